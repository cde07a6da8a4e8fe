mod memory;
mod postgres;

pub use memory::MemoryPhotoRepository;
pub use postgres::PostgresPhotoRepository;

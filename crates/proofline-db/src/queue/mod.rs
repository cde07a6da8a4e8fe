mod memory;
mod postgres;

pub use memory::MemoryWorkQueue;
pub use postgres::PostgresWorkQueue;

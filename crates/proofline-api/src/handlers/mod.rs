pub mod health;
pub mod photos;
pub mod uploads;
pub mod worker;

pub mod flash;
pub mod identity;
pub mod uploads;

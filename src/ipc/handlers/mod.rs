pub mod core;
pub mod reports;

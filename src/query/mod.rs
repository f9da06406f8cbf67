pub mod types;
pub mod executor;

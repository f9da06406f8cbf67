pub mod folding;
pub mod dedup;
pub mod limit;

pub mod cache;
pub mod cached;
pub mod memory;
pub mod notify;

// File: ./src/client/mod.rs
// HTTP implementation of the task backend
pub mod cert;
pub mod core;

pub use self::core::RestClient;

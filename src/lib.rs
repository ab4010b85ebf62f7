pub mod backend;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod session;
pub mod storage;
pub mod theme;
pub mod view_model;

#[cfg(test)]
mod fake_backend;

#[cfg(feature = "tui")]
pub mod tui;

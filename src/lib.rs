pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod server;
pub mod slate;
pub mod store;
pub mod utils;

pub use api::*;
pub use error::*;
pub use models::*;
pub use utils::*;

pub mod llm;
pub mod tools;
pub mod agent;
pub mod message;
pub mod config;
pub mod error;
pub mod prelude;
pub mod registry;
pub mod cache;
pub mod checkpoint;
pub mod dispatcher;
pub mod server;

pub use error::{Error, Result};

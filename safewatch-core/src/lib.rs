//! SafeWatch core: verification and trust engine for community incident reports

pub mod audit;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod store;

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{EngineError, Result};

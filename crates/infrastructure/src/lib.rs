//! Warden Infrastructure - Adapters and implementations
//!
//! This crate provides concrete implementations of the ports
//! defined in the application layer, plus configuration loading and
//! tracing bootstrap for host applications.

pub mod adapters;
pub mod config;
pub mod serialization;
pub mod storage;
pub mod telemetry;

pub use adapters::{ReqwestHttpClient, SystemClock};
pub use self::config::{ConfigError, default_config_path, load_authority_config};
pub use serialization::{
    SerializationError, from_json, from_json_bytes, to_json_stable, to_json_stable_bytes,
};
pub use storage::{FileStorage, MemoryStorage};
pub use telemetry::init_tracing;

//! Object-store gateway.
//!
//! This crate provides:
//! - Storage configuration validation
//! - Client construction for S3 and S3-compatible stores
//! - Upload, list, delete and presigned URL operations
//! - Provider error codes mapped to stable, friendly messages
//! - An in-process store for tests and local runs

pub mod error;
pub mod gateway;
pub mod memory;
pub mod metrics;
pub mod s3;
pub mod store;
pub mod validation;

pub use error::{
    Operation, ProviderFailure, ProviderReason, ProviderResult, StorageError, StorageResult,
};
pub use gateway::{Gateway, DEFAULT_URL_EXPIRY};
pub use memory::{MemoryConnector, MemoryStore};
pub use s3::{S3Connector, S3Store};
pub use store::{ObjectStore, StoreConnector, StoreHandle};
pub use validation::{validate_config, ValidationReport};

//! vidpreview storage library
//!
//! This crate provides the `FileStore` abstraction the pipeline uses to read
//! uploaded files and to publish derived previews, together with a local
//! filesystem backend and an in-memory backend.
//!
//! # Layout of the local backend
//!
//! Every file lives in its own directory named after its id:
//!
//! - `{base}/{id}/info.json`: the serialized `FileInfo`
//! - `{base}/{id}/{internal_name}`: the raw bytes
//!
//! Ids are generated by the store and never contain path separators.

pub mod factory;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod memory;
pub mod traits;

// Re-export commonly used types
pub use factory::create_store;
#[cfg(feature = "storage-local")]
pub use local::LocalFileStore;
pub use memory::MemoryFileStore;
pub use traits::{FileStore, StorageError, StorageResult};
pub use vidpreview_core::StorageBackend;

//! Storage module for file management
//!
//! Provides the local directory that holds uploaded and extracted file bytes.

mod local_storage;

pub use local_storage::{upload_file_name, CollisionPolicy, LocalStorage, StorageError};

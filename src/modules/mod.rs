//! Modules layer - Infrastructure components
//!
//! Contains adapters for resources outside the database, such as the file storage area.

pub mod storage;

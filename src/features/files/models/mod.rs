mod file;

pub use file::{FileChanges, FileRecord, NewFile};

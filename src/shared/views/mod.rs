//! Server-rendered HTML pages.
//!
//! ```ignore
//! use minijinja::context;
//!
//! let views = Views::new()?;
//! let html = views.render("files.html", context! { files => files })?;
//! ```

pub mod engine;

pub use engine::{ViewError, Views};

//! Composition documents
//!
//! Compositions are described in TOML; see [`schema`] for the document layout
//! and [`loader`] for turning a document into something renderable.

pub mod loader;
pub mod schema;

pub use loader::{load_composition, parse_composition, ConfigError, LoadedComposition};
pub use schema::*;

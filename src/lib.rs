//! Static analysis of io-ts style codec modules into OpenAPI documents.
//!
//! Pipeline: [`project`] parses the source tree, [`eval`] interprets codec
//! expressions through the [`registry`], [`worklist`] expands references into
//! components, [`optimize`] canonicalizes them and [`openapi`] serializes.
//! [`document`] drives one build per entry file.
pub mod config;
pub mod doc;
pub mod document;
pub mod error;
pub mod eval;
pub mod ir;
pub mod jq_exec;
pub mod openapi;
pub mod optimize;
pub mod project;
pub mod registry;
pub mod resolve;
pub mod route;
pub mod syntax;
pub mod worklist;

pub use document::{BuildOptions, Document, DocumentBuilder, Info};
pub use error::{Error, Result};
pub use ir::{Origin, Schema, SchemaKind};
pub use project::Project;
pub use registry::Registry;

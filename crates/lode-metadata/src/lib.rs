//! Mod descriptor model and parsing for the lode loader.
//!
//! A mod ships a `lode.mod.json` descriptor at the root of its archive (or
//! directory). This crate defines the descriptor data model ([`ModMetadata`],
//! [`ModDependency`], [`Version`], [`VersionPredicate`]) and the JSON parser
//! that turns descriptor bytes into zero or more metadata entries.
//!
//! The resolver consumes parsing through the [`MetadataParser`] trait so the
//! descriptor format stays replaceable; [`JsonParser`] is the bundled
//! implementation.

mod dependency;
mod metadata;
mod parser;
mod version;

pub use dependency::{DependencyKind, ModDependency};
pub use metadata::{ModMetadata, NestedArchiveEntry};
pub use parser::{JsonParser, MetadataError, MetadataParser};
pub use version::{Version, VersionPredicate};

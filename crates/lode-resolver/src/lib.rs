//! SAT-backed mod discovery and resolution for the lode loader.
//!
//! Given a set of candidate locations (a mods directory, host-provided
//! built-ins, …) the resolver discovers every available mod — including mods
//! nested inside other mod archives — and selects one consistent set to
//! load, or explains every independent reason no such set exists.
//!
//! # Architecture
//!
//! - [`candidate`]: validated mod ids, origins, candidates, and
//!   per-identifier candidate sets.
//! - [`discovery`]: concurrent origin processing with nested-archive
//!   recursion, bounded by a worker pool and a wall-clock timeout.
//! - [`store`]: the in-memory store nested archives are extracted into,
//!   shared across resolution calls as a cache.
//! - [`solver`]: load options, constraint links, and the adapter that
//!   drives a SAT engine to a weight-preferring solution or an iterated
//!   diagnosis of unsatisfiability.
//! - [`ModResolver`]: the public entry point tying discovery, solving, and
//!   result verification together.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use lode_metadata::JsonParser;
//! use lode_resolver::{ArchiveStore, DirectoryModFinder, ModResolver};
//!
//! let store = Arc::new(ArchiveStore::new());
//! let mut resolver = ModResolver::new(store, Arc::new(JsonParser::new()));
//! resolver.add_finder(DirectoryModFinder::new("mods"));
//!
//! match resolver.resolve() {
//!     Ok(resolution) => {
//!         for (id, candidate) in &resolution.mods {
//!             println!("loading {} {}", id, candidate.version());
//!         }
//!     }
//!     Err(error) => eprintln!("{error}"),
//! }
//! ```

pub mod candidate;
pub mod discovery;
pub mod error;
pub mod solver;
pub mod store;

mod resolve;
mod verify;

pub use candidate::{Candidate, CandidateSet, IdRule, InvalidIdError, ModId, Origin};
pub use discovery::{BuiltinMod, CandidateFinder, DirectoryModFinder, DESCRIPTOR_FILE};
pub use error::{ResolveError, Result};
pub use resolve::{ModResolver, Resolution};
pub use store::ArchiveStore;

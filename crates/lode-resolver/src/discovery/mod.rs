//! Concurrent candidate discovery.
//!
//! Every origin is processed by its own task on the resolver's worker pool.
//! A task that finds nested archives extracts them into the shared store and
//! spawns child tasks at depth+1, joining them before it completes, so the
//! whole phase is a fork/join tree behind one barrier. Task failures are
//! captured and aggregated after the join rather than tearing down siblings
//! mid-flight; the phase as a whole is bounded by a wall-clock timeout.

mod finder;

pub use finder::{BuiltinMod, CandidateFinder, DirectoryModFinder};

use std::future::Future;
use std::io::{Cursor, Read};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use indexmap::IndexMap;
use tokio::task::JoinSet;
use zip::result::ZipError;
use zip::ZipArchive;

use lode_metadata::MetadataParser;

use crate::candidate::{Candidate, CandidateSet, ModId, Origin};
use crate::error::ResolveError;
use crate::store::ArchiveStore;

/// The descriptor file looked up at the root of every archive or mod
/// directory.
pub const DESCRIPTOR_FILE: &str = "lode.mod.json";

/// State shared by every discovery task of one resolution call.
pub(crate) struct DiscoveryContext {
    pub candidates: Mutex<IndexMap<ModId, CandidateSet>>,
    pub store: Arc<ArchiveStore>,
    pub parser: Arc<dyn MetadataParser>,
}

/// Run discovery over `origins`, joining every task (and its children)
/// before returning. All task errors are aggregated; exceeding `timeout`
/// fails the whole phase.
pub(crate) async fn run(
    ctx: Arc<DiscoveryContext>,
    origins: Vec<Origin>,
    timeout: Duration,
) -> Result<(), ResolveError> {
    let mut tasks = JoinSet::new();
    for origin in origins {
        tasks.spawn(process_origin(ctx.clone(), origin, 0));
    }

    let joined = tokio::time::timeout(timeout, async move {
        let mut errors = Vec::new();
        while let Some(result) = tasks.join_next().await {
            match result {
                Ok(Ok(())) => {}
                Ok(Err(error)) => errors.push(error),
                Err(join_error) => errors.push(ResolveError::Internal(format!(
                    "discovery task failed: {join_error}"
                ))),
            }
        }
        errors
    })
    .await;

    match joined {
        Err(_elapsed) => Err(ResolveError::DiscoveryTimeout),
        Ok(errors) if errors.is_empty() => Ok(()),
        Ok(errors) => Err(ResolveError::aggregate("Mod discovery failed!", errors)),
    }
}

/// Process one origin: locate and parse its descriptor, insert candidates,
/// then recurse into freshly extracted nested archives.
fn process_origin(
    ctx: Arc<DiscoveryContext>,
    origin: Origin,
    depth: u32,
) -> Pin<Box<dyn Future<Output = Result<(), ResolveError>> + Send>> {
    Box::pin(async move {
        log::debug!("testing {origin}");

        let Some(bytes) = read_descriptor(&ctx.store, &origin)? else {
            return Ok(());
        };

        let origin_text = origin.to_string();
        let mods = ctx
            .parser
            .parse(&bytes, &origin_text)
            .map_err(|source| ResolveError::Metadata {
                origin: origin_text.clone(),
                source,
            })?;

        let mut children = Vec::new();
        for metadata in mods {
            let id = ModId::parse(metadata.id())?;
            let readable = ctx.store.readable_path(&origin);
            let candidate = Arc::new(Candidate::new(
                id.clone(),
                metadata,
                origin.clone(),
                depth,
                readable,
            ));

            let added = {
                let mut map = ctx.candidates.lock().unwrap();
                map.entry(id.clone())
                    .or_insert_with(|| CandidateSet::new(id.clone()))
                    .add(candidate.clone())
            };
            if !added {
                log::debug!("{origin} already present as {candidate}");
                continue;
            }
            log::debug!("adding {candidate} from {origin}");

            let keys = extract_nested(&ctx.store, &origin, &candidate)?;
            children.extend(keys.into_iter().map(Origin::Store));
        }

        if children.is_empty() {
            return Ok(());
        }

        let mut tasks = JoinSet::new();
        for child in children {
            tasks.spawn(process_origin(ctx.clone(), child, depth + 1));
        }
        let mut errors = Vec::new();
        while let Some(result) = tasks.join_next().await {
            match result {
                Ok(Ok(())) => {}
                Ok(Err(error)) => errors.push(error),
                Err(join_error) => errors.push(ResolveError::Internal(format!(
                    "discovery task failed: {join_error}"
                ))),
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ResolveError::aggregate(
                format!("Failed to discover nested archives of {origin}!"),
                errors,
            ))
        }
    })
}

/// The descriptor bytes for an origin, or `None` when the origin carries no
/// descriptor (which yields zero candidates, not an error).
fn read_descriptor(store: &ArchiveStore, origin: &Origin) -> Result<Option<Vec<u8>>, ResolveError> {
    match origin {
        Origin::Path(path) if path.is_dir() => {
            match std::fs::read(path.join(DESCRIPTOR_FILE)) {
                Ok(bytes) => Ok(Some(bytes)),
                Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(source) => Err(ResolveError::Io {
                    origin: origin.to_string(),
                    source,
                }),
            }
        }
        Origin::Path(path) => {
            let bytes = std::fs::read(path).map_err(|source| ResolveError::Io {
                origin: origin.to_string(),
                source,
            })?;
            descriptor_from_zip(&bytes, origin)
        }
        Origin::Store(key) => {
            let bytes = store.get(key).ok_or_else(|| {
                ResolveError::Internal(format!("stored archive `{key}` is missing"))
            })?;
            descriptor_from_zip(&bytes, origin)
        }
        // Built-ins carry ready-made metadata and never pass through here.
        Origin::Builtin(_) => Ok(None),
    }
}

fn descriptor_from_zip(bytes: &[u8], origin: &Origin) -> Result<Option<Vec<u8>>, ResolveError> {
    let archive_error = |source| ResolveError::Archive {
        origin: origin.to_string(),
        source,
    };

    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(archive_error)?;
    let mut file = match archive.by_name(DESCRIPTOR_FILE) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(source) => return Err(archive_error(source)),
    };
    let mut out = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut out).map_err(|source| ResolveError::Io {
        origin: origin.to_string(),
        source,
    })?;
    Ok(Some(out))
}

/// Copy the candidate's declared nested archives into the store (once per
/// parent origin) and return their store keys.
fn extract_nested(
    store: &ArchiveStore,
    origin: &Origin,
    candidate: &Arc<Candidate>,
) -> Result<Vec<String>, ResolveError> {
    let parent_key = origin.to_string();
    let declared = candidate.metadata().archives().to_vec();
    let parent_readable = candidate.readable_origin().to_string();
    let origin = origin.clone();

    store.nested_for(&parent_key, move |store| {
        if declared.is_empty() {
            return Ok(Vec::new());
        }
        log::debug!("searching for nested archives in {origin}");

        let mut keys = Vec::new();
        for entry in &declared {
            if !entry.file.ends_with(".zip") {
                continue;
            }
            let bytes = read_nested_entry(store, &origin, &entry.file)?;
            let key = store.store_archive(bytes);
            log::debug!("found nested archive {} in {origin}", entry.file);
            store.set_readable(key.clone(), format!("{parent_readable}!{}", entry.file));
            keys.push(key);
        }
        Ok(keys)
    })
}

fn read_nested_entry(
    store: &ArchiveStore,
    origin: &Origin,
    entry: &str,
) -> Result<Vec<u8>, ResolveError> {
    let nested_error = |reason: String| ResolveError::NestedCopy {
        parent: origin.to_string(),
        entry: entry.to_string(),
        reason,
    };

    match origin {
        Origin::Path(path) if path.is_dir() => {
            std::fs::read(path.join(entry)).map_err(|e| nested_error(e.to_string()))
        }
        Origin::Path(path) => {
            let bytes = std::fs::read(path).map_err(|e| nested_error(e.to_string()))?;
            nested_from_zip(&bytes, entry).map_err(nested_error)
        }
        Origin::Store(key) => {
            let bytes = store
                .get(key)
                .ok_or_else(|| nested_error("parent archive missing from store".to_string()))?;
            nested_from_zip(&bytes, entry).map_err(nested_error)
        }
        Origin::Builtin(_) => Err(nested_error(
            "built-in mods cannot declare nested archives".to_string(),
        )),
    }
}

fn nested_from_zip(bytes: &[u8], entry: &str) -> Result<Vec<u8>, String> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(|e| e.to_string())?;
    let mut file = archive.by_name(entry).map_err(|e| e.to_string())?;
    let mut out = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut out).map_err(|e| e.to_string())?;
    Ok(out)
}

//! JSON descriptor parsing.
//!
//! A descriptor file holds either a single descriptor object or an array of
//! them, so one archive can declare several mods. Schema structs mirror the
//! on-disk JSON and are converted into [`ModMetadata`] after validation.

use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;

use crate::dependency::DependencyKind;
use crate::metadata::ModMetadata;
use crate::version::{Version, VersionPredicate};

/// Errors produced while turning descriptor bytes into metadata.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("invalid descriptor JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("descriptor declares no mod id")]
    MissingId,

    #[error("descriptor for `{id}` declares no version")]
    MissingVersion { id: String },

    #[error("descriptor for `{id}` uses schema version {found}, but the latest supported is {latest}")]
    UnsupportedSchema { id: String, found: u32, latest: u32 },
}

/// Turns descriptor bytes into zero or more metadata entries.
///
/// The resolver treats implementations as opaque; `origin` is a description
/// of where the bytes came from, for logging only.
pub trait MetadataParser: Send + Sync {
    fn parse(&self, bytes: &[u8], origin: &str) -> Result<Vec<ModMetadata>, MetadataError>;
}

/// The bundled `lode.mod.json` parser.
#[derive(Debug, Default)]
pub struct JsonParser;

impl JsonParser {
    pub fn new() -> Self {
        Self
    }
}

impl MetadataParser for JsonParser {
    fn parse(&self, bytes: &[u8], origin: &str) -> Result<Vec<ModMetadata>, MetadataError> {
        log::debug!("parsing descriptor from {origin}");

        let file: DescriptorFile = serde_json::from_slice(bytes)?;
        let raw = match file {
            DescriptorFile::One(descriptor) => vec![*descriptor],
            DescriptorFile::Many(descriptors) => descriptors,
        };

        raw.into_iter().map(RawDescriptor::into_metadata).collect()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DescriptorFile {
    Many(Vec<RawDescriptor>),
    One(Box<RawDescriptor>),
}

/// A predicate is either one requirement string or an array meaning any-of.
#[derive(Deserialize)]
#[serde(untagged)]
enum PredicateSpec {
    One(String),
    Many(Vec<String>),
}

impl PredicateSpec {
    fn into_predicate(self) -> VersionPredicate {
        match self {
            PredicateSpec::One(text) => VersionPredicate::parse(&text),
            PredicateSpec::Many(texts) => VersionPredicate::parse_any_of(&texts),
        }
    }
}

#[derive(Deserialize)]
struct RawArchiveEntry {
    file: String,
}

fn default_schema_version() -> u32 {
    ModMetadata::LATEST_SCHEMA_VERSION
}

#[derive(Deserialize)]
struct RawDescriptor {
    #[serde(rename = "schemaVersion", default = "default_schema_version")]
    schema_version: u32,
    #[serde(default)]
    id: String,
    version: Option<String>,
    name: Option<String>,
    description: Option<String>,
    #[serde(default)]
    depends: IndexMap<String, PredicateSpec>,
    #[serde(default)]
    recommends: IndexMap<String, PredicateSpec>,
    #[serde(default)]
    breaks: IndexMap<String, PredicateSpec>,
    #[serde(default)]
    conflicts: IndexMap<String, PredicateSpec>,
    #[serde(default)]
    archives: Vec<RawArchiveEntry>,
}

impl RawDescriptor {
    fn into_metadata(self) -> Result<ModMetadata, MetadataError> {
        if self.id.is_empty() {
            return Err(MetadataError::MissingId);
        }
        if self.schema_version > ModMetadata::LATEST_SCHEMA_VERSION {
            return Err(MetadataError::UnsupportedSchema {
                id: self.id,
                found: self.schema_version,
                latest: ModMetadata::LATEST_SCHEMA_VERSION,
            });
        }
        let version = match self.version {
            Some(text) => Version::parse(&text),
            None => return Err(MetadataError::MissingVersion { id: self.id }),
        };

        let mut metadata = ModMetadata::new(self.id, version)
            .with_schema_version(self.schema_version);
        if let Some(name) = self.name {
            metadata = metadata.with_name(name);
        }
        if let Some(description) = self.description {
            metadata = metadata.with_description(description);
        }

        let relations = [
            (DependencyKind::Depends, self.depends),
            (DependencyKind::Recommends, self.recommends),
            (DependencyKind::Breaks, self.breaks),
            (DependencyKind::Conflicts, self.conflicts),
        ];
        for (kind, map) in relations {
            for (id, spec) in map {
                metadata = metadata.with_dependency(kind, id, spec.into_predicate());
            }
        }

        for entry in self.archives {
            metadata = metadata.with_archive(entry.file);
        }

        Ok(metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_one(json: &str) -> ModMetadata {
        let mut mods = JsonParser::new().parse(json.as_bytes(), "test").unwrap();
        assert_eq!(mods.len(), 1);
        mods.remove(0)
    }

    #[test]
    fn test_parse_minimal() {
        let metadata = parse_one(r#"{"id": "example", "version": "1.0.0"}"#);
        assert_eq!(metadata.id(), "example");
        assert_eq!(metadata.version().to_string(), "1.0.0");
        assert_eq!(metadata.schema_version(), ModMetadata::LATEST_SCHEMA_VERSION);
        assert!(metadata.dependencies().is_empty());
    }

    #[test]
    fn test_parse_relations_and_archives() {
        let metadata = parse_one(
            r#"{
                "schemaVersion": 1,
                "id": "example",
                "version": "1.2.0",
                "name": "Example",
                "depends": {"core": ">=2.0.0", "api": ["1.0.0", ">=3.0.0"]},
                "breaks": {"legacy": "*"},
                "archives": [{"file": "nested/lib.zip"}]
            }"#,
        );
        let depends: Vec<_> = metadata.depends().collect();
        assert_eq!(depends.len(), 2);
        assert_eq!(depends[0].id, "core");
        assert!(depends[1].matches(&Version::parse("3.1.0")));
        assert_eq!(metadata.breaks().count(), 1);
        assert_eq!(metadata.archives().len(), 1);
        assert_eq!(metadata.archives()[0].file, "nested/lib.zip");
    }

    #[test]
    fn test_parse_array_of_descriptors() {
        let json = r#"[
            {"id": "one", "version": "1.0.0"},
            {"id": "two", "version": "2.0.0"}
        ]"#;
        let mods = JsonParser::new().parse(json.as_bytes(), "test").unwrap();
        assert_eq!(mods.len(), 2);
        assert_eq!(mods[0].id(), "one");
        assert_eq!(mods[1].id(), "two");
    }

    #[test]
    fn test_parse_missing_id() {
        let err = JsonParser::new()
            .parse(br#"{"version": "1.0.0"}"#, "test")
            .unwrap_err();
        assert!(matches!(err, MetadataError::MissingId));
    }

    #[test]
    fn test_parse_missing_version() {
        let err = JsonParser::new().parse(br#"{"id": "example"}"#, "test").unwrap_err();
        assert!(matches!(err, MetadataError::MissingVersion { .. }));
    }

    #[test]
    fn test_parse_newer_schema_rejected() {
        let err = JsonParser::new()
            .parse(br#"{"schemaVersion": 99, "id": "example", "version": "1.0.0"}"#, "test")
            .unwrap_err();
        assert!(matches!(err, MetadataError::UnsupportedSchema { found: 99, .. }));
    }

    #[test]
    fn test_parse_malformed_json() {
        let err = JsonParser::new().parse(b"{not json", "test").unwrap_err();
        assert!(matches!(err, MetadataError::Json(_)));
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let metadata = parse_one(r#"{"id": "example", "version": "1.0.0", "homepage": "x"}"#);
        assert_eq!(metadata.id(), "example");
    }
}

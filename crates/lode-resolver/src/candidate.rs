//! Candidate model: validated mod ids, origins, discovered candidates, and
//! per-identifier candidate sets.

use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::Arc;

use lode_metadata::{ModDependency, ModMetadata, Version};

use crate::error::ResolveError;

/// One rule an identifier string can violate.
///
/// Valid ids match `[a-z][a-z0-9_-]{1,63}`. Validation reports every
/// violated rule, not just the first, so a multi-rule violation is fully
/// explained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdRule {
    Empty,
    TooShort,
    TooLong,
    InvalidStart(char),
    InvalidChars(Vec<char>),
}

impl fmt::Display for IdRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdRule::Empty => f.write_str("is empty!"),
            IdRule::TooShort => {
                f.write_str("is only a single character! (It must be at least 2 characters long)!")
            }
            IdRule::TooLong => f.write_str("has more than 64 characters!"),
            IdRule::InvalidStart(c) => write!(
                f,
                "starts with an invalid character '{c}' (it must be a lowercase a-z - uppercase isn't allowed anywhere in the id)"
            ),
            IdRule::InvalidChars(chars) => {
                f.write_str("contains invalid characters: '")?;
                for c in chars {
                    write!(f, "{c}")?;
                }
                f.write_str("'!")
            }
        }
    }
}

/// An identifier that failed validation, with every violated rule.
#[derive(Debug, Clone)]
pub struct InvalidIdError {
    pub id: String,
    pub rules: Vec<IdRule>,
}

impl fmt::Display for InvalidIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mod id `{}` does not match the requirements because", self.id)?;
        if self.rules.len() == 1 {
            write!(f, " it {}", self.rules[0])
        } else {
            f.write_str(":")?;
            for rule in &self.rules {
                write!(f, "\n  - It {rule}")?;
            }
            Ok(())
        }
    }
}

impl std::error::Error for InvalidIdError {}

/// A validated mod identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModId(String);

impl ModId {
    /// Validate and wrap an identifier string.
    pub fn parse(id: &str) -> Result<ModId, InvalidIdError> {
        let rules = Self::check(id);
        if rules.is_empty() {
            Ok(ModId(id.to_string()))
        } else {
            Err(InvalidIdError {
                id: id.to_string(),
                rules,
            })
        }
    }

    /// Every rule `id` violates; empty when the id is valid.
    pub fn check(id: &str) -> Vec<IdRule> {
        if id.is_empty() {
            return vec![IdRule::Empty];
        }

        let mut rules = Vec::new();
        let length = id.chars().count();
        if length == 1 {
            rules.push(IdRule::TooShort);
        } else if length > 64 {
            rules.push(IdRule::TooLong);
        }

        let first = id.chars().next().unwrap_or('\0');
        if !first.is_ascii_lowercase() {
            rules.push(IdRule::InvalidStart(first));
        }

        let mut invalid: Vec<char> = id
            .chars()
            .skip(1)
            .filter(|c| !matches!(c, 'a'..='z' | '0'..='9' | '-' | '_'))
            .collect();
        invalid.sort_unstable();
        invalid.dedup();
        if !invalid.is_empty() {
            rules.push(IdRule::InvalidChars(invalid));
        }

        rules
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ModId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ModId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Where a candidate was discovered.
///
/// The display form is the identity used for deduplication and for keying
/// the archive store's readable-path map.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Origin {
    /// An archive file or mod directory on disk.
    Path(PathBuf),
    /// An archive extracted into the in-memory store.
    Store(String),
    /// A built-in mod supplied by the host.
    Builtin(String),
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Path(path) => write!(f, "{}", path.display()),
            Origin::Store(key) => f.write_str(key),
            Origin::Builtin(id) => write!(f, "builtin:{id}"),
        }
    }
}

/// One discovered, parsed mod available for selection.
///
/// Immutable once constructed; discovery creates candidates and everything
/// downstream shares them through `Arc`. Identity is `(id, origin)`.
#[derive(Debug)]
pub struct Candidate {
    id: ModId,
    metadata: ModMetadata,
    origin: Origin,
    depth: u32,
    readable_origin: String,
}

impl Candidate {
    pub fn new(
        id: ModId,
        metadata: ModMetadata,
        origin: Origin,
        depth: u32,
        readable_origin: String,
    ) -> Self {
        Self {
            id,
            metadata,
            origin,
            depth,
            readable_origin,
        }
    }

    pub fn id(&self) -> &ModId {
        &self.id
    }

    pub fn metadata(&self) -> &ModMetadata {
        &self.metadata
    }

    pub fn version(&self) -> &Version {
        self.metadata.version()
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// Nesting depth: 0 for top-level mods and built-ins, +1 per enclosing
    /// archive.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Depth-0 candidates were directly provided and must load.
    pub fn is_mandatory(&self) -> bool {
        self.depth == 0
    }

    /// A path-like description suitable for messages; nested archives render
    /// as `parent!inner`.
    pub fn readable_origin(&self) -> &str {
        &self.readable_origin
    }

    pub fn depends(&self) -> impl Iterator<Item = &ModDependency> {
        self.metadata.depends()
    }

    pub fn recommends(&self) -> impl Iterator<Item = &ModDependency> {
        self.metadata.recommends()
    }

    pub fn breaks(&self) -> impl Iterator<Item = &ModDependency> {
        self.metadata.breaks()
    }

    pub fn conflicts(&self) -> impl Iterator<Item = &ModDependency> {
        self.metadata.conflicts()
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.origin == other.origin
    }
}

impl Eq for Candidate {}

impl Hash for Candidate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.origin.hash(state);
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.version())
    }
}

/// All candidates discovered for one identifier.
///
/// Insertion-ordered and deduplicated by origin: re-adding a candidate from
/// an origin already present is a no-op, not an error.
#[derive(Debug)]
pub struct CandidateSet {
    id: ModId,
    candidates: Vec<Arc<Candidate>>,
}

impl CandidateSet {
    pub fn new(id: ModId) -> Self {
        Self {
            id,
            candidates: Vec::new(),
        }
    }

    pub fn id(&self) -> &ModId {
        &self.id
    }

    /// Insert unless this origin is already present. Returns whether the
    /// candidate was added.
    pub fn add(&mut self, candidate: Arc<Candidate>) -> bool {
        let origin = candidate.origin().to_string();
        if self
            .candidates
            .iter()
            .any(|c| c.origin().to_string() == origin)
        {
            return false;
        }
        self.candidates.push(candidate);
        true
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Candidate>> {
        self.candidates.iter()
    }

    /// Whether any member is mandatory (directly provided).
    pub fn is_mandatory(&self) -> bool {
        self.candidates.iter().any(|c| c.is_mandatory())
    }

    /// The candidates to offer the solver, in preference order.
    ///
    /// A mandatory member shadows nested copies of the same id, so a
    /// mandatory id always resolves to exactly one candidate. Two or more
    /// mandatory members is a hard discovery error.
    pub fn resolve(&self) -> Result<Vec<Arc<Candidate>>, ResolveError> {
        let mandatory: Vec<&Arc<Candidate>> = self
            .candidates
            .iter()
            .filter(|c| c.is_mandatory())
            .collect();
        match mandatory.len() {
            0 => Ok(self.candidates.clone()),
            1 => Ok(vec![mandatory[0].clone()]),
            _ => Err(ResolveError::DuplicateMandatory {
                id: self.id.to_string(),
                origins: mandatory
                    .iter()
                    .map(|c| c.readable_origin().to_string())
                    .collect(),
            }),
        }
    }
}

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::candidate::{Candidate, ModId};

/// One selectable candidate: a boolean decision variable for "load this
/// candidate".
///
/// The index distinguishes options sharing a mod id: `None` means this is
/// the only option for the id, otherwise it is the 0-based preference rank
/// in discovery order (rank 0 preferred).
#[derive(Debug, Clone)]
pub struct CandidateOption {
    candidate: Arc<Candidate>,
    index: Option<usize>,
}

impl CandidateOption {
    pub fn new(candidate: Arc<Candidate>, index: Option<usize>) -> Self {
        Self { candidate, index }
    }

    pub fn candidate(&self) -> &Arc<Candidate> {
        &self.candidate
    }

    pub fn id(&self) -> &ModId {
        self.candidate.id()
    }

    pub fn index(&self) -> Option<usize> {
        self.index
    }

    /// "mod 'x'", or "mod 'x'#2" when several options share the id.
    pub fn short_string(&self) -> String {
        match self.index {
            None => format!("mod '{}'", self.id()),
            Some(index) => format!("mod '{}'#{}", self.id(), index + 1),
        }
    }

    /// Version and load source, for diagnostics.
    pub fn specific_info(&self) -> String {
        format!(
            "version {} loaded from {}",
            self.candidate.version(),
            self.candidate.readable_origin()
        )
    }

    pub fn full_string(&self) -> String {
        format!("{} {}", self.short_string(), self.specific_info())
    }
}

impl PartialEq for CandidateOption {
    fn eq(&self, other: &Self) -> bool {
        self.candidate == other.candidate
    }
}

impl Eq for CandidateOption {}

impl Hash for CandidateOption {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.candidate.hash(state);
    }
}

impl fmt::Display for CandidateOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short_string())
    }
}

/// A clause literal: a candidate option, selected or negated.
///
/// Negation wraps the option directly, so negating twice is
/// unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOption {
    Candidate(CandidateOption),
    Negated(CandidateOption),
}

impl LoadOption {
    pub fn option(&self) -> &CandidateOption {
        match self {
            LoadOption::Candidate(option) | LoadOption::Negated(option) => option,
        }
    }

    pub fn is_negated(&self) -> bool {
        matches!(self, LoadOption::Negated(_))
    }
}

impl fmt::Display for LoadOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadOption::Candidate(option) => write!(f, "{option}"),
            LoadOption::Negated(option) => write!(f, "NOT {option}"),
        }
    }
}

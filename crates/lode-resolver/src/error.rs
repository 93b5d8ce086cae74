use thiserror::Error;

use lode_metadata::MetadataError;

use crate::candidate::InvalidIdError;

pub type Result<T> = std::result::Result<T, ResolveError>;

/// Everything that can make a resolution call fail.
///
/// A failing call raises exactly one value; independent failures collected
/// along the way (duplicate mandatory mods, unsatisfiability diagnoses) are
/// wrapped in [`ResolveError::Aggregate`] so the caller sees every root
/// cause at once.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// A discovered mod id failed validation.
    #[error(transparent)]
    InvalidModId(#[from] InvalidIdError),

    /// More than one mandatory candidate claims the same id.
    #[error("duplicate mandatory mod `{id}`, provided by: {}", .origins.join(", "))]
    DuplicateMandatory { id: String, origins: Vec<String> },

    /// Reading an origin from disk failed.
    #[error("failed to read mod at {origin}: {source}")]
    Io {
        origin: String,
        #[source]
        source: std::io::Error,
    },

    /// An archive could not be opened or read.
    #[error("failed to open mod archive at {origin}: {source}")]
    Archive {
        origin: String,
        #[source]
        source: zip::result::ZipError,
    },

    /// A descriptor was present but failed to parse.
    #[error("mod at {origin} has an invalid descriptor: {source}")]
    Metadata {
        origin: String,
        #[source]
        source: MetadataError,
    },

    /// A declared nested archive could not be copied into the store.
    #[error("failed to load nested archive `{entry}` from {parent}: {reason}")]
    NestedCopy {
        parent: String,
        entry: String,
        reason: String,
    },

    #[error("mod discovery took too long")]
    DiscoveryTimeout,

    #[error("mod collection took too long to be resolved")]
    SolveTimeout,

    /// One independent reason the constraint set is unsatisfiable.
    #[error("{0}")]
    Unsatisfiable(String),

    /// Hard verification failures against the selected set.
    #[error("{0}")]
    Verification(String),

    /// An internal invariant was violated; not a user data problem.
    #[error("internal resolver error: {0}")]
    Internal(String),

    /// Several independent failures, each preserved as a nested cause.
    #[error("{}", format_aggregate(.message, .errors))]
    Aggregate {
        message: String,
        errors: Vec<ResolveError>,
    },
}

impl ResolveError {
    /// Collapse collected errors into one: a single error is raised
    /// directly, several are wrapped with a summary message.
    pub fn aggregate(message: impl Into<String>, mut errors: Vec<ResolveError>) -> ResolveError {
        match errors.len() {
            1 => errors.remove(0),
            _ => ResolveError::Aggregate {
                message: message.into(),
                errors,
            },
        }
    }

    /// The nested causes of an aggregate, or just `self`.
    pub fn causes(&self) -> impl Iterator<Item = &ResolveError> {
        match self {
            ResolveError::Aggregate { errors, .. } => errors.iter(),
            other => std::slice::from_ref(other).iter(),
        }
    }
}

fn format_aggregate(message: &str, errors: &[ResolveError]) -> String {
    let mut out = String::from(message);
    for error in errors {
        out.push_str("\n - ");
        out.push_str(&error.to_string().replace('\n', "\n   "));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_of_one_is_the_error_itself() {
        let error = ResolveError::aggregate(
            "Found 1 errors!",
            vec![ResolveError::DiscoveryTimeout],
        );
        assert!(matches!(error, ResolveError::DiscoveryTimeout));
    }

    #[test]
    fn test_aggregate_lists_every_cause() {
        let error = ResolveError::aggregate(
            "Found 2 errors while resolving mods!",
            vec![
                ResolveError::Unsatisfiable("first".to_string()),
                ResolveError::Unsatisfiable("second".to_string()),
            ],
        );
        let text = error.to_string();
        assert!(text.contains("Found 2 errors"));
        assert!(text.contains("first"));
        assert!(text.contains("second"));
        assert_eq!(error.causes().count(), 2);
    }
}

use crate::dependency::{DependencyKind, ModDependency};
use crate::version::{Version, VersionPredicate};

/// A nested archive declared by a descriptor, as a path inside the parent
/// archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NestedArchiveEntry {
    pub file: String,
}

/// One parsed mod descriptor.
///
/// Immutable once constructed; the resolver wraps it in a candidate together
/// with the origin it was discovered at.
#[derive(Debug, Clone)]
pub struct ModMetadata {
    id: String,
    version: Version,
    name: Option<String>,
    description: Option<String>,
    dependencies: Vec<ModDependency>,
    archives: Vec<NestedArchiveEntry>,
    schema_version: u32,
}

impl ModMetadata {
    /// The newest descriptor schema this crate understands.
    pub const LATEST_SCHEMA_VERSION: u32 = 1;

    /// A minimal descriptor, used for built-in mods supplied by the host.
    pub fn new(id: impl Into<String>, version: Version) -> Self {
        Self {
            id: id.into(),
            version,
            name: None,
            description: None,
            dependencies: Vec::new(),
            archives: Vec::new(),
            schema_version: Self::LATEST_SCHEMA_VERSION,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    pub fn archives(&self) -> &[NestedArchiveEntry] {
        &self.archives
    }

    /// All declared relations in declaration order.
    pub fn dependencies(&self) -> &[ModDependency] {
        &self.dependencies
    }

    pub fn dependencies_of(&self, kind: DependencyKind) -> impl Iterator<Item = &ModDependency> {
        self.dependencies.iter().filter(move |d| d.kind == kind)
    }

    pub fn depends(&self) -> impl Iterator<Item = &ModDependency> {
        self.dependencies_of(DependencyKind::Depends)
    }

    pub fn recommends(&self) -> impl Iterator<Item = &ModDependency> {
        self.dependencies_of(DependencyKind::Recommends)
    }

    pub fn breaks(&self) -> impl Iterator<Item = &ModDependency> {
        self.dependencies_of(DependencyKind::Breaks)
    }

    pub fn conflicts(&self) -> impl Iterator<Item = &ModDependency> {
        self.dependencies_of(DependencyKind::Conflicts)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_dependency(
        mut self,
        kind: DependencyKind,
        id: impl Into<String>,
        predicate: VersionPredicate,
    ) -> Self {
        self.dependencies.push(ModDependency::new(kind, id, predicate));
        self
    }

    pub fn with_archive(mut self, file: impl Into<String>) -> Self {
        self.archives.push(NestedArchiveEntry { file: file.into() });
        self
    }

    pub(crate) fn with_schema_version(mut self, schema_version: u32) -> Self {
        self.schema_version = schema_version;
        self
    }
}

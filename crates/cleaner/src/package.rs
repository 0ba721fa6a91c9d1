//! The package being cleaned and its protection policy

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Decides which paths inside a prefix the cleaner must leave alone.
///
/// Paths are handed over relative to the package prefix (`bin/tool`,
/// `share/info`). Implementations must be side-effect free; the cleaner asks
/// many times per run.
pub trait ProtectionPolicy: Send + Sync {
    fn is_protected(&self, relative: &Path) -> bool;
}

impl<F> ProtectionPolicy for F
where
    F: Fn(&Path) -> bool + Send + Sync,
{
    fn is_protected(&self, relative: &Path) -> bool {
        self(relative)
    }
}

/// Exact-match protection list, optionally protecting everything
#[derive(Debug, Clone, Default)]
pub struct ProtectedPaths {
    all: bool,
    paths: HashSet<PathBuf>,
}

impl ProtectedPaths {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Protect every path in the package
    #[must_use]
    pub fn all() -> Self {
        Self {
            all: true,
            paths: HashSet::new(),
        }
    }

    /// Protect one prefix-relative path
    #[must_use]
    pub fn with(mut self, relative: impl Into<PathBuf>) -> Self {
        self.paths.insert(relative.into());
        self
    }

    pub fn insert(&mut self, relative: impl Into<PathBuf>) {
        self.paths.insert(relative.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.all && self.paths.is_empty()
    }
}

impl<P: Into<PathBuf>> FromIterator<P> for ProtectedPaths {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        Self {
            all: false,
            paths: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl ProtectionPolicy for ProtectedPaths {
    fn is_protected(&self, relative: &Path) -> bool {
        self.all || self.paths.contains(relative)
    }
}

/// An installed package prefix, as handed to [`crate::Cleaner::clean`]
#[derive(Clone)]
pub struct InstalledPackage {
    name: String,
    prefix: PathBuf,
    protection: Arc<dyn ProtectionPolicy>,
}

impl InstalledPackage {
    /// A package with nothing protected
    pub fn new(name: impl Into<String>, prefix: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            prefix: prefix.into(),
            protection: Arc::new(ProtectedPaths::new()),
        }
    }

    #[must_use]
    pub fn with_protection(mut self, policy: impl ProtectionPolicy + 'static) -> Self {
        self.protection = Arc::new(policy);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    #[must_use]
    pub fn bin(&self) -> PathBuf {
        self.prefix.join("bin")
    }

    #[must_use]
    pub fn sbin(&self) -> PathBuf {
        self.prefix.join("sbin")
    }

    #[must_use]
    pub fn lib(&self) -> PathBuf {
        self.prefix.join("lib")
    }

    #[must_use]
    pub fn info(&self) -> PathBuf {
        self.prefix.join("share").join("info")
    }

    /// Directories whose files are classified, stripped and chmodded
    #[must_use]
    pub fn watched_dirs(&self) -> [PathBuf; 3] {
        [self.bin(), self.sbin(), self.lib()]
    }

    /// Whether `path` must be left alone.
    ///
    /// Paths outside the prefix and the prefix itself are never protected.
    #[must_use]
    pub fn is_protected(&self, path: &Path) -> bool {
        match path.strip_prefix(&self.prefix) {
            Ok(relative) if !relative.as_os_str().is_empty() => {
                self.protection.is_protected(relative)
            }
            _ => false,
        }
    }

    /// Whether `path` or any directory between it and the prefix is protected
    #[must_use]
    pub fn is_protected_within(&self, path: &Path) -> bool {
        path.ancestors()
            .take_while(|p| p.starts_with(&self.prefix))
            .any(|p| self.is_protected(p))
    }
}

impl fmt::Debug for InstalledPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstalledPackage")
            .field("name", &self.name)
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_paths() {
        let pkg = InstalledPackage::new("tool", "/opt/keg/tool/1.0");
        assert_eq!(pkg.bin(), PathBuf::from("/opt/keg/tool/1.0/bin"));
        assert_eq!(pkg.info(), PathBuf::from("/opt/keg/tool/1.0/share/info"));
        assert_eq!(pkg.watched_dirs().len(), 3);
    }

    #[test]
    fn protection_is_prefix_relative_and_exact() {
        let pkg = InstalledPackage::new("tool", "/p")
            .with_protection(ProtectedPaths::new().with("lib/keep"));
        assert!(pkg.is_protected(Path::new("/p/lib/keep")));
        assert!(!pkg.is_protected(Path::new("/p/lib/keep/inner")));
        assert!(!pkg.is_protected(Path::new("/p/lib")));
        assert!(!pkg.is_protected(Path::new("/elsewhere/lib/keep")));
    }

    #[test]
    fn protection_covers_descendants_of_protected_directories() {
        let pkg = InstalledPackage::new("tool", "/p")
            .with_protection(ProtectedPaths::new().with("share"));
        assert!(pkg.is_protected_within(Path::new("/p/share/info/tool.info")));
        assert!(pkg.is_protected_within(Path::new("/p/share")));
        assert!(!pkg.is_protected_within(Path::new("/p/lib/share")));
        assert!(!pkg.is_protected_within(Path::new("/p")));
    }

    #[test]
    fn protect_all_spares_everything_but_the_prefix() {
        let pkg = InstalledPackage::new("tool", "/p").with_protection(ProtectedPaths::all());
        assert!(pkg.is_protected(Path::new("/p/bin/tool")));
        assert!(!pkg.is_protected(Path::new("/p")));
    }

    #[test]
    fn closures_are_policies() {
        let pkg = InstalledPackage::new("tool", "/p")
            .with_protection(|rel: &Path| rel.starts_with("share"));
        assert!(pkg.is_protected(Path::new("/p/share/doc")));
        assert!(!pkg.is_protected(Path::new("/p/bin/tool")));
    }

    #[test]
    fn collected_paths() {
        let paths: ProtectedPaths = ["bin/a", "lib/b"].into_iter().collect();
        assert!(paths.is_protected(Path::new("lib/b")));
        assert!(!paths.is_empty());
        assert!(ProtectedPaths::new().is_empty());
    }
}

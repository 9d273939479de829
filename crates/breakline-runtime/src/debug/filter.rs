//! Project / vendored source boundary.

#![allow(missing_docs)]

use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

/// Path segments that mark vendored/third-party code.
///
/// The exact boundary between project and library code is environment
/// specific; these markers are a minimum viable filter and callers can
/// replace them per deployment.
pub const DEFAULT_VENDOR_MARKERS: &[&str] = &["site-packages", "vendor"];

/// Decides which source files belong to the debugged project.
///
/// Wildcard (step) mode instruments only project files: files under the
/// configured root whose path contains no vendor marker segment and that are
/// not synthetic runtime modules (non-absolute or `<...>`-style paths).
#[derive(Debug, Clone)]
pub struct SourceFilter {
    root: Option<PathBuf>,
    vendor_markers: Vec<String>,
}

impl SourceFilter {
    /// Build a filter rooted at `root` with the default vendor markers.
    #[must_use]
    pub fn new(root: Option<PathBuf>) -> Self {
        Self {
            root,
            vendor_markers: DEFAULT_VENDOR_MARKERS
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }

    /// Replace the vendor marker segments.
    #[must_use]
    pub fn with_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.vendor_markers = markers.into_iter().map(Into::into).collect();
        self
    }

    /// The configured project root, if any.
    #[must_use]
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Whether `file` is project-owned code.
    #[must_use]
    pub fn is_project_file(&self, file: &Path) -> bool {
        if is_synthetic(file) {
            return false;
        }
        let Some(root) = &self.root else {
            return false;
        };
        if !file.starts_with(root) {
            return false;
        }
        !file.components().any(|component| match component {
            Component::Normal(segment) => self
                .vendor_markers
                .iter()
                .any(|marker| segment == OsStr::new(marker)),
            _ => false,
        })
    }
}

impl Default for SourceFilter {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Synthetic runtime modules (`<frozen ...>`-style names) never map to
/// project sources.
fn is_synthetic(file: &Path) -> bool {
    if !file.is_absolute() {
        return true;
    }
    file.to_string_lossy().starts_with('<')
}

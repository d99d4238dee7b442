//! Attribute a query to the application code that issued it.

use crate::event::StackFrame;
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Application source location of a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    pub file: PathBuf,
    pub line: u32,
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file.display(), self.line)
    }
}

/// Strategy mapping the current stack (innermost first) to an application frame.
pub trait CallSiteResolver: Send + Sync {
    fn resolve(&self, stack: &[StackFrame]) -> Option<CallSite>;
}

impl<F> CallSiteResolver for F
where
    F: Fn(&[StackFrame]) -> Option<CallSite> + Send + Sync,
{
    fn resolve(&self, stack: &[StackFrame]) -> Option<CallSite> {
        self(stack)
    }
}

/// Picks the innermost frame whose file lies under the application source root.
#[derive(Debug, Clone)]
pub struct AppRootResolver {
    app_root: PathBuf,
}

impl AppRootResolver {
    pub fn new(app_root: impl AsRef<Path>) -> Self {
        Self { app_root: normalize(app_root.as_ref()) }
    }

    pub fn app_root(&self) -> &Path {
        &self.app_root
    }

    fn is_app_file(&self, file: &Path) -> bool {
        normalize(file).starts_with(&self.app_root)
    }
}

impl CallSiteResolver for AppRootResolver {
    fn resolve(&self, stack: &[StackFrame]) -> Option<CallSite> {
        stack.iter().find_map(|frame| {
            // frames without both a file and a line are never candidates
            let (file, line) = (frame.file.as_ref()?, frame.line?);
            self.is_app_file(file).then(|| CallSite { file: file.clone(), line })
        })
    }
}

fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

//! Filesystem loader.
//!
//! Resolves locations against a root directory and executes the module
//! manifest found there.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use crate::core::Implementation;
use crate::loader::{resource_key, ExecutionContext, LoadFailure, LoadRequest, Loader};

/// Loads module manifests from a directory tree.
#[derive(Debug)]
pub struct ManifestLoader {
    root: PathBuf,
    context: ExecutionContext,
}

impl ManifestLoader {
    /// Create a loader rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ManifestLoader {
            root: root.into(),
            context: ExecutionContext::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The execution context modules are installed into.
    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Locations executed so far, in request order.
    pub fn executed(&self) -> Vec<String> {
        self.context.executed()
    }

    pub fn is_executed(&self, location: &str) -> bool {
        self.context.is_executed(location)
    }

    /// Map a location to a file under the root.
    ///
    /// Locations that would escape the root are rejected.
    fn resource_path(&self, location: &str) -> Result<PathBuf, LoadFailure> {
        let key = resource_key(location);
        if key.is_empty() {
            return Err(LoadFailure::network(format!("empty location `{}`", location)));
        }

        let relative = Path::new(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(LoadFailure::network(format!(
                "`{}` points outside {}",
                location,
                self.root.display()
            )));
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl Loader for ManifestLoader {
    fn name(&self) -> &str {
        "manifest"
    }

    async fn load(&self, request: &LoadRequest<'_>) -> Result<Implementation, LoadFailure> {
        let path = self.resource_path(request.location)?;

        let text = tokio::fs::read_to_string(&path).await.map_err(|e| {
            LoadFailure::network(format!("failed to fetch {}: {}", path.display(), e))
        })?;

        self.context.run(request, &text)
    }
}

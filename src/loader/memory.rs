//! In-memory loader for hosts that embed their modules.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::core::Implementation;
use crate::loader::{resource_key, ExecutionContext, LoadFailure, LoadRequest, Loader};

/// Loader backed by a fixed `location -> module text` table.
#[derive(Debug, Default)]
pub struct StaticLoader {
    modules: HashMap<String, String>,
    context: ExecutionContext,
}

impl StaticLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add module text under `location`.
    pub fn with_module(mut self, location: &str, text: impl Into<String>) -> Self {
        self.modules
            .insert(resource_key(location).to_string(), text.into());
        self
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    pub fn executed(&self) -> Vec<String> {
        self.context.executed()
    }
}

#[async_trait]
impl Loader for StaticLoader {
    fn name(&self) -> &str {
        "static"
    }

    async fn load(&self, request: &LoadRequest<'_>) -> Result<Implementation, LoadFailure> {
        let text = self
            .modules
            .get(resource_key(request.location))
            .ok_or_else(|| LoadFailure::network(format!("no module at `{}`", request.location)))?;

        self.context.run(request, text)
    }
}

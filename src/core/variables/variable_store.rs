use super::var_graph::VarGraph;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("{failed} writes failed, first: {first}")]
    Several {
        failed: usize,
        first: Box<StoreError>,
    },
}

impl StoreError {
    /// Fold per-part write errors into one, `None` when all succeeded.
    pub fn combine(mut errors: Vec<StoreError>) -> Option<StoreError> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            failed => Some(StoreError::Several {
                failed,
                first: Box::new(errors.remove(0)),
            }),
        }
    }
}

/// Which partition of persisted variable state an action touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Server,
    Global,
}

/// Both variable scopes, owned by the bot context.
#[derive(Debug, Clone, Default)]
pub struct Variables {
    pub server: VarGraph,
    pub global: VarGraph,
}

impl Variables {
    pub fn scope(&self, scope: Scope) -> &VarGraph {
        match scope {
            Scope::Server => &self.server,
            Scope::Global => &self.global,
        }
    }

    pub fn scope_mut(&mut self, scope: Scope) -> &mut VarGraph {
        match scope {
            Scope::Server => &mut self.server,
            Scope::Global => &mut self.global,
        }
    }

    /// Reclaim unreachable nodes in both scopes.
    pub fn compact(&mut self) -> usize {
        self.server.compact() + self.global.compact()
    }
}

/// Durable storage for the two variable scopes.
///
/// `load` never fails: a scope whose blob is missing or unreadable comes
/// back empty without affecting the other scope.
#[async_trait]
pub trait VariableStore: Send + Sync {
    async fn load(&self) -> Variables;
    async fn flush(&self, variables: &Variables) -> Result<(), StoreError>;
}

use crate::core::variables::{
    PersistedGraph, Scope, StoreError, VarGraph, VariableStore, Variables,
};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Keeps each variable scope in its own pretty-printed JSON file.
pub struct JsonVariableStore {
    server_path: PathBuf,
    global_path: PathBuf,
}

impl JsonVariableStore {
    pub fn new(server_path: impl Into<PathBuf>, global_path: impl Into<PathBuf>) -> Self {
        Self {
            server_path: server_path.into(),
            global_path: global_path.into(),
        }
    }
}

fn read_scope(path: &Path) -> VarGraph {
    let file = match std::fs::File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "No saved variables, starting empty");
            return VarGraph::new();
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), "Failed to open variables: {e}");
            return VarGraph::new();
        }
    };

    let persisted: PersistedGraph = match serde_json::from_reader(std::io::BufReader::new(file)) {
        Ok(persisted) => persisted,
        Err(e) => {
            tracing::warn!(path = %path.display(), "Corrupt variables file, starting empty: {e}");
            return VarGraph::new();
        }
    };

    VarGraph::decode(persisted).unwrap_or_else(|e| {
        tracing::warn!(path = %path.display(), "Invalid variable graph, starting empty: {e}");
        VarGraph::new()
    })
}

fn write_scope(path: &Path, graph: &VarGraph) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(file, &graph.encode())?;
    Ok(())
}

#[async_trait]
impl VariableStore for JsonVariableStore {
    async fn load(&self) -> Variables {
        Variables {
            server: read_scope(&self.server_path),
            global: read_scope(&self.global_path),
        }
    }

    async fn flush(&self, variables: &Variables) -> Result<(), StoreError> {
        let scopes = [
            (Scope::Server, &self.server_path, &variables.server),
            (Scope::Global, &self.global_path, &variables.global),
        ];

        let mut errors = Vec::new();
        for (scope, path, graph) in scopes {
            if let Err(e) = write_scope(path, graph) {
                tracing::error!(?scope, path = %path.display(), "Failed to write variables: {e}");
                errors.push(e);
            }
        }

        match StoreError::combine(errors) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

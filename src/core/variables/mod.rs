pub mod var_graph;
pub mod variable_store;

pub use var_graph::{GraphError, PersistedGraph, VarGraph, VarValue};
pub use variable_store::{Scope, StoreError, VariableStore, Variables};

// Implementations of the variable store.

pub mod json_store;

#[cfg(test)]
pub mod in_memory;

pub use json_store::JsonVariableStore;

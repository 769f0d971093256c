pub mod builtin_mods;
pub mod mod_registry;

pub use mod_registry::{Mod, ModRegistry};

mod actions;
mod states;

pub use actions::ActionRegistry;
pub use states::{ReorderDirection, StatePatch, StateRegistry};

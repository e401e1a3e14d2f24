mod expander;
pub mod glob;

pub use expander::PathExpander;

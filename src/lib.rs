pub mod core;
pub mod extract;
pub mod features;
pub mod merge;
pub mod pipeline;
pub mod search;
pub mod tabular;

// --- Primary core exports ---
pub use crate::core::config;
pub use crate::core::types;
pub use crate::core::types::*;
pub use crate::core::PipelineState;

// --- Convenience module paths ---
pub use features::antibot;
pub use pipeline::suspend::SuspendGate;

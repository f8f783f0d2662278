pub mod orchestrator;
pub mod suspend;

pub use orchestrator::{process_organization, process_query_batch, run};
pub use suspend::SuspendGate;

pub mod service;
pub mod sink;

pub use service::{spawn_intake_worker, IntakeOutcome, IntakeService};
pub use sink::{MemorySink, PersistenceSink, SinkError, SqliteSink};

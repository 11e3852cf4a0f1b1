/// Service modules - each task runs in its own service

pub mod event_ingest;
pub mod scheduler;

pub use event_ingest::{forward_events, EventIngestService};
pub use scheduler::{BatchScheduler, SchedulerReport};

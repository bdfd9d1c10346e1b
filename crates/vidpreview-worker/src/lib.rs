//! Background execution of preview jobs.

pub mod queue;

pub use queue::{PreviewJobQueue, PreviewQueueConfig};

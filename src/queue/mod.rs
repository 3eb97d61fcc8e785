pub mod broker;

pub use broker::{JobQueue, JobSlot, QueueError};

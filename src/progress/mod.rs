//! Progress fan-out
//!
//! Workers publish [`ProgressEvent`](crate::jobs::ProgressEvent)s into a
//! [`ProgressHub`]; each `GET /api/progress` connection holds a
//! [`Subscription`] and receives every event published while it is open.

mod hub;

pub use hub::{ProgressHub, SubscriberId, Subscription};

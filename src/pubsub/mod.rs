//! Pub/Sub fan-out of views to connected observers.
//!
//! Delivery is best effort: no ordering across observers, no retry, and a
//! message an observer cannot accept right away is dropped for it.

mod broadcaster;

pub use broadcaster::{Broadcaster, ObserverId, PushReport, Subscription};

//! Virtual-time testing tools.
//!
//! [`TestScheduler`] drives a thread-local virtual clock. [`HotObservable`]
//! is a multicast source that replays a script of timestamped notifications
//! on that clock and logs when it was subscribed and disposed, and
//! [`Recorder`] is an observer that stamps everything it receives with the
//! virtual time it arrived at.

pub use std::time::Duration;

pub mod test_observable;
mod test_scheduler;

pub use test_observable::*;
pub use test_scheduler::{TaskHandle, TestScheduler};

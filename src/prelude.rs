//! Prelude module for convenient imports
//!
//! This module re-exports commonly used types and traits for easy access.

// Core traits
pub use crate::observable::{self, Observable, ObservableExt};
// Observer trait and adapters
pub use crate::observer::{Emitter, FnMutObserver, Observer, ObserverAll};
// Operators
pub use crate::ops::{
  group_by::{
    DefaultComparer, DurationObserver, Group, GroupByOp, GroupBySubscription, GroupSubscription,
    KeyComparer,
  },
  skip::SkipOp,
};
// Multicast delivery
pub use crate::subscribers::Terminal;
// Subscription
pub use crate::subscription::*;

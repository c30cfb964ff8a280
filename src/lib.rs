//! # rxgroup: keyed grouping for Reactive Extensions
//!
//! A push-based reactive core built around the `group_by` family of
//! operators: a source is partitioned into an open-ended set of per-key
//! [`Group`]s, each one a hot, independently subscribable sequence, while the
//! outer sequence announces every newly opened group exactly once.
//!
//! ## Quick Start
//!
//! ```rust
//! use rxgroup::prelude::*;
//!
//! observable::from_iter(0..10)
//!   .group_by(|v: &i32| v % 3)
//!   .subscribe(|group| {
//!     let key = *group.key();
//!     group.subscribe(move |v| println!("{key}: {v}"));
//!   });
//! ```
//!
//! ## Key Concepts
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Observable`] | Anything that can be subscribed with an [`Observer`] |
//! | [`ObservableExt`] | Operator methods (`skip`, `group_by`, ...) |
//! | [`Observer`] | Consumes `next`, `error`, and `complete` events |
//! | [`Subscription`] | Handle to cancel an active subscription |
//! | [`Group`] | The per-key inner sequence emitted by `group_by` |
//!
//! ## Feature Flags
//!
//! - **`tracing`** (default): emit `tracing` events for upstream connection,
//!   group lifecycle and operator faults.
//!
//! [`Observable`]: observable::Observable
//! [`ObservableExt`]: observable::ObservableExt
//! [`Observer`]: observer::Observer
//! [`Subscription`]: subscription::Subscription
//! [`Group`]: ops::group_by::Group

#[macro_use]
mod logging;

pub mod observable;
pub mod observer;
pub mod ops;
pub mod prelude;
pub mod rc;
pub mod scheduler;
pub mod subscribers;
pub mod subscription;
pub mod type_hint;

pub use prelude::*;

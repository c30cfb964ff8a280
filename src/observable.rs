//! Observable traits and sources.
//!
//! [`Observable`] is the subscription contract: it consumes an observer and
//! returns the handle that cancels it. [`ObservableExt`] is the marker trait
//! that carries the operator methods; every observable type implements it
//! explicitly so the item and error types of a chain stay inferable.

use std::convert::Infallible;

use crate::{
  observer::{FnMutObserver, Observer, ObserverAll},
  ops::{
    group_by::{
      DefaultComparer, Group, GroupByOp, Identity, KeyFn, NoDuration, TryKeyFn, Until,
    },
    skip::SkipOp,
  },
  subscription::Subscription,
};

mod create;
mod from_iter;
mod trivial;

pub use create::*;
pub use from_iter::*;
pub use trivial::*;

/// A sequence that can be subscribed with an observer of type `O`.
///
/// The observer type is a trait parameter rather than a method generic so an
/// operator can state exactly which wrapped observer it hands to its source.
pub trait Observable<Item, Err, O>
where
  O: Observer<Item, Err>,
{
  type Unsub: Subscription;

  /// Start the sequence, pushing its notifications into `observer`.
  fn actual_subscribe(self, observer: O) -> Self::Unsub;
}

/// Operator methods shared by every observable.
pub trait ObservableExt<Item, Err>: Sized {
  /// Subscribe with a `next` handler only. Available for sequences that
  /// cannot fail.
  ///
  /// ```
  /// use rxgroup::prelude::*;
  ///
  /// let mut sum = 0;
  /// observable::from_iter(1..=3).subscribe(|v| sum += v);
  /// assert_eq!(sum, 6);
  /// ```
  fn subscribe<N>(self, next: N) -> <Self as Observable<Item, Infallible, FnMutObserver<N>>>::Unsub
  where
    N: FnMut(Item),
    Self: Observable<Item, Infallible, FnMutObserver<N>>,
  {
    self.actual_subscribe(FnMutObserver(next))
  }

  /// Subscribe with one handler per notification kind.
  fn subscribe_all<N, E, C>(
    self, next: N, error: E, complete: C,
  ) -> <Self as Observable<Item, Err, ObserverAll<N, E, C>>>::Unsub
  where
    N: FnMut(Item),
    E: FnOnce(Err),
    C: FnOnce(),
    Self: Observable<Item, Err, ObserverAll<N, E, C>>,
  {
    self.actual_subscribe(ObserverAll::new(next, error, complete))
  }

  /// Ignore the first `count` values, then mirror the source.
  ///
  /// ```
  /// use rxgroup::prelude::*;
  ///
  /// let mut values = vec![];
  /// observable::from_iter(0..5).skip(3).subscribe(|v| values.push(v));
  /// assert_eq!(values, vec![3, 4]);
  /// ```
  #[inline]
  fn skip(self, count: usize) -> SkipOp<Self> { SkipOp { source: self, count } }

  /// Partition the sequence by the key `key_fn` extracts from every item.
  ///
  /// Emits one [`Group`] the first time each key is seen; every item is then
  /// delivered to the subscribers of the group for its key. Groups stay open
  /// until the source terminates.
  ///
  /// Groups outlive the call that created them, so observers of the outer
  /// sequence and of groups must be `Send + 'static`.
  ///
  /// ```
  /// use rxgroup::prelude::*;
  /// use rxgroup::rc::{MutArc, RcDeref, RcDerefMut};
  ///
  /// let keys = MutArc::own(vec![]);
  /// let c_keys = keys.clone();
  /// observable::from_iter(0..10)
  ///   .group_by(|v: &i32| v % 3)
  ///   .subscribe(move |group| c_keys.rc_deref_mut().push(*group.key()));
  /// assert_eq!(*keys.rc_deref(), vec![0, 1, 2]);
  /// ```
  ///
  /// [`Group`]: crate::ops::group_by::Group
  #[inline]
  fn group_by<F, Key>(self, key_fn: F) -> GroupByOp<Self, Item, KeyFn<F>, Identity, NoDuration, DefaultComparer>
  where
    F: Fn(&Item) -> Key,
  {
    GroupByOp::new(self, KeyFn(key_fn))
  }

  /// Like [`group_by`](ObservableExt::group_by), with a key selector that may
  /// fail. A failing selector errors the outer sequence and every open group.
  #[inline]
  fn try_group_by<F, Key>(
    self, key_fn: F,
  ) -> GroupByOp<Self, Item, TryKeyFn<F>, Identity, NoDuration, DefaultComparer>
  where
    F: Fn(&Item) -> Result<Key, Err>,
  {
    GroupByOp::new(self, TryKeyFn(key_fn))
  }

  /// Like [`group_by`](ObservableExt::group_by), but each group is closed
  /// once the sequence returned by `duration_fn` for it emits or completes.
  /// A later item with the same key opens and announces a new group.
  ///
  /// ```
  /// use std::sync::{
  ///   atomic::{AtomicUsize, Ordering},
  ///   Arc,
  /// };
  ///
  /// use rxgroup::prelude::*;
  ///
  /// let announced = Arc::new(AtomicUsize::new(0));
  /// let c_announced = announced.clone();
  /// observable::from_iter(vec![1, 1, 1, 2])
  ///   .group_by_until(|v: &i32| *v, |group| group.clone().skip(1))
  ///   .subscribe(move |_| {
  ///     c_announced.fetch_add(1, Ordering::SeqCst);
  ///   });
  /// // The first group of `1` closes after its second item.
  /// assert_eq!(announced.load(Ordering::SeqCst), 3);
  /// ```
  #[inline]
  fn group_by_until<F, Key, D, Dur, Signal>(
    self, key_fn: F, duration_fn: D,
  ) -> GroupByOp<Self, Item, KeyFn<F>, Identity, Until<D, Signal>, DefaultComparer>
  where
    F: Fn(&Item) -> Key,
    D: Fn(&Group<Key, Item, Err>) -> Dur,
  {
    GroupByOp::new(self, KeyFn(key_fn)).until(duration_fn)
  }
}

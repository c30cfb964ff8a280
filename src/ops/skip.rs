//! Skip operator implementation
//!
//! This module contains the Skip operator, which ignores the first `count`
//! values emitted by the source Observable, then emits the rest.

use crate::{
  observable::{Observable, ObservableExt},
  observer::Observer,
};

/// Skip operator: Ignores the first `count` values from the source observable
///
/// This operator skips the first `count` values emitted by the source
/// observable, then emits all subsequent values. If the source completes
/// before emitting `count` values, `skip` will complete without emitting
/// any values.
///
/// As a group duration, `group.clone().skip(n)` closes the group when it
/// receives its `n + 1`th value.
///
/// # Examples
///
/// ```
/// use rxgroup::prelude::*;
///
/// let mut result = Vec::new();
/// observable::from_iter([1, 2, 3, 4, 5])
///   .skip(2)
///   .subscribe(|v| result.push(v));
/// assert_eq!(result, vec![3, 4, 5]);
/// ```
#[derive(Clone)]
pub struct SkipOp<S> {
  pub source: S,
  pub count: usize,
}

/// SkipObserver wrapper for skipping the first `count` values
///
/// This observer wraps another observer and ignores the first `count`
/// values received. After `count` values have been skipped, it forwards
/// all subsequent values to the inner observer.
pub struct SkipObserver<O> {
  observer: O,
  remaining: usize,
}

impl<O, Item, Err> Observer<Item, Err> for SkipObserver<O>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, v: Item) {
    if self.remaining > 0 {
      self.remaining -= 1;
    } else {
      self.observer.next(v);
    }
  }

  fn error(self, e: Err) { self.observer.error(e); }

  fn complete(self) { self.observer.complete(); }

  fn is_closed(&self) -> bool { self.observer.is_closed() }
}

impl<S, Item, Err, O> Observable<Item, Err, O> for SkipOp<S>
where
  O: Observer<Item, Err>,
  S: Observable<Item, Err, SkipObserver<O>>,
{
  type Unsub = S::Unsub;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let SkipOp { source, count } = self;
    source.actual_subscribe(SkipObserver { observer, remaining: count })
  }
}

impl<S, Item, Err> ObservableExt<Item, Err> for SkipOp<S> where S: ObservableExt<Item, Err> {}

//! The callbacks a `group_by` applies to every source item.
//!
//! Each selector is a trait with a fallible method so infallible closures and
//! `Result`-returning closures share one code path in the operator: `KeyFn`,
//! `ElementFn` and `Until` lift a plain closure, the `Try*` wrappers forward
//! its `Result`.

use super::{duration::DurationObserver, group::Group};
use crate::{
  observable::Observable,
  subscription::BoxedSubscriptionSend,
  type_hint::TypeHint,
};

/// Derives the grouping key of an item.
pub trait KeySelector<Item, Key, Err> {
  fn select_key(&self, item: &Item) -> Result<Key, Err>;
}

/// Maps an item to the value delivered to its group.
pub trait ElementSelector<Item, Value, Err> {
  fn select_element(&self, item: Item) -> Result<Value, Err>;
}

/// Opens the sequence whose first signal closes a newly created group.
///
/// A duration subscribed to `group` itself counts as a subscriber of the
/// group and keeps the upstream connected until the group closes. Returns
/// `Ok(None)` when the group never expires.
pub trait DurationSelector<Key, Value, Err> {
  fn subscribe_duration(
    &self, group: &Group<Key, Value, Err>, observer: DurationObserver<Key, Value, Err>,
  ) -> Result<Option<BoxedSubscriptionSend>, Err>;
}

#[derive(Clone)]
pub struct KeyFn<F>(pub F);

impl<Item, Key, Err, F> KeySelector<Item, Key, Err> for KeyFn<F>
where
  F: Fn(&Item) -> Key,
{
  #[inline]
  fn select_key(&self, item: &Item) -> Result<Key, Err> { Ok((self.0)(item)) }
}

#[derive(Clone)]
pub struct TryKeyFn<F>(pub F);

impl<Item, Key, Err, F> KeySelector<Item, Key, Err> for TryKeyFn<F>
where
  F: Fn(&Item) -> Result<Key, Err>,
{
  #[inline]
  fn select_key(&self, item: &Item) -> Result<Key, Err> { (self.0)(item) }
}

/// Delivers items to their group unchanged.
#[derive(Clone, Copy, Default)]
pub struct Identity;

impl<Item, Err> ElementSelector<Item, Item, Err> for Identity {
  #[inline]
  fn select_element(&self, item: Item) -> Result<Item, Err> { Ok(item) }
}

#[derive(Clone)]
pub struct ElementFn<F>(pub F);

impl<Item, Value, Err, F> ElementSelector<Item, Value, Err> for ElementFn<F>
where
  F: Fn(Item) -> Value,
{
  #[inline]
  fn select_element(&self, item: Item) -> Result<Value, Err> { Ok((self.0)(item)) }
}

#[derive(Clone)]
pub struct TryElementFn<F>(pub F);

impl<Item, Value, Err, F> ElementSelector<Item, Value, Err> for TryElementFn<F>
where
  F: Fn(Item) -> Result<Value, Err>,
{
  #[inline]
  fn select_element(&self, item: Item) -> Result<Value, Err> { (self.0)(item) }
}

/// Groups stay open until the source terminates.
#[derive(Clone, Copy, Default)]
pub struct NoDuration;

impl<Key, Value, Err> DurationSelector<Key, Value, Err> for NoDuration {
  #[inline]
  fn subscribe_duration(
    &self, _: &Group<Key, Value, Err>, _: DurationObserver<Key, Value, Err>,
  ) -> Result<Option<BoxedSubscriptionSend>, Err> {
    Ok(None)
  }
}

/// Duration built by a closure. `Signal` is the item type of the duration
/// sequence; its values are never inspected.
pub struct Until<F, Signal> {
  f: F,
  _hint: TypeHint<Signal>,
}

impl<F, Signal> Until<F, Signal> {
  #[inline]
  pub fn new(f: F) -> Self { Until { f, _hint: TypeHint::new() } }
}

impl<F: Clone, Signal> Clone for Until<F, Signal> {
  fn clone(&self) -> Self { Until::new(self.f.clone()) }
}

impl<Key, Value, Err, Signal, F, Dur> DurationSelector<Key, Value, Err> for Until<F, Signal>
where
  F: Fn(&Group<Key, Value, Err>) -> Dur,
  Dur: Observable<Signal, Err, DurationObserver<Key, Value, Err>>,
  Dur::Unsub: Send + 'static,
  Key: Clone,
  Value: Clone,
  Err: Clone,
{
  fn subscribe_duration(
    &self, group: &Group<Key, Value, Err>, observer: DurationObserver<Key, Value, Err>,
  ) -> Result<Option<BoxedSubscriptionSend>, Err> {
    let duration = (self.f)(group);
    Ok(Some(BoxedSubscriptionSend::new(duration.actual_subscribe(observer))))
  }
}

/// Like [`Until`], with a closure that may fail to build the duration.
pub struct TryUntil<F, Signal> {
  f: F,
  _hint: TypeHint<Signal>,
}

impl<F, Signal> TryUntil<F, Signal> {
  #[inline]
  pub fn new(f: F) -> Self { TryUntil { f, _hint: TypeHint::new() } }
}

impl<F: Clone, Signal> Clone for TryUntil<F, Signal> {
  fn clone(&self) -> Self { TryUntil::new(self.f.clone()) }
}

impl<Key, Value, Err, Signal, F, Dur> DurationSelector<Key, Value, Err> for TryUntil<F, Signal>
where
  F: Fn(&Group<Key, Value, Err>) -> Result<Dur, Err>,
  Dur: Observable<Signal, Err, DurationObserver<Key, Value, Err>>,
  Dur::Unsub: Send + 'static,
  Key: Clone,
  Value: Clone,
  Err: Clone,
{
  fn subscribe_duration(
    &self, group: &Group<Key, Value, Err>, observer: DurationObserver<Key, Value, Err>,
  ) -> Result<Option<BoxedSubscriptionSend>, Err> {
    let duration = (self.f)(group)?;
    Ok(Some(BoxedSubscriptionSend::new(duration.actual_subscribe(observer))))
  }
}

/// The three selectors of one operator, shared by every upstream connection.
pub(crate) struct Pipeline<KS, ES, DS> {
  pub(crate) key: KS,
  pub(crate) element: ES,
  pub(crate) duration: DS,
}

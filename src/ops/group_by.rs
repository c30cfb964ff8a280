//! GroupBy operator implementation
//!
//! `group_by` partitions a source into one [`Group`] per key. The outer
//! sequence announces each group the first time its key is seen; items are
//! then routed to the subscribers of their group.
//!
//! The operator is built from small parts:
//!
//! - `selector`: the key, element and duration callbacks
//! - `comparer`: the key equality the groups are looked up with
//! - `registry`: the open groups, keyed through the comparer
//! - `link`: the reference-counted upstream connection
//! - `group`: the per-key sequence handed to the user
//! - `duration`: closing a group when its duration sequence signals
//! - `state`: the shared state tying them together, one per outer subscription
//!
//! # Faults
//!
//! A source error, or an error returned by any selector or the comparer, is
//! delivered to every open group in creation order and then to the outer
//! observer; the operator stops afterwards. An error from a duration sequence
//! only closes its own group.

use std::sync::Arc;

use crate::{
  observable::{Observable, ObservableExt},
  observer::Observer,
  subscribers::{ObserverSlot, Terminal},
  subscription::{BoxedSubscriptionSend, Subscription},
  type_hint::TypeHint,
};

mod comparer;
mod duration;
mod group;
mod link;
mod registry;
mod selector;
mod state;

pub use comparer::*;
pub use duration::DurationObserver;
pub use group::{Group, GroupSubscription};
pub use selector::{
  DurationSelector, ElementFn, ElementSelector, Identity, KeyFn, KeySelector, NoDuration, TryElementFn,
  TryKeyFn, TryUntil, Until,
};
use link::Generation;
use selector::Pipeline;
use state::{Connector, GroupByCore};

/// Operator returned by `group_by`, `try_group_by` and `group_by_until`.
///
/// Configure it with the builder methods before subscribing. Call `element`
/// (or `try_element`) before `until`, so the duration selector sees the
/// mapped value type.
///
/// Every subscription of the outer sequence runs its own grouping: groups are
/// never shared between two outer subscribers. The source is subscribed when
/// the outer sequence is, and subscribed again if every interested party left
/// and a still-open group gets a new subscriber, so it has to be `Clone`.
pub struct GroupByOp<S, Item, KS, ES, DS, C> {
  source: S,
  key: KS,
  element: ES,
  duration: DS,
  comparer: C,
  capacity: usize,
  _hint: TypeHint<Item>,
}

impl<S, Item, KS> GroupByOp<S, Item, KS, Identity, NoDuration, DefaultComparer> {
  #[inline]
  pub fn new(source: S, key: KS) -> Self {
    GroupByOp {
      source,
      key,
      element: Identity,
      duration: NoDuration,
      comparer: DefaultComparer,
      capacity: 0,
      _hint: TypeHint::new(),
    }
  }
}

impl<S, Item, KS, ES, DS, C> GroupByOp<S, Item, KS, ES, DS, C> {
  /// Deliver `f(item)` to groups instead of the item itself.
  pub fn element<F, Value>(self, f: F) -> GroupByOp<S, Item, KS, ElementFn<F>, DS, C>
  where
    F: Fn(Item) -> Value,
  {
    self.with_element(ElementFn(f))
  }

  /// Like `element`, with a mapping that may fail. A failure faults the
  /// operator; the group the item was routed to receives the error without
  /// the value.
  pub fn try_element<F, Value, Err>(self, f: F) -> GroupByOp<S, Item, KS, TryElementFn<F>, DS, C>
  where
    F: Fn(Item) -> Result<Value, Err>,
  {
    self.with_element(TryElementFn(f))
  }

  /// Close every group once the sequence `f` builds for it emits or
  /// completes. `f` receives the group right after it was announced.
  pub fn until<F, Dur, Signal, Key, Value, Err>(self, f: F) -> GroupByOp<S, Item, KS, ES, Until<F, Signal>, C>
  where
    KS: KeySelector<Item, Key, Err>,
    ES: ElementSelector<Item, Value, Err>,
    F: Fn(&Group<Key, Value, Err>) -> Dur,
  {
    self.with_duration(Until::new(f))
  }

  /// Like `until`, with a selector that may fail to build the duration. A
  /// failure faults the operator after the new group was announced.
  pub fn try_until<F, Dur, Signal, Key, Value, Err>(
    self, f: F,
  ) -> GroupByOp<S, Item, KS, ES, TryUntil<F, Signal>, C>
  where
    KS: KeySelector<Item, Key, Err>,
    ES: ElementSelector<Item, Value, Err>,
    F: Fn(&Group<Key, Value, Err>) -> Result<Dur, Err>,
  {
    self.with_duration(TryUntil::new(f))
  }

  /// Look keys up with `comparer` instead of their `Hash` and `Eq`.
  pub fn comparer<C2>(self, comparer: C2) -> GroupByOp<S, Item, KS, ES, DS, C2> {
    let GroupByOp { source, key, element, duration, capacity, .. } = self;
    GroupByOp { source, key, element, duration, comparer, capacity, _hint: TypeHint::new() }
  }

  /// Pre-size the group registry for `capacity` simultaneously open groups.
  pub fn capacity(mut self, capacity: usize) -> Self {
    self.capacity = capacity;
    self
  }

  fn with_element<ES2>(self, element: ES2) -> GroupByOp<S, Item, KS, ES2, DS, C> {
    let GroupByOp { source, key, duration, comparer, capacity, .. } = self;
    GroupByOp { source, key, element, duration, comparer, capacity, _hint: TypeHint::new() }
  }

  fn with_duration<DS2>(self, duration: DS2) -> GroupByOp<S, Item, KS, ES, DS2, C> {
    let GroupByOp { source, key, element, comparer, capacity, .. } = self;
    GroupByOp { source, key, element, duration, comparer, capacity, _hint: TypeHint::new() }
  }
}

impl<S, Item, KS, ES, DS, C> Clone for GroupByOp<S, Item, KS, ES, DS, C>
where
  S: Clone,
  KS: Clone,
  ES: Clone,
  DS: Clone,
  C: Clone,
{
  fn clone(&self) -> Self {
    GroupByOp {
      source: self.source.clone(),
      key: self.key.clone(),
      element: self.element.clone(),
      duration: self.duration.clone(),
      comparer: self.comparer.clone(),
      capacity: self.capacity,
      _hint: TypeHint::new(),
    }
  }
}

impl<S, Item, KS, ES, DS, C, Key, Value, Err, O> Observable<Group<Key, Value, Err>, Err, O>
  for GroupByOp<S, Item, KS, ES, DS, C>
where
  O: Observer<Group<Key, Value, Err>, Err> + Send + 'static,
  S: Observable<Item, Err, GroupBySink<Item, Key, Value, Err, KS, ES, DS>> + Clone + Send + Sync + 'static,
  S::Unsub: Send + 'static,
  KS: KeySelector<Item, Key, Err> + Send + Sync + 'static,
  ES: ElementSelector<Item, Value, Err> + Send + Sync + 'static,
  DS: DurationSelector<Key, Value, Err> + Send + Sync + 'static,
  C: KeyComparer<Key, Err> + Send + Sync + 'static,
  Item: 'static,
  Key: Clone + Send + Sync + 'static,
  Value: Clone + Send + 'static,
  Err: Clone + Send + Sync + 'static,
{
  type Unsub = GroupBySubscription<Key, Value, Err>;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let GroupByOp { source, key, element, duration, comparer, capacity, .. } = self;
    let pipeline = Arc::new(Pipeline { key, element, duration });
    let connector: Connector<Key, Value, Err> =
      Box::new(move |core: &Arc<GroupByCore<Key, Value, Err>>, generation: Generation| {
        let sink = GroupBySink { core: core.clone(), pipeline: pipeline.clone(), generation, _hint: TypeHint::new() };
        BoxedSubscriptionSend::new(source.clone().actual_subscribe(sink))
      });
    let core = GroupByCore::new(connector, Box::new(comparer), capacity);
    let outer = Arc::new(ObserverSlot::new(observer));
    core.subscribe_outer(outer.clone());
    GroupBySubscription { core, outer }
  }
}

impl<S, Item, KS, ES, DS, C, Key, Value, Err> ObservableExt<Group<Key, Value, Err>, Err>
  for GroupByOp<S, Item, KS, ES, DS, C>
where
  S: ObservableExt<Item, Err>,
  KS: KeySelector<Item, Key, Err>,
  ES: ElementSelector<Item, Value, Err>,
{
}

/// The observer `group_by` subscribes to its source with, bound to one
/// upstream connection.
pub struct GroupBySink<Item, Key, Value, Err, KS, ES, DS> {
  core: Arc<GroupByCore<Key, Value, Err>>,
  pipeline: Arc<Pipeline<KS, ES, DS>>,
  generation: Generation,
  _hint: TypeHint<Item>,
}

impl<Item, Key, Value, Err, KS, ES, DS> Observer<Item, Err> for GroupBySink<Item, Key, Value, Err, KS, ES, DS>
where
  KS: KeySelector<Item, Key, Err>,
  ES: ElementSelector<Item, Value, Err>,
  DS: DurationSelector<Key, Value, Err>,
  Key: Clone,
  Value: Clone,
  Err: Clone,
{
  fn next(&mut self, item: Item) {
    if !self.core.is_live(self.generation) {
      return;
    }
    let key = match self.pipeline.key.select_key(&item) {
      Ok(key) => key,
      Err(err) => return self.core.fault(err),
    };
    let resolved = match self.core.resolve(key, self.generation) {
      Ok(Some(resolved)) => resolved,
      Ok(None) => return,
      Err(err) => return self.core.fault(err),
    };
    if let Some(group) = resolved.created {
      let duration_group = group.clone();
      self.core.announce(group);
      let observer = DurationObserver::new(Arc::downgrade(&self.core), resolved.id);
      match self.pipeline.duration.subscribe_duration(&duration_group, observer) {
        Ok(Some(subscription)) => self.core.attach_duration(resolved.id, subscription),
        Ok(None) => {}
        Err(err) => return self.core.fault(err),
      }
    }
    match self.pipeline.element.select_element(item) {
      Ok(value) => self.core.deliver(resolved.id, value),
      Err(err) => self.core.fault(err),
    }
  }

  fn error(self, err: Err) {
    if self.core.is_live(self.generation) {
      self.core.terminate(Terminal::Errored(err));
    }
  }

  fn complete(self) {
    if self.core.is_live(self.generation) {
      self.core.terminate(Terminal::Completed);
    }
  }

  fn is_closed(&self) -> bool { !self.core.is_live(self.generation) }
}

/// Subscription to the outer sequence of a `group_by`.
///
/// Disposing it stops group announcements to its observer. Groups already
/// handed out keep receiving values while they have subscribers.
pub struct GroupBySubscription<Key, Value, Err> {
  core: Arc<GroupByCore<Key, Value, Err>>,
  outer: Arc<ObserverSlot<Group<Key, Value, Err>, Err>>,
}

impl<Key, Value, Err> Subscription for GroupBySubscription<Key, Value, Err>
where
  Key: Clone,
  Value: Clone,
  Err: Clone,
{
  fn unsubscribe(self) { self.core.dispose_outer(); }

  fn is_closed(&self) -> bool { self.outer.is_closed() }
}

use std::{fmt, sync::Arc};

use once_cell::sync::OnceCell;

use super::{registry::GroupId, state::GroupByCore};
use crate::{
  observable::{Observable, ObservableExt},
  observer::Observer,
  subscribers::{ObserverSlot, Terminal},
  subscription::Subscription,
};

pub(crate) struct GroupInner<Key, Value, Err> {
  key: Key,
  id: GroupId,
  /// Set under the operator lock right before the group leaves the registry.
  terminal: OnceCell<Terminal<Err>>,
  core: Arc<GroupByCore<Key, Value, Err>>,
}

impl<Key, Value, Err> GroupInner<Key, Value, Err> {
  pub(crate) fn new(key: Key, id: GroupId, core: Arc<GroupByCore<Key, Value, Err>>) -> Self {
    GroupInner { key, id, terminal: OnceCell::new(), core }
  }

  #[inline]
  pub(crate) fn id(&self) -> GroupId { self.id }

  #[inline]
  pub(crate) fn terminal(&self) -> Option<&Terminal<Err>> { self.terminal.get() }

  /// First write wins.
  pub(crate) fn set_terminal(&self, terminal: Terminal<Err>) { let _ = self.terminal.set(terminal); }
}

/// The sequence of all source items sharing one key.
///
/// A group is hot: subscribers only see the values routed to it after they
/// subscribed. Once the group is closed (its duration fired, or the source
/// terminated) every new subscriber immediately receives the terminal
/// notification the group closed with, and nothing else.
///
/// While a group has subscribers it keeps the upstream of the `group_by`
/// connected, even after the outer subscription was disposed. This includes
/// the subscription a duration selector makes to the group.
pub struct Group<Key, Value, Err> {
  inner: Arc<GroupInner<Key, Value, Err>>,
}

impl<Key, Value, Err> Group<Key, Value, Err> {
  pub(crate) fn new(inner: Arc<GroupInner<Key, Value, Err>>) -> Self { Group { inner } }

  /// The key every value of this group was routed by.
  #[inline]
  pub fn key(&self) -> &Key { &self.inner.key }

  /// `true` once the group no longer receives values.
  #[inline]
  pub fn is_closed(&self) -> bool { self.inner.terminal().is_some() }
}

impl<Key, Value, Err> Clone for Group<Key, Value, Err> {
  fn clone(&self) -> Self { Group { inner: self.inner.clone() } }
}

impl<Key: fmt::Debug, Value, Err> fmt::Debug for Group<Key, Value, Err> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Group")
      .field("key", &self.inner.key)
      .field("closed", &self.is_closed())
      .finish()
  }
}

impl<Key, Value, Err, O> Observable<Value, Err, O> for Group<Key, Value, Err>
where
  O: Observer<Value, Err> + Send + 'static,
  Key: Clone,
  Value: Clone + 'static,
  Err: Clone + 'static,
{
  type Unsub = GroupSubscription<Key, Value, Err>;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let slot = Arc::new(ObserverSlot::new(observer));
    let slot_id = self.inner.core.subscribe_group(&self.inner, slot.clone());
    GroupSubscription { group: self.inner, slot_id, slot }
  }
}

impl<Key, Value, Err> ObservableExt<Value, Err> for Group<Key, Value, Err> {}

/// Subscription to one [`Group`]. Disposing it only detaches its own
/// observer; once the last subscriber of every group and the outer
/// subscriber are gone, the upstream is disposed.
pub struct GroupSubscription<Key, Value, Err> {
  group: Arc<GroupInner<Key, Value, Err>>,
  slot_id: Option<usize>,
  slot: Arc<ObserverSlot<Value, Err>>,
}

impl<Key, Value, Err> Subscription for GroupSubscription<Key, Value, Err>
where
  Key: Clone,
  Value: Clone,
  Err: Clone,
{
  fn unsubscribe(self) {
    self.slot.dispose();
    if let Some(slot_id) = self.slot_id {
      self.group.core.unsubscribe_group(self.group.id, slot_id);
    }
  }

  fn is_closed(&self) -> bool { self.slot.is_closed() }
}

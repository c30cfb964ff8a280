//! State shared by one outer subscription of a `group_by`, its groups, the
//! upstream sink and the duration observers.
//!
//! Everything mutable sits behind a single mutex. Only the key comparer runs
//! while it is held; observers are always called after the lock is released,
//! through their [`ObserverSlot`]s.

use std::sync::{Arc, Mutex, Weak};

use super::{
  comparer::KeyComparer,
  group::{Group, GroupInner},
  link::{Generation, SharedLink},
  registry::{GroupId, Located, Registry},
};
use crate::{
  rc::lock,
  subscribers::{broadcast_terminal, broadcast_value, ObserverSlot, Subscribers, Terminal},
  subscription::{BoxedSubscriptionSend, Subscription},
};

/// Subscribes the source with a sink bound to the given connection.
pub(crate) type Connector<Key, Value, Err> =
  Box<dyn Fn(&Arc<GroupByCore<Key, Value, Err>>, Generation) -> BoxedSubscriptionSend + Send + Sync>;

pub(crate) type BoxedComparer<Key, Err> = Box<dyn KeyComparer<Key, Err> + Send + Sync>;

/// Book-keeping of one open group.
struct GroupCell<Key, Value, Err> {
  group: Weak<GroupInner<Key, Value, Err>>,
  subscribers: Subscribers<Value, Err>,
  duration: Option<BoxedSubscriptionSend>,
}

struct CoreState<Key, Value, Err> {
  outer: Option<Arc<ObserverSlot<Group<Key, Value, Err>, Err>>>,
  registry: Registry<Key, GroupCell<Key, Value, Err>>,
  link: SharedLink,
  terminated: bool,
}

/// Result of routing a key: the group it belongs to, and the group itself if
/// the key just opened it.
pub(crate) struct Resolved<Key, Value, Err> {
  pub(crate) id: GroupId,
  pub(crate) created: Option<Group<Key, Value, Err>>,
}

pub(crate) struct GroupByCore<Key, Value, Err> {
  state: Mutex<CoreState<Key, Value, Err>>,
  connector: Connector<Key, Value, Err>,
  comparer: BoxedComparer<Key, Err>,
}

impl<Key, Value, Err> GroupByCore<Key, Value, Err>
where
  Key: Clone,
  Value: Clone,
  Err: Clone,
{
  pub(crate) fn new(
    connector: Connector<Key, Value, Err>, comparer: BoxedComparer<Key, Err>, capacity: usize,
  ) -> Arc<Self> {
    Arc::new(GroupByCore {
      state: Mutex::new(CoreState {
        outer: None,
        registry: Registry::with_capacity(capacity),
        link: SharedLink::default(),
        terminated: false,
      }),
      connector,
      comparer,
    })
  }

  /// `true` while notifications of connection `generation` must be handled.
  pub(crate) fn is_live(&self, generation: Generation) -> bool {
    let state = lock(&self.state);
    !state.terminated && state.link.is_current(generation)
  }

  pub(crate) fn subscribe_outer(self: &Arc<Self>, slot: Arc<ObserverSlot<Group<Key, Value, Err>, Err>>) {
    let generation = {
      let mut state = lock(&self.state);
      state.outer = Some(slot);
      state.link.acquire()
    };
    if let Some(generation) = generation {
      self.connect(generation);
    }
  }

  /// Stop announcing groups. Handed-out groups are not affected.
  pub(crate) fn dispose_outer(&self) {
    let (outer, upstream) = {
      let mut state = lock(&self.state);
      match state.outer.take() {
        Some(outer) => (Some(outer), state.link.release(1)),
        None => (None, None),
      }
    };
    if let Some(outer) = outer {
      outer.dispose();
    }
    disconnect(upstream);
  }

  fn connect(self: &Arc<Self>, generation: Generation) {
    log_debug!("group_by: connecting upstream, generation {}", generation);
    let upstream = (self.connector)(self, generation);
    let stale = lock(&self.state).link.connected(generation, upstream);
    if let Some(stale) = stale {
      log_trace!("group_by: connection {} went stale while connecting", generation);
      stale.unsubscribe();
    }
  }

  /// Find the open group for `key`, opening a new one when there is none.
  ///
  /// Returns `Ok(None)` once the operator has terminated or connection
  /// `generation` went stale. A comparer error is returned before anything is
  /// registered.
  pub(crate) fn resolve(
    self: &Arc<Self>, key: Key, generation: Generation,
  ) -> Result<Option<Resolved<Key, Value, Err>>, Err> {
    let mut state = lock(&self.state);
    if state.terminated || !state.link.is_current(generation) {
      return Ok(None);
    }
    let hash = match state.registry.locate(&key, &*self.comparer)? {
      Located::Found(id) => return Ok(Some(Resolved { id, created: None })),
      Located::Vacant(hash) => hash,
    };

    let mut created = None;
    let core = self.clone();
    let group_key = key.clone();
    let id = state.registry.insert_with(hash, key, |id| {
      let inner = Arc::new(GroupInner::new(group_key, id, core));
      let cell = GroupCell {
        group: Arc::downgrade(&inner),
        subscribers: Subscribers::default(),
        duration: None,
      };
      created = Some(Group::new(inner));
      cell
    });
    log_debug!("group_by: opened group {}, {} open", id, state.registry.len());
    Ok(Some(Resolved { id, created }))
  }

  /// Emit a newly opened group on the outer sequence.
  pub(crate) fn announce(&self, group: Group<Key, Value, Err>) {
    let outer = lock(&self.state).outer.clone();
    if let Some(outer) = outer {
      outer.next(group);
    }
  }

  /// Keep the duration subscription of group `id`, or dispose it right away
  /// if the group already closed.
  pub(crate) fn attach_duration(&self, id: GroupId, subscription: BoxedSubscriptionSend) {
    let rejected = {
      let mut state = lock(&self.state);
      match state.registry.get_mut(id) {
        Some(cell) if cell.duration.is_none() => {
          cell.duration = Some(subscription);
          None
        }
        _ => Some(subscription),
      }
    };
    if let Some(subscription) = rejected {
      subscription.unsubscribe();
    }
  }

  pub(crate) fn deliver(&self, id: GroupId, value: Value) {
    let slots = match lock(&self.state).registry.get(id) {
      Some(cell) => cell.subscribers.snapshot(),
      None => return,
    };
    log_trace!("group_by: routing value to group {} ({} subscribers)", id, slots.len());
    broadcast_value(&slots, value);
  }

  /// Add a subscriber to `group`. A closed group only replays its terminal.
  ///
  /// Returns the subscriber id while the group is open.
  pub(crate) fn subscribe_group(
    self: &Arc<Self>, group: &GroupInner<Key, Value, Err>, slot: Arc<ObserverSlot<Value, Err>>,
  ) -> Option<usize> {
    let (slot_id, generation) = {
      let mut guard = lock(&self.state);
      let state = &mut *guard;
      if let Some(terminal) = group.terminal().cloned() {
        drop(guard);
        slot.terminate(terminal);
        return None;
      }
      let Some(cell) = state.registry.get_mut(group.id()) else {
        drop(guard);
        slot.dispose();
        return None;
      };
      let slot_id = cell.subscribers.add(slot);
      (slot_id, state.link.acquire())
    };
    if let Some(generation) = generation {
      self.connect(generation);
    }
    Some(slot_id)
  }

  pub(crate) fn unsubscribe_group(&self, group: GroupId, slot_id: usize) {
    let upstream = {
      let mut guard = lock(&self.state);
      let state = &mut *guard;
      let Some(cell) = state.registry.get_mut(group) else { return };
      if cell.subscribers.remove(slot_id).is_none() {
        return;
      }
      state.link.release(1)
    };
    disconnect(upstream);
  }

  /// Close one group. The first terminal wins; closing a closed group is a
  /// no-op.
  pub(crate) fn close_group(&self, id: GroupId, terminal: Terminal<Err>) {
    let (slots, duration, upstream) = {
      let mut guard = lock(&self.state);
      let state = &mut *guard;
      let Some(mut cell) = state.registry.remove(id) else { return };
      if let Some(group) = cell.group.upgrade() {
        group.set_terminal(terminal.clone());
      }
      let upstream = state.link.release(cell.subscribers.len());
      (cell.subscribers.drain(), cell.duration.take(), upstream)
    };
    log_debug!("group_by: closed group {}, error: {}", id, terminal.is_error());
    broadcast_terminal(&slots, terminal);
    if let Some(duration) = duration {
      duration.unsubscribe();
    }
    disconnect(upstream);
  }

  /// Terminate the operator: every open group, in creation order, then the
  /// outer sequence receive `terminal`, and the upstream is released.
  ///
  /// Runs at most once; later calls are ignored.
  pub(crate) fn terminate(&self, terminal: Terminal<Err>) {
    let (cells, outer, upstream) = {
      let mut guard = lock(&self.state);
      let state = &mut *guard;
      if state.terminated {
        return;
      }
      state.terminated = true;
      let cells = state.registry.drain();
      for cell in &cells {
        if let Some(group) = cell.group.upgrade() {
          group.set_terminal(terminal.clone());
        }
      }
      (cells, state.outer.take(), state.link.release_all())
    };
    log_debug!("group_by: terminated, {} open groups, error: {}", cells.len(), terminal.is_error());

    let mut durations = Vec::with_capacity(cells.len());
    for mut cell in cells {
      broadcast_terminal(&cell.subscribers.drain(), terminal.clone());
      durations.extend(cell.duration.take());
    }
    if let Some(outer) = outer {
      outer.terminate(terminal);
    }
    for duration in durations {
      duration.unsubscribe();
    }
    disconnect(upstream);
  }

  /// Fault raised by one of the operator's callbacks.
  #[inline]
  pub(crate) fn fault(&self, err: Err) {
    log_debug!("group_by: callback failed, faulting all groups");
    self.terminate(Terminal::Errored(err));
  }
}

fn disconnect(upstream: Option<BoxedSubscriptionSend>) {
  if let Some(upstream) = upstream {
    log_debug!("group_by: no interest left, disposing upstream");
    upstream.unsubscribe();
  }
}

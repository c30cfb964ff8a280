//! Shared delivery cells for multicast observers.
//!
//! A multicast source keeps every subscriber in an [`ObserverSlot`]: an
//! `Arc`-shared cell that owns one boxed observer. Notifications are pushed
//! into the slot from outside any operator lock, so an observer is free to
//! subscribe, unsubscribe or terminate sequences re-entrantly while it is
//! being called.
//!
//! [`Subscribers`] is the ordered, id-keyed list of slots a multicast source
//! broadcasts to.

use std::{
  collections::VecDeque,
  sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
  },
};

use crate::{
  observer::{BoxedObserverSend, IntoBoxedObserver, Observer},
  rc::lock,
  subscription::DynamicSubscriptions,
};

/// The terminal notification of a sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminal<Err> {
  Completed,
  Errored(Err),
}

impl<Err> Terminal<Err> {
  /// Hand the terminal notification to `observer`.
  pub fn deliver<Item, O>(self, observer: O)
  where
    O: Observer<Item, Err>,
  {
    match self {
      Terminal::Completed => observer.complete(),
      Terminal::Errored(err) => observer.error(err),
    }
  }

  #[inline]
  pub fn is_error(&self) -> bool { matches!(self, Terminal::Errored(_)) }
}

struct SlotState<Item, Err> {
  observer: Option<BoxedObserverSend<'static, Item, Err>>,
  /// An observer call is in flight and `observer` is checked out.
  busy: bool,
  /// Values pushed re-entrantly while busy; drained by the in-flight caller.
  queue: VecDeque<Item>,
  /// Terminal raised while busy; delivered when the in-flight call returns.
  pending: Option<Terminal<Err>>,
}

/// A shared cell owning one observer.
///
/// The observer is taken out of the cell for the duration of each call, so no
/// lock is held while user code runs. Anything that reaches the slot while a
/// call is in flight is handed to the calling thread: values are queued and
/// delivered in order, a terminal is parked and delivered last.
///
/// A slot delivers at most one terminal notification. After `terminate` or
/// `dispose` every further notification is ignored.
pub struct ObserverSlot<Item, Err> {
  closed: AtomicBool,
  state: Mutex<SlotState<Item, Err>>,
}

impl<Item, Err> ObserverSlot<Item, Err> {
  pub fn new<O>(observer: O) -> Self
  where
    O: IntoBoxedObserver<BoxedObserverSend<'static, Item, Err>>,
  {
    ObserverSlot {
      closed: AtomicBool::new(false),
      state: Mutex::new(SlotState {
        observer: Some(observer.into_boxed()),
        busy: false,
        queue: VecDeque::new(),
        pending: None,
      }),
    }
  }

  /// `true` once the slot was terminated or disposed, or its observer reported
  /// itself closed.
  #[inline]
  pub fn is_closed(&self) -> bool { self.closed.load(Ordering::Acquire) }

  /// Deliver a value to the observer.
  pub fn next(&self, value: Item) {
    if self.is_closed() {
      return;
    }
    let mut observer = {
      let mut state = lock(&self.state);
      if self.is_closed() {
        return;
      }
      if state.busy {
        state.queue.push_back(value);
        return;
      }
      let Some(observer) = state.observer.take() else {
        return;
      };
      state.busy = true;
      observer
    };

    let mut value = value;
    loop {
      observer.next(value);

      let mut state = lock(&self.state);
      if let Some(terminal) = state.pending.take() {
        state.busy = false;
        state.queue.clear();
        drop(state);
        terminal.deliver(observer);
        return;
      }
      if self.is_closed() || observer.is_closed() {
        self.closed.store(true, Ordering::Release);
        state.busy = false;
        state.queue.clear();
        drop(state);
        drop(observer);
        return;
      }
      match state.queue.pop_front() {
        Some(queued) => value = queued,
        None => {
          state.observer = Some(observer);
          state.busy = false;
          return;
        }
      }
    }
  }

  /// Deliver the terminal notification. Returns `false` if the slot was
  /// already closed and the notification was dropped.
  pub fn terminate(&self, terminal: Terminal<Err>) -> bool {
    let observer = {
      let mut state = lock(&self.state);
      if self.closed.swap(true, Ordering::AcqRel) {
        return false;
      }
      if state.busy {
        state.pending = Some(terminal);
        return true;
      }
      state.queue.clear();
      state.observer.take()
    };
    if let Some(observer) = observer {
      terminal.deliver(observer);
    }
    true
  }

  /// Stop delivering without a terminal notification and drop the observer.
  pub fn dispose(&self) {
    let observer = {
      let mut state = lock(&self.state);
      self.closed.store(true, Ordering::Release);
      state.queue.clear();
      if state.busy {
        None
      } else {
        state.observer.take()
      }
    };
    drop(observer);
  }
}

/// Ordered list of shared observer slots.
///
/// Ids come from [`DynamicSubscriptions`] and are never reused, so a stale
/// subscription handle can safely try to remove itself again.
pub struct Subscribers<Item, Err> {
  inner: DynamicSubscriptions<Arc<ObserverSlot<Item, Err>>>,
}

impl<Item, Err> Default for Subscribers<Item, Err> {
  fn default() -> Self { Self { inner: DynamicSubscriptions::default() } }
}

impl<Item, Err> Subscribers<Item, Err> {
  /// Add a slot and return its unique ID.
  #[inline]
  pub fn add(&mut self, slot: Arc<ObserverSlot<Item, Err>>) -> usize { self.inner.add(slot) }

  /// Remove a slot by ID.
  #[inline]
  pub fn remove(&mut self, id: usize) -> Option<Arc<ObserverSlot<Item, Err>>> { self.inner.remove(id) }

  #[inline]
  pub fn contains(&self, id: usize) -> bool { self.inner.contains(id) }

  #[inline]
  pub fn len(&self) -> usize { self.inner.len() }

  #[inline]
  pub fn is_empty(&self) -> bool { self.inner.is_empty() }

  /// Clone the current slots, in subscription order, so they can be called
  /// after the owning lock is released.
  pub fn snapshot(&self) -> Vec<Arc<ObserverSlot<Item, Err>>> { self.inner.iter().cloned().collect() }

  /// Remove and return every slot, in subscription order.
  pub fn drain(&mut self) -> Vec<Arc<ObserverSlot<Item, Err>>> { self.inner.drain().collect() }
}

/// Broadcast `value` to `slots` in order.
///
/// The value is cloned for every slot except the last one, which receives the
/// moved value.
pub fn broadcast_value<Item, Err>(slots: &[Arc<ObserverSlot<Item, Err>>], value: Item)
where
  Item: Clone,
{
  let Some((last, rest)) = slots.split_last() else {
    return;
  };
  for slot in rest {
    slot.next(value.clone());
  }
  last.next(value);
}

/// Broadcast a terminal notification to `slots` in order.
pub fn broadcast_terminal<Item, Err>(slots: &[Arc<ObserverSlot<Item, Err>>], terminal: Terminal<Err>)
where
  Err: Clone,
{
  let Some((last, rest)) = slots.split_last() else {
    return;
  };
  for slot in rest {
    slot.terminate(terminal.clone());
  }
  last.terminate(terminal);
}

#[cfg(test)]
mod tests {
  use once_cell::sync::OnceCell;

  use super::*;
  use crate::observer::ObserverAll;

  type Log = Arc<Mutex<Vec<String>>>;

  fn logging_slot(log: &Log) -> Arc<ObserverSlot<i32, String>> {
    let (n, e, c) = (log.clone(), log.clone(), log.clone());
    Arc::new(ObserverSlot::new(ObserverAll::new(
      move |v: i32| n.lock().unwrap().push(format!("next {v}")),
      move |err: String| e.lock().unwrap().push(format!("error {err}")),
      move || c.lock().unwrap().push("complete".to_string()),
    )))
  }

  #[rxgroup_macro::test]
  fn delivers_values_then_one_terminal() {
    let log = Log::default();
    let slot = logging_slot(&log);
    slot.next(1);
    slot.next(2);
    assert!(slot.terminate(Terminal::Completed));
    assert!(!slot.terminate(Terminal::Errored("late".into())));
    slot.next(3);

    assert!(slot.is_closed());
    assert_eq!(*log.lock().unwrap(), vec!["next 1", "next 2", "complete"]);
  }

  #[rxgroup_macro::test]
  fn dispose_drops_silently() {
    let log = Log::default();
    let slot = logging_slot(&log);
    slot.next(1);
    slot.dispose();
    slot.next(2);
    assert!(!slot.terminate(Terminal::Completed));
    assert_eq!(*log.lock().unwrap(), vec!["next 1"]);
  }

  #[rxgroup_macro::test]
  fn reentrant_calls_are_handed_to_the_caller() {
    let log = Log::default();
    let me: Arc<OnceCell<Arc<ObserverSlot<i32, String>>>> = Arc::default();

    let (n, e, c) = (log.clone(), log.clone(), log.clone());
    let c_me = me.clone();
    let slot = Arc::new(ObserverSlot::new(ObserverAll::new(
      move |v: i32| {
        n.lock().unwrap().push(format!("next {v}"));
        if v == 1 {
          let slot = c_me.get().unwrap();
          slot.next(2);
          slot.next(3);
          slot.terminate(Terminal::Errored("boom".to_string()));
          n.lock().unwrap().push("returned".to_string());
        }
      },
      move |err: String| e.lock().unwrap().push(format!("error {err}")),
      move || c.lock().unwrap().push("complete".to_string()),
    )));
    let _ = me.set(slot.clone());

    slot.next(1);
    assert!(slot.is_closed());
    // The terminal raised while busy wins over the queued values.
    assert_eq!(*log.lock().unwrap(), vec!["next 1", "returned", "error boom"]);
  }

  #[rxgroup_macro::test]
  fn queued_values_keep_order() {
    let log = Log::default();
    let me: Arc<OnceCell<Arc<ObserverSlot<i32, String>>>> = Arc::default();

    let n = log.clone();
    let c_me = me.clone();
    let slot = Arc::new(ObserverSlot::new(ObserverAll::new(
      move |v: i32| {
        n.lock().unwrap().push(format!("next {v}"));
        if v == 1 {
          let slot = c_me.get().unwrap();
          slot.next(2);
          slot.next(3);
        }
      },
      |_: String| {},
      || {},
    )));
    let _ = me.set(slot.clone());

    slot.next(1);
    slot.next(4);
    assert_eq!(*log.lock().unwrap(), vec!["next 1", "next 2", "next 3", "next 4"]);
  }

  #[rxgroup_macro::test]
  fn broadcast_in_subscription_order() {
    let log = Log::default();
    let mut subscribers = Subscribers::default();
    let first = subscribers.add(logging_slot(&log));
    subscribers.add(logging_slot(&log));
    assert_eq!(subscribers.len(), 2);

    broadcast_value(&subscribers.snapshot(), 7);
    subscribers.remove(first);
    broadcast_value(&subscribers.snapshot(), 8);
    broadcast_terminal(&subscribers.drain(), Terminal::Errored("e".to_string()));

    assert!(subscribers.is_empty());
    assert_eq!(*log.lock().unwrap(), vec!["next 7", "next 7", "next 8", "error e"]);
  }

  #[rxgroup_macro::test]
  fn terminal_delivery() {
    let terminal: Terminal<String> = Terminal::Errored("x".into());
    assert!(terminal.is_error());
    assert!(!Terminal::<String>::Completed.is_error());
  }
}

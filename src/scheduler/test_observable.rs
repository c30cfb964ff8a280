use std::sync::Arc;

use super::{Duration, TestScheduler};
use crate::{
  observable::{Observable, ObservableExt},
  observer::Observer,
  rc::{MutArc, RcDeref, RcDerefMut},
  subscribers::{broadcast_terminal, broadcast_value, ObserverSlot, Subscribers, Terminal},
  subscription::Subscription,
};

/// A notification as seen by an observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification<Item, Err> {
  Next(Item),
  Error(Err),
  Completed,
}

/// A value stamped with the virtual time, in milliseconds, it happened at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded<T> {
  pub time: u64,
  pub value: T,
}

pub fn on_next<Item, Err>(time: u64, value: Item) -> Recorded<Notification<Item, Err>> {
  Recorded { time, value: Notification::Next(value) }
}

pub fn on_error<Item, Err>(time: u64, err: Err) -> Recorded<Notification<Item, Err>> {
  Recorded { time, value: Notification::Error(err) }
}

pub fn on_completed<Item, Err>(time: u64) -> Recorded<Notification<Item, Err>> {
  Recorded { time, value: Notification::Completed }
}

/// When a subscription to a [`HotObservable`] started and, if it did, ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionLog {
  pub subscribed: u64,
  pub unsubscribed: Option<u64>,
}

impl SubscriptionLog {
  pub fn new(subscribed: u64, unsubscribed: u64) -> Self {
    SubscriptionLog { subscribed, unsubscribed: Some(unsubscribed) }
  }

  pub fn open(subscribed: u64) -> Self { SubscriptionLog { subscribed, unsubscribed: None } }
}

fn millis() -> u64 { u64::try_from(TestScheduler::clock().as_millis()).unwrap_or(u64::MAX) }

struct HotState<Item, Err> {
  subscribers: Subscribers<Item, Err>,
  log: Vec<SubscriptionLog>,
}

impl<Item, Err> Default for HotState<Item, Err> {
  fn default() -> Self { HotState { subscribers: Subscribers::default(), log: vec![] } }
}

/// A multicast source for tests.
///
/// Notifications are pushed either by hand with [`emit`](Self::emit) and
/// friends, or from a script of [`Recorded`] notifications played back on
/// the [`TestScheduler`]. Subscribers only see what is pushed after they
/// subscribed. Every subscription is logged with its virtual start and end
/// time.
pub struct HotObservable<Item, Err> {
  state: MutArc<HotState<Item, Err>>,
}

impl<Item, Err> Default for HotObservable<Item, Err> {
  fn default() -> Self { HotObservable { state: MutArc::own(HotState::default()) } }
}

impl<Item, Err> Clone for HotObservable<Item, Err> {
  fn clone(&self) -> Self { HotObservable { state: self.state.clone() } }
}

impl<Item, Err> HotObservable<Item, Err>
where
  Item: Clone + 'static,
  Err: Clone + 'static,
{
  /// Schedule every message of `messages` at its virtual time.
  ///
  /// # Panics
  ///
  /// Panics if `TestScheduler::init()` has not been called first.
  pub fn new(messages: Vec<Recorded<Notification<Item, Err>>>) -> Self {
    let hot = Self::default();
    for Recorded { time, value } in messages {
      let c_hot = hot.clone();
      TestScheduler::schedule_at(Duration::from_millis(time), move || match value {
        Notification::Next(v) => c_hot.emit(v),
        Notification::Error(e) => c_hot.emit_error(e),
        Notification::Completed => c_hot.emit_complete(),
      });
    }
    hot
  }

  pub fn emit(&self, value: Item) {
    let slots = self.state.rc_deref().subscribers.snapshot();
    broadcast_value(&slots, value);
  }

  pub fn emit_error(&self, err: Err) {
    let slots = self.state.rc_deref().subscribers.snapshot();
    broadcast_terminal(&slots, Terminal::Errored(err));
  }

  pub fn emit_complete(&self) {
    let slots = self.state.rc_deref().subscribers.snapshot();
    broadcast_terminal(&slots, Terminal::Completed);
  }
}

impl<Item, Err> HotObservable<Item, Err> {
  /// Number of subscriptions not disposed yet.
  pub fn observer_count(&self) -> usize { self.state.rc_deref().subscribers.len() }

  /// Every subscription so far, in subscription order.
  pub fn subscriptions(&self) -> Vec<SubscriptionLog> { self.state.rc_deref().log.clone() }
}

impl<Item, Err, O> Observable<Item, Err, O> for HotObservable<Item, Err>
where
  O: Observer<Item, Err> + Send + 'static,
  Item: 'static,
  Err: 'static,
{
  type Unsub = HotSubscription<Item, Err>;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let slot = Arc::new(ObserverSlot::new(observer));
    let (slot_id, log_index) = {
      let mut state = self.state.rc_deref_mut();
      let slot_id = state.subscribers.add(slot.clone());
      state.log.push(SubscriptionLog::open(millis()));
      (slot_id, state.log.len() - 1)
    };
    HotSubscription { state: self.state, slot_id, log_index, slot }
  }
}

impl<Item, Err> ObservableExt<Item, Err> for HotObservable<Item, Err> {}

pub struct HotSubscription<Item, Err> {
  state: MutArc<HotState<Item, Err>>,
  slot_id: usize,
  log_index: usize,
  slot: Arc<ObserverSlot<Item, Err>>,
}

impl<Item, Err> Subscription for HotSubscription<Item, Err> {
  fn unsubscribe(self) {
    self.slot.dispose();
    let mut state = self.state.rc_deref_mut();
    if state.subscribers.remove(self.slot_id).is_some() {
      if let Some(entry) = state.log.get_mut(self.log_index) {
        entry.unsubscribed = Some(millis());
      }
    }
  }

  fn is_closed(&self) -> bool { self.slot.is_closed() }
}

/// An observer that records every notification with the virtual time it
/// arrived at. Clones share the same recording.
pub struct Recorder<Item, Err> {
  messages: MutArc<Vec<Recorded<Notification<Item, Err>>>>,
}

impl<Item, Err> Default for Recorder<Item, Err> {
  fn default() -> Self { Recorder { messages: MutArc::own(vec![]) } }
}

impl<Item, Err> Clone for Recorder<Item, Err> {
  fn clone(&self) -> Self { Recorder { messages: self.messages.clone() } }
}

impl<Item, Err> Recorder<Item, Err> {
  pub fn new() -> Self { Self::default() }

  fn record(&self, value: Notification<Item, Err>) {
    self
      .messages
      .rc_deref_mut()
      .push(Recorded { time: millis(), value });
  }
}

impl<Item: Clone, Err: Clone> Recorder<Item, Err> {
  pub fn messages(&self) -> Vec<Recorded<Notification<Item, Err>>> { self.messages.rc_deref().clone() }
}

impl<Item, Err> Observer<Item, Err> for Recorder<Item, Err> {
  fn next(&mut self, value: Item) { self.record(Notification::Next(value)); }

  fn error(self, err: Err) { self.record(Notification::Error(err)); }

  fn complete(self) { self.record(Notification::Completed); }

  fn is_closed(&self) -> bool { false }
}

//! Virtual-time scenarios for `group_by` and `group_by_until`.
//!
//! Every scenario replays the same hot source of padded, mixed-case words,
//! groups them by their trimmed text with an ASCII case-insensitive comparer
//! and records what the outer sequence and each group saw, stamped with the
//! virtual time.

use std::{
  cell::RefCell,
  convert::Infallible,
  rc::Rc,
  sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
  },
  thread,
};

use rxgroup::{
  prelude::*,
  scheduler::{
    on_completed, on_error, on_next, Duration, HotObservable, Notification, Recorded, Recorder,
    SubscriptionLog, TestScheduler,
  },
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
enum TestError {
  #[error("comparer failed")]
  Comparer,
  #[error("selector failed")]
  Selector,
  #[error("duration failed")]
  Duration,
  #[error("source failed")]
  Source,
}

type Word = Recorded<Notification<String, TestError>>;
type WordGroup = Group<String, String, TestError>;

fn ms(v: u64) -> Duration { Duration::from_millis(v) }

fn next(time: u64, word: &str) -> Word { on_next(time, word.to_string()) }

fn words() -> HotObservable<String, TestError> {
  HotObservable::new(vec![
    next(90, "error"),
    next(110, "error"),
    next(130, "error"),
    next(220, "  foo"),
    next(240, " FoO "),
    next(270, "baR  "),
    next(310, "foO "),
    next(350, " Baz   "),
    next(360, "  qux "),
    next(390, "   bar"),
    next(420, " BAR  "),
    next(470, "FOO "),
    next(480, "baz  "),
    next(510, " bAZ "),
    next(530, "    fOo    "),
    on_completed(570),
    next(580, "error"),
    on_completed(600),
    on_error(650, TestError::Source),
  ])
}

fn trimmed(word: &String) -> String { word.trim().to_string() }

fn ascii_hash(key: &str) -> u64 {
  key
    .bytes()
    .fold(17, |h, b| h.wrapping_mul(31).wrapping_add(b.to_ascii_lowercase() as u64))
}

/// ASCII case-insensitive key equality, optionally failing once virtual time
/// passes a threshold.
#[derive(Default)]
struct Insensitive {
  hash_fails_after: Option<u64>,
  eq_fails_after: Option<u64>,
}

fn past(threshold: Option<u64>) -> bool {
  threshold.is_some_and(|t| TestScheduler::now() > ms(t))
}

impl KeyComparer<String, TestError> for Insensitive {
  fn hash_key(&self, key: &String) -> Result<u64, TestError> {
    if past(self.hash_fails_after) {
      return Err(TestError::Comparer);
    }
    Ok(ascii_hash(key))
  }

  fn eq_keys(&self, a: &String, b: &String) -> Result<bool, TestError> {
    if past(self.eq_fails_after) {
      return Err(TestError::Comparer);
    }
    Ok(a.eq_ignore_ascii_case(b))
  }
}

/// Records the keys the outer sequence announces and subscribes a fresh
/// recorder to every group.
#[derive(Clone, Default)]
struct Scenario {
  outer: Recorder<String, TestError>,
  groups: Arc<Mutex<Vec<(WordGroup, Recorder<String, TestError>)>>>,
}

impl Scenario {
  fn group(&self, key: &str) -> (WordGroup, Recorder<String, TestError>) {
    let groups = self.groups.lock().unwrap();
    let (group, recorder) = groups
      .iter()
      .find(|(group, _)| group.key() == key)
      .unwrap_or_else(|| panic!("no group {key}"));
    (group.clone(), recorder.clone())
  }

  fn group_messages(&self, key: &str) -> Vec<Word> { self.group(key).1.messages() }

  fn run<S>(&self, grouped: S, subscribe_at: u64, dispose_at: u64)
  where
    S: Observable<WordGroup, TestError, Scenario> + 'static,
    S::Unsub: 'static,
  {
    let observer = self.clone();
    TestScheduler::subscribe_between(ms(subscribe_at), ms(dispose_at), move || grouped.actual_subscribe(observer));
    TestScheduler::flush();
  }
}

impl Observer<WordGroup, TestError> for Scenario {
  fn next(&mut self, group: WordGroup) {
    self.outer.next(group.key().clone());
    let recorder = Recorder::new();
    self.groups.lock().unwrap().push((group.clone(), recorder.clone()));
    group.actual_subscribe(recorder);
  }

  fn error(self, err: TestError) { self.outer.error(err); }

  fn complete(self) { self.outer.complete(); }

  fn is_closed(&self) -> bool { false }
}

#[rxgroup_macro::test]
fn until_closes_groups_and_reopens_keys() {
  TestScheduler::init();
  let xs = words();
  let scenario = Scenario::default();

  scenario.run(
    xs.clone()
      .group_by_until(trimmed, |group| group.clone().skip(2))
      .comparer(Insensitive::default()),
    200,
    1000,
  );

  assert_eq!(
    scenario.outer.messages(),
    vec![
      next(220, "foo"),
      next(270, "baR"),
      next(350, "Baz"),
      next(360, "qux"),
      next(470, "FOO"),
      on_completed(570),
    ]
  );
  assert_eq!(
    scenario.group_messages("foo"),
    vec![next(220, "  foo"), next(240, " FoO "), next(310, "foO "), on_completed(310)]
  );
  assert_eq!(
    scenario.group_messages("baR"),
    vec![next(270, "baR  "), next(390, "   bar"), next(420, " BAR  "), on_completed(420)]
  );
  assert_eq!(
    scenario.group_messages("FOO"),
    vec![next(470, "FOO "), next(530, "    fOo    "), on_completed(570)]
  );
  assert_eq!(xs.subscriptions(), vec![SubscriptionLog::new(200, 570)]);
}

#[rxgroup_macro::test]
fn closed_group_replays_only_its_terminal() {
  TestScheduler::init();
  let scenario = Scenario::default();
  scenario.run(
    words()
      .group_by_until(trimmed, |group| group.clone().skip(2))
      .comparer(Insensitive::default()),
    200,
    1000,
  );

  let (foo, _) = scenario.group("foo");
  assert!(foo.is_closed());
  let late = Recorder::new();
  foo.actual_subscribe(late.clone());
  assert_eq!(late.messages(), vec![on_completed(1000)]);
}

#[rxgroup_macro::test]
fn errored_groups_replay_only_their_error() {
  TestScheduler::init();
  let closer = HotObservable::<(), TestError>::new(vec![on_error(300, TestError::Duration)]);
  let scenario = Scenario::default();
  scenario.run(
    words()
      .group_by_until(trimmed, move |_| closer.clone())
      .comparer(Insensitive::default()),
    200,
    1000,
  );

  // `foo` was closed by its duration, the source itself completed later.
  let (foo, _) = scenario.group("foo");
  assert!(foo.is_closed());
  let late = Recorder::new();
  foo.actual_subscribe(late.clone());
  assert_eq!(late.messages(), vec![on_error(1000, TestError::Duration)]);

  // A fault of the whole operator is replayed the same way.
  TestScheduler::init();
  let faulted = Scenario::default();
  faulted.run(
    words()
      .group_by(trimmed)
      .try_element(|word: String| if word.contains("qux") { Err(TestError::Selector) } else { Ok(word) })
      .comparer(Insensitive::default()),
    200,
    1000,
  );
  let (qux, _) = faulted.group("qux");
  let late = Recorder::new();
  qux.actual_subscribe(late.clone());
  assert_eq!(late.messages(), vec![on_error(1000, TestError::Selector)]);
}

#[rxgroup_macro::test]
fn groups_without_duration_stay_open_until_the_source_ends() {
  TestScheduler::init();
  let xs = words();
  let scenario = Scenario::default();
  scenario.run(xs.clone().group_by(trimmed).comparer(Insensitive::default()), 200, 1000);

  let keys: Vec<_> = scenario
    .outer
    .messages()
    .into_iter()
    .filter_map(|r| match r.value {
      Notification::Next(key) => Some(key),
      _ => None,
    })
    .collect();
  assert_eq!(keys, vec!["foo", "baR", "Baz", "qux"]);
  assert_eq!(scenario.group_messages("qux"), vec![next(360, "  qux "), on_completed(570)]);
  assert_eq!(scenario.group_messages("foo").len(), 6);
}

#[rxgroup_macro::test]
fn comparer_eq_failure_faults_every_open_group() {
  TestScheduler::init();
  let xs = words();
  let scenario = Scenario::default();
  scenario.run(
    xs.clone()
      .group_by(trimmed)
      .comparer(Insensitive { eq_fails_after: Some(250), ..Default::default() }),
    200,
    1000,
  );

  assert_eq!(
    scenario.outer.messages(),
    vec![next(220, "foo"), next(270, "baR"), on_error(310, TestError::Comparer)]
  );
  assert_eq!(
    scenario.group_messages("foo"),
    vec![next(220, "  foo"), next(240, " FoO "), on_error(310, TestError::Comparer)]
  );
  assert_eq!(
    scenario.group_messages("baR"),
    vec![next(270, "baR  "), on_error(310, TestError::Comparer)]
  );
  assert_eq!(xs.subscriptions(), vec![SubscriptionLog::new(200, 310)]);
}

#[rxgroup_macro::test]
fn comparer_hash_failure_never_creates_the_group() {
  TestScheduler::init();
  let xs = words();
  let scenario = Scenario::default();
  scenario.run(
    xs.clone()
      .group_by(trimmed)
      .comparer(Insensitive { hash_fails_after: Some(250), ..Default::default() }),
    200,
    1000,
  );

  assert_eq!(
    scenario.outer.messages(),
    vec![next(220, "foo"), on_error(270, TestError::Comparer)]
  );
  assert_eq!(
    scenario.group_messages("foo"),
    vec![next(220, "  foo"), next(240, " FoO "), on_error(270, TestError::Comparer)]
  );
  assert_eq!(scenario.groups.lock().unwrap().len(), 1);
  assert_eq!(xs.subscriptions(), vec![SubscriptionLog::new(200, 270)]);
}

#[rxgroup_macro::test]
fn key_selector_failure_on_the_tenth_item() {
  TestScheduler::init();
  let calls = Arc::new(AtomicUsize::new(0));
  let c_calls = calls.clone();
  let scenario = Scenario::default();
  scenario.run(
    words()
      .try_group_by(move |word: &String| {
        if c_calls.fetch_add(1, Ordering::SeqCst) + 1 == 10 {
          Err(TestError::Selector)
        } else {
          Ok(trimmed(word))
        }
      })
      .comparer(Insensitive::default()),
    200,
    1000,
  );

  assert_eq!(
    scenario.outer.messages(),
    vec![
      next(220, "foo"),
      next(270, "baR"),
      next(350, "Baz"),
      next(360, "qux"),
      on_error(480, TestError::Selector),
    ]
  );
  for key in ["foo", "baR", "Baz", "qux"] {
    assert_eq!(scenario.group_messages(key).last(), Some(&on_error(480, TestError::Selector)));
  }
  assert_eq!(
    scenario.group_messages("Baz"),
    vec![next(350, " Baz   "), on_error(480, TestError::Selector)]
  );
  assert_eq!(calls.load(Ordering::SeqCst), 10);
}

#[rxgroup_macro::test]
fn element_selector_failure_on_the_tenth_item() {
  TestScheduler::init();
  let calls = Arc::new(AtomicUsize::new(0));
  let c_calls = calls.clone();
  let scenario = Scenario::default();
  scenario.run(
    words()
      .group_by(trimmed)
      .try_element(move |word: String| {
        if c_calls.fetch_add(1, Ordering::SeqCst) + 1 == 10 {
          Err(TestError::Selector)
        } else {
          Ok(word.chars().rev().collect::<String>())
        }
      })
      .comparer(Insensitive::default()),
    200,
    1000,
  );

  assert_eq!(scenario.outer.messages().last(), Some(&on_error(480, TestError::Selector)));
  assert_eq!(
    scenario.group_messages("Baz"),
    vec![next(350, "   zaB "), on_error(480, TestError::Selector)]
  );
  assert_eq!(
    scenario.group_messages("qux"),
    vec![next(360, " xuq  "), on_error(480, TestError::Selector)]
  );
}

#[rxgroup_macro::test]
fn element_selector_failure_on_a_new_key() {
  TestScheduler::init();
  let scenario = Scenario::default();
  scenario.run(
    words()
      .group_by(trimmed)
      .try_element(|word: String| if word.contains("qux") { Err(TestError::Selector) } else { Ok(word) })
      .comparer(Insensitive::default()),
    200,
    1000,
  );

  assert_eq!(
    scenario.outer.messages(),
    vec![
      next(220, "foo"),
      next(270, "baR"),
      next(350, "Baz"),
      next(360, "qux"),
      on_error(360, TestError::Selector),
    ]
  );
  assert_eq!(scenario.group_messages("qux"), vec![on_error(360, TestError::Selector)]);
}

#[rxgroup_macro::test]
fn duration_selector_failure_faults_after_the_announcement() {
  TestScheduler::init();
  let scenario = Scenario::default();
  scenario.run(
    words()
      .group_by(trimmed)
      .try_until(|_: &WordGroup| Err::<observable::NeverObservable<(), TestError>, _>(TestError::Duration))
      .comparer(Insensitive::default()),
    200,
    1000,
  );

  assert_eq!(
    scenario.outer.messages(),
    vec![next(220, "foo"), on_error(220, TestError::Duration)]
  );
  assert_eq!(scenario.group_messages("foo"), vec![on_error(220, TestError::Duration)]);
}

#[rxgroup_macro::test]
fn duration_error_closes_only_its_groups() {
  TestScheduler::init();
  let closer = HotObservable::<(), TestError>::new(vec![on_error(300, TestError::Duration)]);
  let scenario = Scenario::default();
  scenario.run(
    words()
      .group_by_until(trimmed, move |_| closer.clone())
      .comparer(Insensitive::default()),
    200,
    1000,
  );

  assert_eq!(
    scenario.outer.messages(),
    vec![
      next(220, "foo"),
      next(270, "baR"),
      next(310, "foO"),
      next(350, "Baz"),
      next(360, "qux"),
      next(390, "bar"),
      on_completed(570),
    ]
  );
  assert_eq!(
    scenario.group_messages("foo"),
    vec![next(220, "  foo"), next(240, " FoO "), on_error(300, TestError::Duration)]
  );
  assert_eq!(
    scenario.group_messages("foO"),
    vec![next(310, "foO "), next(470, "FOO "), next(530, "    fOo    "), on_completed(570)]
  );
}

#[rxgroup_macro::test]
fn disposing_one_group_subscriber_only_stops_that_subscriber() {
  TestScheduler::init();
  let first = Recorder::<String, TestError>::new();
  let second = Recorder::<String, TestError>::new();
  let to_dispose: Arc<Mutex<Option<GroupSubscription<String, String, TestError>>>> = Arc::default();

  let (c_first, c_second, c_to_dispose) = (first.clone(), second.clone(), to_dispose.clone());
  let grouped = words().group_by(trimmed).comparer(Insensitive::default());
  TestScheduler::subscribe_between(ms(200), ms(1000), move || {
    grouped.subscribe_all(
      move |group: WordGroup| {
        if group.key() == "foo" {
          let subscription = group.clone().actual_subscribe(c_first.clone());
          *c_to_dispose.lock().unwrap() = Some(subscription);
          group.actual_subscribe(c_second.clone());
        }
      },
      |_| {},
      || {},
    )
  });
  TestScheduler::schedule_at(ms(300), move || {
    to_dispose.lock().unwrap().take().unsubscribe();
  });
  TestScheduler::flush();

  assert_eq!(first.messages(), vec![next(220, "  foo"), next(240, " FoO ")]);
  assert_eq!(second.messages().len(), 6);
  assert_eq!(second.messages().last(), Some(&on_completed(570)));
}

#[rxgroup_macro::test]
fn upstream_lives_while_any_party_is_interested() {
  TestScheduler::init();
  let xs = words();
  let foo: Arc<Mutex<Option<WordGroup>>> = Arc::default();
  let foo_subscription: Rc<RefCell<Option<GroupSubscription<String, String, TestError>>>> = Rc::default();
  let late = Recorder::<String, TestError>::new();

  let c_foo = foo.clone();
  let grouped = xs.clone().group_by(trimmed).comparer(Insensitive::default());
  TestScheduler::subscribe_between(ms(200), ms(230), move || {
    grouped.subscribe_all(
      move |group: WordGroup| {
        if group.key() == "foo" {
          *c_foo.lock().unwrap() = Some(group);
        }
      },
      |_| {},
      || {},
    )
  });

  // The outer subscriber left at 230; the group subscriber keeps the source
  // connected until 300.
  let (c_foo, c_subscription) = (foo.clone(), foo_subscription.clone());
  TestScheduler::schedule_at(ms(225), move || {
    let group = c_foo.lock().unwrap().clone().unwrap();
    *c_subscription.borrow_mut() = Some(group.actual_subscribe(Recorder::new()));
  });
  TestScheduler::schedule_at(ms(300), move || {
    foo_subscription.borrow_mut().take().unsubscribe();
  });

  // A new subscriber of the still-open group connects the source again.
  let (c_foo, c_late) = (foo.clone(), late.clone());
  TestScheduler::schedule_at(ms(400), move || {
    let group = c_foo.lock().unwrap().clone().unwrap();
    group.actual_subscribe(c_late);
  });
  TestScheduler::flush();

  assert_eq!(
    xs.subscriptions(),
    vec![SubscriptionLog::new(200, 300), SubscriptionLog::new(400, 570)]
  );
  assert_eq!(
    late.messages(),
    vec![next(470, "FOO "), next(530, "    fOo    "), on_completed(570)]
  );
}

#[rxgroup_macro::test]
fn source_error_reaches_groups_then_outer() {
  let order = Arc::new(Mutex::new(vec![]));
  let source = HotObservable::<i32, TestError>::default();

  let c_order = order.clone();
  let c_outer = order.clone();
  source.clone().group_by(|v: &i32| v % 3).subscribe_all(
    move |group: Group<i32, i32, TestError>| {
      let key = *group.key();
      let c_order = c_order.clone();
      group.subscribe_all(|_| {}, move |e| c_order.lock().unwrap().push(format!("{key}: {e}")), || {});
    },
    move |e| c_outer.lock().unwrap().push(format!("outer: {e}")),
    || {},
  );
  for v in [2, 0, 1, 5] {
    source.emit(v);
  }
  source.emit_error(TestError::Source);
  source.emit(3);

  assert_eq!(
    *order.lock().unwrap(),
    vec!["2: source failed", "0: source failed", "1: source failed", "outer: source failed"]
  );
  assert_eq!(source.observer_count(), 0);
}

#[rxgroup_macro::test]
fn groups_are_subscribed_and_disposed_across_threads() {
  let source = HotObservable::<usize, Infallible>::default();
  let groups: Arc<Mutex<Vec<Group<usize, usize, Infallible>>>> = Arc::default();
  let total = Arc::new(AtomicUsize::new(0));

  let (c_groups, c_total) = (groups.clone(), total.clone());
  source.clone().group_by(|v: &usize| v % 4).subscribe(move |group| {
    let c_total = c_total.clone();
    c_groups.lock().unwrap().push(group.clone());
    group.subscribe(move |_| {
      c_total.fetch_add(1, Ordering::SeqCst);
    });
  });
  for v in 0..4 {
    source.emit(v);
  }

  thread::scope(|s| {
    for _ in 0..4 {
      let groups = groups.lock().unwrap().clone();
      s.spawn(move || {
        for _ in 0..200 {
          for group in &groups {
            group.clone().subscribe(|_| {}).unsubscribe();
          }
        }
      });
    }
    for v in 4..1000 {
      source.emit(v);
    }
  });
  source.emit_complete();

  assert_eq!(total.load(Ordering::SeqCst), 1000);
  assert!(groups.lock().unwrap().iter().all(|g| g.is_closed()));
}

#[rxgroup_macro::test(shared)]
async fn groups_feed_tasks_on_a_multi_thread_runtime() {
  let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
  let source = HotObservable::<i32, Infallible>::default();

  source.clone().group_by(|v: &i32| v % 2).subscribe(move |group| {
    let key = *group.key();
    let tx = tx.clone();
    group.subscribe(move |v| {
      let _ = tx.send((key, v));
    });
  });

  let emitter = source.clone();
  tokio::spawn(async move {
    for v in 0..10 {
      emitter.emit(v);
    }
    emitter.emit_complete();
  })
  .await
  .unwrap();

  let mut received = vec![];
  for _ in 0..10 {
    received.push(rx.recv().await.unwrap());
  }
  let odd: Vec<_> = received.iter().filter(|(k, _)| *k == 1).map(|(_, v)| *v).collect();
  assert_eq!(odd, vec![1, 3, 5, 7, 9]);
}

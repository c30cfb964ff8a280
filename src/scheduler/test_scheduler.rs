//! Test Scheduler for deterministic testing of time-dependent sequences.
//!
//! Provides virtual time that only advances when explicitly instructed,
//! enabling deterministic tests of `group_by_until` against hot sources
//! whose notifications are stamped with virtual timestamps.
//!
//! # Usage
//!
//! ```rust
//! use rxgroup::scheduler::{Duration, TestScheduler};
//!
//! // Initialize the test scheduler (required before use)
//! TestScheduler::init();
//!
//! TestScheduler::schedule_at(Duration::from_millis(100), || println!("at 100ms"));
//!
//! // Advance virtual time to run the task
//! TestScheduler::advance_by(Duration::from_millis(100));
//!
//! // Or execute all pending tasks
//! TestScheduler::flush();
//! ```
//!
//! # Thread Safety
//!
//! TestScheduler uses thread-local storage, so each thread has its own
//! independent virtual time and task queue. This ensures test isolation when
//! running tests in parallel across different threads.

use std::{
  cell::{Cell, RefCell},
  cmp::Ordering,
  collections::BinaryHeap,
  rc::Rc,
};

use super::Duration;
use crate::subscription::Subscription;

// ==================== Internal State ====================

struct TestSchedulerState {
  virtual_time: Duration,
  task_queue: BinaryHeap<ScheduledTask>,
  next_task_id: usize,
  initialized: bool,
}

impl Default for TestSchedulerState {
  fn default() -> Self {
    Self {
      virtual_time: Duration::ZERO,
      task_queue: BinaryHeap::new(),
      next_task_id: 0,
      initialized: false,
    }
  }
}

struct ScheduledTask {
  scheduled_time: Duration,
  task_id: usize,
  task: Box<dyn FnOnce()>,
  handle: TaskHandle,
}

impl PartialEq for ScheduledTask {
  fn eq(&self, other: &Self) -> bool {
    self.scheduled_time == other.scheduled_time && self.task_id == other.task_id
  }
}

impl Eq for ScheduledTask {}

impl PartialOrd for ScheduledTask {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for ScheduledTask {
  fn cmp(&self, other: &Self) -> Ordering {
    // Min-heap: earlier times first, then FIFO by task_id
    other
      .scheduled_time
      .cmp(&self.scheduled_time)
      .then_with(|| other.task_id.cmp(&self.task_id))
  }
}

thread_local! {
  static TEST_SCHEDULER_STATE: RefCell<TestSchedulerState>
    = RefCell::new(TestSchedulerState::default());
}

/// Handle to a scheduled task. Unsubscribing it cancels the task if it has
/// not run yet.
#[derive(Clone, Default)]
pub struct TaskHandle(Rc<Cell<bool>>);

impl TaskHandle {
  fn mark_finished(&self) { self.0.set(true); }
}

impl Subscription for TaskHandle {
  fn unsubscribe(self) { self.0.set(true); }

  fn is_closed(&self) -> bool { self.0.get() }
}

// ==================== TestScheduler ====================

/// A virtual time scheduler for deterministic testing.
///
/// This is a zero-sized type that accesses thread-local state.
/// All instances in the same thread share the same virtual time and task queue.
#[derive(Clone, Copy, Default)]
pub struct TestScheduler;

impl TestScheduler {
  /// Initialize or reset the test scheduler state.
  ///
  /// This method must be called at the start of each test to ensure clean
  /// state. It resets the virtual time to zero, clears the task queue, and
  /// resets the task ID counter.
  ///
  /// # Panics
  ///
  /// Other methods will panic if `init()` has not been called first.
  pub fn init() {
    TEST_SCHEDULER_STATE.with(|state| {
      let mut state = state.borrow_mut();
      state.virtual_time = Duration::ZERO;
      state.task_queue.clear();
      state.next_task_id = 0;
      state.initialized = true;
    });
  }

  fn ensure_initialized() {
    TEST_SCHEDULER_STATE.with(|state| {
      assert!(
        state.borrow().initialized,
        "TestScheduler::init() must be called before using the scheduler"
      );
    });
  }

  /// Get the current virtual time.
  ///
  /// # Panics
  ///
  /// Panics if `init()` has not been called first.
  pub fn now() -> Duration {
    Self::ensure_initialized();
    TEST_SCHEDULER_STATE.with(|state| state.borrow().virtual_time)
  }

  /// The current virtual time, or zero on a thread that never initialized
  /// the scheduler. Used to timestamp recordings made from any thread.
  pub(crate) fn clock() -> Duration {
    TEST_SCHEDULER_STATE.with(|state| {
      let state = state.borrow();
      if state.initialized { state.virtual_time } else { Duration::ZERO }
    })
  }

  /// Get the number of pending tasks in the queue.
  ///
  /// # Panics
  ///
  /// Panics if `init()` has not been called first.
  pub fn pending_count() -> usize {
    Self::ensure_initialized();
    TEST_SCHEDULER_STATE.with(|state| state.borrow().task_queue.len())
  }

  /// Check if there are no pending tasks.
  ///
  /// # Panics
  ///
  /// Panics if `init()` has not been called first.
  pub fn is_empty() -> bool {
    Self::ensure_initialized();
    TEST_SCHEDULER_STATE.with(|state| state.borrow().task_queue.is_empty())
  }

  /// Schedule `task` to run once virtual time reaches `at`. A time in the
  /// past runs on the next advance.
  ///
  /// # Panics
  ///
  /// Panics if `init()` has not been called first.
  pub fn schedule_at(at: Duration, task: impl FnOnce() + 'static) -> TaskHandle {
    Self::ensure_initialized();
    TEST_SCHEDULER_STATE.with(|state| {
      let mut state = state.borrow_mut();
      let scheduled_time = at.max(state.virtual_time);
      let task_id = state.next_task_id;
      state.next_task_id += 1;
      let handle = TaskHandle::default();
      state.task_queue.push(ScheduledTask {
        scheduled_time,
        task_id,
        task: Box::new(task),
        handle: handle.clone(),
      });
      handle
    })
  }

  /// Schedule `task` to run `delay` after the current virtual time.
  pub fn schedule(delay: Duration, task: impl FnOnce() + 'static) -> TaskHandle {
    Self::schedule_at(Self::now() + delay, task)
  }

  /// Subscribe with `subscribe` at `subscribe_at` and unsubscribe the result
  /// at `dispose_at`, the usual shape of a virtual-time scenario.
  pub fn subscribe_between<U>(subscribe_at: Duration, dispose_at: Duration, subscribe: impl FnOnce() -> U + 'static)
  where
    U: Subscription + 'static,
  {
    let subscription: Rc<RefCell<Option<U>>> = Rc::default();
    let c_subscription = subscription.clone();
    Self::schedule_at(subscribe_at, move || *c_subscription.borrow_mut() = Some(subscribe()));
    Self::schedule_at(dispose_at, move || {
      let taken = subscription.borrow_mut().take();
      taken.unsubscribe();
    });
  }

  fn execute_tasks_until(target_time: Option<Duration>) {
    loop {
      let task = TEST_SCHEDULER_STATE.with(|state| {
        let mut state = state.borrow_mut();

        // Check if we should stop (no tasks or past target time)
        let should_stop = state
          .task_queue
          .peek()
          .is_none_or(|peek| target_time.is_some_and(|limit| peek.scheduled_time > limit));
        if should_stop {
          return None;
        }

        let scheduled_task = state.task_queue.pop()?;
        state.virtual_time = scheduled_task.scheduled_time;
        Some(scheduled_task)
      });

      let Some(scheduled_task) = task else {
        break;
      };

      if !scheduled_task.handle.is_closed() {
        scheduled_task.handle.mark_finished();
        (scheduled_task.task)();
      }
    }
  }

  /// Advance virtual time by the specified duration and execute due tasks.
  ///
  /// Tasks are executed in order of their scheduled time, with FIFO ordering
  /// for tasks scheduled at the same time.
  ///
  /// # Panics
  ///
  /// Panics if `init()` has not been called first.
  pub fn advance_by(duration: Duration) {
    Self::ensure_initialized();
    let target_time = TEST_SCHEDULER_STATE.with(|state| state.borrow().virtual_time + duration);
    Self::advance_to(target_time);
  }

  /// Advance virtual time to `target_time`, executing due tasks. Never moves
  /// the clock backwards.
  ///
  /// # Panics
  ///
  /// Panics if `init()` has not been called first.
  pub fn advance_to(target_time: Duration) {
    Self::ensure_initialized();
    Self::execute_tasks_until(Some(target_time));

    TEST_SCHEDULER_STATE.with(|state| {
      let mut state = state.borrow_mut();
      state.virtual_time = state.virtual_time.max(target_time);
    });
  }

  /// Execute all pending tasks by advancing time to each task's scheduled time.
  ///
  /// # Panics
  ///
  /// Panics if `init()` has not been called first.
  pub fn flush() {
    Self::ensure_initialized();
    Self::execute_tasks_until(None);
  }
}

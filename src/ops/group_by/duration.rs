use std::sync::Weak;

use super::{registry::GroupId, state::GroupByCore};
use crate::{observer::Observer, subscribers::Terminal};

/// Observes the duration sequence of one group.
///
/// The first value or completion closes the group; an error closes only that
/// group, with the error. Anything after the first signal is ignored. Holds
/// the operator weakly so an outstanding duration never keeps it alive.
pub struct DurationObserver<Key, Value, Err> {
  core: Weak<GroupByCore<Key, Value, Err>>,
  id: GroupId,
  fired: bool,
}

impl<Key, Value, Err> DurationObserver<Key, Value, Err> {
  pub(crate) fn new(core: Weak<GroupByCore<Key, Value, Err>>, id: GroupId) -> Self {
    DurationObserver { core, id, fired: false }
  }
}

impl<Key, Value, Err> DurationObserver<Key, Value, Err>
where
  Key: Clone,
  Value: Clone,
  Err: Clone,
{
  fn fire(&mut self, terminal: Terminal<Err>) {
    if std::mem::replace(&mut self.fired, true) {
      return;
    }
    if let Some(core) = self.core.upgrade() {
      log_debug!("group_by: duration of group {} fired", self.id);
      core.close_group(self.id, terminal);
    }
  }
}

impl<Signal, Key, Value, Err> Observer<Signal, Err> for DurationObserver<Key, Value, Err>
where
  Key: Clone,
  Value: Clone,
  Err: Clone,
{
  fn next(&mut self, _: Signal) { self.fire(Terminal::Completed); }

  fn error(mut self, err: Err) { self.fire(Terminal::Errored(err)); }

  fn complete(mut self) { self.fire(Terminal::Completed); }

  fn is_closed(&self) -> bool { self.fired || self.core.strong_count() == 0 }
}

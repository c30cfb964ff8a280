use crate::subscription::BoxedSubscriptionSend;

/// Tags one upstream connection. Notifications from an older connection are
/// ignored.
pub(crate) type Generation = u64;

#[derive(Default)]
enum Upstream {
  #[default]
  Idle,
  /// The source is being subscribed outside the operator lock.
  Connecting,
  Connected(BoxedSubscriptionSend),
}

/// Reference-counted upstream connection shared by the outer subscriber and
/// every group subscriber that keeps the source alive.
///
/// The link never subscribes or disposes anything itself: the methods return
/// what the caller has to do once the operator lock is released.
#[derive(Default)]
pub(crate) struct SharedLink {
  refcount: usize,
  upstream: Upstream,
  generation: Generation,
}

impl SharedLink {
  /// Count one more interested party. On the first one returns the
  /// generation of the connection the caller must now establish.
  pub(crate) fn acquire(&mut self) -> Option<Generation> {
    self.refcount += 1;
    if self.refcount == 1 {
      self.generation += 1;
      self.upstream = Upstream::Connecting;
      Some(self.generation)
    } else {
      None
    }
  }

  /// Store the subscription of connection `generation`. Hands it back when
  /// the connection went stale while it was being established.
  pub(crate) fn connected(
    &mut self, generation: Generation, subscription: BoxedSubscriptionSend,
  ) -> Option<BoxedSubscriptionSend> {
    if generation == self.generation && matches!(self.upstream, Upstream::Connecting) {
      self.upstream = Upstream::Connected(subscription);
      None
    } else {
      Some(subscription)
    }
  }

  /// Drop `count` interested parties. Returns the upstream subscription to
  /// dispose once nobody is left.
  pub(crate) fn release(&mut self, count: usize) -> Option<BoxedSubscriptionSend> {
    if count == 0 || self.refcount == 0 {
      return None;
    }
    self.refcount = self.refcount.saturating_sub(count);
    if self.refcount == 0 { self.disconnect() } else { None }
  }

  /// Drop everybody, as the operator terminates.
  pub(crate) fn release_all(&mut self) -> Option<BoxedSubscriptionSend> {
    if self.refcount == 0 {
      return None;
    }
    self.refcount = 0;
    self.disconnect()
  }

  /// `true` while `generation` is the connection currently held open.
  #[inline]
  pub(crate) fn is_current(&self, generation: Generation) -> bool {
    self.refcount > 0 && generation == self.generation
  }

  #[cfg(test)]
  pub(crate) fn refcount(&self) -> usize { self.refcount }

  fn disconnect(&mut self) -> Option<BoxedSubscriptionSend> {
    self.generation += 1;
    match std::mem::take(&mut self.upstream) {
      Upstream::Connected(subscription) => Some(subscription),
      Upstream::Idle | Upstream::Connecting => None,
    }
  }
}

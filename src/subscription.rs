//! Subscription handles.
//!
//! A [`Subscription`] is returned from every `actual_subscribe` call and is
//! the only way to cancel interest in a sequence before it terminates.

mod boxed;
mod dynamic;

pub use boxed::*;
pub use dynamic::*;

/// Handle to cancel an active subscription.
///
/// `unsubscribe` consumes the handle, so a handle can be disposed at most
/// once; implementations must still tolerate being disposed after the
/// sequence they guard has already terminated.
pub trait Subscription {
  /// Stop receiving notifications and release the resources held on behalf
  /// of this subscription.
  fn unsubscribe(self);

  /// Returns `true` once the subscription no longer delivers anything.
  fn is_closed(&self) -> bool;
}

/// The subscription of a sequence that finished synchronously while being
/// subscribed. Nothing is left to cancel.
impl Subscription for () {
  #[inline]
  fn unsubscribe(self) {}

  #[inline]
  fn is_closed(&self) -> bool { true }
}

impl<S: Subscription> Subscription for Option<S> {
  #[inline]
  fn unsubscribe(self) {
    if let Some(s) = self {
      s.unsubscribe();
    }
  }

  #[inline]
  fn is_closed(&self) -> bool { self.as_ref().is_none_or(Subscription::is_closed) }
}

/// An RAII implementation of a "scoped subscribed" of a subscription.
/// When this structure is dropped (falls out of scope), the subscription will
/// be unsubscribed.
///
/// If you want to drop it immediately, wrap it in its own scope
#[must_use]
pub struct SubscriptionGuard<T: Subscription>(Option<T>);

impl<T: Subscription> SubscriptionGuard<T> {
  /// Wraps an existing subscription with a guard to enable RAII behavior for
  /// it.
  pub fn new(subscription: T) -> SubscriptionGuard<T> { SubscriptionGuard(Some(subscription)) }

  /// Give the subscription back without unsubscribing it.
  pub fn into_inner(mut self) -> Option<T> { self.0.take() }
}

impl<T: Subscription> Drop for SubscriptionGuard<T> {
  #[inline]
  fn drop(&mut self) {
    if let Some(subscription) = self.0.take() {
      subscription.unsubscribe();
    }
  }
}

/// Extension to opt into RAII behaviour.
pub trait SubscriptionExt: Subscription + Sized {
  /// Activates "RAII" behavior for this subscription. That means
  /// `unsubscribe()` will be called automatically as soon as the returned
  /// value goes out of scope.
  ///
  /// **Attention:** If you don't assign the return value to a variable,
  /// `unsubscribe()` is called immediately, which is probably not what you
  /// want!
  fn unsubscribe_when_dropped(self) -> SubscriptionGuard<Self> { SubscriptionGuard::new(self) }
}

impl<T: Subscription> SubscriptionExt for T {}

use std::marker::PhantomData;

/// Zero-sized marker that pins a type parameter an operator only mentions in
/// its trait bounds (for example the source item type of `group_by`).
///
/// `fn() -> T` keeps the marker `Send + Sync` and covariant regardless of `T`.
pub struct TypeHint<T>(PhantomData<fn() -> T>);

impl<T> TypeHint<T> {
  #[inline]
  pub fn new() -> Self { Self(PhantomData) }
}

impl<T> Default for TypeHint<T> {
  #[inline]
  fn default() -> Self { Self::new() }
}

impl<T> Clone for TypeHint<T> {
  #[inline]
  fn clone(&self) -> Self { Self::new() }
}

impl<T> Copy for TypeHint<T> {}

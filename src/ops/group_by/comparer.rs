use std::{
  collections::hash_map::DefaultHasher,
  hash::{Hash, Hasher},
};

/// Decides which keys share a group.
///
/// `group_by` never uses the key's own `Hash`/`Eq`; it asks the comparer.
/// Keys that compare equal must hash equal. `eq_keys` is only called for keys
/// whose hashes match, with the key of the open group first.
///
/// Either method may fail; the error faults the whole operator.
///
/// # Examples
///
/// ```
/// use rxgroup::ops::group_by::KeyComparer;
///
/// struct CaseInsensitive;
///
/// impl<Err> KeyComparer<String, Err> for CaseInsensitive {
///   fn hash_key(&self, key: &String) -> Result<u64, Err> {
///     Ok(key.bytes().fold(0, |h, b| h.wrapping_mul(31).wrapping_add(b.to_ascii_lowercase() as u64)))
///   }
///
///   fn eq_keys(&self, a: &String, b: &String) -> Result<bool, Err> { Ok(a.eq_ignore_ascii_case(b)) }
/// }
/// ```
pub trait KeyComparer<Key, Err> {
  fn hash_key(&self, key: &Key) -> Result<u64, Err>;

  fn eq_keys(&self, a: &Key, b: &Key) -> Result<bool, Err>;
}

/// Compares keys with their `Hash` and `Eq` implementations.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultComparer;

impl<Key, Err> KeyComparer<Key, Err> for DefaultComparer
where
  Key: Hash + Eq,
{
  fn hash_key(&self, key: &Key) -> Result<u64, Err> {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    Ok(hasher.finish())
  }

  #[inline]
  fn eq_keys(&self, a: &Key, b: &Key) -> Result<bool, Err> { Ok(a == b) }
}

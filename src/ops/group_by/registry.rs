use std::collections::{BTreeMap, HashMap};

use smallvec::SmallVec;

use super::comparer::KeyComparer;

/// Identity of one group for the lifetime of its operator. Never reused, so a
/// key that reopens gets a fresh id.
pub(crate) type GroupId = u64;

pub(crate) enum Located {
  Found(GroupId),
  /// No open group for the key; carries its hash for the following insert.
  Vacant(u64),
}

struct Entry<Key, Cell> {
  hash: u64,
  key: Key,
  cell: Cell,
}

/// The open groups of one operator, looked up through an injected comparer.
///
/// Entries are bucketed by the comparer's hash. Ids grow monotonically, so
/// iterating `entries` visits groups in creation order.
pub(crate) struct Registry<Key, Cell> {
  buckets: HashMap<u64, SmallVec<[GroupId; 1]>>,
  entries: BTreeMap<GroupId, Entry<Key, Cell>>,
  next_id: GroupId,
}

impl<Key, Cell> Registry<Key, Cell> {
  pub(crate) fn with_capacity(capacity: usize) -> Self {
    Registry {
      buckets: HashMap::with_capacity(capacity),
      entries: BTreeMap::new(),
      next_id: 0,
    }
  }

  /// Find the open group whose key equals `key`.
  ///
  /// Hashes `key` once and calls `eq_keys` only on entries of the same
  /// bucket, in creation order, stopping at the first match.
  pub(crate) fn locate<C, Err>(&self, key: &Key, comparer: &C) -> Result<Located, Err>
  where
    C: KeyComparer<Key, Err> + ?Sized,
  {
    let hash = comparer.hash_key(key)?;
    if let Some(bucket) = self.buckets.get(&hash) {
      for id in bucket {
        let Some(entry) = self.entries.get(id) else { continue };
        if comparer.eq_keys(&entry.key, key)? {
          return Ok(Located::Found(*id));
        }
      }
    }
    Ok(Located::Vacant(hash))
  }

  /// Register a new group under `hash`; `make` builds its cell from the id.
  pub(crate) fn insert_with(&mut self, hash: u64, key: Key, make: impl FnOnce(GroupId) -> Cell) -> GroupId {
    let id = self.next_id;
    self.next_id += 1;
    let cell = make(id);
    self.entries.insert(id, Entry { hash, key, cell });
    self.buckets.entry(hash).or_default().push(id);
    id
  }

  pub(crate) fn get(&self, id: GroupId) -> Option<&Cell> { self.entries.get(&id).map(|e| &e.cell) }

  pub(crate) fn get_mut(&mut self, id: GroupId) -> Option<&mut Cell> {
    self.entries.get_mut(&id).map(|e| &mut e.cell)
  }

  pub(crate) fn remove(&mut self, id: GroupId) -> Option<Cell> {
    let entry = self.entries.remove(&id)?;
    if let Some(bucket) = self.buckets.get_mut(&entry.hash) {
      bucket.retain(|i| *i != id);
      if bucket.is_empty() {
        self.buckets.remove(&entry.hash);
      }
    }
    Some(entry.cell)
  }

  /// Remove every group, returning the cells in creation order.
  pub(crate) fn drain(&mut self) -> Vec<Cell> {
    self.buckets.clear();
    std::mem::take(&mut self.entries)
      .into_values()
      .map(|e| e.cell)
      .collect()
  }

  #[inline]
  pub(crate) fn len(&self) -> usize { self.entries.len() }

  #[inline]
  pub(crate) fn is_empty(&self) -> bool { self.entries.is_empty() }
}

//! Versioned entity store with compare-and-swap commits
//!
//! Readers get clones. A writer commits against the version it read;
//! if the stored version moved on, the commit fails with `StaleState`
//! and nothing is written. The commit callback runs while the entry's
//! write guard is held, so side effects performed inside it are atomic
//! with the write.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use hrflow_types::{EntityRef, EntityType, Versioned, WorkflowError, WorkflowResult};

#[derive(Debug)]
pub struct EntityStore<E> {
    entity_type: EntityType,
    records: DashMap<String, E>,
}

impl<E: Versioned + Clone> EntityStore<E> {
    pub fn new(entity_type: EntityType) -> Self {
        Self {
            entity_type,
            records: DashMap::new(),
        }
    }

    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    fn entity_ref(&self, key: &str) -> EntityRef {
        EntityRef::new(self.entity_type, key)
    }

    /// Snapshot of one entity
    pub fn get(&self, key: &str) -> WorkflowResult<E> {
        self.records
            .get(key)
            .map(|r| r.clone())
            .ok_or_else(|| WorkflowError::NotFound(self.entity_ref(key)))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    /// Insert a new entity. Returns `false` (and does nothing) when the
    /// key is already taken.
    pub fn insert_new(&self, entity: E) -> bool {
        matches!(self.insert_with(entity, |_| Ok(())), Ok(true))
    }

    /// Insert a new entity, running `effects` while the vacant slot is
    /// held. Returns `Ok(false)` when the key is already taken; an error
    /// from `effects` leaves the slot empty.
    pub fn insert_with<F>(&self, entity: E, effects: F) -> WorkflowResult<bool>
    where
        F: FnOnce(&E) -> WorkflowResult<()>,
    {
        match self.records.entry(entity.key()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                effects(&entity)?;
                slot.insert(entity);
                Ok(true)
            }
        }
    }

    /// Replace the entity stored under `key` if its version still equals
    /// `expected_version`.
    ///
    /// `write` receives the current value and returns the value to store.
    /// An error from `write` aborts the commit and leaves the entry as
    /// it was.
    pub fn commit<F>(&self, key: &str, expected_version: u64, write: F) -> WorkflowResult<E>
    where
        F: FnOnce(&E) -> WorkflowResult<E>,
    {
        let mut slot = self
            .records
            .get_mut(key)
            .ok_or_else(|| WorkflowError::NotFound(self.entity_ref(key)))?;

        let actual = slot.version();
        if actual != expected_version {
            return Err(WorkflowError::StaleState {
                entity: self.entity_ref(key),
                expected: expected_version,
                actual,
            });
        }

        let next = write(slot.value())?;
        *slot = next.clone();
        Ok(next)
    }

    pub fn remove(&self, key: &str) -> Option<E> {
        self.records.remove(key).map(|(_, e)| e)
    }

    /// Every entity matching a predicate
    pub fn filter<P>(&self, predicate: P) -> Vec<E>
    where
        P: Fn(&E) -> bool,
    {
        self.records
            .iter()
            .filter(|r| predicate(r.value()))
            .map(|r| r.value().clone())
            .collect()
    }

    /// Remove every entity matching a predicate. Returns the removed ones.
    pub fn remove_where<P>(&self, predicate: P) -> Vec<E>
    where
        P: Fn(&E) -> bool,
    {
        let keys: Vec<String> = self
            .records
            .iter()
            .filter(|r| predicate(r.value()))
            .map(|r| r.key().clone())
            .collect();
        keys.iter().filter_map(|k| self.remove(k)).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hrflow_types::GuardFailure;

    #[derive(Clone, Debug, PartialEq)]
    struct Doc {
        id: String,
        body: String,
        version: u64,
    }

    impl Versioned for Doc {
        fn version(&self) -> u64 {
            self.version
        }

        fn key(&self) -> String {
            self.id.clone()
        }

        fn touch(&mut self, _at: chrono::DateTime<chrono::Utc>) {
            self.version += 1;
        }
    }

    fn doc(id: &str) -> Doc {
        Doc {
            id: id.into(),
            body: "draft".into(),
            version: 1,
        }
    }

    fn bump(d: &Doc, body: &str) -> Doc {
        Doc {
            body: body.into(),
            version: d.version + 1,
            ..d.clone()
        }
    }

    #[test]
    fn test_insert_new_rejects_duplicates() {
        let store = EntityStore::new(EntityType::Ticket);
        assert!(store.insert_new(doc("a")));
        assert!(!store.insert_new(doc("a")));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_insert_with_failing_effects() {
        let store = EntityStore::new(EntityType::Ticket);
        let err = store
            .insert_with(doc("a"), |_| Err(GuardFailure::EmptyComment.into()))
            .unwrap_err();
        assert!(matches!(err, WorkflowError::GuardFailed(_)));
        assert!(!store.contains("a"));

        assert_eq!(store.insert_with(doc("a"), |_| Ok(())), Ok(true));
        assert_eq!(store.insert_with(doc("a"), |_| Ok(())), Ok(false));
    }

    #[test]
    fn test_commit_with_matching_version() {
        let store = EntityStore::new(EntityType::Ticket);
        store.insert_new(doc("a"));
        let next = store.commit("a", 1, |d| Ok(bump(d, "final"))).unwrap();
        assert_eq!(next.version, 2);
        assert_eq!(store.get("a").unwrap().body, "final");
    }

    #[test]
    fn test_commit_with_stale_version() {
        let store = EntityStore::new(EntityType::Ticket);
        store.insert_new(doc("a"));
        store.commit("a", 1, |d| Ok(bump(d, "first"))).unwrap();

        let err = store
            .commit("a", 1, |d| Ok(bump(d, "second")))
            .unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::StaleState {
                expected: 1,
                actual: 2,
                ..
            }
        ));
        assert_eq!(store.get("a").unwrap().body, "first");
    }

    #[test]
    fn test_failed_write_leaves_entry() {
        let store = EntityStore::new(EntityType::Ticket);
        store.insert_new(doc("a"));
        let err = store
            .commit("a", 1, |_| Err(GuardFailure::EmptyComment.into()))
            .unwrap_err();
        assert!(matches!(err, WorkflowError::GuardFailed(_)));
        assert_eq!(store.get("a").unwrap(), doc("a"));
    }

    #[test]
    fn test_missing_entity() {
        let store: EntityStore<Doc> = EntityStore::new(EntityType::Leave);
        assert!(matches!(store.get("x"), Err(WorkflowError::NotFound(_))));
        assert!(matches!(
            store.commit("x", 1, |d| Ok(d.clone())),
            Err(WorkflowError::NotFound(_))
        ));
    }

    #[test]
    fn test_remove_where() {
        let store = EntityStore::new(EntityType::Leave);
        store.insert_new(doc("a"));
        store.insert_new(doc("b"));
        let removed = store.remove_where(|d| d.id == "a");
        assert_eq!(removed.len(), 1);
        assert!(!store.contains("a"));
        assert!(store.contains("b"));
    }
}

use std::sync::{Arc, PoisonError, RwLock};

use crate::batch::HashedBatch;

/// Single slot holding the most recently stored batch since process start.
///
/// Clones share the slot. Concurrent writers race and the last one to take the
/// lock wins; readers only ever see a whole batch. The lock is never held
/// across an await point.
#[derive(Clone, Default)]
pub struct LastBatch {
    slot: Arc<RwLock<Option<Arc<HashedBatch>>>>,
}

impl LastBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&self, batch: HashedBatch) {
        let batch = Arc::new(batch);
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = Some(batch);
    }

    pub fn get(&self) -> Option<Arc<HashedBatch>> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Empty, or the latest batch as the only element.
    pub fn snapshot(&self) -> Vec<HashedBatch> {
        self.get()
            .map(|batch| vec![batch.as_ref().clone()])
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::LastBatch;
    use crate::batch::HashedBatch;

    fn batch(timestamp: f64) -> HashedBatch {
        HashedBatch {
            user_id_hash: "hash".to_string(),
            timestamp,
            items: vec![],
        }
    }

    #[test]
    fn starts_empty() {
        let last = LastBatch::new();
        assert!(last.get().is_none());
        assert!(last.snapshot().is_empty());
    }

    #[test]
    fn keeps_only_the_latest() {
        let last = LastBatch::new();
        for n in 1..=5 {
            last.replace(batch(f64::from(n)));
        }
        assert_eq!(last.snapshot(), vec![batch(5.0)]);
    }

    #[test]
    fn clones_share_the_slot() {
        let last = LastBatch::new();
        let reader = last.clone();
        last.replace(batch(1.0));
        assert_eq!(reader.get().map(|b| b.timestamp), Some(1.0));
    }

    #[test]
    fn concurrent_writers_leave_one_whole_batch() {
        let last = LastBatch::new();
        let handles: Vec<_> = (0..8)
            .map(|n| {
                let last = last.clone();
                std::thread::spawn(move || last.replace(batch(f64::from(n))))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = last.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert!((0.0..8.0).contains(&snapshot[0].timestamp));
    }
}

use std::{collections::BTreeSet, sync::Arc};

use chrono::Utc;
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    config::HISTORY_LIMIT,
    error::{Result, SynopsisError},
    kv::{FAVORITES_KEY, HISTORY_KEY, KeyValueStore},
    types::{HistoryItem, InputKind, Job},
};

/// Persisted list of completed jobs (most recent first) and the set of
/// favorited job ids. Every mutation is written through before returning.
pub struct HistoryStore {
    kv: Arc<dyn KeyValueStore>,
    items: Vec<HistoryItem>,
    favorites: BTreeSet<String>,
    limit: usize,
}

fn load_json<T: DeserializeOwned + Default>(kv: &dyn KeyValueStore, key: &str) -> Result<T> {
    match kv.get(key)? {
        None => Ok(T::default()),
        Some(raw) if raw.trim().is_empty() => Ok(T::default()),
        Some(raw) => serde_json::from_str(&raw).map_err(|e| SynopsisError::Storage {
            key: key.to_string(),
            reason: e.to_string(),
        }),
    }
}

fn save_json<T: Serialize + ?Sized>(kv: &dyn KeyValueStore, key: &str, value: &T) -> Result<()> {
    kv.set(key, &serde_json::to_string(value)?)
}

impl HistoryStore {
    pub fn open(kv: Arc<dyn KeyValueStore>) -> Result<Self> {
        Self::with_limit(kv, HISTORY_LIMIT)
    }

    /// Open with a custom cap. `limit` must be at least 1.
    pub fn with_limit(kv: Arc<dyn KeyValueStore>, limit: usize) -> Result<Self> {
        if limit == 0 {
            return Err(SynopsisError::Storage {
                key: HISTORY_KEY.to_string(),
                reason: "history limit must be at least 1".to_string(),
            });
        }

        let mut items: Vec<HistoryItem> = load_json(kv.as_ref(), HISTORY_KEY)?;
        let favorites: BTreeSet<String> = load_json(kv.as_ref(), FAVORITES_KEY)?;

        items.truncate(limit);
        for item in &mut items {
            item.favorite = favorites.contains(&item.job_id);
        }

        tracing::debug!(items = items.len(), favorites = favorites.len(), "Loaded job history");
        Ok(Self {
            kv,
            items,
            favorites,
            limit,
        })
    }

    /// Prepend a completed job. A job already in history moves to the front.
    pub fn record(&mut self, job: &Job, title: &str, kind: InputKind) -> Result<&HistoryItem> {
        let item = HistoryItem {
            job_id: job.id.clone(),
            timestamp: Utc::now(),
            title: title.to_string(),
            kind,
            favorite: self.favorites.contains(&job.id),
        };

        let mut items = Vec::with_capacity(self.limit);
        items.push(item);
        items.extend(
            self.items
                .iter()
                .filter(|existing| existing.job_id != job.id)
                .cloned(),
        );
        items.truncate(self.limit);

        save_json(self.kv.as_ref(), HISTORY_KEY, &items)?;
        self.items = items;

        tracing::info!(job_id = %job.id, total = self.items.len(), "Recorded job in history");
        Ok(&self.items[0])
    }

    /// Flip favorite membership for `job_id`; returns whether it is now a
    /// favorite.
    pub fn toggle_favorite(&mut self, job_id: &str) -> Result<bool> {
        let mut favorites = self.favorites.clone();
        let now_favorite = if favorites.remove(job_id) {
            false
        } else {
            favorites.insert(job_id.to_string());
            true
        };

        save_json(self.kv.as_ref(), FAVORITES_KEY, &favorites)?;
        self.favorites = favorites;

        if let Some(item) = self.items.iter_mut().find(|i| i.job_id == job_id) {
            item.favorite = now_favorite;
            save_json(self.kv.as_ref(), HISTORY_KEY, &self.items)?;
        }

        Ok(now_favorite)
    }

    pub fn is_favorite(&self, job_id: &str) -> bool {
        self.favorites.contains(job_id)
    }

    pub fn items(&self) -> &[HistoryItem] {
        &self.items
    }

    pub fn favorites(&self) -> impl Iterator<Item = &str> {
        self.favorites.iter().map(String::as_str)
    }

    pub fn get(&self, job_id: &str) -> Option<&HistoryItem> {
        self.items.iter().find(|i| i.job_id == job_id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Forget all jobs. Favorites are kept.
    pub fn clear(&mut self) -> Result<()> {
        self.kv.remove(HISTORY_KEY)?;
        self.items.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryStore;

    fn store() -> (Arc<MemoryStore>, HistoryStore) {
        let kv = Arc::new(MemoryStore::new());
        let history = HistoryStore::open(kv.clone()).unwrap();
        (kv, history)
    }

    #[test]
    fn never_exceeds_limit_and_keeps_newest_first() {
        let (kv, mut history) = store();
        for i in 0..75 {
            history
                .record(&Job::new(format!("job_{i}")), &format!("title {i}"), InputKind::Text)
                .unwrap();
            assert!(history.len() <= HISTORY_LIMIT);
        }

        assert_eq!(history.len(), 50);
        assert_eq!(history.items()[0].job_id, "job_74");
        assert_eq!(history.items()[49].job_id, "job_25");

        let persisted: Vec<HistoryItem> =
            serde_json::from_str(&kv.get(HISTORY_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(persisted.len(), 50);
        assert_eq!(persisted[0].job_id, "job_74");
    }

    #[test]
    fn re_recording_moves_job_to_front() {
        let (_kv, mut history) = store();
        history.record(&Job::new("a"), "A", InputKind::Url).unwrap();
        history.record(&Job::new("b"), "B", InputKind::Url).unwrap();
        history.record(&Job::new("a"), "A again", InputKind::Url).unwrap();

        let ids: Vec<_> = history.items().iter().map(|i| i.job_id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(history.items()[0].title, "A again");
    }

    #[test]
    fn toggle_favorite_flips_membership() {
        let (kv, mut history) = store();
        history.record(&Job::new("job_1"), "One", InputKind::File).unwrap();

        assert!(history.toggle_favorite("job_1").unwrap());
        assert!(history.is_favorite("job_1"));
        assert!(history.get("job_1").unwrap().favorite);

        assert!(!history.toggle_favorite("job_1").unwrap());
        assert!(!history.is_favorite("job_1"));
        assert_eq!(kv.get(FAVORITES_KEY).unwrap().as_deref(), Some("[]"));

        assert!(history.toggle_favorite("job_1").unwrap());
        assert!(history.is_favorite("job_1"));
    }

    #[test]
    fn reopen_restores_items_and_favorites() {
        let (kv, mut history) = store();
        history.record(&Job::new("job_1"), "One", InputKind::Text).unwrap();
        history.toggle_favorite("job_1").unwrap();
        history.toggle_favorite("job_gone").unwrap();

        let reopened = HistoryStore::open(kv).unwrap();
        assert_eq!(reopened.len(), 1);
        assert!(reopened.items()[0].favorite);
        assert_eq!(reopened.favorites().collect::<Vec<_>>(), ["job_1", "job_gone"]);
    }

    #[test]
    fn zero_limit_is_rejected() {
        let kv = Arc::new(MemoryStore::new());
        let err = HistoryStore::with_limit(kv.clone(), 0).err().unwrap();
        assert!(matches!(err, SynopsisError::Storage { ref key, .. } if key == HISTORY_KEY));

        let mut history = HistoryStore::with_limit(kv, 1).unwrap();
        history.record(&Job::new("a"), "A", InputKind::Text).unwrap();
        let latest = history.record(&Job::new("b"), "B", InputKind::Text).unwrap();
        assert_eq!(latest.job_id, "b");
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn clear_forgets_jobs_but_keeps_favorites() {
        let (kv, mut history) = store();
        history.record(&Job::new("job_1"), "One", InputKind::Text).unwrap();
        history.toggle_favorite("job_1").unwrap();

        history.clear().unwrap();
        assert!(history.is_empty());
        assert!(history.is_favorite("job_1"));
        assert_eq!(kv.get(HISTORY_KEY).unwrap(), None);

        let reopened = HistoryStore::open(kv).unwrap();
        assert!(reopened.is_empty());
        assert_eq!(reopened.favorites().collect::<Vec<_>>(), ["job_1"]);
    }

    #[test]
    fn corrupt_history_is_a_storage_error() {
        let kv = Arc::new(MemoryStore::new());
        kv.set(HISTORY_KEY, "[{").unwrap();
        let err = HistoryStore::open(kv).err().unwrap();
        assert!(matches!(err, SynopsisError::Storage { ref key, .. } if key == HISTORY_KEY));
    }
}

pub mod parser;

use crate::config::DataConfig;
use crate::error::{Error, Result};
use crate::models::*;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::sync::Arc;
use tracing::{info, warn};

/// Read-only ratings corpus with a sparse user -> item index.
#[derive(Debug)]
pub struct RatingsStore {
    records: Vec<RatingRecord>,
    user_ratings: HashMap<UserId, RatingVector>,
    item_raters: HashMap<ItemId, Vec<UserId>>,
    user_ids: Vec<UserId>,
    user_activity: Vec<(UserId, usize)>,
    item_popularity: Vec<(ItemId, usize)>,
    titles: HashMap<ItemId, String>,
    empty: RatingVector,
}

impl RatingsStore {
    pub fn load(config: &DataConfig) -> Result<Self> {
        let ratings_path = &config.ratings_path;
        let file = File::open(ratings_path).map_err(|source| Error::RatingsSource {
            path: ratings_path.clone(),
            source,
        })?;
        let records = parser::parse_ratings(file)?;

        let titles_path = config.titles_path();
        let titles = match File::open(&titles_path)
            .map_err(Error::from)
            .and_then(parser::parse_titles)
        {
            Ok(titles) => {
                info!("Loaded {} item titles from {}", titles.len(), titles_path.display());
                titles
            }
            Err(e) => {
                warn!(
                    "Failed to load item titles from {}: {}; using placeholders",
                    titles_path.display(),
                    e
                );
                HashMap::new()
            }
        };

        let store = Self::from_records(records, titles)?;
        match store.time_span() {
            Some((first, last)) => info!(
                "Loaded {} ratings from {} users on {} items ({} to {})",
                store.len(),
                store.user_count(),
                store.item_count(),
                first.date_naive(),
                last.date_naive()
            ),
            None => info!(
                "Loaded {} ratings from {} users on {} items",
                store.len(),
                store.user_count(),
                store.item_count()
            ),
        }
        Ok(store)
    }

    pub fn from_records(
        records: Vec<RatingRecord>,
        titles: HashMap<ItemId, String>,
    ) -> Result<Self> {
        if records.is_empty() {
            return Err(Error::EmptyCorpus);
        }

        let mut user_ratings: HashMap<UserId, RatingVector> = HashMap::new();
        let mut item_raters: HashMap<ItemId, Vec<UserId>> = HashMap::new();
        let mut user_counts: HashMap<UserId, usize> = HashMap::new();
        let mut seen: HashSet<(UserId, ItemId)> = HashSet::with_capacity(records.len());

        for (index, record) in records.iter().enumerate() {
            if !seen.insert((record.user_id, record.item_id)) {
                return Err(Error::DuplicateRating {
                    record: index + 1,
                    user_id: record.user_id,
                    item_id: record.item_id,
                });
            }

            *user_counts.entry(record.user_id).or_default() += 1;
            item_raters.entry(record.item_id).or_default().push(record.user_id);

            // Zero is the unrated sentinel and never enters a vector.
            if record.rating > 0.0 {
                user_ratings
                    .entry(record.user_id)
                    .or_default()
                    .insert(record.item_id, record.rating);
            }
        }

        let mut user_ids: Vec<UserId> = user_counts.keys().copied().collect();
        user_ids.sort_unstable();

        let user_activity = rank_by_count(user_counts);
        let item_popularity = rank_by_count(
            item_raters
                .iter()
                .map(|(&item_id, raters)| (item_id, raters.len()))
                .collect(),
        );

        Ok(Self {
            records,
            user_ratings,
            item_raters,
            user_ids,
            user_activity,
            item_popularity,
            titles,
            empty: RatingVector::new(),
        })
    }

    pub fn user_ratings(&self, user_id: UserId) -> &RatingVector {
        self.user_ratings.get(&user_id).unwrap_or(&self.empty)
    }

    // Includes zero-valued records.
    pub fn item_raters(&self, item_id: ItemId) -> &[UserId] {
        self.item_raters.get(&item_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn user_ids(&self) -> &[UserId] {
        &self.user_ids
    }

    pub fn item_title(&self, item_id: ItemId) -> String {
        match self.titles.get(&item_id) {
            Some(title) => title.clone(),
            None => format!("Item {}", item_id),
        }
    }

    pub fn most_rated_items(&self, n: usize) -> Vec<(ItemId, usize)> {
        self.item_popularity.iter().take(n).copied().collect()
    }

    pub fn most_active_users(&self, n: usize) -> Vec<UserId> {
        self.user_activity.iter().take(n).map(|&(user_id, _)| user_id).collect()
    }

    pub fn records(&self) -> &[RatingRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn user_count(&self) -> usize {
        self.user_ids.len()
    }

    pub fn item_count(&self) -> usize {
        self.item_raters.len()
    }

    pub fn title_count(&self) -> usize {
        self.titles.len()
    }

    pub fn time_span(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let first = self.records.iter().filter_map(RatingRecord::rated_at).min()?;
        let last = self.records.iter().filter_map(RatingRecord::rated_at).max()?;
        Some((first, last))
    }
}

// Highest count first, ties by ascending id.
fn rank_by_count(counts: HashMap<u32, usize>) -> Vec<(u32, usize)> {
    let mut ranked: Vec<(u32, usize)> = counts.into_iter().collect();
    ranked.sort_unstable_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked
}

/// Gate in front of the store: closed until the corpus has been loaded once.
pub struct RatingsStoreHandle {
    data: DataConfig,
    store: RwLock<Option<Arc<RatingsStore>>>,
}

impl RatingsStoreHandle {
    pub fn new(data: DataConfig) -> Self {
        Self {
            data,
            store: RwLock::new(None),
        }
    }

    pub fn ready(store: Arc<RatingsStore>, data: DataConfig) -> Self {
        Self {
            data,
            store: RwLock::new(Some(store)),
        }
    }

    pub async fn load(&self) -> Result<Arc<RatingsStore>> {
        let existing = self.store.read().clone();
        if let Some(store) = existing {
            return Ok(store);
        }

        let data = self.data.clone();
        let store = tokio::task::spawn_blocking(move || RatingsStore::load(&data))
            .await
            .map_err(|e| Error::Worker(e.to_string()))??;
        let store = Arc::new(store);

        *self.store.write() = Some(store.clone());
        info!("Ratings store ready");
        Ok(store)
    }

    pub fn is_ready(&self) -> bool {
        self.store.read().is_some()
    }

    pub fn get(&self) -> Result<Arc<RatingsStore>> {
        self.store.read().clone().ok_or(Error::NotReady)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_store() -> RatingsStore {
        let records = vec![
            RatingRecord::new(1, 10, 5.0, 100),
            RatingRecord::new(1, 20, 4.0, 200),
            RatingRecord::new(1, 30, 0.0, 300),
            RatingRecord::new(2, 10, 3.0, 150),
            RatingRecord::new(3, 10, 4.0, 120),
            RatingRecord::new(3, 20, 2.0, 130),
            RatingRecord::new(4, 30, 0.0, 140),
        ];
        let titles = HashMap::from([(10, "Heat (1995)".to_string())]);
        RatingsStore::from_records(records, titles).unwrap()
    }

    #[test]
    fn test_user_ratings_exclude_zero() {
        let store = sample_store();
        let ratings = store.user_ratings(1);
        assert_eq!(ratings.len(), 2);
        assert!(!ratings.contains_key(&30));
        assert!(store.user_ratings(4).is_empty());
        assert!(store.user_ratings(99).is_empty());
    }

    #[test]
    fn test_all_users_listed() {
        let store = sample_store();
        assert_eq!(store.user_ids(), &[1, 2, 3, 4]);
        assert_eq!(store.item_raters(30), &[1, 4]);
        assert!(store.item_raters(99).is_empty());
    }

    #[test]
    fn test_titles_and_placeholder() {
        let store = sample_store();
        assert_eq!(store.item_title(10), "Heat (1995)");
        assert_eq!(store.item_title(20), "Item 20");
        assert_eq!(store.item_title(20), store.item_title(20));
    }

    #[test]
    fn test_popularity_rankings() {
        let store = sample_store();
        assert_eq!(store.most_rated_items(2), vec![(10, 3), (20, 2)]);
        assert_eq!(store.most_active_users(2), vec![1, 3]);
        // 2 and 4 tie with one record each and break by id.
        assert_eq!(store.most_active_users(10), vec![1, 3, 2, 4]);
    }

    #[test]
    fn test_duplicate_rating_is_fatal() {
        let records = vec![
            RatingRecord::new(1, 10, 5.0, 100),
            RatingRecord::new(1, 10, 4.0, 200),
        ];
        assert!(matches!(
            RatingsStore::from_records(records, HashMap::new()),
            Err(Error::DuplicateRating { record: 2, user_id: 1, item_id: 10 })
        ));
    }

    #[test]
    fn test_empty_corpus_is_fatal() {
        assert!(matches!(
            RatingsStore::from_records(Vec::new(), HashMap::new()),
            Err(Error::EmptyCorpus)
        ));
    }

    #[test]
    fn test_handle_gate() {
        let handle = RatingsStoreHandle::new(DataConfig::new("missing/u.data"));
        assert!(!handle.is_ready());
        assert!(matches!(handle.get(), Err(Error::NotReady)));

        let handle = RatingsStoreHandle::ready(Arc::new(sample_store()), DataConfig::new("u.data"));
        assert!(handle.is_ready());
        assert_eq!(handle.get().unwrap().len(), 7);
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type UserId = u32;
pub type ItemId = u32;

/// Sparse item -> rating mapping. Unrated items are absent, never stored as zero.
pub type RatingVector = HashMap<ItemId, f32>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingRecord {
    pub user_id: UserId,
    pub item_id: ItemId,
    pub rating: f32,
    pub timestamp: i64,
}

impl RatingRecord {
    pub fn new(user_id: UserId, item_id: ItemId, rating: f32, timestamp: i64) -> Self {
        Self {
            user_id,
            item_id,
            rating,
            timestamp,
        }
    }

    pub fn rated_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp, 0)
    }
}

/// Ratings of a synthetic user that only lives for one recommendation call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VirtualUserRatings(RatingVector);

impl VirtualUserRatings {
    pub fn new(ratings: RatingVector) -> Self {
        Self(ratings)
    }

    pub fn ratings(&self) -> &RatingVector {
        &self.0
    }

    pub fn contains(&self, item_id: ItemId) -> bool {
        self.0.contains_key(&item_id)
    }

    pub fn items(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.0.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<RatingVector> for VirtualUserRatings {
    fn from(ratings: RatingVector) -> Self {
        Self(ratings)
    }
}

impl FromIterator<(ItemId, f32)> for VirtualUserRatings {
    fn from_iter<T: IntoIterator<Item = (ItemId, f32)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub user_id: UserId,
    pub similarity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub item_id: ItemId,
    pub predicted_rating: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecommendationOutcome {
    pub recommendations: Vec<Recommendation>,
    pub candidate_count: usize,
    pub neighbor_count: usize,
    pub scored_item_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationRequest {
    pub ratings: VirtualUserRatings,
    #[serde(default)]
    pub num_recommendations: Option<usize>,
}

impl RecommendationRequest {
    pub fn new(ratings: VirtualUserRatings) -> Self {
        Self {
            ratings,
            num_recommendations: None,
        }
    }

    pub fn with_limit(mut self, num_recommendations: usize) -> Self {
        self.num_recommendations = Some(num_recommendations);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingRequest {
    pub prompt: RankingPrompt,
    // Prompt positions, favourite first: "3, 1, 5, 2, 4"
    pub ranking: String,
    #[serde(default)]
    pub num_recommendations: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub recommendations: Vec<RecommendationItem>,
    pub candidate_count: usize,
    pub neighbor_count: usize,
    pub generated_at: DateTime<Utc>,
}

impl RecommendationResponse {
    pub fn is_empty(&self) -> bool {
        self.recommendations.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationItem {
    pub item_id: ItemId,
    pub title: String,
    pub predicted_rating: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptItem {
    pub position: usize,
    pub item_id: ItemId,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingPrompt {
    pub items: Vec<PromptItem>,
}

impl RankingPrompt {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemPopularity {
    pub item_id: ItemId,
    pub title: String,
    pub rating_count: usize,
}

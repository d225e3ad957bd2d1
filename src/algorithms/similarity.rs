use crate::models::{ItemId, RatingVector};

pub trait SimilarityMeasure: Send + Sync {
    fn similarity(&self, a: &RatingVector, b: &RatingVector) -> f32;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CosineSimilarity;

impl SimilarityMeasure for CosineSimilarity {
    fn similarity(&self, a: &RatingVector, b: &RatingVector) -> f32 {
        cosine_similarity(a, b)
    }
}

/// Cosine similarity over the items both vectors rated.
///
/// Items rated by only one side contribute nothing. Returns 0.0 when there is
/// no overlap or when either restricted norm is zero.
pub fn cosine_similarity(a: &RatingVector, b: &RatingVector) -> f32 {
    let (small, large, swapped) = if a.len() <= b.len() { (a, b, false) } else { (b, a, true) };

    let mut common: Vec<(ItemId, f64, f64)> = small
        .iter()
        .filter_map(|(&item_id, &x)| {
            large.get(&item_id).map(|&y| {
                if swapped {
                    (item_id, y as f64, x as f64)
                } else {
                    (item_id, x as f64, y as f64)
                }
            })
        })
        .collect();

    if common.is_empty() {
        return 0.0;
    }

    // Fixed summation order keeps the result bit-identical for (a, b) and (b, a).
    common.sort_unstable_by_key(|&(item_id, _, _)| item_id);

    let mut dot_product = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for &(_, x, y) in &common {
        dot_product += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let norm_a = norm_a.sqrt();
    let norm_b = norm_b.sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        ((dot_product / (norm_a * norm_b)) as f32).clamp(-1.0, 1.0)
    }
}

pub fn shared_item_count(a: &RatingVector, b: &RatingVector) -> usize {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    small.keys().filter(|item_id| large.contains_key(item_id)).count()
}

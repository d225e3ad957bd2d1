use collabrec::algorithms::{cosine_similarity, RecommendationEngine};
use collabrec::config::RecommendationConfig;
use collabrec::services::ratings_store::RatingsStore;
use collabrec::*;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Roughly MovieLens-100k shaped: 943 users, 1682 items, popularity skewed to low ids.
fn synthetic_store(users: u32, items: u32, per_user: usize) -> Arc<RatingsStore> {
    let mut rng = StdRng::seed_from_u64(17);
    let mut records = Vec::new();

    for user_id in 1..=users {
        let mut rated = HashSet::new();
        while rated.len() < per_user {
            let item_id = (rng.gen::<f32>().powi(3) * items as f32) as ItemId + 1;
            if rated.insert(item_id) {
                records.push(RatingRecord::new(
                    user_id,
                    item_id,
                    rng.gen_range(1..=5) as f32,
                    880_000_000,
                ));
            }
        }
    }

    Arc::new(RatingsStore::from_records(records, HashMap::new()).expect("synthetic corpus"))
}

fn benchmark_similarity(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(5);
    let mut vector = || -> RatingVector {
        (0..200)
            .map(|_| (rng.gen_range(1..1000), rng.gen_range(1..=5) as f32))
            .collect()
    };
    let a = vector();
    let b = vector();

    c.bench_function("cosine_similarity_sparse_200", |bench| {
        bench.iter(|| black_box(cosine_similarity(&a, &b)));
    });
}

fn benchmark_recommendations(c: &mut Criterion) {
    let store = synthetic_store(943, 1682, 100);
    let engine = RecommendationEngine::new(store.clone(), RecommendationConfig::default());

    let ratings: VirtualUserRatings = store
        .most_rated_items(5)
        .into_iter()
        .enumerate()
        .map(|(position, (item_id, _))| (item_id, 5.0 - 0.5 * position as f32))
        .collect();

    c.bench_function("generate_recommendations_popular_seed", |bench| {
        bench.iter(|| black_box(engine.generate_recommendations(&ratings, 5)));
    });

    let niche: VirtualUserRatings = [(1_681, 5.0), (1_682, 4.5), (1_680, 4.0)]
        .into_iter()
        .collect();
    c.bench_function("generate_recommendations_fallback_pool", |bench| {
        bench.iter(|| black_box(engine.generate_recommendations(&niche, 5)));
    });
}

fn benchmark_store(c: &mut Criterion) {
    c.bench_function("index_corpus_20k", |bench| {
        bench.iter(|| black_box(synthetic_store(400, 1000, 50)));
    });
}

criterion_group!(benches, benchmark_similarity, benchmark_recommendations, benchmark_store);
criterion_main!(benches);

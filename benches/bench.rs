// Criterion benchmarks for Lume Swipe

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lume_swipe::core::{is_browsable, CandidateFeed};
use lume_swipe::models::{Profile, SwipeMap};
use lume_swipe::services::{
    AgeBounds, Document, DocumentStore, DocumentSwipeStore, InMemoryDocumentStore, ProfileRepository,
};
use serde_json::json;
use std::sync::Arc;

fn create_record(id: usize) -> Document {
    json!({
        "fullname": format!("User {}", id),
        "age": 18 + (id % 40) as u8,
        "bio": "Climbing, coffee and long walks",
        "profession": "Engineer",
        "minSeekingAge": 20,
        "maxSeekingAge": 35,
        "photoUrls": [
            format!("https://blobs.test/{}/1.jpeg", id),
            format!("https://blobs.test/{}/2.jpeg", id)
        ],
        "photoKeys": [format!("{}-1", id), format!("{}-2", id)],
        "createdAt": "2024-05-20T10:00:00Z"
    })
    .as_object()
    .cloned()
    .unwrap_or_default()
}

fn create_actor() -> Profile {
    let mut actor = Profile::with_defaults("actor");
    actor.age = 28;
    actor.min_seeking_age = 21;
    actor.max_seeking_age = 35;
    actor
}

fn bench_decode(c: &mut Criterion) {
    let record = create_record(7);
    c.bench_function("profile_decode", |b| {
        b.iter(|| Profile::decode(black_box("u7"), black_box(record.clone())))
    });
}

fn bench_filtering(c: &mut Criterion) {
    let actor = create_actor();
    let mut group = c.benchmark_group("filtering");

    for candidate_count in [100, 1000].iter() {
        let candidates: Vec<Profile> = (0..*candidate_count)
            .filter_map(|i| Profile::decode(&format!("c{}", i), create_record(i)).ok())
            .collect();
        // Every third candidate already swiped
        let swiped: SwipeMap = (0..*candidate_count)
            .step_by(3)
            .map(|i| (format!("c{}", i), i % 2 == 0))
            .collect();

        group.bench_with_input(
            BenchmarkId::new("is_browsable", candidate_count),
            candidate_count,
            |b, _| {
                b.iter(|| {
                    candidates
                        .iter()
                        .filter(|p| is_browsable(p, black_box(&actor), black_box(&swiped)))
                        .count()
                });
            },
        );
    }

    group.finish();
}

fn bench_candidate_batch(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = Arc::new(InMemoryDocumentStore::new());
    rt.block_on(async {
        for i in 0..500 {
            store.patch("profiles", &format!("c{:03}", i), create_record(i)).await.unwrap();
        }
    });

    let profiles = Arc::new(ProfileRepository::new(store.clone(), "profiles", AgeBounds::default()));
    let swipes = Arc::new(DocumentSwipeStore::new(store, "swipes"));
    let feed = CandidateFeed::new(profiles, swipes, 20);
    let actor = create_actor();

    c.bench_function("candidate_batch_500_profiles", |b| {
        b.iter(|| {
            rt.block_on(async {
                let batch: Vec<Profile> = feed.next_batch(black_box(&actor)).await.unwrap().collect();
                black_box(batch)
            })
        });
    });
}

criterion_group!(benches, bench_decode, bench_filtering, bench_candidate_batch);

criterion_main!(benches);

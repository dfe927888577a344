use std::collections::HashSet;

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use uuid::Uuid;

use ekami_core::build_comment_tree;
use ekami_domain::{AuthorRef, Comment};

/// Roots with one reply each and a second-level reply on every other root.
fn thread(roots: usize) -> Vec<Comment> {
    let post_id = Uuid::new_v4();
    let start = Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap();
    let author = AuthorRef {
        user_id: "bench".into(),
        display_name: "Bench".into(),
    };
    let mut comments = Vec::with_capacity(roots * 3);
    for idx in 0..roots {
        let at = start + Duration::seconds(idx as i64 * 3);
        let mut root = Comment::new(post_id, author.clone(), "root", None, at);
        root.is_pinned = idx % 25 == 0;
        let reply = Comment::new(
            post_id,
            author.clone(),
            "reply",
            Some(root.id),
            at + Duration::seconds(1),
        );
        if idx % 2 == 0 {
            comments.push(Comment::new(
                post_id,
                author.clone(),
                "nested",
                Some(reply.id),
                at + Duration::seconds(2),
            ));
        }
        comments.push(root);
        comments.push(reply);
    }
    comments
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_comment_tree");
    for roots in [10usize, 100, 1_000] {
        let comments = thread(roots);
        let liked: HashSet<Uuid> = comments.iter().step_by(7).map(|c| c.id).collect();
        group.bench_with_input(BenchmarkId::from_parameter(roots), &comments, |b, comments| {
            b.iter(|| build_comment_tree(black_box(comments), black_box(&liked)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_build);
criterion_main!(benches);

mod support;

use std::collections::HashSet;
use std::time::Duration;

use metrics_util::debugging::DebuggingRecorder;
use tokio::time::timeout;

use stormo::application::pagination::PageRequest;

use support::{publish_post, test_app};

#[tokio::test]
async fn service_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let app = test_app();
    app.store.seed_account(1, "gazza", 0).await;
    app.store.seed_account(2, "merlo", 0).await;
    app.store.seed_account(3, "stella", 5_000).await;
    app.store.seed_account(4, "solitario", 0).await;

    // Follow graph changes
    app.social.follow(2, 1).await.expect("follow");
    app.social.follow(2, 3).await.expect("follow celebrity");

    // One live connection plus one dead one to force a prune
    let (_live_handle, mut frames) = app.live.subscribe(2);
    let (_dead_handle, dead_frames) = app.live.subscribe(2);
    drop(dead_frames);

    // Push fan-out, pull fan-out, realtime delivery
    let post_id = publish_post(&app, 1, "post regolare").await;
    publish_post(&app, 3, "post dal palco").await;
    timeout(Duration::from_secs(2), frames.recv())
        .await
        .expect("frame before deadline")
        .expect("subscription open");

    // Warm viewer hits the cache; the lonely viewer misses and rebuilds
    app.timeline
        .home(2, PageRequest::from_wire(Some(10), None))
        .await
        .expect("warm home page");
    app.timeline
        .home(4, PageRequest::from_wire(Some(10), None))
        .await
        .expect("cold home page");
    app.timeline
        .author(2, 1, PageRequest::from_wire(Some(10), None))
        .await
        .expect("author page");

    // Engagement and deletion
    app.social.like(2, post_id).await.expect("like");
    app.publish.delete(1, post_id).await.expect("delete");

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "stormo_posts_published_total",
        "stormo_posts_deleted_total",
        "stormo_fanout_push_total",
        "stormo_fanout_pull_total",
        "stormo_fanout_recipients",
        "stormo_retract_total",
        "stormo_follows_total",
        "stormo_engagement_total",
        "stormo_timeline_cache_hit_total",
        "stormo_timeline_cache_miss_total",
        "stormo_timeline_rebuild_total",
        "stormo_timeline_assemble_ms",
        "stormo_realtime_events_total",
        "stormo_realtime_delivered_total",
        "stormo_realtime_pruned_total",
        "stormo_live_connections",
        "stormo_live_users",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}

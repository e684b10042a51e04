mod support;

use axum::http::StatusCode;

use stormo::application::pagination::PageRequest;
use stormo::domain::posts::NewPost;
use stormo::domain::types::PostId;

use support::{TestApp, publish_post, test_app};

async fn seed_follow_pair(app: &TestApp) {
    app.store.seed_account(1, "gazza", 0).await;
    app.store.seed_account(2, "merlo", 0).await;
    app.social.follow(2, 1).await.expect("follow");
}

fn item_ids(items: &[stormo_api_types::PostView]) -> Vec<PostId> {
    items.iter().map(|item| item.id).collect()
}

#[tokio::test]
async fn pages_cover_all_posts_without_overlap() {
    let app = test_app();
    seed_follow_pair(&app).await;
    for n in 1..=25 {
        publish_post(&app, 1, &format!("post {n}")).await;
    }

    let first = app
        .timeline
        .home(2, PageRequest::from_wire(Some(10), None))
        .await
        .expect("first page");
    assert_eq!(item_ids(&first.items), (16..=25).rev().collect::<Vec<_>>());
    assert!(first.has_more);
    assert_eq!(first.next_cursor.as_deref(), Some("16"));

    let second = app
        .timeline
        .home(2, PageRequest::from_wire(Some(10), first.next_cursor.as_deref()))
        .await
        .expect("second page");
    assert_eq!(item_ids(&second.items), (6..=15).rev().collect::<Vec<_>>());
    assert!(second.has_more);
    assert_eq!(second.next_cursor.as_deref(), Some("6"));

    let third = app
        .timeline
        .home(2, PageRequest::from_wire(Some(10), second.next_cursor.as_deref()))
        .await
        .expect("third page");
    assert_eq!(item_ids(&third.items), (1..=5).rev().collect::<Vec<_>>());
    assert!(!third.has_more);
    assert_eq!(third.next_cursor, None);
}

#[tokio::test]
async fn cold_rebuild_serves_the_same_first_page_as_the_warm_cache() {
    let app = test_app();
    seed_follow_pair(&app).await;
    for n in 1..=25 {
        publish_post(&app, 1, &format!("post {n}")).await;
    }

    let warm = app
        .timeline
        .home(2, PageRequest::from_wire(Some(10), None))
        .await
        .expect("warm page");

    app.cache.invalidate_home(2);
    let cold = app
        .timeline
        .home(2, PageRequest::from_wire(Some(10), None))
        .await
        .expect("cold page");

    assert_eq!(item_ids(&cold.items), item_ids(&warm.items));
    assert!(cold.has_more);
    // The rebuild also warmed the cache back up.
    assert!(app.cache.home_len(2) > 0);
}

#[tokio::test]
async fn malformed_cursors_restart_from_the_newest_post() {
    let app = test_app();
    seed_follow_pair(&app).await;
    for n in 1..=5 {
        publish_post(&app, 1, &format!("post {n}")).await;
    }

    let fresh = app
        .timeline
        .home(2, PageRequest::from_wire(Some(3), None))
        .await
        .expect("cursorless page");
    let garbled = app
        .timeline
        .home(2, PageRequest::from_wire(Some(3), Some("abc")))
        .await
        .expect("garbled cursor page");

    assert_eq!(item_ids(&garbled.items), item_ids(&fresh.items));
    assert_eq!(garbled.next_cursor, fresh.next_cursor);
}

#[tokio::test]
async fn vanished_rows_are_skipped_during_enrichment() {
    let app = test_app();
    seed_follow_pair(&app).await;
    let first = publish_post(&app, 1, "resta").await;
    let middle = publish_post(&app, 1, "svanisce").await;
    let last = publish_post(&app, 1, "resta anche").await;

    // The row disappears but the cached id stays behind.
    app.store.drop_post_row(middle).await;

    let page = app
        .timeline
        .home(2, PageRequest::from_wire(Some(10), None))
        .await
        .expect("home page");
    assert_eq!(item_ids(&page.items), vec![last, first]);
    assert!(!page.has_more);
}

#[tokio::test]
async fn broadcast_posts_merge_into_home_pages() {
    let app = test_app();
    app.store.seed_account(1, "stella", 5_000).await;
    app.store.seed_account(2, "merlo", 0).await;
    app.store.seed_account(3, "gazza", 0).await;
    app.social.follow(2, 1).await.expect("follow celebrity");
    app.social.follow(2, 3).await.expect("follow regular");

    let broadcast = publish_post(&app, 1, "dal palco").await;
    let pushed = publish_post(&app, 3, "dal vicinato").await;

    let page = app
        .timeline
        .home(2, PageRequest::from_wire(Some(10), None))
        .await
        .expect("home page");
    assert_eq!(item_ids(&page.items), vec![pushed, broadcast]);
}

#[tokio::test]
async fn following_someone_surfaces_their_existing_posts() {
    let app = test_app();
    app.store.seed_account(2, "merlo", 0).await;
    app.store.seed_account(3, "gazza", 0).await;
    let old_post = publish_post(&app, 3, "scritto prima del follow").await;

    let before = app
        .timeline
        .home(2, PageRequest::from_wire(Some(10), None))
        .await
        .expect("page before follow");
    assert!(before.items.is_empty());

    // The follow invalidates the viewer's home entry; the next read
    // rebuilds against the new graph and finds the old post.
    app.social.follow(2, 3).await.expect("follow");
    let after = app
        .timeline
        .home(2, PageRequest::from_wire(Some(10), None))
        .await
        .expect("page after follow");
    assert_eq!(item_ids(&after.items), vec![old_post]);
}

#[tokio::test]
async fn engagement_flags_reflect_the_viewer() {
    let app = test_app();
    seed_follow_pair(&app).await;
    let liked = publish_post(&app, 1, "piaciuto").await;
    let reposted = publish_post(&app, 1, "rilanciato").await;
    app.social.like(2, liked).await.expect("like");
    app.social.repost(2, reposted).await.expect("repost");

    let page = app
        .timeline
        .home(2, PageRequest::from_wire(Some(10), None))
        .await
        .expect("home page");

    let liked_view = page
        .items
        .iter()
        .find(|item| item.id == liked)
        .expect("liked post present");
    assert!(liked_view.liked);
    assert!(!liked_view.reposted);

    let reposted_view = page
        .items
        .iter()
        .find(|item| item.id == reposted)
        .expect("reposted post present");
    assert!(reposted_view.reposted);
    assert!(!reposted_view.liked);
}

#[tokio::test]
async fn author_timeline_skips_replies_and_pages_by_cursor() {
    let app = test_app();
    seed_follow_pair(&app).await;
    let first = publish_post(&app, 1, "primo").await;
    let second = publish_post(&app, 1, "secondo").await;
    app.publish
        .publish(NewPost {
            author_id: 1,
            body: "risposta al primo".to_string(),
            reply_to_id: Some(first),
            quote_of_id: None,
        })
        .await
        .expect("reply");
    let third = publish_post(&app, 1, "terzo").await;

    let page = app
        .timeline
        .author(2, 1, PageRequest::from_wire(Some(2), None))
        .await
        .expect("author page");
    assert_eq!(item_ids(&page.items), vec![third, second]);
    assert!(page.has_more);

    let rest = app
        .timeline
        .author(2, 1, PageRequest::from_wire(Some(2), page.next_cursor.as_deref()))
        .await
        .expect("author page two");
    assert_eq!(item_ids(&rest.items), vec![first]);
    assert!(!rest.has_more);
    // The reply never shows, but it is counted on its parent.
    assert_eq!(rest.items[0].replies_count, 1);
}

#[tokio::test]
async fn unknown_author_timelines_are_not_found() {
    let app = test_app();
    app.store.seed_account(2, "merlo", 0).await;

    let err = app
        .timeline
        .author(2, 999, PageRequest::from_wire(None, None))
        .await
        .expect_err("missing author rejected");
    assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
}

//! In-memory repository fakes and service wiring shared by the
//! integration tests. `MemoryStore` mirrors the Postgres adapter's
//! observable behavior (id assignment, denormalized counts, duplicate
//! and not-found errors) without a database.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;

use stormo::application::fanout::FanoutEngine;
use stormo::application::publish::PublishService;
use stormo::application::repos::{
    AccountsRepo, EngagementRepo, PostsRepo, PostsWriteRepo, RepoError, SocialGraphRepo,
};
use stormo::application::social::SocialService;
use stormo::application::timeline::TimelineAssembler;
use stormo::cache::{CacheConfig, TimelineCache};
use stormo::domain::entities::{AccountRecord, EngagementFlags, PostRecord};
use stormo::domain::posts::NewPost;
use stormo::domain::types::{AccountId, PostId};
use stormo::realtime::{EventBus, LiveRegistry, RelayHandle, RelayWorker};
use stormo_api_types::AccountView;

#[derive(Default)]
pub struct MemoryStore {
    next_post_id: AtomicI64,
    accounts: Mutex<HashMap<AccountId, AccountRecord>>,
    posts: Mutex<BTreeMap<PostId, PostRecord>>,
    follows: Mutex<HashSet<(AccountId, AccountId)>>,
    likes: Mutex<HashSet<(AccountId, PostId)>>,
    reposts: Mutex<HashSet<(AccountId, PostId)>>,
}

impl MemoryStore {
    /// Insert an account with an explicit follower count. The count is
    /// what strategy resolution reads, so tests can make an account a
    /// celebrity without materializing thousands of follow edges.
    pub async fn seed_account(
        &self,
        id: AccountId,
        handle: &str,
        followers_count: i64,
    ) -> AccountRecord {
        let record = AccountRecord {
            id,
            handle: handle.to_string(),
            display_name: handle.to_string(),
            bio: None,
            avatar_url: None,
            followers_count,
            following_count: 0,
            posts_count: 0,
            created_at: OffsetDateTime::now_utc(),
        };
        self.accounts.lock().await.insert(id, record.clone());
        record
    }

    pub async fn account(&self, id: AccountId) -> AccountRecord {
        self.accounts
            .lock()
            .await
            .get(&id)
            .cloned()
            .expect("account should have been seeded")
    }

    /// Remove a post row without touching counts, edges, or caches, as
    /// if the row vanished after its id was already fanned out.
    pub async fn drop_post_row(&self, id: PostId) {
        self.posts.lock().await.remove(&id);
    }
}

#[async_trait]
impl SocialGraphRepo for MemoryStore {
    async fn follower_ids(&self, account: AccountId) -> Result<Vec<AccountId>, RepoError> {
        let follows = self.follows.lock().await;
        Ok(follows
            .iter()
            .filter(|(_, followee)| *followee == account)
            .map(|(follower, _)| *follower)
            .collect())
    }

    async fn following_regular_ids(
        &self,
        account: AccountId,
        threshold: i64,
    ) -> Result<Vec<AccountId>, RepoError> {
        let follows = self.follows.lock().await;
        let accounts = self.accounts.lock().await;
        Ok(follows
            .iter()
            .filter(|(follower, followee)| {
                *follower == account
                    && accounts
                        .get(followee)
                        .is_some_and(|followed| followed.followers_count < threshold)
            })
            .map(|(_, followee)| *followee)
            .collect())
    }

    async fn following_high_fanout_ids(
        &self,
        account: AccountId,
        threshold: i64,
    ) -> Result<Vec<AccountId>, RepoError> {
        let follows = self.follows.lock().await;
        let accounts = self.accounts.lock().await;
        Ok(follows
            .iter()
            .filter(|(follower, followee)| {
                *follower == account
                    && accounts
                        .get(followee)
                        .is_some_and(|followed| followed.followers_count >= threshold)
            })
            .map(|(_, followee)| *followee)
            .collect())
    }

    async fn follow(&self, follower: AccountId, followee: AccountId) -> Result<(), RepoError> {
        if !self.follows.lock().await.insert((follower, followee)) {
            return Err(RepoError::Duplicate {
                constraint: "follows_pkey".to_string(),
            });
        }
        let mut accounts = self.accounts.lock().await;
        if let Some(account) = accounts.get_mut(&follower) {
            account.following_count += 1;
        }
        if let Some(account) = accounts.get_mut(&followee) {
            account.followers_count += 1;
        }
        Ok(())
    }

    async fn unfollow(&self, follower: AccountId, followee: AccountId) -> Result<(), RepoError> {
        if !self.follows.lock().await.remove(&(follower, followee)) {
            return Err(RepoError::NotFound);
        }
        let mut accounts = self.accounts.lock().await;
        if let Some(account) = accounts.get_mut(&follower) {
            account.following_count = (account.following_count - 1).max(0);
        }
        if let Some(account) = accounts.get_mut(&followee) {
            account.followers_count = (account.followers_count - 1).max(0);
        }
        Ok(())
    }
}

#[async_trait]
impl PostsRepo for MemoryStore {
    async fn find_post(&self, id: PostId) -> Result<Option<PostRecord>, RepoError> {
        Ok(self.posts.lock().await.get(&id).cloned())
    }

    async fn posts_by_author(
        &self,
        author: AccountId,
        before: Option<PostId>,
        limit: u32,
        exclude_replies: bool,
    ) -> Result<Vec<PostRecord>, RepoError> {
        let posts = self.posts.lock().await;
        Ok(posts
            .values()
            .rev()
            .filter(|post| post.author_id == author)
            .filter(|post| !exclude_replies || post.is_top_level())
            .filter(|post| before.is_none_or(|boundary| post.id < boundary))
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn recent_posts_by_authors(
        &self,
        authors: &[AccountId],
        limit: u32,
    ) -> Result<Vec<PostRecord>, RepoError> {
        let posts = self.posts.lock().await;
        Ok(posts
            .values()
            .rev()
            .filter(|post| post.is_top_level() && authors.contains(&post.author_id))
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn posts_by_ids(&self, ids: &[PostId]) -> Result<Vec<PostRecord>, RepoError> {
        let posts = self.posts.lock().await;
        Ok(ids.iter().filter_map(|id| posts.get(id).cloned()).collect())
    }
}

#[async_trait]
impl PostsWriteRepo for MemoryStore {
    async fn create_post(&self, post: NewPost) -> Result<PostRecord, RepoError> {
        let id = self.next_post_id.fetch_add(1, Ordering::SeqCst) + 1;
        let record = PostRecord {
            id,
            author_id: post.author_id,
            body: post.body,
            reply_to_id: post.reply_to_id,
            quote_of_id: post.quote_of_id,
            likes_count: 0,
            reposts_count: 0,
            replies_count: 0,
            created_at: OffsetDateTime::now_utc(),
        };

        let mut posts = self.posts.lock().await;
        if let Some(parent) = record.reply_to_id {
            if let Some(parent_post) = posts.get_mut(&parent) {
                parent_post.replies_count += 1;
            }
        }
        posts.insert(id, record.clone());
        drop(posts);

        if let Some(account) = self.accounts.lock().await.get_mut(&record.author_id) {
            account.posts_count += 1;
        }
        Ok(record)
    }

    async fn delete_post(&self, id: PostId) -> Result<(), RepoError> {
        let mut posts = self.posts.lock().await;
        let Some(record) = posts.remove(&id) else {
            return Err(RepoError::NotFound);
        };
        if let Some(parent) = record.reply_to_id {
            if let Some(parent_post) = posts.get_mut(&parent) {
                parent_post.replies_count = (parent_post.replies_count - 1).max(0);
            }
        }
        drop(posts);

        if let Some(account) = self.accounts.lock().await.get_mut(&record.author_id) {
            account.posts_count = (account.posts_count - 1).max(0);
        }
        self.likes.lock().await.retain(|(_, post)| *post != id);
        self.reposts.lock().await.retain(|(_, post)| *post != id);
        Ok(())
    }
}

#[async_trait]
impl AccountsRepo for MemoryStore {
    async fn find_account(&self, id: AccountId) -> Result<Option<AccountRecord>, RepoError> {
        Ok(self.accounts.lock().await.get(&id).cloned())
    }

    async fn author_cards(&self, ids: &[AccountId]) -> Result<Vec<AccountView>, RepoError> {
        let accounts = self.accounts.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| accounts.get(id))
            .map(|account| AccountView {
                id: account.id,
                handle: account.handle.clone(),
                display_name: account.display_name.clone(),
                avatar_url: account.avatar_url.clone(),
            })
            .collect())
    }
}

#[async_trait]
impl EngagementRepo for MemoryStore {
    async fn engagement_state(
        &self,
        viewer: AccountId,
        posts: &[PostId],
    ) -> Result<HashMap<PostId, EngagementFlags>, RepoError> {
        let likes = self.likes.lock().await;
        let reposts = self.reposts.lock().await;
        let mut flags: HashMap<PostId, EngagementFlags> = HashMap::new();
        for &post in posts {
            if likes.contains(&(viewer, post)) {
                flags.entry(post).or_default().liked = true;
            }
            if reposts.contains(&(viewer, post)) {
                flags.entry(post).or_default().reposted = true;
            }
        }
        Ok(flags)
    }

    async fn like(&self, account: AccountId, post: PostId) -> Result<(), RepoError> {
        if !self.likes.lock().await.insert((account, post)) {
            return Err(RepoError::Duplicate {
                constraint: "likes_pkey".to_string(),
            });
        }
        if let Some(record) = self.posts.lock().await.get_mut(&post) {
            record.likes_count += 1;
        }
        Ok(())
    }

    async fn unlike(&self, account: AccountId, post: PostId) -> Result<(), RepoError> {
        if !self.likes.lock().await.remove(&(account, post)) {
            return Err(RepoError::NotFound);
        }
        if let Some(record) = self.posts.lock().await.get_mut(&post) {
            record.likes_count = (record.likes_count - 1).max(0);
        }
        Ok(())
    }

    async fn repost(&self, account: AccountId, post: PostId) -> Result<(), RepoError> {
        if !self.reposts.lock().await.insert((account, post)) {
            return Err(RepoError::Duplicate {
                constraint: "reposts_pkey".to_string(),
            });
        }
        if let Some(record) = self.posts.lock().await.get_mut(&post) {
            record.reposts_count += 1;
        }
        Ok(())
    }

    async fn unrepost(&self, account: AccountId, post: PostId) -> Result<(), RepoError> {
        if !self.reposts.lock().await.remove(&(account, post)) {
            return Err(RepoError::NotFound);
        }
        if let Some(record) = self.posts.lock().await.get_mut(&post) {
            record.reposts_count = (record.reposts_count - 1).max(0);
        }
        Ok(())
    }
}

/// Full service stack over a `MemoryStore`, wired the way `main` wires
/// the real one. Must be built inside a tokio runtime because the relay
/// worker spawns immediately.
pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub cache: Arc<TimelineCache>,
    pub live: LiveRegistry,
    pub timeline: Arc<TimelineAssembler>,
    pub publish: Arc<PublishService>,
    pub social: Arc<SocialService>,
    pub relay: RelayHandle,
}

pub fn test_app() -> TestApp {
    test_app_with(CacheConfig::default())
}

pub fn test_app_with(config: CacheConfig) -> TestApp {
    let store = Arc::new(MemoryStore::default());
    let cache = Arc::new(TimelineCache::new(&config));

    let posts_repo: Arc<dyn PostsRepo> = store.clone();
    let posts_write_repo: Arc<dyn PostsWriteRepo> = store.clone();
    let accounts_repo: Arc<dyn AccountsRepo> = store.clone();
    let social_repo: Arc<dyn SocialGraphRepo> = store.clone();
    let engagement_repo: Arc<dyn EngagementRepo> = store.clone();

    let live = LiveRegistry::new();
    let (bus, events) = EventBus::channel();
    let relay = RelayWorker::spawn(live.clone(), events);

    let fanout = Arc::new(FanoutEngine::new(
        social_repo.clone(),
        cache.clone(),
        bus,
        config.celebrity_threshold,
    ));
    let timeline = Arc::new(TimelineAssembler::new(
        cache.clone(),
        social_repo.clone(),
        posts_repo.clone(),
        accounts_repo.clone(),
        engagement_repo.clone(),
        config,
    ));
    let publish = Arc::new(PublishService::new(
        posts_repo.clone(),
        posts_write_repo,
        accounts_repo.clone(),
        fanout,
    ));
    let social = Arc::new(SocialService::new(
        social_repo,
        accounts_repo,
        posts_repo,
        engagement_repo,
        cache.clone(),
    ));

    TestApp {
        store,
        cache,
        live,
        timeline,
        publish,
        social,
        relay,
    }
}

/// Publish a top-level post and return its assigned id.
pub async fn publish_post(app: &TestApp, author: AccountId, body: &str) -> PostId {
    app.publish
        .publish(NewPost {
            author_id: author,
            body: body.to_string(),
            reply_to_id: None,
            quote_of_id: None,
        })
        .await
        .expect("publish should succeed")
        .post
        .id
}

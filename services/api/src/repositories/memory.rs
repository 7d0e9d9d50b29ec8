//! In-memory store used by service tests
//!
//! Mirrors the PostgreSQL adapters closely enough for behavioural tests:
//! the same constraint errors, the same version check and the same feed
//! filtering and ordering rules.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::{DatabaseError, DatabaseResult};

use super::{
    CommentRepository, FollowerRepository, PostRepository, RoleRepository, Storage,
    UserRepository,
};
use crate::feed::{FeedQuery, SortDirection};
use crate::models::{Comment, FeedItem, NewComment, NewPost, Post, PostAuthor, Role, User};

#[derive(Default)]
struct Tables {
    roles: Vec<Role>,
    users: Vec<User>,
    posts: Vec<Post>,
    comments: Vec<Comment>,
    /// (user_id, follower_id)
    followers: Vec<(i64, i64)>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn user(&self, id: i64) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }
}

/// Shared in-memory tables behind every repository trait
#[derive(Clone)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// A store seeded with the user, moderator and admin roles
    pub fn new() -> Self {
        let roles = [("user", 1), ("moderator", 2), ("admin", 3)]
            .into_iter()
            .enumerate()
            .map(|(i, (name, level))| Role {
                id: i as i64 + 1,
                name: name.to_string(),
                level,
                description: String::new(),
            })
            .collect();

        Self {
            tables: Arc::new(Mutex::new(Tables {
                roles,
                next_id: 100,
                ..Tables::default()
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap()
    }

    /// Storage whose every repository is this store
    pub fn storage(&self) -> Storage {
        let store = Arc::new(self.clone());
        Storage {
            users: store.clone(),
            roles: store.clone(),
            posts: store.clone(),
            comments: store.clone(),
            followers: store,
        }
    }

    pub fn role(&self, name: &str) -> Role {
        self.lock()
            .roles
            .iter()
            .find(|r| r.name == name)
            .cloned()
            .unwrap()
    }

    /// Add an active user holding the named role
    pub fn add_user(&self, username: &str, role: &str) -> User {
        let role = self.role(role);
        let mut tables = self.lock();
        let user = User {
            id: tables.next_id(),
            username: username.to_string(),
            email: format!("{username}@example.com"),
            created_at: Utc::now(),
            is_active: true,
            role,
        };
        tables.users.push(user.clone());
        user
    }

    /// Add a post with an explicit creation time
    pub fn add_post(
        &self,
        user_id: i64,
        title: &str,
        content: &str,
        tags: &[&str],
        created_at: DateTime<Utc>,
    ) -> Post {
        let mut tables = self.lock();
        let post = Post {
            id: tables.next_id(),
            title: title.to_string(),
            content: content.to_string(),
            user_id,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            version: 0,
            created_at,
            updated_at: created_at,
        };
        tables.posts.push(post.clone());
        post
    }

    pub fn add_comment(&self, post_id: i64, user_id: i64, content: &str) {
        let mut tables = self.lock();
        let username = tables.user(user_id).unwrap().username.clone();
        let comment = Comment {
            id: tables.next_id(),
            post_id,
            user_id,
            username,
            content: content.to_string(),
            created_at: Utc::now(),
        };
        tables.comments.push(comment);
    }

    pub fn add_follow(&self, follower_id: i64, user_id: i64) {
        self.lock().followers.push((user_id, follower_id));
    }

    pub fn is_following(&self, follower_id: i64, user_id: i64) -> bool {
        self.lock().followers.contains(&(user_id, follower_id))
    }

    pub fn post(&self, id: i64) -> Option<Post> {
        self.lock().posts.iter().find(|p| p.id == id).cloned()
    }
}

fn matches_feed(post: &Post, query: &FeedQuery) -> bool {
    if let Some(search) = &query.search {
        let needle = search.to_lowercase();
        if !post.title.to_lowercase().contains(&needle)
            && !post.content.to_lowercase().contains(&needle)
        {
            return false;
        }
    }

    if !query.tags.iter().all(|tag| post.tags.contains(tag)) {
        return false;
    }

    if query.since.is_some_and(|since| post.created_at < since) {
        return false;
    }

    if query.until.is_some_and(|until| post.created_at > until) {
        return false;
    }

    true
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn get_by_id(&self, id: i64) -> DatabaseResult<Option<User>> {
        Ok(self.lock().user(id).cloned())
    }
}

#[async_trait]
impl RoleRepository for MemoryStore {
    async fn get_by_name(&self, name: &str) -> DatabaseResult<Option<Role>> {
        Ok(self.lock().roles.iter().find(|r| r.name == name).cloned())
    }
}

#[async_trait]
impl PostRepository for MemoryStore {
    async fn create(&self, new_post: &NewPost) -> DatabaseResult<Post> {
        let mut tables = self.lock();
        if tables.user(new_post.user_id).is_none() {
            return Err(DatabaseError::ForeignKeyViolation(
                "posts_user_id_fkey".to_string(),
            ));
        }

        let now = Utc::now();
        let post = Post {
            id: tables.next_id(),
            title: new_post.title.clone(),
            content: new_post.content.clone(),
            user_id: new_post.user_id,
            tags: new_post.tags.clone(),
            version: 0,
            created_at: now,
            updated_at: now,
        };
        tables.posts.push(post.clone());
        Ok(post)
    }

    async fn get_by_id(&self, id: i64) -> DatabaseResult<Option<Post>> {
        Ok(self.post(id))
    }

    async fn update(&self, post: &Post) -> DatabaseResult<Post> {
        let mut tables = self.lock();
        let stored = tables
            .posts
            .iter_mut()
            .find(|p| p.id == post.id && p.version == post.version)
            .ok_or(DatabaseError::NotFound)?;

        stored.title = post.title.clone();
        stored.content = post.content.clone();
        stored.version += 1;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn delete(&self, id: i64) -> DatabaseResult<()> {
        let mut tables = self.lock();
        let before = tables.posts.len();
        tables.posts.retain(|p| p.id != id);
        if tables.posts.len() == before {
            return Err(DatabaseError::NotFound);
        }
        tables.comments.retain(|c| c.post_id != id);
        Ok(())
    }

    async fn get_user_feed(
        &self,
        user_id: i64,
        query: &FeedQuery,
    ) -> DatabaseResult<Vec<FeedItem>> {
        let tables = self.lock();

        let mut posts: Vec<&Post> = tables
            .posts
            .iter()
            .filter(|p| p.user_id == user_id || tables.followers.contains(&(p.user_id, user_id)))
            .filter(|p| matches_feed(p, query))
            .collect();

        posts.sort_by_key(|p| (p.created_at, p.id));
        if query.sort == SortDirection::Descending {
            posts.reverse();
        }

        let items = posts
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .filter_map(|post| {
                let author = tables.user(post.user_id)?;
                Some(FeedItem {
                    post: post.clone(),
                    comments_count: tables
                        .comments
                        .iter()
                        .filter(|c| c.post_id == post.id)
                        .count() as i64,
                    user: PostAuthor {
                        username: author.username.clone(),
                        email: author.email.clone(),
                    },
                })
            })
            .collect();

        Ok(items)
    }
}

#[async_trait]
impl CommentRepository for MemoryStore {
    async fn create(&self, new_comment: &NewComment) -> DatabaseResult<Comment> {
        let mut tables = self.lock();
        if !tables.posts.iter().any(|p| p.id == new_comment.post_id) {
            return Err(DatabaseError::ForeignKeyViolation(
                "comments_post_id_fkey".to_string(),
            ));
        }
        let username = tables
            .user(new_comment.user_id)
            .map(|u| u.username.clone())
            .ok_or_else(|| DatabaseError::ForeignKeyViolation("comments_user_id_fkey".into()))?;

        let comment = Comment {
            id: tables.next_id(),
            post_id: new_comment.post_id,
            user_id: new_comment.user_id,
            username,
            content: new_comment.content.clone(),
            created_at: Utc::now(),
        };
        tables.comments.push(comment.clone());
        Ok(comment)
    }

    async fn get_by_post_id(&self, post_id: i64) -> DatabaseResult<Vec<Comment>> {
        let tables = self.lock();
        let mut comments: Vec<Comment> = tables
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by_key(|c| std::cmp::Reverse((c.created_at, c.id)));
        Ok(comments)
    }
}

#[async_trait]
impl FollowerRepository for MemoryStore {
    async fn follow(&self, follower_id: i64, user_id: i64) -> DatabaseResult<()> {
        let mut tables = self.lock();
        if tables.user(follower_id).is_none() || tables.user(user_id).is_none() {
            return Err(DatabaseError::ForeignKeyViolation(
                "followers_user_id_fkey".to_string(),
            ));
        }
        if tables.followers.contains(&(user_id, follower_id)) {
            return Err(DatabaseError::UniqueViolation("followers_pkey".to_string()));
        }
        tables.followers.push((user_id, follower_id));
        Ok(())
    }

    async fn unfollow(&self, follower_id: i64, user_id: i64) -> DatabaseResult<()> {
        let mut tables = self.lock();
        let before = tables.followers.len();
        tables.followers.retain(|edge| *edge != (user_id, follower_id));
        if tables.followers.len() == before {
            return Err(DatabaseError::NotFound);
        }
        Ok(())
    }
}

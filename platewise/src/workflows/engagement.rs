//! Likes, favorites, reactions and view counts.
//!
//! Each toggle is a single store command: the pair's unique reservation decides
//! between insert and delete, and the parent's counter is recomputed from the
//! membership set inside that same command.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    client::{Client, ToggleOutcome},
    errors::{RepoError, ValidationError},
    id::{ensure_well_formed_id, generate_entity_id},
    models::{Favorite, FavoriteInput, Like, LikeInput, Post, Reaction, Restaurant, RestaurantComment, User},
    repository::CreateInput,
    runtime::ToggleAction,
    types::Entity,
};

const LIKE_COUNT: &str = "like_count";
const VIEW_COUNT: &str = "view_count";
const RATING: &str = "rating";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LikeAction {
    Liked,
    Unliked,
}

#[derive(Debug, Clone, Serialize)]
pub struct LikeToggle {
    pub action: LikeAction,
    /// Present when the toggle created a like.
    pub like: Option<Like>,
    pub like_count: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LikeRequest {
    pub post_id: String,
    pub user_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FavoriteAction {
    Favorited,
    Unfavorited,
}

#[derive(Debug, Clone, Serialize)]
pub struct FavoriteToggle {
    pub action: FavoriteAction,
    pub favorite: Option<Favorite>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FavoriteRequest {
    pub user_id: String,
    pub restaurant_id: String,
}

/// Both ids are checked before either is looked up.
fn ensure_ids(ids: &[(&str, &str)]) -> Result<(), ValidationError> {
    let issues: Vec<_> = ids
        .iter()
        .filter_map(|(field, value)| ensure_well_formed_id(field, value).err())
        .flat_map(|err| err.issues)
        .collect();
    if issues.is_empty() { Ok(()) } else { Err(ValidationError::new(issues)) }
}

async fn ensure_exists<T: Entity>(client: &Client, id: &str) -> Result<(), RepoError> {
    if client.collection::<T>().exists(id).await? {
        Ok(())
    } else {
        Err(RepoError::not_found(T::descriptor().collection, id))
    }
}

/// Owns the (post, user) like relation.
#[derive(Debug, Clone)]
pub struct LikeRegister {
    client: Client,
}

impl LikeRegister {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn toggle(&self, post_id: &str, user_id: &str) -> Result<LikeToggle, RepoError> {
        ensure_ids(&[("post_id", post_id), ("user_id", user_id)])?;
        ensure_exists::<Post>(&self.client, post_id).await?;
        ensure_exists::<User>(&self.client, user_id).await?;

        let like = LikeInput {
            post_id: post_id.to_string(),
            user_id: user_id.to_string(),
        }
        .into_entity(generate_entity_id(), Utc::now())?;
        let ToggleOutcome {
            action,
            record,
            refreshed,
        } = self.client.collection::<Like>().toggle(&like).await?;

        let post_key = self.client.collection::<Post>().repo().collection().entity_key(post_id);
        let like_count = match refreshed
            .iter()
            .find(|entry| entry.key == post_key && entry.path == format!("$.{LIKE_COUNT}"))
        {
            Some(entry) => entry.value as u64,
            None => self.count_for_post(post_id).await?,
        };

        let (action, like) = match action {
            ToggleAction::Added => (LikeAction::Liked, Some(record)),
            ToggleAction::Removed => (LikeAction::Unliked, None),
        };
        log::info!("post '{post_id}' {action:?} by '{user_id}', now {like_count} likes");
        Ok(LikeToggle {
            action,
            like,
            like_count,
        })
    }

    /// Authoritative count, read from the post's like set.
    pub async fn count_for_post(&self, post_id: &str) -> Result<u64, RepoError> {
        ensure_ids(&[("post_id", post_id)])?;
        ensure_exists::<Post>(&self.client, post_id).await?;
        self.client.collection::<Like>().count_related("post", post_id).await
    }

    pub async fn is_liked(&self, post_id: &str, user_id: &str) -> Result<bool, RepoError> {
        ensure_ids(&[("post_id", post_id), ("user_id", user_id)])?;
        let like = self
            .client
            .collection::<Like>()
            .find_by_unique(&["post_id", "user_id"], &[post_id, user_id])
            .await?;
        Ok(like.is_some())
    }

    /// The user's likes with each post's title and content.
    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<Value>, RepoError> {
        ensure_ids(&[("user_id", user_id)])?;
        ensure_exists::<User>(&self.client, user_id).await?;
        self.populated("user", user_id).await
    }

    /// The post's likes with each user's username and avatar.
    pub async fn list_for_post(&self, post_id: &str) -> Result<Vec<Value>, RepoError> {
        ensure_ids(&[("post_id", post_id)])?;
        ensure_exists::<Post>(&self.client, post_id).await?;
        self.populated("post", post_id).await
    }

    async fn populated(&self, alias: &str, anchor_id: &str) -> Result<Vec<Value>, RepoError> {
        let likes = self.client.collection::<Like>();
        let mut shown = Vec::new();
        for like in likes.related(alias, anchor_id).await? {
            let mut document = likes.populate(&like).await?;
            // the anchor is the same on every row
            if let Value::Object(fields) = &mut document {
                fields.remove(alias);
            }
            shown.push(document);
        }
        Ok(shown)
    }
}

/// Repairs denormalized values from their authoritative sets.
#[derive(Debug, Clone)]
pub struct CounterSynchronizer {
    client: Client,
}

impl CounterSynchronizer {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Rewrites `Post.like_count` from the post's like set in one command.
    pub async fn resync(&self, post_id: &str) -> Result<u64, RepoError> {
        ensure_ids(&[("post_id", post_id)])?;
        let count = self.client.collection::<Like>().refresh(LIKE_COUNT, post_id).await? as u64;
        log::info!("resynced like_count of post '{post_id}' to {count}");
        Ok(count)
    }

    /// Rewrites `Restaurant.rating` from its comments.
    pub async fn resync_rating(&self, restaurant_id: &str) -> Result<f64, RepoError> {
        ensure_ids(&[("restaurant_id", restaurant_id)])?;
        self.client
            .collection::<RestaurantComment>()
            .refresh(RATING, restaurant_id)
            .await
    }
}

pub async fn toggle_favorite(client: &Client, user_id: &str, restaurant_id: &str) -> Result<FavoriteToggle, RepoError> {
    ensure_ids(&[("user_id", user_id), ("restaurant_id", restaurant_id)])?;
    ensure_exists::<User>(client, user_id).await?;
    ensure_exists::<Restaurant>(client, restaurant_id).await?;

    let favorite = FavoriteInput {
        user_id: user_id.to_string(),
        restaurant_id: restaurant_id.to_string(),
        note: None,
    }
    .into_entity(generate_entity_id(), Utc::now())?;
    let outcome = client.collection::<Favorite>().toggle(&favorite).await?;
    Ok(match outcome.action {
        ToggleAction::Added => FavoriteToggle {
            action: FavoriteAction::Favorited,
            favorite: Some(outcome.record),
        },
        ToggleAction::Removed => FavoriteToggle {
            action: FavoriteAction::Unfavorited,
            favorite: None,
        },
    })
}

/// Bumps the comment's like or dislike counter and returns the comment.
pub async fn react<T: Entity>(client: &Client, comment_id: &str, reaction: Reaction) -> Result<T, RepoError> {
    let comments = client.collection::<T>();
    comments.increment(comment_id, reaction.counter_field(), 1).await?;
    comments.get_or_error(comment_id).await
}

/// Returns the post's new view count.
pub async fn record_view(client: &Client, post_id: &str) -> Result<u64, RepoError> {
    let views = client.collection::<Post>().increment(post_id, VIEW_COUNT, 1).await?;
    Ok(views as u64)
}

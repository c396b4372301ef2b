use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use uuid::Uuid;

/// Emoji → identifiers of the users who reacted with it.
pub type Reactions = BTreeMap<String, BTreeSet<String>>;

/// A gallery photo or a trip photo. Both live in tables of the same shape;
/// `trip_id` is only present for trip photos.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Photo {
    pub id: Uuid,
    #[sqlx(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trip_id: Option<Uuid>,
    pub url: String,
    pub storage_path: String,
    pub thumbnail_url: Option<String>,
    pub thumbnail_path: Option<String>,
    pub content_type: String,
    pub size_bytes: i64,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub caption: String,
    pub reactions: Json<Reactions>,
    pub uploaded_by: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Which collection a photo belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoCollection {
    Gallery,
    Trip(Uuid),
}

impl PhotoCollection {
    pub fn table(&self) -> &'static str {
        match self {
            PhotoCollection::Gallery => "photos",
            PhotoCollection::Trip(_) => "trip_photos",
        }
    }

    /// Storage prefix for objects of this collection.
    pub fn storage_prefix(&self) -> String {
        match self {
            PhotoCollection::Gallery => "gallery".to_string(),
            PhotoCollection::Trip(trip_id) => format!("trips/{trip_id}"),
        }
    }

    pub fn trip_id(&self) -> Option<Uuid> {
        match self {
            PhotoCollection::Gallery => None,
            PhotoCollection::Trip(id) => Some(*id),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateCaptionRequest {
    pub caption: String,
}

#[derive(Debug, Deserialize)]
pub struct ToggleReactionRequest {
    pub emoji: String,
}

/// Toggle `user`'s membership in `emoji`'s set. Returns `true` when the reaction
/// was added. An emoji whose set becomes empty is removed from the map.
pub fn toggle_reaction(reactions: &mut Reactions, emoji: &str, user: &str) -> bool {
    let users = reactions.entry(emoji.to_string()).or_default();
    let added = if users.remove(user) {
        false
    } else {
        users.insert(user.to_string());
        true
    };
    if users.is_empty() {
        reactions.remove(emoji);
    }
    added
}

use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::photo::{toggle_reaction, Photo, PhotoCollection},
    services::{
        media::{render_jpeg, Upload, THUMBNAIL_SIZE},
        metrics::UPLOADS_COUNTER,
        storage::{MediaStorage, StoredObject},
    },
};

const PHOTO_COLS: &str = "id, url, storage_path, thumbnail_url, thumbnail_path, content_type,
     size_bytes, width, height, caption, reactions, uploaded_by, uploaded_at";

/// Longest emoji sequence accepted as a reaction key.
const MAX_EMOJI_CHARS: usize = 16;

fn columns(collection: PhotoCollection) -> String {
    match collection {
        PhotoCollection::Gallery => PHOTO_COLS.to_string(),
        PhotoCollection::Trip(_) => format!("{PHOTO_COLS}, trip_id"),
    }
}

/// Extra predicate restricting a query to the collection; `param` is the
/// placeholder number the trip id will be bound to.
fn scope(collection: PhotoCollection, param: usize) -> String {
    match collection {
        PhotoCollection::Gallery => String::new(),
        PhotoCollection::Trip(_) => format!(" AND trip_id = ${param}"),
    }
}

fn thumbnail_key(key: &str) -> String {
    match key.rsplit_once('.') {
        Some((stem, _)) => format!("{stem}_thumb.jpg"),
        None => format!("{key}_thumb.jpg"),
    }
}

pub struct PhotoService;

impl PhotoService {
    /// Newest first.
    pub async fn list(pool: &PgPool, collection: PhotoCollection) -> anyhow::Result<Vec<Photo>> {
        let table = collection.table();
        let cols = columns(collection);
        let photos = match collection {
            PhotoCollection::Gallery => {
                sqlx::query_as::<_, Photo>(&format!(
                    "SELECT {cols} FROM {table} ORDER BY uploaded_at DESC, id"
                ))
                .fetch_all(pool)
                .await?
            }
            PhotoCollection::Trip(trip_id) => {
                sqlx::query_as::<_, Photo>(&format!(
                    "SELECT {cols} FROM {table} WHERE trip_id = $1 ORDER BY uploaded_at DESC, id"
                ))
                .bind(trip_id)
                .fetch_all(pool)
                .await?
            }
        };
        Ok(photos)
    }

    pub async fn get(pool: &PgPool, collection: PhotoCollection, id: Uuid) -> anyhow::Result<Option<Photo>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE id = $1{}",
            columns(collection),
            collection.table(),
            scope(collection, 2)
        );
        let mut query = sqlx::query_as::<_, Photo>(&sql).bind(id);
        if let Some(trip_id) = collection.trip_id() {
            query = query.bind(trip_id);
        }
        Ok(query.fetch_optional(pool).await?)
    }

    /// Store the original and a JPEG thumbnail, then record the photo. A file
    /// that cannot be decoded is still stored, without thumbnail or dimensions.
    pub async fn upload(
        pool: &PgPool,
        storage: &MediaStorage,
        collection: PhotoCollection,
        uploaded_by: &str,
        upload: Upload,
    ) -> anyhow::Result<Photo> {
        let key = MediaStorage::new_key(&collection.storage_prefix(), &upload.filename);

        let rendition = match render_jpeg(&upload.data, THUMBNAIL_SIZE) {
            Ok(r) => Some(r),
            Err(e) => {
                tracing::warn!("no thumbnail for {}: {}", upload.filename, e);
                None
            }
        };

        let size_bytes = upload.data.len() as i64;
        let original = storage.put(&key, upload.data).await?;

        let mut stored = vec![original.clone()];
        let mut thumbnail: Option<StoredObject> = None;
        let mut dims = (None, None);
        if let Some(r) = rendition {
            dims = (Some(r.width as i32), Some(r.height as i32));
            match storage.put(&thumbnail_key(&key), r.jpeg.into()).await {
                Ok(obj) => {
                    stored.push(obj.clone());
                    thumbnail = Some(obj);
                }
                Err(e) => tracing::warn!("thumbnail for {} not stored: {}", key, e),
            }
        }

        let caption = upload.caption.unwrap_or_default();
        let table = collection.table();
        let cols = columns(collection);
        let inserted = match collection.trip_id() {
            None => {
                sqlx::query_as::<_, Photo>(&format!(
                    "INSERT INTO {table}
                        (url, storage_path, thumbnail_url, thumbnail_path, content_type,
                         size_bytes, width, height, caption, uploaded_by)
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                     RETURNING {cols}"
                ))
                .bind(&original.url)
                .bind(&original.path)
                .bind(thumbnail.as_ref().map(|t| &t.url))
                .bind(thumbnail.as_ref().map(|t| &t.path))
                .bind(&upload.content_type)
                .bind(size_bytes)
                .bind(dims.0)
                .bind(dims.1)
                .bind(&caption)
                .bind(uploaded_by)
                .fetch_one(pool)
                .await
            }
            Some(trip_id) => {
                sqlx::query_as::<_, Photo>(&format!(
                    "INSERT INTO {table}
                        (url, storage_path, thumbnail_url, thumbnail_path, content_type,
                         size_bytes, width, height, caption, uploaded_by, trip_id)
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                     RETURNING {cols}"
                ))
                .bind(&original.url)
                .bind(&original.path)
                .bind(thumbnail.as_ref().map(|t| &t.url))
                .bind(thumbnail.as_ref().map(|t| &t.path))
                .bind(&upload.content_type)
                .bind(size_bytes)
                .bind(dims.0)
                .bind(dims.1)
                .bind(&caption)
                .bind(uploaded_by)
                .bind(trip_id)
                .fetch_one(pool)
                .await
            }
        };

        let photo = match inserted {
            Ok(photo) => photo,
            Err(e) => {
                for obj in &stored {
                    storage.discard(&obj.path).await;
                }
                return Err(e.into());
            }
        };

        let kind = match collection {
            PhotoCollection::Gallery => "gallery",
            PhotoCollection::Trip(_) => "trip",
        };
        UPLOADS_COUNTER.with_label_values(&[kind]).inc();
        tracing::info!("{} photo {} uploaded by {}", kind, photo.id, uploaded_by);
        Ok(photo)
    }

    pub async fn update_caption(
        pool: &PgPool,
        collection: PhotoCollection,
        id: Uuid,
        caption: &str,
    ) -> anyhow::Result<Option<Photo>> {
        let sql = format!(
            "UPDATE {} SET caption = $1 WHERE id = $2{} RETURNING {}",
            collection.table(),
            scope(collection, 3),
            columns(collection)
        );
        let mut query = sqlx::query_as::<_, Photo>(&sql).bind(caption.trim()).bind(id);
        if let Some(trip_id) = collection.trip_id() {
            query = query.bind(trip_id);
        }
        Ok(query.fetch_optional(pool).await?)
    }

    /// Read-modify-write of the reaction map; concurrent toggles are last-write-wins.
    pub async fn toggle_reaction(
        pool: &PgPool,
        collection: PhotoCollection,
        id: Uuid,
        emoji: &str,
        user: &str,
    ) -> anyhow::Result<Option<Photo>> {
        let emoji = emoji.trim();
        if emoji.is_empty() || emoji.chars().count() > MAX_EMOJI_CHARS {
            return Err(AppError::validation("Reaction must be a single emoji").into());
        }

        let Some(photo) = Self::get(pool, collection, id).await? else {
            return Ok(None);
        };
        let mut reactions = photo.reactions.0;
        toggle_reaction(&mut reactions, emoji, user);

        let sql = format!(
            "UPDATE {} SET reactions = $1 WHERE id = $2{} RETURNING {}",
            collection.table(),
            scope(collection, 3),
            columns(collection)
        );
        let mut query = sqlx::query_as::<_, Photo>(&sql).bind(Json(&reactions)).bind(id);
        if let Some(trip_id) = collection.trip_id() {
            query = query.bind(trip_id);
        }
        Ok(query.fetch_optional(pool).await?)
    }

    /// Remove the record, then its stored files. File removal failures are logged only.
    pub async fn delete(
        pool: &PgPool,
        storage: &MediaStorage,
        collection: PhotoCollection,
        id: Uuid,
    ) -> anyhow::Result<bool> {
        let sql = format!(
            "DELETE FROM {} WHERE id = $1{} RETURNING {}",
            collection.table(),
            scope(collection, 2),
            columns(collection)
        );
        let mut query = sqlx::query_as::<_, Photo>(&sql).bind(id);
        if let Some(trip_id) = collection.trip_id() {
            query = query.bind(trip_id);
        }
        let Some(photo) = query.fetch_optional(pool).await? else {
            return Ok(false);
        };

        if let Err(e) = Self::remove_files(storage, &photo).await {
            tracing::warn!("files of deleted photo {} not fully removed: {}", photo.id, e);
        }
        Ok(true)
    }

    /// Delete a photo's original and thumbnail. Returns how many files were removed.
    pub async fn remove_files(storage: &MediaStorage, photo: &Photo) -> anyhow::Result<usize> {
        let mut removed = 0;
        if storage.delete(&photo.storage_path).await? {
            removed += 1;
        }
        if let Some(thumb) = &photo.thumbnail_path {
            if storage.delete(thumb).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use chrono::Utc;

    use super::*;
    use crate::services::storage::test_support::temp_storage;

    fn photo(storage_path: &str, thumbnail_path: Option<&str>) -> Photo {
        Photo {
            id: Uuid::new_v4(),
            trip_id: None,
            url: format!("/media/files/{storage_path}"),
            storage_path: storage_path.to_string(),
            thumbnail_url: None,
            thumbnail_path: thumbnail_path.map(str::to_string),
            content_type: "image/jpeg".into(),
            size_bytes: 4,
            width: None,
            height: None,
            caption: String::new(),
            reactions: Json(Default::default()),
            uploaded_by: "ada@example.com".into(),
            uploaded_at: Utc::now(),
        }
    }

    #[test]
    fn test_scope_binds_trip_filter() {
        assert_eq!(scope(PhotoCollection::Gallery, 2), "");
        assert_eq!(
            scope(PhotoCollection::Trip(Uuid::nil()), 3),
            " AND trip_id = $3"
        );
        assert!(columns(PhotoCollection::Trip(Uuid::nil())).ends_with("trip_id"));
        assert!(!columns(PhotoCollection::Gallery).contains("trip_id"));
    }

    #[test]
    fn test_thumbnail_key() {
        assert_eq!(thumbnail_key("gallery/abc.png"), "gallery/abc_thumb.jpg");
        assert_eq!(thumbnail_key("gallery/abc"), "gallery/abc_thumb.jpg");
    }

    #[tokio::test]
    async fn test_remove_files_counts_and_tolerates_missing() {
        let (storage, root) = temp_storage();
        storage.put("gallery/a.jpg", Bytes::from_static(b"orig")).await.unwrap();
        storage.put("gallery/a_thumb.jpg", Bytes::from_static(b"thumb")).await.unwrap();

        let p = photo("gallery/a.jpg", Some("gallery/a_thumb.jpg"));
        assert_eq!(PhotoService::remove_files(&storage, &p).await.unwrap(), 2);
        // Already gone: nothing removed, no error.
        assert_eq!(PhotoService::remove_files(&storage, &p).await.unwrap(), 0);

        let _ = std::fs::remove_dir_all(root);
    }
}

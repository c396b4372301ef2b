use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        photo::{Photo, PhotoCollection},
        trip::{CreateTripRequest, Trip, TripDeletion, UpdateTripRequest},
    },
    services::{photos::PhotoService, storage::MediaStorage},
};

const TRIP_COLS: &str =
    "id, title, location, emoji, start_date, end_date, description, created_by, created_at, updated_at";

pub struct TripService;

impl TripService {
    /// Most recent trips first; trips without a start date come last.
    pub async fn list(pool: &PgPool) -> anyhow::Result<Vec<Trip>> {
        let trips = sqlx::query_as::<_, Trip>(&format!(
            "SELECT {TRIP_COLS} FROM trips
             ORDER BY start_date DESC NULLS LAST, created_at DESC"
        ))
        .fetch_all(pool)
        .await?;
        Ok(trips)
    }

    pub async fn get(pool: &PgPool, id: Uuid) -> anyhow::Result<Option<Trip>> {
        let trip = sqlx::query_as::<_, Trip>(&format!("SELECT {TRIP_COLS} FROM trips WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(trip)
    }

    /// Like [`TripService::get`], failing with `NotFound` when the trip does not exist.
    pub async fn require(pool: &PgPool, id: Uuid) -> anyhow::Result<Trip> {
        Ok(Self::get(pool, id).await?.ok_or(AppError::NotFound("Trip"))?)
    }

    pub async fn create(pool: &PgPool, created_by: &str, req: &CreateTripRequest) -> anyhow::Result<Trip> {
        req.validate()?;
        let trip = sqlx::query_as::<_, Trip>(&format!(
            "INSERT INTO trips (title, location, emoji, start_date, end_date, description, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {TRIP_COLS}"
        ))
        .bind(req.title.trim())
        .bind(req.location.trim())
        .bind(req.emoji.trim())
        .bind(req.start_date)
        .bind(req.end_date)
        .bind(&req.description)
        .bind(created_by)
        .fetch_one(pool)
        .await?;
        tracing::info!("trip {} created by {}", trip.id, created_by);
        Ok(trip)
    }

    pub async fn update(pool: &PgPool, id: Uuid, req: &UpdateTripRequest) -> anyhow::Result<Option<Trip>> {
        let Some(mut trip) = Self::get(pool, id).await? else {
            return Ok(None);
        };
        trip.apply(req);
        trip.validate()?;

        let updated = sqlx::query_as::<_, Trip>(&format!(
            "UPDATE trips SET
                title = $1, location = $2, emoji = $3, start_date = $4, end_date = $5,
                description = $6, updated_at = NOW()
             WHERE id = $7
             RETURNING {TRIP_COLS}"
        ))
        .bind(&trip.title)
        .bind(&trip.location)
        .bind(&trip.emoji)
        .bind(trip.start_date)
        .bind(trip.end_date)
        .bind(&trip.description)
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(updated)
    }

    /// Delete a trip with all of its photos. See [`delete_trip`].
    pub async fn delete(pool: &PgPool, storage: &MediaStorage, id: Uuid) -> anyhow::Result<TripDeletion> {
        Self::require(pool, id).await?;
        delete_trip(pool, storage, id).await
    }
}

/// The record operations a trip deletion needs.
#[allow(async_fn_in_trait)]
pub trait TripRecords {
    async fn trip_photos(&self, trip_id: Uuid) -> anyhow::Result<Vec<Photo>>;
    async fn delete_photo_record(&self, photo_id: Uuid) -> anyhow::Result<()>;
    async fn delete_trip_record(&self, trip_id: Uuid) -> anyhow::Result<()>;
}

impl TripRecords for PgPool {
    async fn trip_photos(&self, trip_id: Uuid) -> anyhow::Result<Vec<Photo>> {
        PhotoService::list(self, PhotoCollection::Trip(trip_id)).await
    }

    async fn delete_photo_record(&self, photo_id: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM trip_photos WHERE id = $1")
            .bind(photo_id)
            .execute(self)
            .await?;
        Ok(())
    }

    async fn delete_trip_record(&self, trip_id: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM trips WHERE id = $1")
            .bind(trip_id)
            .execute(self)
            .await?;
        Ok(())
    }
}

/// For each photo its files then its record; the trip record last. There is
/// no transaction: when a step fails the steps already done stay done and the
/// error reports how far it got.
pub async fn delete_trip<R: TripRecords>(
    records: &R,
    storage: &MediaStorage,
    trip_id: Uuid,
) -> anyhow::Result<TripDeletion> {
    let photos = records.trip_photos(trip_id).await?;
    let mut progress = TripDeletion::default();

    for photo in &photos {
        let step = async {
            let files = PhotoService::remove_files(storage, photo).await?;
            records.delete_photo_record(photo.id).await?;
            anyhow::Ok(files)
        };
        match step.await {
            Ok(files) => {
                progress.files_deleted += files;
                progress.photos_deleted += 1;
            }
            Err(e) => return Err(partial_failure(trip_id, &progress, photos.len(), e)),
        }
    }

    if let Err(e) = records.delete_trip_record(trip_id).await {
        return Err(partial_failure(trip_id, &progress, photos.len(), e));
    }

    tracing::info!(
        "trip {} deleted with {} photo(s) and {} file(s)",
        trip_id,
        progress.photos_deleted,
        progress.files_deleted
    );
    Ok(progress)
}

fn partial_failure(id: Uuid, progress: &TripDeletion, total: usize, cause: anyhow::Error) -> anyhow::Error {
    tracing::error!(
        "deleting trip {} stopped after {}/{} photo(s), {} file(s): {}",
        id,
        progress.photos_deleted,
        total,
        progress.files_deleted,
        cause
    );
    AppError::PartialFailure(format!(
        "Trip deletion stopped partway: {} of {} photos and {} files were deleted ({cause})",
        progress.photos_deleted, total, progress.files_deleted
    ))
    .into()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use bytes::Bytes;
    use chrono::Utc;
    use sqlx::types::Json;

    use super::*;
    use crate::services::storage::test_support::temp_storage;

    /// In-memory trip tables. `fail_photo_delete_after` makes the n-th and later
    /// photo record deletions fail.
    #[derive(Default)]
    struct MemoryRecords {
        trips: Mutex<Vec<Uuid>>,
        photos: Mutex<Vec<Photo>>,
        fail_photo_delete_after: Option<usize>,
        photo_deletes: Mutex<usize>,
    }

    impl TripRecords for MemoryRecords {
        async fn trip_photos(&self, trip_id: Uuid) -> anyhow::Result<Vec<Photo>> {
            let photos = self.photos.lock().unwrap();
            Ok(photos.iter().filter(|p| p.trip_id == Some(trip_id)).cloned().collect())
        }

        async fn delete_photo_record(&self, photo_id: Uuid) -> anyhow::Result<()> {
            let mut deletes = self.photo_deletes.lock().unwrap();
            if self.fail_photo_delete_after.is_some_and(|n| *deletes >= n) {
                anyhow::bail!("connection reset");
            }
            *deletes += 1;
            self.photos.lock().unwrap().retain(|p| p.id != photo_id);
            Ok(())
        }

        async fn delete_trip_record(&self, trip_id: Uuid) -> anyhow::Result<()> {
            self.trips.lock().unwrap().retain(|t| *t != trip_id);
            Ok(())
        }
    }

    async fn stored_photo(storage: &MediaStorage, trip_id: Uuid, n: u32) -> Photo {
        let path = format!("trips/{trip_id}/{n}.jpg");
        let thumb = format!("trips/{trip_id}/{n}_thumb.jpg");
        storage.put(&path, Bytes::from_static(b"orig")).await.unwrap();
        storage.put(&thumb, Bytes::from_static(b"thumb")).await.unwrap();
        Photo {
            id: Uuid::new_v4(),
            trip_id: Some(trip_id),
            url: storage.url_for(&path),
            storage_path: path,
            thumbnail_url: Some(storage.url_for(&thumb)),
            thumbnail_path: Some(thumb),
            content_type: "image/jpeg".into(),
            size_bytes: 4,
            width: Some(10),
            height: Some(10),
            caption: String::new(),
            reactions: Json(Default::default()),
            uploaded_by: "ada@example.com".into(),
            uploaded_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_delete_trip_removes_photos_files_and_trip() {
        let (storage, root) = temp_storage();
        let trip = Uuid::new_v4();
        let other_trip = Uuid::new_v4();

        let records = MemoryRecords::default();
        records.trips.lock().unwrap().extend([trip, other_trip]);
        for n in 0..2 {
            let photo = stored_photo(&storage, trip, n).await;
            records.photos.lock().unwrap().push(photo);
        }
        let kept = stored_photo(&storage, other_trip, 9).await;
        records.photos.lock().unwrap().push(kept.clone());

        let outcome = delete_trip(&records, &storage, trip).await.unwrap();
        assert_eq!(
            outcome,
            TripDeletion {
                photos_deleted: 2,
                files_deleted: 4
            }
        );

        assert_eq!(*records.trips.lock().unwrap(), vec![other_trip]);
        let remaining: Vec<Uuid> = records.photos.lock().unwrap().iter().map(|p| p.id).collect();
        assert_eq!(remaining, vec![kept.id]);
        assert_eq!(storage.read(&format!("trips/{trip}/0.jpg")).await.unwrap(), None);
        assert!(storage.read(&kept.storage_path).await.unwrap().is_some());

        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn test_delete_trip_reports_partial_failure() {
        let (storage, root) = temp_storage();
        let trip = Uuid::new_v4();

        let records = MemoryRecords {
            fail_photo_delete_after: Some(1),
            ..Default::default()
        };
        records.trips.lock().unwrap().push(trip);
        for n in 0..2 {
            let photo = stored_photo(&storage, trip, n).await;
            records.photos.lock().unwrap().push(photo);
        }

        let err = delete_trip(&records, &storage, trip).await.unwrap_err();
        match AppError::from(err) {
            AppError::PartialFailure(msg) => {
                assert!(msg.contains("1 of 2 photos"));
                assert!(msg.contains("connection reset"));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        // The first photo is gone, the second lost its files but kept its record,
        // and the trip itself survives.
        assert_eq!(records.photos.lock().unwrap().len(), 1);
        assert_eq!(*records.trips.lock().unwrap(), vec![trip]);

        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn test_partial_failure_reports_counts() {
        let progress = TripDeletion {
            photos_deleted: 1,
            files_deleted: 2,
        };
        let err = partial_failure(Uuid::nil(), &progress, 2, anyhow::anyhow!("disk error"));
        match AppError::from(err) {
            AppError::PartialFailure(msg) => {
                assert!(msg.contains("1 of 2 photos"));
                assert!(msg.contains("2 files"));
                assert!(msg.contains("disk error"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

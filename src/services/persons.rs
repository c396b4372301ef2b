use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::AppError,
    family::{plan_move, FamilyGraph, OrderChange},
    models::person::{dedup_ids, CreatePersonRequest, MoveDirection, Person, UpdatePersonRequest},
    services::{
        media::{render_jpeg, Upload, PROFILE_PICTURE_SIZE},
        metrics::{FAMILY_MEMBERS_GAUGE, UPLOADS_COUNTER},
        storage::MediaStorage,
    },
};

const PERSON_COLS: &str = "id, first_name, last_name, date_of_birth, date_of_death, place_of_birth,
     gender, biography, profile_picture_url, profile_picture_path, parent_ids, spouse_id,
     display_order, created_by, created_at, updated_at";

pub struct PersonService;

impl PersonService {
    /// Every member, oldest record first. This is the snapshot the resolver runs on.
    pub async fn list(pool: &PgPool) -> anyhow::Result<Vec<Person>> {
        let members = sqlx::query_as::<_, Person>(&format!(
            "SELECT {PERSON_COLS} FROM family_members ORDER BY created_at, id"
        ))
        .fetch_all(pool)
        .await?;
        FAMILY_MEMBERS_GAUGE.set(members.len() as f64);
        Ok(members)
    }

    pub async fn get(pool: &PgPool, id: Uuid) -> anyhow::Result<Option<Person>> {
        let person = sqlx::query_as::<_, Person>(&format!(
            "SELECT {PERSON_COLS} FROM family_members WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(person)
    }

    pub async fn create(
        pool: &PgPool,
        created_by: &str,
        req: &CreatePersonRequest,
    ) -> anyhow::Result<Person> {
        req.validate()?;

        let person = sqlx::query_as::<_, Person>(&format!(
            "INSERT INTO family_members
                (first_name, last_name, date_of_birth, date_of_death, place_of_birth, gender,
                 biography, parent_ids, spouse_id, display_order, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING {PERSON_COLS}"
        ))
        .bind(req.first_name.trim())
        .bind(req.last_name.trim())
        .bind(req.date_of_birth)
        .bind(req.date_of_death)
        .bind(crate::models::non_blank(req.place_of_birth.clone()))
        .bind(req.gender.map(|g| g.to_string()))
        .bind(crate::models::non_blank(req.biography.clone()))
        .bind(dedup_ids(&req.parent_ids))
        .bind(req.spouse_id)
        .bind(req.display_order)
        .bind(created_by)
        .fetch_one(pool)
        .await?;

        tracing::info!("family member {} added by {}", person.id, created_by);
        Ok(person)
    }

    /// Partial update: load, apply the present fields, validate, write back.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        req: &UpdatePersonRequest,
    ) -> anyhow::Result<Option<Person>> {
        let Some(mut person) = Self::get(pool, id).await? else {
            return Ok(None);
        };
        person.apply(req);
        person.validate()?;

        let updated = sqlx::query_as::<_, Person>(&format!(
            "UPDATE family_members SET
                first_name = $1, last_name = $2, date_of_birth = $3, date_of_death = $4,
                place_of_birth = $5, gender = $6, biography = $7, parent_ids = $8,
                spouse_id = $9, display_order = $10, updated_at = NOW()
             WHERE id = $11
             RETURNING {PERSON_COLS}"
        ))
        .bind(&person.first_name)
        .bind(&person.last_name)
        .bind(person.date_of_birth)
        .bind(person.date_of_death)
        .bind(&person.place_of_birth)
        .bind(&person.gender)
        .bind(&person.biography)
        .bind(&person.parent_ids)
        .bind(person.spouse_id)
        .bind(person.display_order)
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(updated)
    }

    /// Remove the record, then its profile picture. References to the member
    /// held by others are left dangling.
    pub async fn delete(pool: &PgPool, storage: &MediaStorage, id: Uuid) -> anyhow::Result<bool> {
        let row: Option<(Option<String>,)> = sqlx::query_as(
            "DELETE FROM family_members WHERE id = $1 RETURNING profile_picture_path",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        let Some((picture_path,)) = row else {
            return Ok(false);
        };
        if let Some(path) = picture_path {
            if let Err(e) = storage.delete(&path).await {
                tracing::warn!("profile picture {} of deleted member {} not removed: {}", path, id, e);
            }
        }
        tracing::info!("family member {} deleted", id);
        Ok(true)
    }

    /// Store a new profile picture, resized to fit [`PROFILE_PICTURE_SIZE`],
    /// and drop the previous one.
    pub async fn set_profile_picture(
        pool: &PgPool,
        storage: &MediaStorage,
        id: Uuid,
        upload: Upload,
    ) -> anyhow::Result<Person> {
        let person = Self::get(pool, id)
            .await?
            .ok_or(AppError::NotFound("Family member"))?;

        let rendition = render_jpeg(&upload.data, PROFILE_PICTURE_SIZE)?;
        let key = MediaStorage::new_key("profiles", "picture.jpg");
        let stored = storage.put(&key, rendition.jpeg.into()).await?;

        let updated = sqlx::query_as::<_, Person>(&format!(
            "UPDATE family_members
             SET profile_picture_url = $1, profile_picture_path = $2, updated_at = NOW()
             WHERE id = $3
             RETURNING {PERSON_COLS}"
        ))
        .bind(&stored.url)
        .bind(&stored.path)
        .bind(id)
        .fetch_optional(pool)
        .await;

        let updated = match updated {
            Ok(Some(p)) => p,
            Ok(None) => {
                storage.discard(&stored.path).await;
                return Err(AppError::NotFound("Family member").into());
            }
            Err(e) => {
                storage.discard(&stored.path).await;
                return Err(e.into());
            }
        };

        UPLOADS_COUNTER.with_label_values(&["profile"]).inc();
        if let Some(old) = person.profile_picture_path {
            if let Err(e) = storage.delete(&old).await {
                tracing::warn!("previous profile picture {} not removed: {}", old, e);
            }
        }
        Ok(updated)
    }

    /// Shift a member (and their recorded spouse) one step left or right
    /// among their siblings. Returns the `display_order` values written.
    pub async fn move_member(
        pool: &PgPool,
        id: Uuid,
        direction: MoveDirection,
    ) -> anyhow::Result<Option<Vec<OrderChange>>> {
        let members = Self::list(pool).await?;
        let graph = FamilyGraph::new(&members);
        let Some(changes) = plan_move(&graph, id, direction) else {
            return Ok(None);
        };

        for change in &changes {
            sqlx::query("UPDATE family_members SET display_order = $1, updated_at = NOW() WHERE id = $2")
                .bind(change.display_order)
                .bind(change.id)
                .execute(pool)
                .await?;
        }
        Ok(Some(changes))
    }
}

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{double_option, non_blank};
use crate::error::AppError;

/// A person may record at most two parents.
pub const MAX_PARENTS: usize = 2;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Gender {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "other" => Ok(Gender::Other),
            _ => Err(anyhow::anyhow!("Unknown gender: {s}")),
        }
    }
}

/// A family-tree record. `parent_ids` and `spouse_id` are loose references:
/// nothing guarantees they point at an existing member.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Person {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub date_of_death: Option<NaiveDate>,
    pub place_of_birth: Option<String>,
    /// Stored as TEXT; one of `Gender`'s values when set.
    pub gender: Option<String>,
    pub biography: Option<String>,
    pub profile_picture_url: Option<String>,
    pub profile_picture_path: Option<String>,
    pub parent_ids: Vec<Uuid>,
    pub spouse_id: Option<Uuid>,
    pub display_order: Option<i32>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Person {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn has_parents(&self) -> bool {
        !self.parent_ids.is_empty()
    }

    /// Apply a partial update in place. Fields absent from the request are kept.
    pub fn apply(&mut self, req: &UpdatePersonRequest) {
        if let Some(v) = &req.first_name {
            self.first_name = v.trim().to_string();
        }
        if let Some(v) = &req.last_name {
            self.last_name = v.trim().to_string();
        }
        if let Some(v) = req.date_of_birth {
            self.date_of_birth = v;
        }
        if let Some(v) = req.date_of_death {
            self.date_of_death = v;
        }
        if let Some(v) = &req.place_of_birth {
            self.place_of_birth = non_blank(v.clone());
        }
        if let Some(v) = req.gender {
            self.gender = v.map(|g| g.to_string());
        }
        if let Some(v) = &req.biography {
            self.biography = non_blank(v.clone());
        }
        if let Some(v) = &req.parent_ids {
            self.parent_ids = dedup_ids(v);
        }
        if let Some(v) = req.spouse_id {
            self.spouse_id = v;
        }
        if let Some(v) = req.display_order {
            self.display_order = v;
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        validate_member(
            Some(self.id),
            &self.first_name,
            &self.last_name,
            self.date_of_birth,
            self.date_of_death,
            &self.parent_ids,
            self.spouse_id,
        )
    }
}

/// Keep the first occurrence of each id, preserving order.
pub fn dedup_ids(ids: &[Uuid]) -> Vec<Uuid> {
    let mut out: Vec<Uuid> = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.contains(id) {
            out.push(*id);
        }
    }
    out
}

fn validate_member(
    self_id: Option<Uuid>,
    first_name: &str,
    last_name: &str,
    date_of_birth: Option<NaiveDate>,
    date_of_death: Option<NaiveDate>,
    parent_ids: &[Uuid],
    spouse_id: Option<Uuid>,
) -> Result<(), AppError> {
    if first_name.trim().is_empty() {
        return Err(AppError::validation("First name is required"));
    }
    if last_name.trim().is_empty() {
        return Err(AppError::validation("Last name is required"));
    }
    if parent_ids.len() > MAX_PARENTS {
        return Err(AppError::validation("A person can have at most two parents"));
    }
    if let (Some(born), Some(died)) = (date_of_birth, date_of_death) {
        if died < born {
            return Err(AppError::validation("Date of death is before date of birth"));
        }
    }
    if let Some(id) = self_id {
        if parent_ids.contains(&id) {
            return Err(AppError::validation("A person cannot be their own parent"));
        }
        if spouse_id == Some(id) {
            return Err(AppError::validation("A person cannot be their own spouse"));
        }
    }
    if let Some(spouse) = spouse_id {
        if parent_ids.contains(&spouse) {
            return Err(AppError::validation("A parent cannot also be the spouse"));
        }
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct CreatePersonRequest {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub date_of_death: Option<NaiveDate>,
    pub place_of_birth: Option<String>,
    pub gender: Option<Gender>,
    pub biography: Option<String>,
    #[serde(default)]
    pub parent_ids: Vec<Uuid>,
    pub spouse_id: Option<Uuid>,
    pub display_order: Option<i32>,
}

impl CreatePersonRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_member(
            None,
            &self.first_name,
            &self.last_name,
            self.date_of_birth,
            self.date_of_death,
            &dedup_ids(&self.parent_ids),
            self.spouse_id,
        )
    }
}

/// Partial update. For nullable fields, an explicit `null` clears the value.
#[derive(Debug, Default, Deserialize)]
pub struct UpdatePersonRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub date_of_birth: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    pub date_of_death: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    pub place_of_birth: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub gender: Option<Option<Gender>>,
    #[serde(default, deserialize_with = "double_option")]
    pub biography: Option<Option<String>>,
    pub parent_ids: Option<Vec<Uuid>>,
    #[serde(default, deserialize_with = "double_option")]
    pub spouse_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "double_option")]
    pub display_order: Option<Option<i32>>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MoveDirection {
    Left,
    Right,
}

#[derive(Debug, Deserialize)]
pub struct MoveMemberRequest {
    pub direction: MoveDirection,
}

#[derive(Debug, Serialize)]
pub struct Relations {
    pub parents: Vec<Person>,
    pub children: Vec<Person>,
    pub siblings: Vec<Person>,
    pub spouse: Option<Person>,
}

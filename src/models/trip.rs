use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::double_option;
use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Trip {
    pub id: Uuid,
    pub title: String,
    pub location: String,
    pub emoji: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub description: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Trip {
    pub fn apply(&mut self, req: &UpdateTripRequest) {
        if let Some(v) = &req.title {
            self.title = v.trim().to_string();
        }
        if let Some(v) = &req.location {
            self.location = v.trim().to_string();
        }
        if let Some(v) = &req.emoji {
            self.emoji = v.trim().to_string();
        }
        if let Some(v) = req.start_date {
            self.start_date = v;
        }
        if let Some(v) = req.end_date {
            self.end_date = v;
        }
        if let Some(v) = &req.description {
            self.description = v.clone();
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        validate_trip(&self.title, self.start_date, self.end_date)
    }
}

fn validate_trip(
    title: &str,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> Result<(), AppError> {
    if title.trim().is_empty() {
        return Err(AppError::validation("Trip title is required"));
    }
    if let (Some(start), Some(end)) = (start_date, end_date) {
        if end < start {
            return Err(AppError::validation("Trip ends before it starts"));
        }
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct CreateTripRequest {
    pub title: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub emoji: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub description: String,
}

impl CreateTripRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_trip(&self.title, self.start_date, self.end_date)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateTripRequest {
    pub title: Option<String>,
    pub location: Option<String>,
    pub emoji: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub start_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    pub end_date: Option<Option<NaiveDate>>,
    pub description: Option<String>,
}

/// Outcome of the multi-step trip deletion.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct TripDeletion {
    pub photos_deleted: usize,
    pub files_deleted: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trip() -> Trip {
        let now = Utc::now();
        Trip {
            id: Uuid::from_u128(1),
            title: "Lisbon".into(),
            location: "Portugal".into(),
            emoji: "🇵🇹".into(),
            start_date: NaiveDate::from_ymd_opt(2024, 6, 1),
            end_date: NaiveDate::from_ymd_opt(2024, 6, 10),
            description: String::new(),
            created_by: "ada@example.com".into(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_apply_clears_end_date() {
        let mut t = trip();
        let req: UpdateTripRequest = serde_json::from_str(r#"{ "end_date": null }"#).unwrap();
        t.apply(&req);
        assert_eq!(t.end_date, None);
        assert!(t.start_date.is_some());
        assert!(t.validate().is_ok());
    }

    #[test]
    fn test_reject_end_before_start() {
        let mut t = trip();
        t.end_date = NaiveDate::from_ymd_opt(2024, 5, 1);
        assert!(t.validate().is_err());
    }

    #[test]
    fn test_reject_blank_title() {
        let req = CreateTripRequest {
            title: "   ".into(),
            location: String::new(),
            emoji: String::new(),
            start_date: None,
            end_date: None,
            description: String::new(),
        };
        assert!(req.validate().is_err());
    }
}

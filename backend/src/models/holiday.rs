use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::types::HolidayId;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
/// A company non-working date.
pub struct Holiday {
    pub id: HolidayId,
    pub date: NaiveDate,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Holiday {
    pub fn new(date: NaiveDate, name: String) -> Self {
        let now = Utc::now();
        Self {
            id: HolidayId::new(),
            date,
            name,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateHolidayPayload {
    pub date: NaiveDate,
    pub name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HolidayResponse {
    pub id: HolidayId,
    pub date: NaiveDate,
    pub name: String,
}

impl From<Holiday> for HolidayResponse {
    fn from(value: Holiday) -> Self {
        Self {
            id: value.id,
            date: value.date,
            name: value.name,
        }
    }
}

//! Models that represent user accounts, authentication payloads, and role metadata.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::types::{TeamId, UserId};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
/// Database representation of a user account.
pub struct User {
    /// Unique identifier for the user.
    pub id: UserId,
    /// Company-issued employee code, unique among live users.
    pub employee_code: String,
    /// Lower-cased email address, unique among live users.
    pub email: String,
    /// Optional login alias, unique among live users when present.
    pub username: Option<String>,
    /// Argon2 hash of the user's password.
    pub password_hash: String,
    /// Human-readable full name.
    pub name: String,
    /// Role describing the user's privileges.
    pub role: UserRole,
    /// Team membership; scopes what a manager may see and approve.
    pub team_id: Option<TeamId>,
    /// First day of employment, if recorded.
    pub start_date: Option<NaiveDate>,
    /// Active flag; inactive users cannot authenticate.
    pub is_active: bool,
    /// Soft-delete marker. Set strictly in the past when present.
    pub deleted_at: Option<DateTime<Utc>>,
    /// Creation timestamp for auditing.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp for auditing.
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, ToSchema, Default)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
/// Supported user roles stored in the database.
pub enum UserRole {
    /// Standard employee with self-scoped access.
    #[default]
    Employee,
    /// Manager with team-scoped review capabilities.
    Manager,
    /// Administrator with company-wide capabilities.
    Admin,
}

impl UserRole {
    /// Returns the canonical snake_case representation stored in the database.
    pub fn db_value(&self) -> &'static str {
        match self {
            UserRole::Employee => "employee",
            UserRole::Manager => "manager",
            UserRole::Admin => "admin",
        }
    }

    /// Returns the wire representation used in tokens and JSON bodies.
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Employee => "EMPLOYEE",
            UserRole::Manager => "MANAGER",
            UserRole::Admin => "ADMIN",
        }
    }
}

impl Serialize for UserRole {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for UserRole {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            // primary canonical values
            "EMPLOYEE" => Ok(UserRole::Employee),
            "MANAGER" => Ok(UserRole::Manager),
            "ADMIN" => Ok(UserRole::Admin),
            // tolerate stored snake_case values
            "employee" => Ok(UserRole::Employee),
            "manager" => Ok(UserRole::Manager),
            "admin" => Ok(UserRole::Admin),
            other => Err(serde::de::Error::unknown_variant(
                other,
                &["EMPLOYEE", "MANAGER", "ADMIN"],
            )),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
/// Payload for creating a new user account.
pub struct CreateUserPayload {
    #[validate(length(min = 1, max = 50))]
    pub employee_code: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
    pub role: UserRole,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub team_id: Option<TeamId>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Whitelisted partial update for a user. Absent fields are left unchanged;
/// `teamId: ""` clears the assignment while an explicit `null` is rejected.
pub struct UpdateUserPayload {
    pub name: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub team_id: Option<Option<String>>,
    pub is_active: Option<bool>,
    /// Raw date string; must parse as a real `YYYY-MM-DD` date.
    pub start_date: Option<String>,
}

/// Keeps `null` distinguishable from an absent field.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
/// Payload submitted when an administrator resets a user's password.
pub struct ResetPasswordPayload {
    #[validate(length(min = 8))]
    pub new_password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
/// Credentials submitted by a user attempting to authenticate.
pub struct LoginPayload {
    /// Email, employee code, or username.
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
/// Authentication token returned after a successful login.
pub struct LoginResponse {
    pub token: String,
    pub user: UserResponse,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Public-facing representation of a user returned by the API.
pub struct UserResponse {
    pub id: UserId,
    pub employee_code: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub name: String,
    pub role: UserRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<TeamId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<User> for UserResponse {
    /// Converts the persistent user model into the API response DTO.
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id,
            employee_code: user.employee_code,
            email: user.email,
            username: user.username,
            name: user.name,
            role: user.role,
            team_id: user.team_id,
            start_date: user.start_date,
            is_active: user.is_active,
            deleted_at: user.deleted_at,
        }
    }
}

impl User {
    /// Constructs a new live user with freshly generated identifiers.
    pub fn new(
        employee_code: String,
        email: String,
        username: Option<String>,
        password_hash: String,
        name: String,
        role: UserRole,
        team_id: Option<TeamId>,
        start_date: Option<NaiveDate>,
        is_active: bool,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(),
            employee_code,
            email,
            username,
            password_hash,
            name,
            role,
            team_id,
            start_date,
            is_active,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns `true` when the user holds the `Admin` role.
    pub fn is_admin(&self) -> bool {
        matches!(self.role, UserRole::Admin)
    }

    /// Returns `true` when the user is a manager with a team assignment.
    /// A manager without a team has manager capabilities disabled.
    pub fn is_scoped_manager(&self) -> bool {
        matches!(self.role, UserRole::Manager) && self.team_id.is_some()
    }

    /// Returns `true` when the record is soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Returns `true` when this user may see or decide on records owned by
    /// `other`: admins always, scoped managers for their own team.
    pub fn manages(&self, other: &User) -> bool {
        if self.is_admin() {
            return true;
        }
        self.is_scoped_manager() && self.team_id == other.team_id
    }

    /// The last instant at which a soft-deleted record may still be restored.
    pub fn restore_deadline(&self, retention_days: i64) -> Option<DateTime<Utc>> {
        self.deleted_at
            .map(|deleted_at| deleted_at + Duration::days(retention_days))
    }
}

//! The heterogeneous request model: adjust-time, leave, and overtime appeals
//! share one table; per-variant fields are cleared for foreign variants on
//! save so storage never carries cross-contaminated rows.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::types::{RequestId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
/// Discriminates the request variants.
pub enum RequestType {
    AdjustTime,
    Leave,
    OtRequest,
}

impl RequestType {
    pub fn db_value(&self) -> &'static str {
        match self {
            RequestType::AdjustTime => "adjust_time",
            RequestType::Leave => "leave",
            RequestType::OtRequest => "ot_request",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema, Default)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
/// Workflow status. The only legal transitions are PENDING to APPROVED and
/// PENDING to REJECTED.
pub enum RequestStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn db_value(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
/// Supported leave categories.
pub enum LeaveType {
    Annual,
    Sick,
    Unpaid,
}

impl LeaveType {
    pub fn db_value(&self) -> &'static str {
        match self {
            LeaveType::Annual => "annual",
            LeaveType::Sick => "sick",
            LeaveType::Unpaid => "unpaid",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Flat storage row for a request. Fields foreign to `request_type` are
/// always `None`; [`Request::new`] guarantees it at construction.
pub struct Request {
    pub id: RequestId,
    pub user_id: UserId,
    pub request_type: RequestType,
    pub status: RequestStatus,

    // ADJUST_TIME / OT_REQUEST: the nominal date being appealed.
    pub date: Option<NaiveDate>,

    // ADJUST_TIME
    pub check_in_date: Option<NaiveDate>,
    pub check_out_date: Option<NaiveDate>,
    pub requested_check_in_at: Option<DateTime<Utc>>,
    pub requested_check_out_at: Option<DateTime<Utc>>,

    // LEAVE
    pub leave_start_date: Option<NaiveDate>,
    pub leave_end_date: Option<NaiveDate>,
    pub leave_type: Option<LeaveType>,
    pub leave_days_count: Option<i32>,

    // OT_REQUEST
    pub estimated_end_time: Option<DateTime<Utc>>,
    pub actual_ot_minutes: Option<i32>,

    pub reason: String,
    pub approved_by: Option<UserId>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-variant field sets. Constructing a [`Request`] goes through this enum
/// so a variant can never carry another variant's fields.
#[derive(Debug, Clone)]
pub enum RequestDetails {
    AdjustTime {
        date: NaiveDate,
        check_in_date: NaiveDate,
        check_out_date: NaiveDate,
        requested_check_in_at: Option<DateTime<Utc>>,
        requested_check_out_at: Option<DateTime<Utc>>,
    },
    Leave {
        start_date: NaiveDate,
        end_date: NaiveDate,
        leave_type: Option<LeaveType>,
        days_count: i32,
    },
    Overtime {
        date: NaiveDate,
        estimated_end_time: DateTime<Utc>,
    },
}

impl Request {
    /// Creates a new pending request from validated per-variant details.
    pub fn new(user_id: UserId, reason: String, details: RequestDetails) -> Self {
        let now = Utc::now();
        let mut request = Self {
            id: RequestId::new(),
            user_id,
            request_type: RequestType::Leave,
            status: RequestStatus::Pending,
            date: None,
            check_in_date: None,
            check_out_date: None,
            requested_check_in_at: None,
            requested_check_out_at: None,
            leave_start_date: None,
            leave_end_date: None,
            leave_type: None,
            leave_days_count: None,
            estimated_end_time: None,
            actual_ot_minutes: None,
            reason,
            approved_by: None,
            approved_at: None,
            created_at: now,
            updated_at: now,
        };

        match details {
            RequestDetails::AdjustTime {
                date,
                check_in_date,
                check_out_date,
                requested_check_in_at,
                requested_check_out_at,
            } => {
                request.request_type = RequestType::AdjustTime;
                request.date = Some(date);
                request.check_in_date = Some(check_in_date);
                request.check_out_date = Some(check_out_date);
                request.requested_check_in_at = requested_check_in_at;
                request.requested_check_out_at = requested_check_out_at;
            }
            RequestDetails::Leave {
                start_date,
                end_date,
                leave_type,
                days_count,
            } => {
                request.request_type = RequestType::Leave;
                request.leave_start_date = Some(start_date);
                request.leave_end_date = Some(end_date);
                request.leave_type = leave_type;
                request.leave_days_count = Some(days_count);
            }
            RequestDetails::Overtime {
                date,
                estimated_end_time,
            } => {
                request.request_type = RequestType::OtRequest;
                request.date = Some(date);
                request.estimated_end_time = Some(estimated_end_time);
            }
        }

        request
    }

    /// Returns `true` while the request is awaiting a reviewer decision.
    pub fn is_pending(&self) -> bool {
        matches!(self.status, RequestStatus::Pending)
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(tag = "type")]
/// Wire payload for `POST /requests`, dispatched on the `type` tag.
pub enum CreateRequestPayload {
    #[serde(rename = "ADJUST_TIME", rename_all = "camelCase")]
    AdjustTime {
        date: NaiveDate,
        #[serde(default)]
        check_in_date: Option<NaiveDate>,
        #[serde(default)]
        check_out_date: Option<NaiveDate>,
        #[serde(default)]
        requested_check_in_at: Option<DateTime<Utc>>,
        #[serde(default)]
        requested_check_out_at: Option<DateTime<Utc>>,
        reason: String,
    },
    #[serde(rename = "LEAVE", rename_all = "camelCase")]
    Leave {
        leave_start_date: NaiveDate,
        leave_end_date: NaiveDate,
        #[serde(default)]
        leave_type: Option<LeaveType>,
        reason: String,
    },
    #[serde(rename = "OT_REQUEST", rename_all = "camelCase")]
    OtRequest {
        date: NaiveDate,
        estimated_end_time: DateTime<Utc>,
        reason: String,
    },
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// API representation of a request; variant-foreign fields are omitted.
pub struct RequestResponse {
    pub id: RequestId,
    pub user_id: UserId,
    #[serde(rename = "type")]
    pub request_type: RequestType,
    pub status: RequestStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_in_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_out_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_check_in_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_check_out_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leave_start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leave_end_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leave_type: Option<LeaveType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leave_days_count: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_end_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_ot_minutes: Option<i32>,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<Request> for RequestResponse {
    fn from(request: Request) -> Self {
        RequestResponse {
            id: request.id,
            user_id: request.user_id,
            request_type: request.request_type,
            status: request.status,
            date: request.date,
            check_in_date: request.check_in_date,
            check_out_date: request.check_out_date,
            requested_check_in_at: request.requested_check_in_at,
            requested_check_out_at: request.requested_check_out_at,
            leave_start_date: request.leave_start_date,
            leave_end_date: request.leave_end_date,
            leave_type: request.leave_type,
            leave_days_count: request.leave_days_count,
            estimated_end_time: request.estimated_end_time,
            actual_ot_minutes: request.actual_ot_minutes,
            reason: request.reason,
            approved_by: request.approved_by,
            approved_at: request.approved_at,
            created_at: request.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("date")
    }

    #[test]
    fn leave_request_carries_no_adjust_or_ot_fields() {
        let request = Request::new(
            UserId::new(),
            "family trip".into(),
            RequestDetails::Leave {
                start_date: date(2026, 2, 5),
                end_date: date(2026, 2, 10),
                leave_type: Some(LeaveType::Annual),
                days_count: 4,
            },
        );

        assert_eq!(request.request_type, RequestType::Leave);
        assert!(request.date.is_none());
        assert!(request.requested_check_in_at.is_none());
        assert!(request.requested_check_out_at.is_none());
        assert!(request.estimated_end_time.is_none());
        assert_eq!(request.leave_days_count, Some(4));
    }

    #[test]
    fn adjust_request_carries_no_leave_fields() {
        let request = Request::new(
            UserId::new(),
            "forgot to check out".into(),
            RequestDetails::AdjustTime {
                date: date(2026, 2, 5),
                check_in_date: date(2026, 2, 5),
                check_out_date: date(2026, 2, 5),
                requested_check_in_at: None,
                requested_check_out_at: Some(Utc::now()),
            },
        );

        assert_eq!(request.request_type, RequestType::AdjustTime);
        assert!(request.leave_start_date.is_none());
        assert!(request.leave_end_date.is_none());
        assert!(request.leave_type.is_none());
        assert!(request.estimated_end_time.is_none());
    }

    #[test]
    fn new_requests_start_pending_without_reviewer() {
        let request = Request::new(
            UserId::new(),
            "late shipment".into(),
            RequestDetails::Overtime {
                date: date(2026, 2, 5),
                estimated_end_time: Utc::now(),
            },
        );

        assert!(request.is_pending());
        assert!(request.approved_by.is_none());
        assert!(request.approved_at.is_none());
    }

    #[test]
    fn create_payload_dispatches_on_the_type_tag() {
        let raw = r#"{
            "type": "LEAVE",
            "leaveStartDate": "2026-02-08",
            "leaveEndDate": "2026-02-12",
            "leaveType": "ANNUAL",
            "reason": "x"
        }"#;
        let payload: CreateRequestPayload = serde_json::from_str(raw).expect("parse");
        match payload {
            CreateRequestPayload::Leave {
                leave_start_date,
                leave_end_date,
                leave_type,
                reason,
            } => {
                assert_eq!(leave_start_date, date(2026, 2, 8));
                assert_eq!(leave_end_date, date(2026, 2, 12));
                assert_eq!(leave_type, Some(LeaveType::Annual));
                assert_eq!(reason, "x");
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn create_payload_rejects_phantom_dates() {
        let raw = r#"{
            "type": "LEAVE",
            "leaveStartDate": "2026-02-30",
            "leaveEndDate": "2026-03-01",
            "reason": "x"
        }"#;
        assert!(serde_json::from_str::<CreateRequestPayload>(raw).is_err());

        let feb29 = r#"{
            "type": "LEAVE",
            "leaveStartDate": "2024-02-29",
            "leaveEndDate": "2024-02-29",
            "reason": "x"
        }"#;
        assert!(serde_json::from_str::<CreateRequestPayload>(feb29).is_ok());

        let feb29_nonleap = r#"{
            "type": "LEAVE",
            "leaveStartDate": "2026-02-29",
            "leaveEndDate": "2026-03-01",
            "reason": "x"
        }"#;
        assert!(serde_json::from_str::<CreateRequestPayload>(feb29_nonleap).is_err());
    }

    #[test]
    fn response_omits_foreign_fields_on_the_wire() {
        let request = Request::new(
            UserId::new(),
            "family trip".into(),
            RequestDetails::Leave {
                start_date: date(2026, 2, 5),
                end_date: date(2026, 2, 10),
                leave_type: None,
                days_count: 4,
            },
        );
        let value = serde_json::to_value(RequestResponse::from(request)).expect("serialize");

        assert_eq!(value["type"], serde_json::json!("LEAVE"));
        assert_eq!(value["status"], serde_json::json!("PENDING"));
        assert!(value.get("date").is_none());
        assert!(value.get("estimatedEndTime").is_none());
        assert!(value.get("requestedCheckInAt").is_none());
    }
}

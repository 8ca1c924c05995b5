use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub session_ttl_hours: i64,
}

/* -------------------------
   Status enums
   Stored as smallint codes; lowercase strings on the wire.
--------------------------*/

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "smallint")]
#[serde(rename_all = "lowercase")]
#[repr(i16)]
pub enum AppointmentStatus {
    Pending = 0,
    Confirmed = 1,
    Completed = 2,
    Cancelled = 3,
}

impl AppointmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }

    /// Parse a filter value; `None` for unknown strings.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(AppointmentStatus::Pending),
            "confirmed" => Some(AppointmentStatus::Confirmed),
            "completed" => Some(AppointmentStatus::Completed),
            "cancelled" => Some(AppointmentStatus::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "smallint")]
#[serde(rename_all = "lowercase")]
#[repr(i16)]
pub enum PaymentStatus {
    Pending = 0,
    Paid = 1,
    Partial = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "smallint")]
#[serde(rename_all = "lowercase")]
#[repr(i16)]
pub enum PhotoStatus {
    Pending = 0,
    Approved = 1,
    Rejected = 2,
}

impl PhotoStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(PhotoStatus::Pending),
            "approved" => Some(PhotoStatus::Approved),
            "rejected" => Some(PhotoStatus::Rejected),
            _ => None,
        }
    }
}

/// Working shift. Stored on roster accounts; for appointments it is derived
/// from the time label (see `scope.rs`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "smallint")]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum Shift {
    Morning = 0,
    Evening = 1,
    FullDay = 2,
}

impl Shift {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "morning" => Some(Shift::Morning),
            "evening" => Some(Shift::Evening),
            "full_day" | "fullday" | "full-day" => Some(Shift::FullDay),
            _ => None,
        }
    }
}

/* -------------------------
   Roles
--------------------------*/

/// Role mapping according to the salon_user table:
/// 1 Admin, 2 Staff, 3 Reception
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Staff,
    Reception,
}

impl Role {
    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            1 => Some(Role::Admin),
            2 => Some(Role::Staff),
            3 => Some(Role::Reception),
            _ => None,
        }
    }

    pub fn code(self) -> i16 {
        match self {
            Role::Admin => 1,
            Role::Staff => 2,
            Role::Reception => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Staff => "staff",
            Role::Reception => "reception",
        }
    }
}

/* -------------------------
   Domain rows
--------------------------*/

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Appointment {
    pub appointment_id: Uuid,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub email: Option<String>,
    /// Service names in booking order (duplicates allowed).
    pub services: Vec<String>,
    /// Civil date; nullable so a malformed row degrades to "skipped", not a 500.
    pub date: Option<NaiveDate>,
    /// Display label like "10:00 AM"; only parsed for ordering and shift.
    pub time_label: Option<String>,
    pub staff: Option<String>,
    /// Absent means "unset", never zero.
    pub amount_cents: Option<i64>,
    pub status: AppointmentStatus,
    pub payment_status: PaymentStatus,
    pub customer_arrived: bool,
    pub payment_checked: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status_changed_at: Option<DateTime<Utc>>,
    pub status_changed_by: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PhotoSubmission {
    pub photo_id: Uuid,
    pub staff_user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    /// Open set; normalized to lowercase, defaults to "other".
    pub category: String,
    /// Opaque handle to stored media; this server never dereferences it.
    pub image_ref: String,
    pub uploaded_at: DateTime<Utc>,
    pub status: PhotoStatus,
    /// Set if and only if status = rejected.
    pub rejection_reason: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<Uuid>,
}

/// One cell of the 6x7 month grid. Recomputed per request, never stored.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CalendarCell {
    /// `None` for padding cells outside the displayed month.
    pub date: Option<NaiveDate>,
    pub in_current_month: bool,
    pub is_today: bool,
    pub is_selected: bool,
    pub appointment_count: usize,
}

/* -------------------------
   Auth rows + DTOs
--------------------------*/

#[derive(Debug, sqlx::FromRow)]
pub struct UserRow {
    pub user_id: Uuid,
    pub username: String,
    pub display_name: String,
    pub password_hash: String,
    pub roles: i16,
    pub is_active: bool,
}

#[derive(Debug, sqlx::FromRow)]
pub struct SessionTokenRow {
    pub session_token_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    pub device_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub data: LoginResponseData,
}

#[derive(Debug, Serialize)]
pub struct LoginResponseData {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
    pub salon_user: UserProfile,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub data: MeResponseData,
}

#[derive(Debug, Serialize)]
pub struct MeResponseData {
    pub salon_user: UserProfile,
    pub session: SessionInfo,
}

#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub user_id: Uuid,
    pub username: String,
    pub display_name: String,
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub session_token_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/* -------------------------
   Shared response envelopes
--------------------------*/

#[derive(Debug, Serialize)]
pub struct ApiOk<T> {
    pub data: T,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub data: OkData,
}

#[derive(Debug, Serialize)]
pub struct OkData {
    pub ok: bool,
}

// src/routes/appointment_routes.rs

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    calendar,
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{ApiOk, AppState, Appointment, AppointmentStatus, CalendarCell, PaymentStatus, Role, Shift},
    scope::{self, AppointmentFilters},
    workflow,
};

/*
Roles (salon_user.roles):
1 admin
2 staff
3 reception
*/

fn is_admin(auth: &AuthContext) -> bool {
    auth.role == Role::Admin
}
fn is_staff(auth: &AuthContext) -> bool {
    auth.role == Role::Staff
}
fn is_reception(auth: &AuthContext) -> bool {
    auth.role == Role::Reception
}

fn can_manage_bookings(auth: &AuthContext) -> bool {
    is_admin(auth) || is_reception(auth)
}

fn ensure_manage(auth: &AuthContext) -> Result<(), ApiError> {
    if can_manage_bookings(auth) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "FORBIDDEN",
            "Only admin/reception can manage bookings".into(),
        ))
    }
}

fn ensure_can_transition(auth: &AuthContext, appointment: &Appointment) -> Result<(), ApiError> {
    if is_admin(auth) {
        return Ok(());
    }
    if is_staff(auth) && scope::may_view(appointment, &auth.caller()) {
        return Ok(());
    }
    Err(ApiError::Forbidden(
        "FORBIDDEN",
        "Only admin or the assigned staff member can change booking status".into(),
    ))
}

fn parse_civil_date(s: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest("VALIDATION_ERROR", "date must be YYYY-MM-DD".into()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/appointments", get(list_appointments).post(create_appointment))
        .route("/appointments/calendar", get(get_calendar))
        .route("/appointments/date/{date}", get(get_appointments_for_date))
        .route(
            "/appointments/{appointment_id}",
            get(get_appointment).patch(patch_appointment),
        )
        .route(
            "/appointments/{appointment_id}/transition",
            post(transition_appointment),
        )
        .route("/appointments/{appointment_id}/arrived", post(set_arrived))
        .route(
            "/appointments/{appointment_id}/payment_checked",
            post(set_payment_checked),
        )
}

/* ============================================================
   Query params
   ============================================================ */

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// pending | confirmed | completed | cancelled | all (default)
    pub status: Option<String>,
    /// free text: customer name, email or phone
    pub q: Option<String>,
    /// morning | evening | full_day
    pub shift: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    pub year: i32,
    pub month: u32,
    /// YYYY-MM-DD; may point outside the displayed month
    pub selected: Option<String>,
}

fn parse_filters(q: &ListQuery) -> Result<AppointmentFilters, ApiError> {
    let status = match q.status.as_deref().map(str::trim) {
        None | Some("") | Some("all") => None,
        Some(s) => Some(AppointmentStatus::parse(s).ok_or_else(|| {
            ApiError::BadRequest("VALIDATION_ERROR", format!("unknown status filter: {s}"))
        })?),
    };
    let shift = match q.shift.as_deref().map(str::trim) {
        None | Some("") | Some("all") => None,
        Some(s) => Some(Shift::parse(s).ok_or_else(|| {
            ApiError::BadRequest("VALIDATION_ERROR", format!("unknown shift filter: {s}"))
        })?),
    };
    Ok(AppointmentFilters {
        status,
        search: q.q.clone(),
        shift,
    })
}

/* ============================================================
   GET /appointments
   ============================================================ */

pub async fn list_appointments(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(q): Query<ListQuery>,
) -> Result<Json<ApiOk<Vec<Appointment>>>, ApiError> {
    let filters = parse_filters(&q)?;

    let rows: Vec<Appointment> = sqlx::query_as::<_, Appointment>(
        r#"
        SELECT
          appointment_id, customer_name, customer_phone, email, services,
          date, time_label, staff, amount_cents, status, payment_status,
          customer_arrived, payment_checked, notes,
          created_at, updated_at, status_changed_at, status_changed_by
        FROM appointment
        ORDER BY date ASC NULLS LAST, created_at ASC
        LIMIT 500
        "#,
    )
    .fetch_all(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    let visible = scope::visible_to(rows, &auth.caller());
    let filtered = scope::apply_filters(visible, &filters);

    Ok(Json(ApiOk { data: filtered }))
}

/* ============================================================
   GET /appointments/date/{date}
   ============================================================ */

pub async fn get_appointments_for_date(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(date): Path<String>,
) -> Result<Json<ApiOk<Vec<Appointment>>>, ApiError> {
    let date = parse_civil_date(&date)?;

    let rows: Vec<Appointment> = sqlx::query_as::<_, Appointment>(
        r#"
        SELECT
          appointment_id, customer_name, customer_phone, email, services,
          date, time_label, staff, amount_cents, status, payment_status,
          customer_arrived, payment_checked, notes,
          created_at, updated_at, status_changed_at, status_changed_by
        FROM appointment
        WHERE date = $1
        ORDER BY created_at ASC
        "#,
    )
    .bind(date)
    .fetch_all(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    let mut visible = scope::visible_to(rows, &auth.caller());
    calendar::sort_by_time(&mut visible);

    Ok(Json(ApiOk { data: visible }))
}

/* ============================================================
   GET /appointments/calendar
   ============================================================ */

#[derive(Debug, Serialize)]
pub struct CalendarData {
    pub year: i32,
    pub month: u32,
    pub cells: Vec<CalendarCell>,
}

pub async fn get_calendar(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(q): Query<CalendarQuery>,
) -> Result<Json<ApiOk<CalendarData>>, ApiError> {
    let first = NaiveDate::from_ymd_opt(q.year, q.month, 1).ok_or_else(|| {
        ApiError::BadRequest("VALIDATION_ERROR", "year/month is not a real month".into())
    })?;
    let next_first = if q.month == 12 {
        NaiveDate::from_ymd_opt(q.year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(q.year, q.month + 1, 1)
    }
    .ok_or_else(|| ApiError::Internal("month arithmetic overflow".into()))?;

    let selected = match q.selected.as_deref() {
        Some(s) if !s.trim().is_empty() => Some(parse_civil_date(s)?),
        _ => None,
    };

    let rows: Vec<Appointment> = sqlx::query_as::<_, Appointment>(
        r#"
        SELECT
          appointment_id, customer_name, customer_phone, email, services,
          date, time_label, staff, amount_cents, status, payment_status,
          customer_arrived, payment_checked, notes,
          created_at, updated_at, status_changed_at, status_changed_by
        FROM appointment
        WHERE date >= $1
          AND date <  $2
        ORDER BY created_at ASC
        "#,
    )
    .bind(first)
    .bind(next_first)
    .fetch_all(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    let visible = scope::visible_to(rows, &auth.caller());
    let counts = calendar::counts_by_date(&visible, q.year, q.month);

    let today = Utc::now().date_naive();
    let cells = calendar::generate_grid(q.year, q.month, today, selected, &counts)
        .ok_or_else(|| ApiError::BadRequest("VALIDATION_ERROR", "year/month is not a real month".into()))?;

    Ok(Json(ApiOk {
        data: CalendarData {
            year: q.year,
            month: q.month,
            cells,
        },
    }))
}

/* ============================================================
   GET /appointments/{id}
   ============================================================ */

async fn load_appointment(state: &AppState, appointment_id: Uuid) -> Result<Appointment, ApiError> {
    sqlx::query_as::<_, Appointment>(
        r#"
        SELECT
          appointment_id, customer_name, customer_phone, email, services,
          date, time_label, staff, amount_cents, status, payment_status,
          customer_arrived, payment_checked, notes,
          created_at, updated_at, status_changed_at, status_changed_by
        FROM appointment
        WHERE appointment_id = $1
        "#,
    )
    .bind(appointment_id)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?
    .ok_or_else(|| ApiError::not_found("appointment"))
}

pub async fn get_appointment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<ApiOk<Appointment>>, ApiError> {
    let appointment = load_appointment(&state, appointment_id).await?;
    if !scope::may_view(&appointment, &auth.caller()) {
        return Err(ApiError::Forbidden(
            "FORBIDDEN",
            "Staff can only view their own bookings".into(),
        ));
    }
    Ok(Json(ApiOk { data: appointment }))
}

/* ============================================================
   POST /appointments (create)
   ============================================================ */

#[derive(Debug, Deserialize)]
pub struct CreateAppointmentRequest {
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub email: Option<String>,
    pub services: Vec<String>,
    pub date: String, // YYYY-MM-DD, immutable afterwards
    pub time_label: Option<String>,
    pub staff: Option<String>,
    pub amount_cents: Option<i64>,
    pub payment_status: Option<PaymentStatus>,
    pub notes: Option<String>,
}

pub async fn create_appointment(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<CreateAppointmentRequest>,
) -> Result<Json<ApiOk<Appointment>>, ApiError> {
    ensure_manage(&auth)?;

    let customer_name = req.customer_name.trim().to_string();
    if customer_name.is_empty() {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "customer_name is required".into(),
        ));
    }
    if req.services.is_empty() || req.services.iter().any(|s| s.trim().is_empty()) {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "at least one non-empty service is required".into(),
        ));
    }
    if let Some(amount) = req.amount_cents {
        if amount < 0 {
            return Err(ApiError::BadRequest(
                "VALIDATION_ERROR",
                "amount_cents must not be negative".into(),
            ));
        }
    }
    let date = parse_civil_date(&req.date)?;

    let created: Appointment = sqlx::query_as::<_, Appointment>(
        r#"
        INSERT INTO appointment (
          customer_name, customer_phone, email, services, date, time_label,
          staff, amount_cents, status, payment_status,
          customer_arrived, payment_checked, notes, created_by_user_id
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 0, $9, false, false, $10, $11)
        RETURNING
          appointment_id, customer_name, customer_phone, email, services,
          date, time_label, staff, amount_cents, status, payment_status,
          customer_arrived, payment_checked, notes,
          created_at, updated_at, status_changed_at, status_changed_by
        "#,
    )
    .bind(&customer_name)
    .bind(req.customer_phone.as_deref().map(str::trim))
    .bind(req.email.as_deref().map(str::trim))
    .bind(&req.services)
    .bind(date)
    .bind(req.time_label.as_deref().map(str::trim))
    .bind(req.staff.as_deref().map(str::trim))
    .bind(req.amount_cents)
    .bind(req.payment_status.unwrap_or(PaymentStatus::Pending))
    .bind(req.notes)
    .bind(auth.user_id)
    .fetch_one(&state.db)
    .await
    .map_err(|e| ApiError::BadRequest("APPOINTMENT_CREATE_FAILED", format!("{e}")))?;

    tracing::info!(appointment_id = %created.appointment_id, "booking created");
    Ok(Json(ApiOk { data: created }))
}

/* ============================================================
   PATCH /appointments/{id}  (non-lifecycle fields only)
   ============================================================ */

#[derive(Debug, Deserialize)]
pub struct PatchAppointmentRequest {
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub email: Option<String>,
    pub services: Option<Vec<String>>,
    pub time_label: Option<String>,
    pub staff: Option<String>,
    pub amount_cents: Option<i64>,
    pub payment_status: Option<PaymentStatus>,
    pub notes: Option<String>,
}

pub async fn patch_appointment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(appointment_id): Path<Uuid>,
    Json(req): Json<PatchAppointmentRequest>,
) -> Result<Json<ApiOk<Appointment>>, ApiError> {
    ensure_manage(&auth)?;

    if let Some(name) = req.customer_name.as_deref() {
        if name.trim().is_empty() {
            return Err(ApiError::BadRequest(
                "VALIDATION_ERROR",
                "customer_name must not be blank".into(),
            ));
        }
    }
    if let Some(services) = &req.services {
        if services.is_empty() || services.iter().any(|s| s.trim().is_empty()) {
            return Err(ApiError::BadRequest(
                "VALIDATION_ERROR",
                "services must not be empty".into(),
            ));
        }
    }
    if let Some(amount) = req.amount_cents {
        if amount < 0 {
            return Err(ApiError::BadRequest(
                "VALIDATION_ERROR",
                "amount_cents must not be negative".into(),
            ));
        }
    }

    // Status, the desk flags and the date are deliberately absent here:
    // status moves only through /transition, the flags through their
    // toggles, and the date never.
    let updated: Option<Appointment> = sqlx::query_as::<_, Appointment>(
        r#"
        UPDATE appointment
        SET
          customer_name  = COALESCE($2, customer_name),
          customer_phone = COALESCE($3, customer_phone),
          email          = COALESCE($4, email),
          services       = COALESCE($5, services),
          time_label     = COALESCE($6, time_label),
          staff          = COALESCE($7, staff),
          amount_cents   = COALESCE($8, amount_cents),
          payment_status = COALESCE($9, payment_status),
          notes          = COALESCE($10, notes),
          updated_at = now(),
          updated_by_user_id = $11
        WHERE appointment_id = $1
        RETURNING
          appointment_id, customer_name, customer_phone, email, services,
          date, time_label, staff, amount_cents, status, payment_status,
          customer_arrived, payment_checked, notes,
          created_at, updated_at, status_changed_at, status_changed_by
        "#,
    )
    .bind(appointment_id)
    .bind(req.customer_name.as_deref().map(str::trim))
    .bind(req.customer_phone.as_deref().map(str::trim))
    .bind(req.email.as_deref().map(str::trim))
    .bind(req.services)
    .bind(req.time_label.as_deref().map(str::trim))
    .bind(req.staff.as_deref().map(str::trim))
    .bind(req.amount_cents)
    .bind(req.payment_status)
    .bind(req.notes)
    .bind(auth.user_id)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| ApiError::BadRequest("APPOINTMENT_UPDATE_FAILED", format!("{e}")))?;

    let updated = updated.ok_or_else(|| ApiError::not_found("appointment"))?;
    Ok(Json(ApiOk { data: updated }))
}

/* ============================================================
   POST /appointments/{id}/transition
   ============================================================ */

#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    pub status: AppointmentStatus,
}

pub async fn transition_appointment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(appointment_id): Path<Uuid>,
    Json(req): Json<TransitionRequest>,
) -> Result<Json<ApiOk<Appointment>>, ApiError> {
    let current = load_appointment(&state, appointment_id).await?;
    ensure_can_transition(&auth, &current)?;

    let updated = workflow::transition(&current, req.status, auth.user_id, Utc::now())?;

    // Optimistic per-appointment serialization: the update only lands if the
    // status is still the one the transition was validated against.
    let persisted: Option<Appointment> = sqlx::query_as::<_, Appointment>(
        r#"
        UPDATE appointment
        SET status = $2,
            status_changed_at = $3,
            status_changed_by = $4,
            updated_at = $3,
            updated_by_user_id = $4
        WHERE appointment_id = $1
          AND status = $5
        RETURNING
          appointment_id, customer_name, customer_phone, email, services,
          date, time_label, staff, amount_cents, status, payment_status,
          customer_arrived, payment_checked, notes,
          created_at, updated_at, status_changed_at, status_changed_by
        "#,
    )
    .bind(appointment_id)
    .bind(updated.status)
    .bind(updated.status_changed_at)
    .bind(auth.user_id)
    .bind(current.status)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    let Some(persisted) = persisted else {
        return Err(ApiError::Conflict(
            "CONCURRENT_UPDATE",
            "booking status changed concurrently, reload and retry".into(),
        ));
    };

    tracing::info!(
        appointment_id = %appointment_id,
        from = current.status.as_str(),
        to = persisted.status.as_str(),
        actor = %auth.user_id,
        "booking status changed"
    );
    Ok(Json(ApiOk { data: persisted }))
}

/* ============================================================
   Reception desk toggles
   ============================================================ */

#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    pub value: bool,
}

async fn set_desk_flag(
    state: &AppState,
    auth: &AuthContext,
    appointment_id: Uuid,
    column: DeskFlag,
    value: bool,
) -> Result<Appointment, ApiError> {
    if !auth.caller().can_set_reception_flags() {
        return Err(ApiError::Forbidden(
            "FORBIDDEN",
            "Only reception can update desk flags".into(),
        ));
    }

    let current = load_appointment(state, appointment_id).await?;
    workflow::ensure_flags_mutable(&current)?;

    let sql = match column {
        DeskFlag::Arrived => {
            r#"
            UPDATE appointment
            SET customer_arrived = $2,
                updated_at = now(),
                updated_by_user_id = $3
            WHERE appointment_id = $1
              AND status IN (0, 1)
            RETURNING
              appointment_id, customer_name, customer_phone, email, services,
              date, time_label, staff, amount_cents, status, payment_status,
              customer_arrived, payment_checked, notes,
              created_at, updated_at, status_changed_at, status_changed_by
            "#
        }
        DeskFlag::PaymentChecked => {
            r#"
            UPDATE appointment
            SET payment_checked = $2,
                updated_at = now(),
                updated_by_user_id = $3
            WHERE appointment_id = $1
              AND status IN (0, 1)
            RETURNING
              appointment_id, customer_name, customer_phone, email, services,
              date, time_label, staff, amount_cents, status, payment_status,
              customer_arrived, payment_checked, notes,
              created_at, updated_at, status_changed_at, status_changed_by
            "#
        }
    };

    let persisted: Option<Appointment> = sqlx::query_as::<_, Appointment>(sql)
        .bind(appointment_id)
        .bind(value)
        .bind(auth.user_id)
        .fetch_optional(&state.db)
        .await
        .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    // The flag guard passed a moment ago, so an empty update means the
    // booking reached a terminal status in between.
    persisted.ok_or_else(|| {
        ApiError::Conflict(
            "CONCURRENT_UPDATE",
            "booking reached a terminal status concurrently".into(),
        )
    })
}

pub async fn set_arrived(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(appointment_id): Path<Uuid>,
    Json(req): Json<ToggleRequest>,
) -> Result<Json<ApiOk<Appointment>>, ApiError> {
    let updated = set_desk_flag(&state, &auth, appointment_id, DeskFlag::Arrived, req.value).await?;
    Ok(Json(ApiOk { data: updated }))
}

pub async fn set_payment_checked(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(appointment_id): Path<Uuid>,
    Json(req): Json<ToggleRequest>,
) -> Result<Json<ApiOk<Appointment>>, ApiError> {
    let updated =
        set_desk_flag(&state, &auth, appointment_id, DeskFlag::PaymentChecked, req.value).await?;
    Ok(Json(ApiOk { data: updated }))
}

#[derive(Debug, Clone, Copy)]
enum DeskFlag {
    Arrived,
    PaymentChecked,
}

// src/routes/staff_routes.rs

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::hash_password,
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{ApiOk, AppState, OkData, OkResponse, Role, Shift},
};

fn ensure_admin(auth: &AuthContext) -> Result<(), ApiError> {
    if auth.role == Role::Admin {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "FORBIDDEN",
            "Only admin can manage the roster".into(),
        ))
    }
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct RosterRow {
    pub user_id: Uuid,
    pub username: String,
    pub display_name: String,
    pub roles: i16,
    pub shift: Option<Shift>,
    pub is_active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        // /api/v1/staff
        .route("/", get(list_roster).post(create_account))
        // /api/v1/staff/{user_id}
        .route("/{user_id}", get(get_account).patch(update_account))
        .route("/{user_id}/disable", post(disable_account))
        .route("/{user_id}/enable", post(enable_account))
}

/* ============================================================
   GET /staff  (admin roster, searchable)
   ============================================================ */

#[derive(Debug, Deserialize)]
pub struct RosterQuery {
    /// staff | reception; default both
    pub role: Option<String>,
    /// morning | evening | full_day
    pub shift: Option<String>,
    /// name search
    pub q: Option<String>,
}

pub async fn list_roster(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(q): Query<RosterQuery>,
) -> Result<Json<ApiOk<Vec<RosterRow>>>, ApiError> {
    ensure_admin(&auth)?;

    let role_code = match q.role.as_deref().map(str::trim) {
        None | Some("") | Some("all") => None,
        Some("staff") => Some(Role::Staff.code()),
        Some("reception") => Some(Role::Reception.code()),
        Some(other) => {
            return Err(ApiError::BadRequest(
                "VALIDATION_ERROR",
                format!("unknown role filter: {other}"),
            ))
        }
    };
    let shift = match q.shift.as_deref().map(str::trim) {
        None | Some("") | Some("all") => None,
        Some(s) => Some(Shift::parse(s).ok_or_else(|| {
            ApiError::BadRequest("VALIDATION_ERROR", format!("unknown shift filter: {s}"))
        })?),
    };
    let name_pattern = q
        .q
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{s}%"));

    let rows: Vec<RosterRow> = sqlx::query_as::<_, RosterRow>(
        r#"
        SELECT user_id, username, display_name, roles, shift, is_active, created_at
        FROM salon_user
        WHERE roles IN (2, 3)
          AND ($1::smallint IS NULL OR roles = $1)
          AND ($2::smallint IS NULL OR shift = $2)
          AND ($3::text IS NULL OR username ILIKE $3 OR display_name ILIKE $3)
        ORDER BY created_at DESC
        LIMIT 200
        "#,
    )
    .bind(role_code)
    .bind(shift)
    .bind(name_pattern)
    .fetch_all(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    Ok(Json(ApiOk { data: rows }))
}

pub async fn get_account(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(user_id): Path<Uuid>,
) -> Result<Json<ApiOk<RosterRow>>, ApiError> {
    ensure_admin(&auth)?;

    let row: RosterRow = sqlx::query_as::<_, RosterRow>(
        r#"
        SELECT user_id, username, display_name, roles, shift, is_active, created_at
        FROM salon_user
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?
    .ok_or_else(|| ApiError::not_found("user"))?;

    Ok(Json(ApiOk { data: row }))
}

/* ============================================================
   Validation helpers
   ============================================================ */

fn parse_account_role(role: &str) -> Result<Role, ApiError> {
    match role.trim() {
        "admin" => Ok(Role::Admin),
        "staff" => Ok(Role::Staff),
        "reception" => Ok(Role::Reception),
        other => Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            format!("role must be admin/staff/reception, got: {other}"),
        )),
    }
}

fn validate_username(username: &str) -> Result<(), ApiError> {
    let u = username.trim();
    if u.is_empty() {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "username is required".into(),
        ));
    }
    if u.len() < 3 {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "username must be at least 3 characters".into(),
        ));
    }
    Ok(())
}

fn validate_display_name(display_name: &str) -> Result<(), ApiError> {
    if display_name.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "display_name is required".into(),
        ));
    }
    Ok(())
}

fn validate_password(pw: &str) -> Result<(), ApiError> {
    if pw.trim().len() < 8 {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "password must be at least 8 characters".into(),
        ));
    }
    Ok(())
}

/* ============================================================
   POST /staff  (create account)
   ============================================================ */

#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub username: String,
    pub display_name: String,
    pub password: String,
    /// admin | staff | reception
    pub role: String,
    /// morning | evening | full_day (roster attribute, optional)
    pub shift: Option<String>,
    pub is_active: Option<bool>,
}

pub async fn create_account(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<CreateAccountRequest>,
) -> Result<Json<ApiOk<RosterRow>>, ApiError> {
    ensure_admin(&auth)?;

    validate_username(&req.username)?;
    validate_display_name(&req.display_name)?;
    validate_password(&req.password)?;
    let role = parse_account_role(&req.role)?;
    let shift = match req.shift.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(s) => Some(Shift::parse(s).ok_or_else(|| {
            ApiError::BadRequest("VALIDATION_ERROR", format!("unknown shift: {s}"))
        })?),
    };

    let pw_hash = hash_password(req.password.trim()).map_err(ApiError::Internal)?;

    let created: RosterRow = sqlx::query_as::<_, RosterRow>(
        r#"
        INSERT INTO salon_user (username, display_name, password_hash, roles, shift, is_active)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING user_id, username, display_name, roles, shift, is_active, created_at
        "#,
    )
    .bind(req.username.trim())
    .bind(req.display_name.trim())
    .bind(&pw_hash)
    .bind(role.code())
    .bind(shift)
    .bind(req.is_active.unwrap_or(true))
    .fetch_one(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    tracing::info!(user_id = %created.user_id, role = role.as_str(), "account created");
    Ok(Json(ApiOk { data: created }))
}

/* ============================================================
   PATCH /staff/{user_id}
   ============================================================ */

#[derive(Debug, Deserialize)]
pub struct UpdateAccountRequest {
    pub display_name: Option<String>,
    pub shift: Option<String>,
    pub is_active: Option<bool>,
}

pub async fn update_account(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(user_id): Path<Uuid>,
    Json(req): Json<UpdateAccountRequest>,
) -> Result<Json<ApiOk<RosterRow>>, ApiError> {
    ensure_admin(&auth)?;

    if let Some(name) = req.display_name.as_deref() {
        validate_display_name(name)?;
    }
    let shift = match req.shift.as_deref().map(str::trim) {
        None => None,
        Some("") => None,
        Some(s) => Some(Shift::parse(s).ok_or_else(|| {
            ApiError::BadRequest("VALIDATION_ERROR", format!("unknown shift: {s}"))
        })?),
    };

    let updated: RosterRow = sqlx::query_as::<_, RosterRow>(
        r#"
        UPDATE salon_user
        SET display_name = COALESCE($2, display_name),
            shift        = COALESCE($3, shift),
            is_active    = COALESCE($4, is_active)
        WHERE user_id = $1
        RETURNING user_id, username, display_name, roles, shift, is_active, created_at
        "#,
    )
    .bind(user_id)
    .bind(req.display_name.as_deref().map(str::trim))
    .bind(shift)
    .bind(req.is_active)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?
    .ok_or_else(|| ApiError::not_found("user"))?;

    Ok(Json(ApiOk { data: updated }))
}

/* ============================================================
   Enable / disable
   ============================================================ */

async fn set_active(state: &AppState, user_id: Uuid, active: bool) -> Result<(), ApiError> {
    let res = sqlx::query(
        r#"
        UPDATE salon_user
        SET is_active = $2
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .bind(active)
    .execute(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    if res.rows_affected() == 0 {
        return Err(ApiError::not_found("user"));
    }
    Ok(())
}

pub async fn disable_account(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(user_id): Path<Uuid>,
) -> Result<Json<OkResponse>, ApiError> {
    ensure_admin(&auth)?;
    set_active(&state, user_id, false).await?;
    Ok(Json(OkResponse {
        data: OkData { ok: true },
    }))
}

pub async fn enable_account(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(user_id): Path<Uuid>,
) -> Result<Json<OkResponse>, ApiError> {
    ensure_admin(&auth)?;
    set_active(&state, user_id, true).await?;
    Ok(Json(OkResponse {
        data: OkData { ok: true },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_role_parsing() {
        assert_eq!(parse_account_role("staff").unwrap(), Role::Staff);
        assert_eq!(parse_account_role(" reception ").unwrap(), Role::Reception);
        assert_eq!(parse_account_role("admin").unwrap(), Role::Admin);
        assert!(parse_account_role("manager").is_err());
    }

    #[test]
    fn username_rules() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("al").is_err());
        assert!(validate_username("   ").is_err());
    }

    #[test]
    fn password_rules() {
        assert!(validate_password("password123").is_ok());
        assert!(validate_password("short").is_err());
    }
}

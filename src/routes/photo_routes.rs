// src/routes/photo_routes.rs

use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{ApiOk, AppState, PhotoStatus, PhotoSubmission, Role},
    workflow::{self, ReviewDecision},
};

fn ensure_admin(auth: &AuthContext) -> Result<(), ApiError> {
    if auth.role == Role::Admin {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "FORBIDDEN",
            "Only admin can moderate photos".into(),
        ))
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/photos", get(list_photos).post(submit_photo))
        .route("/photos/stats", get(photo_stats))
        .route("/photos/{photo_id}/review", put(review_photo))
}

const PHOTO_COLUMNS: &str = r#"
  photo_id, staff_user_id, title, description, category, image_ref,
  uploaded_at, status, rejection_reason, reviewed_at, reviewed_by
"#;

async fn load_photo(state: &AppState, photo_id: Uuid) -> Result<PhotoSubmission, ApiError> {
    sqlx::query_as::<_, PhotoSubmission>(&format!(
        "SELECT {PHOTO_COLUMNS} FROM staff_photo WHERE photo_id = $1"
    ))
    .bind(photo_id)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?
    .ok_or_else(|| ApiError::not_found("photo"))
}

/* ============================================================
   POST /photos  (staff submission)
   ============================================================ */

#[derive(Debug, Deserialize)]
pub struct SubmitPhotoRequest {
    pub title: String,
    pub description: Option<String>,
    /// Open set; anything blank becomes "other".
    pub category: Option<String>,
    /// Opaque handle produced by the upload flow.
    pub image_ref: String,
}

pub async fn submit_photo(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<SubmitPhotoRequest>,
) -> Result<Json<ApiOk<PhotoSubmission>>, ApiError> {
    if auth.role != Role::Staff {
        return Err(ApiError::Forbidden(
            "FORBIDDEN",
            "Only staff accounts submit portfolio photos".into(),
        ));
    }

    let title = req.title.trim().to_string();
    if title.is_empty() {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "title is required".into(),
        ));
    }
    if req.image_ref.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "image_ref is required".into(),
        ));
    }
    let category = match req.category.as_deref().map(str::trim) {
        Some(c) if !c.is_empty() => c.to_ascii_lowercase(),
        _ => "other".to_string(),
    };

    let created: PhotoSubmission = sqlx::query_as::<_, PhotoSubmission>(&format!(
        r#"
        INSERT INTO staff_photo
            (staff_user_id, title, description, category, image_ref, status)
        VALUES
            ($1, $2, $3, $4, $5, 0)
        RETURNING {PHOTO_COLUMNS}
        "#
    ))
    .bind(auth.user_id)
    .bind(&title)
    .bind(req.description.as_deref().map(str::trim))
    .bind(&category)
    .bind(req.image_ref.trim())
    .fetch_one(&state.db)
    .await
    .map_err(|e| ApiError::BadRequest("PHOTO_CREATE_FAILED", format!("{e}")))?;

    tracing::info!(photo_id = %created.photo_id, staff = %auth.user_id, "photo submitted for review");
    Ok(Json(ApiOk { data: created }))
}

/* ============================================================
   GET /photos
   ============================================================ */

#[derive(Debug, Deserialize)]
pub struct PhotoListQuery {
    /// pending | approved | rejected | all (default)
    pub status: Option<String>,
    pub category: Option<String>,
}

pub async fn list_photos(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(q): Query<PhotoListQuery>,
) -> Result<Json<ApiOk<Vec<PhotoSubmission>>>, ApiError> {
    // Admin moderates everything; staff see their own uploads only.
    let rows: Vec<PhotoSubmission> = match auth.role {
        Role::Admin => sqlx::query_as::<_, PhotoSubmission>(&format!(
            "SELECT {PHOTO_COLUMNS} FROM staff_photo ORDER BY uploaded_at DESC LIMIT 500"
        ))
        .fetch_all(&state.db)
        .await,
        Role::Staff => sqlx::query_as::<_, PhotoSubmission>(&format!(
            r#"
            SELECT {PHOTO_COLUMNS} FROM staff_photo
            WHERE staff_user_id = $1
            ORDER BY uploaded_at DESC
            LIMIT 500
            "#
        ))
        .bind(auth.user_id)
        .fetch_all(&state.db)
        .await,
        Role::Reception => {
            return Err(ApiError::Forbidden(
                "FORBIDDEN",
                "Reception has no access to portfolio photos".into(),
            ))
        }
    }
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    let status = match q.status.as_deref().map(str::trim) {
        None | Some("") | Some("all") => None,
        Some(s) => Some(PhotoStatus::parse(s).ok_or_else(|| {
            ApiError::BadRequest("VALIDATION_ERROR", format!("unknown status filter: {s}"))
        })?),
    };
    let category = q
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_ascii_lowercase);

    let filtered: Vec<PhotoSubmission> = rows
        .into_iter()
        .filter(|p| status.is_none_or(|s| p.status == s))
        .filter(|p| category.as_deref().is_none_or(|c| p.category == c))
        .collect();

    Ok(Json(ApiOk { data: filtered }))
}

/* ============================================================
   PUT /photos/{id}/review
   ============================================================ */

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub decision: ReviewDecision,
    pub reason: Option<String>,
}

pub async fn review_photo(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(photo_id): Path<Uuid>,
    Json(req): Json<ReviewRequest>,
) -> Result<Json<ApiOk<PhotoSubmission>>, ApiError> {
    ensure_admin(&auth)?;

    let current = load_photo(&state, photo_id).await?;
    let reviewed = workflow::review(
        &current,
        req.decision,
        req.reason.as_deref(),
        auth.user_id,
        Utc::now(),
    )?;

    // Only one reviewer wins: the row must still be pending when we write.
    let persisted: Option<PhotoSubmission> = sqlx::query_as::<_, PhotoSubmission>(&format!(
        r#"
        UPDATE staff_photo
        SET status = $2,
            rejection_reason = $3,
            reviewed_at = $4,
            reviewed_by = $5
        WHERE photo_id = $1
          AND status = 0
        RETURNING {PHOTO_COLUMNS}
        "#
    ))
    .bind(photo_id)
    .bind(reviewed.status)
    .bind(reviewed.rejection_reason.as_deref())
    .bind(reviewed.reviewed_at)
    .bind(auth.user_id)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    let Some(persisted) = persisted else {
        return Err(ApiError::Conflict(
            "CONCURRENT_UPDATE",
            "photo was reviewed concurrently".into(),
        ));
    };

    tracing::info!(
        photo_id = %photo_id,
        decision = ?req.decision,
        actor = %auth.user_id,
        "photo reviewed"
    );
    Ok(Json(ApiOk { data: persisted }))
}

/* ============================================================
   GET /photos/stats
   ============================================================ */

#[derive(Debug, Serialize)]
pub struct PhotoStatsData {
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
}

pub async fn photo_stats(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<ApiOk<PhotoStatsData>>, ApiError> {
    ensure_admin(&auth)?;

    let (pending, approved, rejected): (i64, i64, i64) = sqlx::query_as(
        r#"
        SELECT
          count(*) FILTER (WHERE status = 0),
          count(*) FILTER (WHERE status = 1),
          count(*) FILTER (WHERE status = 2)
        FROM staff_photo
        "#,
    )
    .fetch_one(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    Ok(Json(ApiOk {
        data: PhotoStatsData {
            pending,
            approved,
            rejected,
        },
    }))
}

// src/workflow.rs
//
// Lifecycle rules for appointments and staff photo submissions. Everything
// here is a pure function over in-memory values: callers decide when "now"
// is and who the actor was, and the routes own persistence.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::WorkflowError,
    models::{Appointment, AppointmentStatus, PhotoStatus, PhotoSubmission},
};

/* ============================================================
   Appointment lifecycle
   ============================================================ */

/// Terminal statuses admit no further transition and freeze the
/// reception flags (arrived / payment checked).
pub fn is_terminal(status: AppointmentStatus) -> bool {
    matches!(
        status,
        AppointmentStatus::Completed | AppointmentStatus::Cancelled
    )
}

/// The full transition table. Confirmation must precede completion;
/// cancellation is allowed until the appointment completes.
pub fn can_transition(from: AppointmentStatus, to: AppointmentStatus) -> bool {
    use AppointmentStatus::*;
    matches!(
        (from, to),
        (Pending, Confirmed) | (Pending, Cancelled) | (Confirmed, Completed) | (Confirmed, Cancelled)
    )
}

/// Apply a status transition, recording who moved it and when.
///
/// Returns the updated appointment; the caller persists it. A terminal
/// source status fails before the table is consulted, so "re-cancelling a
/// cancelled appointment" reports the terminal state rather than a missing
/// edge.
pub fn transition(
    appointment: &Appointment,
    to: AppointmentStatus,
    actor: Uuid,
    at: DateTime<Utc>,
) -> Result<Appointment, WorkflowError> {
    let from = appointment.status;
    if is_terminal(from) {
        return Err(WorkflowError::TerminalState { status: from });
    }
    if !can_transition(from, to) {
        return Err(WorkflowError::InvalidTransition { from, to });
    }

    let mut updated = appointment.clone();
    updated.status = to;
    updated.status_changed_at = Some(at);
    updated.status_changed_by = Some(actor);
    updated.updated_at = at;
    Ok(updated)
}

/// Guard for the reception toggles. They bypass the status machine but are
/// frozen once the appointment reaches a terminal status.
pub fn ensure_flags_mutable(appointment: &Appointment) -> Result<(), WorkflowError> {
    if is_terminal(appointment.status) {
        return Err(WorkflowError::TerminalState {
            status: appointment.status,
        });
    }
    Ok(())
}

/* ============================================================
   Photo moderation
   ============================================================ */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewDecision {
    Approved,
    Rejected,
}

/// Review a pending photo submission.
///
/// A rejection requires a non-empty reason, which is kept on the record;
/// an approval discards any reason that was sent along.
pub fn review(
    photo: &PhotoSubmission,
    decision: ReviewDecision,
    reason: Option<&str>,
    actor: Uuid,
    at: DateTime<Utc>,
) -> Result<PhotoSubmission, WorkflowError> {
    if photo.status != PhotoStatus::Pending {
        return Err(WorkflowError::AlreadyReviewed);
    }

    let mut updated = photo.clone();
    match decision {
        ReviewDecision::Approved => {
            updated.status = PhotoStatus::Approved;
            updated.rejection_reason = None;
        }
        ReviewDecision::Rejected => {
            let reason = reason.map(str::trim).unwrap_or("");
            if reason.is_empty() {
                return Err(WorkflowError::MissingReason);
            }
            updated.status = PhotoStatus::Rejected;
            updated.rejection_reason = Some(reason.to_string());
        }
    }
    updated.reviewed_at = Some(at);
    updated.reviewed_by = Some(actor);
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaymentStatus;
    use chrono::TimeZone;

    fn appt(status: AppointmentStatus) -> Appointment {
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        Appointment {
            appointment_id: Uuid::new_v4(),
            customer_name: "Asha Rao".into(),
            customer_phone: Some("9876543210".into()),
            email: None,
            services: vec!["Haircut".into()],
            date: Some(chrono::NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()),
            time_label: Some("10:00 AM".into()),
            staff: Some("priya".into()),
            amount_cents: Some(150_000),
            status,
            payment_status: PaymentStatus::Pending,
            customer_arrived: false,
            payment_checked: false,
            notes: None,
            created_at: t,
            updated_at: t,
            status_changed_at: None,
            status_changed_by: None,
        }
    }

    fn photo(status: PhotoStatus) -> PhotoSubmission {
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        PhotoSubmission {
            photo_id: Uuid::new_v4(),
            staff_user_id: Uuid::new_v4(),
            title: "Balayage result".into(),
            description: None,
            category: "coloring".into(),
            image_ref: "media/abc123.jpg".into(),
            uploaded_at: t,
            status,
            rejection_reason: None,
            reviewed_at: None,
            reviewed_by: None,
        }
    }

    const ALL: [AppointmentStatus; 4] = [
        AppointmentStatus::Pending,
        AppointmentStatus::Confirmed,
        AppointmentStatus::Completed,
        AppointmentStatus::Cancelled,
    ];

    #[test]
    fn transition_table_is_closed() {
        let legal = [
            (AppointmentStatus::Pending, AppointmentStatus::Confirmed),
            (AppointmentStatus::Pending, AppointmentStatus::Cancelled),
            (AppointmentStatus::Confirmed, AppointmentStatus::Completed),
            (AppointmentStatus::Confirmed, AppointmentStatus::Cancelled),
        ];
        let actor = Uuid::new_v4();
        let at = Utc.with_ymd_and_hms(2024, 3, 2, 12, 0, 0).unwrap();

        for from in ALL {
            for to in ALL {
                let result = transition(&appt(from), to, actor, at);
                if legal.contains(&(from, to)) {
                    let updated = result.expect("legal edge must succeed");
                    assert_eq!(updated.status, to);
                } else {
                    assert!(result.is_err(), "{from:?} -> {to:?} must be rejected");
                }
            }
        }
    }

    #[test]
    fn pending_cannot_skip_to_completed() {
        let err = transition(
            &appt(AppointmentStatus::Pending),
            AppointmentStatus::Completed,
            Uuid::new_v4(),
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            WorkflowError::InvalidTransition {
                from: AppointmentStatus::Pending,
                to: AppointmentStatus::Completed,
            }
        );
    }

    #[test]
    fn terminal_statuses_reject_everything() {
        for from in [AppointmentStatus::Completed, AppointmentStatus::Cancelled] {
            for to in ALL {
                let err = transition(&appt(from), to, Uuid::new_v4(), Utc::now()).unwrap_err();
                assert_eq!(err, WorkflowError::TerminalState { status: from });
            }
            assert_eq!(
                ensure_flags_mutable(&appt(from)),
                Err(WorkflowError::TerminalState { status: from })
            );
        }
    }

    #[test]
    fn flags_stay_mutable_before_terminal() {
        assert!(ensure_flags_mutable(&appt(AppointmentStatus::Pending)).is_ok());
        assert!(ensure_flags_mutable(&appt(AppointmentStatus::Confirmed)).is_ok());
    }

    #[test]
    fn transition_records_actor_and_timestamp() {
        let actor = Uuid::new_v4();
        let at = Utc.with_ymd_and_hms(2024, 3, 2, 12, 30, 0).unwrap();
        let updated = transition(&appt(AppointmentStatus::Pending), AppointmentStatus::Confirmed, actor, at)
            .unwrap();
        assert_eq!(updated.status_changed_by, Some(actor));
        assert_eq!(updated.status_changed_at, Some(at));
        assert_eq!(updated.updated_at, at);
    }

    #[test]
    fn rejection_requires_a_reason() {
        let actor = Uuid::new_v4();
        for empty in [None, Some(""), Some("   ")] {
            let err = review(&photo(PhotoStatus::Pending), ReviewDecision::Rejected, empty, actor, Utc::now())
                .unwrap_err();
            assert_eq!(err, WorkflowError::MissingReason);
        }

        let updated = review(
            &photo(PhotoStatus::Pending),
            ReviewDecision::Rejected,
            Some("blurry"),
            actor,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(updated.status, PhotoStatus::Rejected);
        assert_eq!(updated.rejection_reason.as_deref(), Some("blurry"));
    }

    #[test]
    fn approval_discards_any_reason() {
        let updated = review(
            &photo(PhotoStatus::Pending),
            ReviewDecision::Approved,
            Some("ignored"),
            Uuid::new_v4(),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(updated.status, PhotoStatus::Approved);
        assert_eq!(updated.rejection_reason, None);
        assert!(updated.reviewed_at.is_some());
    }

    #[test]
    fn reviewed_photos_cannot_be_reviewed_again() {
        for status in [PhotoStatus::Approved, PhotoStatus::Rejected] {
            let err = review(&photo(status), ReviewDecision::Approved, None, Uuid::new_v4(), Utc::now())
                .unwrap_err();
            assert_eq!(err, WorkflowError::AlreadyReviewed);
        }
    }
}

// src/scope.rs
//
// Role-scoped views over the appointment collection plus the list filters
// shared by the three dashboards. The caller's identity is always passed in
// explicitly; nothing here reads ambient session state.

use uuid::Uuid;

use crate::{
    calendar::parse_time_minutes,
    models::{Appointment, AppointmentStatus, Role, Shift},
};

/// The authenticated caller as the core sees it: a stable id, a tagged role
/// and the display name appointments are booked under.
#[derive(Debug, Clone)]
pub struct Caller {
    pub user_id: Uuid,
    pub role: Role,
    pub display_name: String,
}

impl Caller {
    /// The reception flags (customer arrived / payment checked) are a
    /// reception-desk capability, not a filter: other roles read them but
    /// only reception may write them.
    pub fn can_set_reception_flags(&self) -> bool {
        self.role == Role::Reception
    }
}

/// Narrow a collection to what the caller may see, preserving order.
/// Admin and reception see everything; staff see their own bookings.
pub fn visible_to(appointments: Vec<Appointment>, caller: &Caller) -> Vec<Appointment> {
    match caller.role {
        Role::Admin | Role::Reception => appointments,
        Role::Staff => appointments
            .into_iter()
            .filter(|a| assigned_to(a, caller))
            .collect(),
    }
}

/// Single-entity form of `visible_to`, used on detail and mutation paths.
pub fn may_view(appointment: &Appointment, caller: &Caller) -> bool {
    match caller.role {
        Role::Admin | Role::Reception => true,
        Role::Staff => assigned_to(appointment, caller),
    }
}

/// The `staff` field carries whatever the booking flow recorded: a user id
/// or a display name. Match either.
fn assigned_to(appointment: &Appointment, caller: &Caller) -> bool {
    match appointment.staff.as_deref() {
        Some(s) => {
            s.eq_ignore_ascii_case(&caller.display_name) || s == caller.user_id.to_string()
        }
        None => false,
    }
}

/// List filters. Every present filter must match (conjunction); an absent
/// filter is the identity.
#[derive(Debug, Clone, Default)]
pub struct AppointmentFilters {
    pub status: Option<AppointmentStatus>,
    pub search: Option<String>,
    pub shift: Option<Shift>,
}

/// Apply the filters without reordering. Sorting is the aggregator's job.
pub fn apply_filters(
    mut appointments: Vec<Appointment>,
    filters: &AppointmentFilters,
) -> Vec<Appointment> {
    appointments.retain(|a| matches_filters(a, filters));
    appointments
}

fn matches_filters(appointment: &Appointment, filters: &AppointmentFilters) -> bool {
    if let Some(status) = filters.status {
        if appointment.status != status {
            return false;
        }
    }
    if let Some(term) = filters.search.as_deref() {
        let term = term.trim();
        if !term.is_empty() && !matches_search(appointment, term) {
            return false;
        }
    }
    if let Some(shift) = filters.shift {
        if shift_of(appointment) != shift {
            return false;
        }
    }
    true
}

/// Free-text search: case-insensitive substring on name and email, plain
/// substring on the phone number. Any one hit is a match.
fn matches_search(appointment: &Appointment, term: &str) -> bool {
    let needle = term.to_lowercase();
    if appointment.customer_name.to_lowercase().contains(&needle) {
        return true;
    }
    if appointment
        .email
        .as_deref()
        .is_some_and(|e| e.to_lowercase().contains(&needle))
    {
        return true;
    }
    appointment
        .customer_phone
        .as_deref()
        .is_some_and(|p| p.contains(term))
}

/// Shift bucket for an appointment, derived from its time label: before
/// noon is morning, noon onward is evening, and anything without a parseable
/// time ("All Day", blank) counts as full-day.
pub fn shift_of(appointment: &Appointment) -> Shift {
    match appointment.time_label.as_deref().and_then(parse_time_minutes) {
        Some(minutes) if minutes < 12 * 60 => Shift::Morning,
        Some(_) => Shift::Evening,
        None => Shift::FullDay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaymentStatus;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn appt(customer: &str, staff: Option<&str>) -> Appointment {
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        Appointment {
            appointment_id: Uuid::new_v4(),
            customer_name: customer.into(),
            customer_phone: None,
            email: None,
            services: vec!["Haircut".into()],
            date: NaiveDate::from_ymd_opt(2024, 3, 15),
            time_label: Some("10:00 AM".into()),
            staff: staff.map(Into::into),
            amount_cents: None,
            status: AppointmentStatus::Pending,
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

    fn caller(role: Role, display_name: &str) -> Caller {
        Caller {
            user_id: Uuid::new_v4(),
            role,
            display_name: display_name.into(),
        }
    }

    #[test]
    fn staff_see_only_their_own_bookings_in_order() {
        let mine = ["c1", "c4", "c6", "c9"];
        let collection: Vec<Appointment> = (1..=10)
            .map(|i| {
                let name = format!("c{i}");
                let staff = if mine.contains(&name.as_str()) { "Priya" } else { "Noor" };
                appt(&name, Some(staff))
            })
            .collect();

        let visible = visible_to(collection, &caller(Role::Staff, "priya"));
        let names: Vec<_> = visible.iter().map(|a| a.customer_name.as_str()).collect();
        assert_eq!(names, mine);
    }

    #[test]
    fn staff_match_by_user_id_as_well() {
        let me = caller(Role::Staff, "Priya");
        let mut a = appt("walk-in", None);
        a.staff = Some(me.user_id.to_string());
        let visible = visible_to(vec![a, appt("other", Some("Noor"))], &me);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].customer_name, "walk-in");
    }

    #[test]
    fn admin_and_reception_see_everything() {
        let collection = vec![appt("a", Some("Priya")), appt("b", None)];
        for role in [Role::Admin, Role::Reception] {
            let visible = visible_to(collection.clone(), &caller(role, "whoever"));
            assert_eq!(visible.len(), 2);
        }
    }

    #[test]
    fn unassigned_appointments_are_hidden_from_staff() {
        let visible = visible_to(vec![appt("a", None)], &caller(Role::Staff, "Priya"));
        assert!(visible.is_empty());
    }

    #[test]
    fn search_matches_name_or_email_or_phone() {
        let mut by_name = appt("John Doe", None);
        by_name.customer_phone = Some("5550001".into());
        let mut by_email = appt("Mary", None);
        by_email.email = Some("ajohn@x.com".into());
        let no_hit = appt("Mary", None);

        let filters = AppointmentFilters {
            search: Some("john".into()),
            ..Default::default()
        };
        let out = apply_filters(vec![by_name, by_email, no_hit], &filters);
        let names: Vec<_> = out.iter().map(|a| a.customer_name.as_str()).collect();
        assert_eq!(names, ["John Doe", "Mary"]);
        assert_eq!(out[1].email.as_deref(), Some("ajohn@x.com"));

        let by_phone = apply_filters(
            vec![appt("Mary", None), {
                let mut a = appt("Asha", None);
                a.customer_phone = Some("9876543210".into());
                a
            }],
            &AppointmentFilters {
                search: Some("87654".into()),
                ..Default::default()
            },
        );
        assert_eq!(by_phone.len(), 1);
        assert_eq!(by_phone[0].customer_name, "Asha");
    }

    #[test]
    fn blank_search_is_the_identity() {
        let collection = vec![appt("a", None), appt("b", None)];
        let out = apply_filters(
            collection.clone(),
            &AppointmentFilters {
                search: Some("   ".into()),
                ..Default::default()
            },
        );
        assert_eq!(out.len(), collection.len());
    }

    #[test]
    fn status_filter_is_exact() {
        let mut confirmed = appt("a", None);
        confirmed.status = AppointmentStatus::Confirmed;
        let out = apply_filters(
            vec![confirmed, appt("b", None)],
            &AppointmentFilters {
                status: Some(AppointmentStatus::Confirmed),
                ..Default::default()
            },
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].customer_name, "a");
    }

    #[test]
    fn shift_buckets_derive_from_the_time_label() {
        let morning = appt("m", None);
        let mut evening = appt("e", None);
        evening.time_label = Some("2:00 PM".into());
        let mut noon = appt("noon", None);
        noon.time_label = Some("12:00 PM".into());
        let mut all_day = appt("ad", None);
        all_day.time_label = Some("All Day".into());

        assert_eq!(shift_of(&morning), Shift::Morning);
        assert_eq!(shift_of(&evening), Shift::Evening);
        assert_eq!(shift_of(&noon), Shift::Evening);
        assert_eq!(shift_of(&all_day), Shift::FullDay);

        let out = apply_filters(
            vec![morning, evening, noon, all_day],
            &AppointmentFilters {
                shift: Some(Shift::Evening),
                ..Default::default()
            },
        );
        let names: Vec<_> = out.iter().map(|a| a.customer_name.as_str()).collect();
        assert_eq!(names, ["e", "noon"]);
    }

    #[test]
    fn combined_filters_are_a_conjunction() {
        let mut a = appt("John Doe", None);
        a.status = AppointmentStatus::Confirmed;
        let mut b = appt("John Roe", None);
        b.status = AppointmentStatus::Pending;
        let mut c = appt("Mary", None);
        c.status = AppointmentStatus::Confirmed;
        let collection = vec![a, b, c];

        let status_only = AppointmentFilters {
            status: Some(AppointmentStatus::Confirmed),
            ..Default::default()
        };
        let search_only = AppointmentFilters {
            search: Some("john".into()),
            ..Default::default()
        };
        let both = AppointmentFilters {
            status: Some(AppointmentStatus::Confirmed),
            search: Some("john".into()),
            ..Default::default()
        };

        let by_status = apply_filters(collection.clone(), &status_only);
        let by_search = apply_filters(collection.clone(), &search_only);
        let by_both = apply_filters(collection, &both);

        assert_eq!(by_both.len(), 1);
        assert_eq!(by_both[0].customer_name, "John Doe");
        for hit in &by_both {
            assert!(by_status.iter().any(|a| a.appointment_id == hit.appointment_id));
            assert!(by_search.iter().any(|a| a.appointment_id == hit.appointment_id));
        }
    }

    #[test]
    fn only_reception_may_write_the_desk_flags() {
        assert!(caller(Role::Reception, "desk").can_set_reception_flags());
        assert!(!caller(Role::Admin, "boss").can_set_reception_flags());
        assert!(!caller(Role::Staff, "priya").can_set_reception_flags());
    }
}

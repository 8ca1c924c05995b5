// src/calendar.rs
//
// Month-grid generation and per-day aggregation. Dates are civil dates
// throughout: no time zones, equality is plain (year, month, day).

use std::collections::HashMap;

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Timelike};

use crate::models::{Appointment, CalendarCell};

/// Number of cells in the rendered month grid (6 rows x 7 columns). Enough
/// for any Gregorian month regardless of which weekday the 1st lands on.
pub const GRID_CELLS: usize = 42;

/// Build the 42-cell grid for one month, Sunday-first.
///
/// Cells before the 1st and after the last day are padding: no date, no
/// count, never today or selected. `selected` may point anywhere — a
/// selection outside the displayed month simply marks zero cells.
///
/// Returns `None` only when `(year, month)` is not a real month.
pub fn generate_grid(
    year: i32,
    month: u32,
    today: NaiveDate,
    selected: Option<NaiveDate>,
    counts: &HashMap<NaiveDate, usize>,
) -> Option<Vec<CalendarCell>> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    let days_in_month = next_first.signed_duration_since(first).num_days();
    let leading = first.weekday().num_days_from_sunday() as i64;

    let mut cells = Vec::with_capacity(GRID_CELLS);
    for i in 0..GRID_CELLS as i64 {
        if i < leading || i >= leading + days_in_month {
            cells.push(CalendarCell {
                date: None,
                in_current_month: false,
                is_today: false,
                is_selected: false,
                appointment_count: 0,
            });
            continue;
        }
        let date = first + Duration::days(i - leading);
        cells.push(CalendarCell {
            date: Some(date),
            in_current_month: true,
            is_today: date == today,
            is_selected: selected == Some(date),
            appointment_count: counts.get(&date).copied().unwrap_or(0),
        });
    }
    Some(cells)
}

/// All appointments on one civil date, ordered by time of day.
///
/// Entries whose time label is missing or unparsable sort after the timed
/// ones, keeping their original relative order.
pub fn appointments_on(appointments: &[Appointment], date: NaiveDate) -> Vec<Appointment> {
    let mut matching: Vec<Appointment> = appointments
        .iter()
        .filter(|a| a.date == Some(date))
        .cloned()
        .collect();
    sort_by_time(&mut matching);
    matching
}

/// Stable time-of-day ordering shared by the day views.
pub fn sort_by_time(appointments: &mut [Appointment]) {
    appointments.sort_by_key(|a| {
        let minutes = a.time_label.as_deref().and_then(parse_time_minutes);
        (minutes.is_none(), minutes)
    });
}

/// Per-day appointment counts for one month. Rows without a date, or dated
/// outside the month, are skipped.
pub fn counts_by_date(
    appointments: &[Appointment],
    year: i32,
    month: u32,
) -> HashMap<NaiveDate, usize> {
    let mut counts = HashMap::new();
    for a in appointments {
        let Some(date) = a.date else { continue };
        if date.year() == year && date.month() == month {
            *counts.entry(date).or_insert(0) += 1;
        }
    }
    counts
}

/// Minutes since midnight for display labels like "10:00 AM", "9 PM" or
/// "14:30". Anything else ("All Day", free text) is `None`.
pub fn parse_time_minutes(label: &str) -> Option<u32> {
    let label = label.trim().to_ascii_uppercase();
    for format in ["%I:%M %p", "%I %p", "%H:%M:%S", "%H:%M"] {
        if let Ok(t) = NaiveTime::parse_from_str(&label, format) {
            return Some(t.hour() * 60 + t.minute());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AppointmentStatus, PaymentStatus};
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn appt(date: Option<NaiveDate>, time_label: Option<&str>, customer: &str) -> Appointment {
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        Appointment {
            appointment_id: Uuid::new_v4(),
            customer_name: customer.into(),
            customer_phone: None,
            email: None,
            services: vec!["Haircut".into()],
            date,
            time_label: time_label.map(Into::into),
            staff: None,
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

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn every_month_fills_exactly_42_cells() {
        let today = d(2024, 1, 10);
        for (year, month) in [
            (2024, 2), // leap February
            (2021, 2), // 28 days starting Monday
            (2024, 3),
            (2023, 12),
            (2024, 9),  // 1st on a Sunday, no leading padding
            (2026, 8),  // 31 days starting Saturday, fills the last row
        ] {
            let grid = generate_grid(year, month, today, None, &HashMap::new()).unwrap();
            assert_eq!(grid.len(), GRID_CELLS, "{year}-{month}");
            let in_month = grid.iter().filter(|c| c.in_current_month).count();
            assert!(in_month >= 28 && in_month <= 31, "{year}-{month}");
        }
    }

    #[test]
    fn month_starting_on_sunday_has_no_leading_padding() {
        // September 2024 starts on a Sunday.
        let grid = generate_grid(2024, 9, d(2024, 1, 1), None, &HashMap::new()).unwrap();
        assert_eq!(grid[0].date, Some(d(2024, 9, 1)));
        assert_eq!(grid[29].date, Some(d(2024, 9, 30)));
        assert!(grid[30..].iter().all(|c| c.date.is_none()));
    }

    #[test]
    fn invalid_month_is_rejected() {
        assert!(generate_grid(2024, 0, d(2024, 1, 1), None, &HashMap::new()).is_none());
        assert!(generate_grid(2024, 13, d(2024, 1, 1), None, &HashMap::new()).is_none());
    }

    #[test]
    fn march_2024_padding_layout() {
        // 1st of March 2024 is a Friday: 5 leading cells, 31 days, 6 trailing.
        let grid = generate_grid(2024, 3, d(2024, 3, 8), None, &HashMap::new()).unwrap();
        assert!(grid[..5].iter().all(|c| !c.in_current_month && c.date.is_none()));
        assert_eq!(grid[5].date, Some(d(2024, 3, 1)));
        assert_eq!(grid[35].date, Some(d(2024, 3, 31)));
        assert!(grid[36..].iter().all(|c| !c.in_current_month && c.date.is_none()));
        assert_eq!(grid.iter().filter(|c| c.in_current_month).count(), 31);
    }

    #[test]
    fn exactly_one_today_cell_when_today_is_displayed() {
        let grid = generate_grid(2024, 3, d(2024, 3, 8), None, &HashMap::new()).unwrap();
        let todays: Vec<_> = grid.iter().filter(|c| c.is_today).collect();
        assert_eq!(todays.len(), 1);
        assert_eq!(todays[0].date, Some(d(2024, 3, 8)));

        let other = generate_grid(2024, 4, d(2024, 3, 8), None, &HashMap::new()).unwrap();
        assert_eq!(other.iter().filter(|c| c.is_today).count(), 0);
    }

    #[test]
    fn selection_outside_month_marks_no_cells() {
        let grid =
            generate_grid(2024, 3, d(2024, 3, 8), Some(d(2024, 4, 2)), &HashMap::new()).unwrap();
        assert_eq!(grid.iter().filter(|c| c.is_selected).count(), 0);

        let grid =
            generate_grid(2024, 3, d(2024, 3, 8), Some(d(2024, 3, 15)), &HashMap::new()).unwrap();
        let selected: Vec<_> = grid.iter().filter(|c| c.is_selected).collect();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].date, Some(d(2024, 3, 15)));
    }

    #[test]
    fn grid_counts_conserve_the_month_total() {
        let appointments = vec![
            appt(Some(d(2024, 3, 15)), Some("10:00 AM"), "a"),
            appt(Some(d(2024, 3, 15)), Some("11:00 AM"), "b"),
            appt(Some(d(2024, 3, 31)), None, "c"),
            appt(Some(d(2024, 4, 1)), None, "other month"),
            appt(None, None, "dateless, skipped"),
        ];
        let counts = counts_by_date(&appointments, 2024, 3);
        let grid = generate_grid(2024, 3, d(2024, 3, 8), None, &counts).unwrap();

        let total: usize = grid
            .iter()
            .filter(|c| c.in_current_month)
            .map(|c| c.appointment_count)
            .sum();
        assert_eq!(total, 3);
        assert!(grid
            .iter()
            .filter(|c| !c.in_current_month)
            .all(|c| c.appointment_count == 0));
    }

    #[test]
    fn day_view_sorts_by_time_with_unparsable_last() {
        let day = d(2024, 3, 15);
        let appointments = vec![
            appt(Some(day), Some("2:00 PM"), "afternoon"),
            appt(Some(day), None, "no time"),
            appt(Some(day), Some("9:15 AM"), "early"),
            appt(Some(day), Some("All Day"), "all day"),
            appt(Some(day), Some("10:00 AM"), "mid-morning"),
            appt(Some(d(2024, 3, 16)), Some("8:00 AM"), "wrong day"),
        ];
        let names: Vec<_> = appointments_on(&appointments, day)
            .into_iter()
            .map(|a| a.customer_name)
            .collect();
        assert_eq!(
            names,
            vec!["early", "mid-morning", "afternoon", "no time", "all day"]
        );
    }

    #[test]
    fn time_label_parsing() {
        assert_eq!(parse_time_minutes("10:00 AM"), Some(600));
        assert_eq!(parse_time_minutes("12:30 pm"), Some(750));
        assert_eq!(parse_time_minutes("12:05 AM"), Some(5));
        assert_eq!(parse_time_minutes("14:30"), Some(870));
        assert_eq!(parse_time_minutes("9 PM"), Some(21 * 60));
        assert_eq!(parse_time_minutes("All Day"), None);
        assert_eq!(parse_time_minutes(""), None);
    }
}

// libs/appointment-cell/src/services/lifecycle.rs
use std::fmt;

use tracing::debug;

use crate::models::{Appointment, AppointmentError, MIN_DURATION_MINUTES};

/// Why an update has to go through the slot check again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecheckReason {
    StartChanged,
    DurationChanged,
    Reactivated,
}

impl fmt::Display for RecheckReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecheckReason::StartChanged => write!(f, "start_changed"),
            RecheckReason::DurationChanged => write!(f, "duration_changed"),
            RecheckReason::Reactivated => write!(f, "reactivated"),
        }
    }
}

/// Bookings shorter than the minimum slot are refused before they reach storage.
pub fn validate_duration(duration_minutes: i32) -> Result<(), AppointmentError> {
    if duration_minutes < MIN_DURATION_MINUTES {
        return Err(AppointmentError::ValidationError(format!(
            "Duration must be at least {} minutes", MIN_DURATION_MINUTES
        )));
    }
    Ok(())
}

/// Compares the stored appointment with its updated form. An inactive result
/// never needs a check; an active one does when it moved, resized, or came
/// back from cancelled/no-show.
pub fn recheck_reason(before: &Appointment, after: &Appointment) -> Option<RecheckReason> {
    if !after.status.is_active() {
        return None;
    }

    let reason = if before.start_time != after.start_time {
        Some(RecheckReason::StartChanged)
    } else if before.duration_minutes != after.duration_minutes {
        Some(RecheckReason::DurationChanged)
    } else if !before.status.is_active() {
        Some(RecheckReason::Reactivated)
    } else {
        None
    };

    debug!(appointment_id = %after.id, ?reason, "Evaluated update");
    reason
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{Duration, TimeZone, Utc};
    use uuid::Uuid;

    use crate::models::AppointmentStatus;

    fn appointment(status: AppointmentStatus) -> Appointment {
        let start = Utc.with_ymd_and_hms(2025, 5, 20, 14, 0, 0).unwrap();
        Appointment {
            id: Uuid::new_v4(),
            clinic_id: Uuid::new_v4(),
            created_by: Uuid::new_v4(),
            client_name: "Paula".to_string(),
            client_email: "paula@example.com".to_string(),
            client_phone: "11911112222".to_string(),
            procedure: "Preenchimento".to_string(),
            start_time: start,
            duration_minutes: 60,
            status,
            price: Some(800.0),
            notes: None,
            confirmed_by_client: false,
            confirmed_at: None,
            created_at: start,
            updated_at: start,
        }
    }

    #[test]
    fn duration_below_minimum_is_rejected() {
        assert_matches!(validate_duration(14), Err(AppointmentError::ValidationError(_)));
        assert!(validate_duration(15).is_ok());
        assert!(validate_duration(60).is_ok());
    }

    #[test]
    fn moving_an_active_appointment_requires_check() {
        let before = appointment(AppointmentStatus::Scheduled);
        let mut after = before.clone();
        after.start_time += Duration::hours(1);

        assert_eq!(recheck_reason(&before, &after), Some(RecheckReason::StartChanged));
    }

    #[test]
    fn resizing_requires_check() {
        let before = appointment(AppointmentStatus::Confirmed);
        let mut after = before.clone();
        after.duration_minutes = 90;

        assert_eq!(recheck_reason(&before, &after), Some(RecheckReason::DurationChanged));
    }

    #[test]
    fn reactivating_requires_check() {
        for inactive in [AppointmentStatus::Cancelled, AppointmentStatus::NoShow] {
            let before = appointment(inactive);
            let mut after = before.clone();
            after.status = AppointmentStatus::Scheduled;

            assert_eq!(recheck_reason(&before, &after), Some(RecheckReason::Reactivated));
        }
    }

    #[test]
    fn other_field_changes_skip_check() {
        let before = appointment(AppointmentStatus::Scheduled);
        let mut after = before.clone();
        after.notes = Some("Trazer exames".to_string());
        after.price = Some(950.0);
        after.status = AppointmentStatus::Confirmed;

        assert_eq!(recheck_reason(&before, &after), None);
    }

    #[test]
    fn cancelling_never_requires_check() {
        let before = appointment(AppointmentStatus::Scheduled);
        let mut after = before.clone();
        after.status = AppointmentStatus::Cancelled;
        after.start_time += Duration::hours(2);

        assert_eq!(recheck_reason(&before, &after), None);
    }
}

// libs/appointment-cell/src/services/conflict.rs
//
// Double-booking detection over plain in-memory values. Windows are half-open,
// `[start, start + duration)`, so a booking that ends exactly when another
// begins does not conflict with it.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{window_end, Appointment, AppointmentError};

/// `[start_a, end_a)` and `[start_b, end_b)` share at least one instant.
pub fn intervals_overlap(
    start_a: DateTime<Utc>,
    end_a: DateTime<Utc>,
    start_b: DateTime<Utc>,
    end_b: DateTime<Utc>,
) -> bool {
    start_b < end_a && end_b > start_a
}

/// Window covered by a proposed booking. Rejects non-positive durations.
pub fn proposed_window(
    start: DateTime<Utc>,
    duration_minutes: i32,
) -> Result<(DateTime<Utc>, DateTime<Utc>), AppointmentError> {
    if duration_minutes <= 0 {
        return Err(AppointmentError::ValidationError(format!(
            "Duration must be positive, got {} minutes", duration_minutes
        )));
    }
    let end = window_end(start, duration_minutes).ok_or_else(|| {
        AppointmentError::ValidationError("Appointment window is out of range".to_string())
    })?;
    Ok((start, end))
}

/// End of the slot a stored booking holds. A window running past the
/// representable range holds everything after its start.
pub fn occupied_until(appointment: &Appointment) -> DateTime<Utc> {
    appointment.end_time().unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Active appointments in `existing` that overlap the proposed window, skipping
/// `exclude_id` (the appointment being updated).
pub fn find_conflicts<'a>(
    start: DateTime<Utc>,
    duration_minutes: i32,
    existing: &'a [Appointment],
    exclude_id: Option<Uuid>,
) -> Result<Vec<&'a Appointment>, AppointmentError> {
    let (window_start, window_end) = proposed_window(start, duration_minutes)?;

    Ok(existing
        .iter()
        .filter(|appointment| Some(appointment.id) != exclude_id)
        .filter(|appointment| appointment.status.is_active())
        .filter(|appointment| {
            intervals_overlap(window_start, window_end, appointment.start_time, occupied_until(appointment))
        })
        .collect())
}

/// Ids of the same-clinic bookings that the proposed window would collide with.
pub fn conflicting_ids(
    clinic_id: Uuid,
    start: DateTime<Utc>,
    duration_minutes: i32,
    existing: &[Appointment],
    exclude_id: Option<Uuid>,
) -> Result<Vec<Uuid>, AppointmentError> {
    let conflicts = find_conflicts(start, duration_minutes, existing, exclude_id)?;

    Ok(conflicts
        .into_iter()
        .filter(|appointment| appointment.clinic_id == clinic_id)
        .map(|appointment| appointment.id)
        .collect())
}

pub fn check_appointment_conflict(
    clinic_id: Uuid,
    start: DateTime<Utc>,
    duration_minutes: i32,
    existing: &[Appointment],
    exclude_id: Option<Uuid>,
) -> Result<bool, AppointmentError> {
    let ids = conflicting_ids(clinic_id, start, duration_minutes, existing, exclude_id)?;
    debug!(clinic_id = %clinic_id, %start, duration_minutes, conflicts = ids.len(), "Checked slot");
    Ok(!ids.is_empty())
}

/// Same check as [`check_appointment_conflict`], but reports a taken slot as
/// `ConflictDetected` so write paths can bail out with `?`.
pub fn ensure_slot_available(
    clinic_id: Uuid,
    start: DateTime<Utc>,
    duration_minutes: i32,
    existing: &[Appointment],
    exclude_id: Option<Uuid>,
) -> Result<(), AppointmentError> {
    let conflicting_ids = conflicting_ids(clinic_id, start, duration_minutes, existing, exclude_id)?;

    if conflicting_ids.is_empty() {
        return Ok(());
    }

    warn!(clinic_id = %clinic_id, %start, duration_minutes, ?conflicting_ids, "Slot already taken");
    Err(AppointmentError::ConflictDetected { conflicting_ids })
}

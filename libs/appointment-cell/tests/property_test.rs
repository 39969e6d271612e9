use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use uuid::Uuid;

use appointment_cell::models::{Appointment, AppointmentStatus};
use appointment_cell::services::conflict::{check_appointment_conflict, intervals_overlap};

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 1, 1, 8, 0, 0).unwrap()
}

fn window(offset: i64, minutes: i64) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = base() + Duration::minutes(offset);
    (start, start + Duration::minutes(minutes))
}

fn appointment(clinic_id: Uuid, offset: i64, minutes: i32, status: AppointmentStatus) -> Appointment {
    let start = base() + Duration::minutes(offset);
    Appointment {
        id: Uuid::new_v4(),
        clinic_id,
        created_by: Uuid::new_v4(),
        client_name: "Cliente".to_string(),
        client_email: "cliente@example.com".to_string(),
        client_phone: "11900000000".to_string(),
        procedure: "Botox".to_string(),
        start_time: start,
        duration_minutes: minutes,
        status,
        price: None,
        notes: None,
        confirmed_by_client: false,
        confirmed_at: None,
        created_at: start,
        updated_at: start,
    }
}

proptest! {
    #[test]
    fn overlap_is_symmetric(
        a_offset in 0i64..600, a_len in 1i64..240,
        b_offset in 0i64..600, b_len in 1i64..240,
    ) {
        let (a_start, a_end) = window(a_offset, a_len);
        let (b_start, b_end) = window(b_offset, b_len);

        prop_assert_eq!(
            intervals_overlap(a_start, a_end, b_start, b_end),
            intervals_overlap(b_start, b_end, a_start, a_end)
        );
    }

    #[test]
    fn back_to_back_never_overlaps(offset in 0i64..600, first in 1i64..240, second in 1i64..240) {
        let (a_start, a_end) = window(offset, first);
        let (b_start, b_end) = window(offset + first, second);

        prop_assert!(!intervals_overlap(a_start, a_end, b_start, b_end));
    }

    #[test]
    fn a_window_always_overlaps_itself(offset in 0i64..600, len in 1i64..240) {
        let (start, end) = window(offset, len);
        prop_assert!(intervals_overlap(start, end, start, end));
    }

    #[test]
    fn inactive_bookings_never_conflict(
        offset in 0i64..600, len in 15i32..240,
        cancelled in any::<bool>(),
    ) {
        let clinic = Uuid::new_v4();
        let status = if cancelled { AppointmentStatus::Cancelled } else { AppointmentStatus::NoShow };
        let existing = vec![appointment(clinic, offset, len, status)];

        let conflict = check_appointment_conflict(clinic, base() + Duration::minutes(offset), len, &existing, None);
        prop_assert_eq!(conflict, Ok(false));
    }
}

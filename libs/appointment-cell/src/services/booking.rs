// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;

use crate::models::{
    Appointment, AppointmentError, AppointmentSearchQuery, BookAppointmentRequest,
    ConflictCheckQuery, ConflictCheckResponse, UpdateAppointmentRequest,
};
use crate::services::conflict::{conflicting_ids, proposed_window};
use crate::services::lifecycle::{recheck_reason, validate_duration};
use crate::services::repository::{AppointmentRepository, SupabaseAppointmentRepository};

pub struct AppointmentBookingService {
    repository: Arc<dyn AppointmentRepository>,
}

impl AppointmentBookingService {
    pub fn new(config: &AppConfig, auth_token: &str) -> Self {
        Self {
            repository: Arc::new(SupabaseAppointmentRepository::new(config, auth_token)),
        }
    }

    pub fn with_repository(repository: Arc<dyn AppointmentRepository>) -> Self {
        Self { repository }
    }

    /// Book a slot. Check and insert happen atomically in the repository.
    pub async fn book_appointment(
        &self,
        clinic_id: Uuid,
        created_by: Uuid,
        request: BookAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Booking appointment for clinic {} at {}", clinic_id, request.start_time);

        validate_duration(request.duration_minutes)?;
        proposed_window(request.start_time, request.duration_minutes)?;

        let now = Utc::now();
        let appointment = Appointment {
            id: Uuid::new_v4(),
            clinic_id,
            created_by,
            client_name: request.client_name,
            client_email: request.client_email,
            client_phone: request.client_phone,
            procedure: request.procedure,
            start_time: request.start_time,
            duration_minutes: request.duration_minutes,
            status: request.status,
            price: request.price,
            notes: request.notes,
            confirmed_by_client: false,
            confirmed_at: None,
            created_at: now,
            updated_at: now,
        };

        let booked = self.repository.reserve_if_free(&appointment).await?;
        info!(
            appointment_id = %booked.id,
            clinic_id = %clinic_id,
            start_time = %booked.start_time,
            duration_minutes = booked.duration_minutes,
            "Appointment booked"
        );
        Ok(booked)
    }

    pub async fn get_appointment(
        &self,
        clinic_id: Uuid,
        appointment_id: Uuid,
    ) -> Result<Appointment, AppointmentError> {
        self.repository
            .get(clinic_id, appointment_id)
            .await?
            .ok_or(AppointmentError::NotFound)
    }

    pub async fn list_appointments(
        &self,
        clinic_id: Uuid,
        query: AppointmentSearchQuery,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        if let Some((from, to)) = query.period() {
            if from > to {
                return Err(AppointmentError::ValidationError(
                    "from_date must not be after to_date".to_string(),
                ));
            }
        }

        self.repository.list(clinic_id, &query).await
    }

    /// Partial update. Goes through the atomic slot check only when the change
    /// moves, resizes, or reactivates an active booking.
    pub async fn update_appointment(
        &self,
        clinic_id: Uuid,
        appointment_id: Uuid,
        request: UpdateAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.get_appointment(clinic_id, appointment_id).await?;

        let now = Utc::now();
        let mut updated = current.clone();
        request.apply_to(&mut updated, now);
        updated.updated_at = now;

        if updated.duration_minutes != current.duration_minutes {
            validate_duration(updated.duration_minutes)?;
        }
        if updated.start_time != current.start_time || updated.duration_minutes != current.duration_minutes {
            proposed_window(updated.start_time, updated.duration_minutes)?;
        }

        let saved = match recheck_reason(&current, &updated) {
            Some(reason) => {
                debug!(appointment_id = %appointment_id, %reason, "Re-checking slot");
                self.repository.reschedule_if_free(&updated).await?
            }
            None => self.repository.update(&updated).await?,
        };

        info!(appointment_id = %appointment_id, status = %saved.status, "Appointment updated");
        Ok(saved)
    }

    pub async fn delete_appointment(
        &self,
        clinic_id: Uuid,
        appointment_id: Uuid,
    ) -> Result<(), AppointmentError> {
        if !self.repository.delete(clinic_id, appointment_id).await? {
            return Err(AppointmentError::NotFound);
        }
        info!(appointment_id = %appointment_id, clinic_id = %clinic_id, "Appointment deleted");
        Ok(())
    }

    /// Advisory pre-check. Reads the current bookings without reserving anything.
    pub async fn check_conflicts(
        &self,
        clinic_id: Uuid,
        query: ConflictCheckQuery,
    ) -> Result<ConflictCheckResponse, AppointmentError> {
        let (start_time, end_time) = proposed_window(query.start_time, query.duration_minutes)?;

        let existing = self
            .repository
            .active_in_window(clinic_id, start_time, end_time, query.exclude_appointment_id)
            .await?;

        let conflicting_appointments = conflicting_ids(
            clinic_id,
            start_time,
            query.duration_minutes,
            &existing,
            query.exclude_appointment_id,
        )?;

        Ok(ConflictCheckResponse {
            has_conflict: !conflicting_appointments.is_empty(),
            start_time,
            end_time,
            conflicting_appointments,
        })
    }
}

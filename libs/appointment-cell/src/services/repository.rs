// libs/appointment-cell/src/services/repository.rs
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{SupabaseClient, SupabaseError};

use crate::models::{Appointment, AppointmentError, AppointmentSearchQuery, AppointmentStatus};
use crate::services::conflict::{ensure_slot_available, intervals_overlap, occupied_until, proposed_window};

const EXCLUSION_VIOLATION: &str = "23P01";

/// Persistence seam for appointments. The `*_if_free` operations check the
/// slot and write in one atomic step; a plain `update` never checks.
#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    async fn get(&self, clinic_id: Uuid, appointment_id: Uuid) -> Result<Option<Appointment>, AppointmentError>;

    /// Appointments of one clinic ordered by start time.
    async fn list(&self, clinic_id: Uuid, query: &AppointmentSearchQuery) -> Result<Vec<Appointment>, AppointmentError>;

    /// Active appointments of one clinic whose window intersects `[start, end)`.
    async fn active_in_window(
        &self,
        clinic_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_id: Option<Uuid>,
    ) -> Result<Vec<Appointment>, AppointmentError>;

    /// Insert unless an active booking of the same clinic overlaps.
    async fn reserve_if_free(&self, appointment: &Appointment) -> Result<Appointment, AppointmentError>;

    /// Replace a stored appointment unless its new window overlaps another
    /// active booking of the same clinic.
    async fn reschedule_if_free(&self, appointment: &Appointment) -> Result<Appointment, AppointmentError>;

    async fn update(&self, appointment: &Appointment) -> Result<Appointment, AppointmentError>;

    /// Returns `false` when nothing matched.
    async fn delete(&self, clinic_id: Uuid, appointment_id: Uuid) -> Result<bool, AppointmentError>;
}

// ==============================================================================
// SUPABASE (POSTGREST) REPOSITORY
// ==============================================================================

pub struct SupabaseAppointmentRepository {
    supabase: Arc<SupabaseClient>,
    auth_token: String,
}

impl SupabaseAppointmentRepository {
    pub fn new(config: &AppConfig, auth_token: &str) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
            auth_token: auth_token.to_string(),
        }
    }

    fn parse_rows(rows: Vec<Value>) -> Result<Vec<Appointment>, AppointmentError> {
        rows.into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Appointment>, _>>()
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse appointments: {}", e)))
    }

    fn parse_row(row: Value) -> Result<Appointment, AppointmentError> {
        serde_json::from_value(row)
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse appointment: {}", e)))
    }

    fn to_row(appointment: &Appointment) -> Result<Value, AppointmentError> {
        serde_json::to_value(appointment)
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to serialize appointment: {}", e)))
    }

    fn timestamp(value: DateTime<Utc>) -> String {
        urlencoding::encode(&value.to_rfc3339()).into_owned()
    }

    fn map_error(error: anyhow::Error) -> AppointmentError {
        match error.downcast_ref::<SupabaseError>() {
            Some(SupabaseError::Unauthorized { message }) => AppointmentError::Unauthorized(message.clone()),
            Some(SupabaseError::NotFound { .. }) => AppointmentError::NotFound,
            _ => AppointmentError::DatabaseError(error.to_string()),
        }
    }

    /// Overlaps surface as SQLSTATE 23P01; depending on the PostgREST version
    /// that arrives as 409 or as 400 carrying the code in the body.
    fn is_slot_conflict(error: &anyhow::Error) -> bool {
        match error.downcast_ref::<SupabaseError>() {
            Some(SupabaseError::Api { status, message }) => {
                *status == StatusCode::CONFLICT || message.contains(EXCLUSION_VIOLATION)
            }
            _ => false,
        }
    }

    /// The store rejected the write as overlapping; look up who holds the slot
    /// so the caller gets the conflicting ids.
    async fn conflict_for(&self, appointment: &Appointment) -> AppointmentError {
        let (start, end) = match proposed_window(appointment.start_time, appointment.duration_minutes) {
            Ok(window) => window,
            Err(e) => return e,
        };

        let conflicting_ids = match self
            .active_in_window(appointment.clinic_id, start, end, Some(appointment.id))
            .await
        {
            Ok(existing) => existing.into_iter().map(|a| a.id).collect(),
            Err(e) => {
                warn!("Failed to load conflicting appointments: {}", e);
                Vec::new()
            }
        };

        AppointmentError::ConflictDetected { conflicting_ids }
    }

    async fn call_guarded(&self, function: &str, appointment: &Appointment) -> Result<Appointment, AppointmentError> {
        let args = json!({ "payload": Self::to_row(appointment)? });

        match self.supabase.rpc::<Value>(function, Some(&self.auth_token), args).await {
            Ok(row) => Self::parse_row(row),
            Err(e) if Self::is_slot_conflict(&e) => Err(self.conflict_for(appointment).await),
            Err(e) => Err(Self::map_error(e)),
        }
    }
}

#[async_trait]
impl AppointmentRepository for SupabaseAppointmentRepository {
    async fn get(&self, clinic_id: Uuid, appointment_id: Uuid) -> Result<Option<Appointment>, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}&clinic_id=eq.{}", appointment_id, clinic_id);
        let rows: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(&self.auth_token),
            None,
        ).await.map_err(Self::map_error)?;

        Ok(Self::parse_rows(rows)?.into_iter().next())
    }

    async fn list(&self, clinic_id: Uuid, query: &AppointmentSearchQuery) -> Result<Vec<Appointment>, AppointmentError> {
        let mut query_parts = vec![format!("clinic_id=eq.{}", clinic_id)];

        if let Some(status) = &query.status {
            query_parts.push(format!("status=eq.{}", status));
        }
        if let Some((from, to)) = query.period() {
            query_parts.push(format!("start_time=gte.{}", Self::timestamp(from)));
            query_parts.push(format!("start_time=lte.{}", Self::timestamp(to)));
        }

        let path = format!("/rest/v1/appointments?{}&order=start_time.asc", query_parts.join("&"));
        debug!("Listing appointments: {}", path);

        let rows: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(&self.auth_token),
            None,
        ).await.map_err(Self::map_error)?;

        Self::parse_rows(rows)
    }

    async fn active_in_window(
        &self,
        clinic_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_id: Option<Uuid>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let active = AppointmentStatus::ACTIVE
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");

        let mut query_parts = vec![
            format!("clinic_id=eq.{}", clinic_id),
            format!("status=in.({})", active),
            format!("start_time=lt.{}", Self::timestamp(end)),
            format!("end_time=gt.{}", Self::timestamp(start)),
        ];
        if let Some(exclude_id) = exclude_id {
            query_parts.push(format!("id=neq.{}", exclude_id));
        }

        let path = format!("/rest/v1/appointments?{}&order=start_time.asc", query_parts.join("&"));

        let rows: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(&self.auth_token),
            None,
        ).await.map_err(Self::map_error)?;

        Self::parse_rows(rows)
    }

    async fn reserve_if_free(&self, appointment: &Appointment) -> Result<Appointment, AppointmentError> {
        self.call_guarded("reserve_appointment", appointment).await
    }

    async fn reschedule_if_free(&self, appointment: &Appointment) -> Result<Appointment, AppointmentError> {
        self.call_guarded("reschedule_appointment", appointment).await
    }

    async fn update(&self, appointment: &Appointment) -> Result<Appointment, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?id=eq.{}&clinic_id=eq.{}",
            appointment.id, appointment.clinic_id
        );
        let rows: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(&self.auth_token),
            Some(Self::to_row(appointment)?),
            Some(SupabaseClient::representation_headers()),
        ).await.map_err(Self::map_error)?;

        Self::parse_rows(rows)?
            .into_iter()
            .next()
            .ok_or(AppointmentError::NotFound)
    }

    async fn delete(&self, clinic_id: Uuid, appointment_id: Uuid) -> Result<bool, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}&clinic_id=eq.{}", appointment_id, clinic_id);
        let rows: Vec<Value> = self.supabase.request_with_headers(
            Method::DELETE,
            &path,
            Some(&self.auth_token),
            None,
            Some(SupabaseClient::representation_headers()),
        ).await.map_err(Self::map_error)?;

        Ok(!rows.is_empty())
    }
}

// ==============================================================================
// IN-MEMORY REPOSITORY
// ==============================================================================

/// Process-local store. The write lock is held across the slot check and the
/// write, so concurrent reservations of one slot serialize.
#[derive(Default)]
pub struct InMemoryAppointmentRepository {
    appointments: RwLock<HashMap<Uuid, Appointment>>,
}

impl InMemoryAppointmentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn clinic_appointments(store: &HashMap<Uuid, Appointment>, clinic_id: Uuid) -> Vec<Appointment> {
        store
            .values()
            .filter(|a| a.clinic_id == clinic_id)
            .cloned()
            .collect()
    }

    fn guard_slot(store: &HashMap<Uuid, Appointment>, appointment: &Appointment) -> Result<(), AppointmentError> {
        if !appointment.status.is_active() {
            return Ok(());
        }
        let existing = Self::clinic_appointments(store, appointment.clinic_id);
        ensure_slot_available(
            appointment.clinic_id,
            appointment.start_time,
            appointment.duration_minutes,
            &existing,
            Some(appointment.id),
        )
    }

    fn replace(store: &mut HashMap<Uuid, Appointment>, appointment: &Appointment) -> Result<Appointment, AppointmentError> {
        match store.get_mut(&appointment.id) {
            Some(stored) if stored.clinic_id == appointment.clinic_id => {
                *stored = appointment.clone();
                Ok(appointment.clone())
            }
            _ => Err(AppointmentError::NotFound),
        }
    }
}

#[async_trait]
impl AppointmentRepository for InMemoryAppointmentRepository {
    async fn get(&self, clinic_id: Uuid, appointment_id: Uuid) -> Result<Option<Appointment>, AppointmentError> {
        let store = self.appointments.read().await;
        Ok(store.get(&appointment_id).filter(|a| a.clinic_id == clinic_id).cloned())
    }

    async fn list(&self, clinic_id: Uuid, query: &AppointmentSearchQuery) -> Result<Vec<Appointment>, AppointmentError> {
        let store = self.appointments.read().await;
        let period = query.period();

        let mut matching: Vec<Appointment> = Self::clinic_appointments(&store, clinic_id)
            .into_iter()
            .filter(|a| query.status.map_or(true, |status| a.status == status))
            .filter(|a| period.map_or(true, |(from, to)| a.start_time >= from && a.start_time <= to))
            .collect();

        matching.sort_by_key(|a| a.start_time);
        Ok(matching)
    }

    async fn active_in_window(
        &self,
        clinic_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_id: Option<Uuid>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let store = self.appointments.read().await;

        let mut matching: Vec<Appointment> = Self::clinic_appointments(&store, clinic_id)
            .into_iter()
            .filter(|a| Some(a.id) != exclude_id)
            .filter(|a| a.status.is_active())
            .filter(|a| intervals_overlap(start, end, a.start_time, occupied_until(a)))
            .collect();

        matching.sort_by_key(|a| a.start_time);
        Ok(matching)
    }

    async fn reserve_if_free(&self, appointment: &Appointment) -> Result<Appointment, AppointmentError> {
        let mut store = self.appointments.write().await;
        if store.contains_key(&appointment.id) {
            return Err(AppointmentError::DatabaseError(format!(
                "Appointment {} already exists", appointment.id
            )));
        }

        Self::guard_slot(&store, appointment)?;
        store.insert(appointment.id, appointment.clone());
        Ok(appointment.clone())
    }

    async fn reschedule_if_free(&self, appointment: &Appointment) -> Result<Appointment, AppointmentError> {
        let mut store = self.appointments.write().await;
        let stored = store
            .get(&appointment.id)
            .is_some_and(|a| a.clinic_id == appointment.clinic_id);
        if !stored {
            return Err(AppointmentError::NotFound);
        }

        Self::guard_slot(&store, appointment)?;
        Self::replace(&mut store, appointment)
    }

    async fn update(&self, appointment: &Appointment) -> Result<Appointment, AppointmentError> {
        let mut store = self.appointments.write().await;
        Self::replace(&mut store, appointment)
    }

    async fn delete(&self, clinic_id: Uuid, appointment_id: Uuid) -> Result<bool, AppointmentError> {
        let mut store = self.appointments.write().await;
        let owned = store.get(&appointment_id).is_some_and(|a| a.clinic_id == clinic_id);
        if owned {
            store.remove(&appointment_id);
        }
        Ok(owned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::TimeZone;

    fn appointment(clinic_id: Uuid, hour: u32) -> Appointment {
        let start = Utc.with_ymd_and_hms(2030, 2, 1, hour, 0, 0).unwrap();
        Appointment {
            id: Uuid::new_v4(),
            clinic_id,
            created_by: Uuid::new_v4(),
            client_name: "Rita".to_string(),
            client_email: "rita@example.com".to_string(),
            client_phone: "11933334444".to_string(),
            procedure: "Microagulhamento".to_string(),
            start_time: start,
            duration_minutes: 60,
            status: AppointmentStatus::Scheduled,
            price: None,
            notes: None,
            confirmed_by_client: false,
            confirmed_at: None,
            created_at: start,
            updated_at: start,
        }
    }

    #[test]
    fn exclusion_violation_is_a_slot_conflict() {
        let conflict = anyhow::Error::new(SupabaseError::Api {
            status: StatusCode::CONFLICT,
            message: "appointment slot already taken".to_string(),
        });
        let coded = anyhow::Error::new(SupabaseError::Api {
            status: StatusCode::BAD_REQUEST,
            message: r#"{"code":"23P01","message":"appointment slot already taken"}"#.to_string(),
        });
        let other = anyhow::Error::new(SupabaseError::Api {
            status: StatusCode::BAD_REQUEST,
            message: r#"{"code":"22023"}"#.to_string(),
        });

        assert!(SupabaseAppointmentRepository::is_slot_conflict(&conflict));
        assert!(SupabaseAppointmentRepository::is_slot_conflict(&coded));
        assert!(!SupabaseAppointmentRepository::is_slot_conflict(&other));
    }

    #[test]
    fn unauthorized_store_errors_keep_their_kind() {
        let error = anyhow::Error::new(SupabaseError::Unauthorized { message: "jwt expired".to_string() });
        assert_matches!(
            SupabaseAppointmentRepository::map_error(error),
            AppointmentError::Unauthorized(msg) if msg == "jwt expired"
        );
    }

    #[tokio::test]
    async fn reschedule_of_unknown_appointment_is_not_found() {
        let repo = InMemoryAppointmentRepository::new();
        let result = repo.reschedule_if_free(&appointment(Uuid::new_v4(), 10)).await;
        assert_matches!(result, Err(AppointmentError::NotFound));
    }

    #[tokio::test]
    async fn inactive_reservation_skips_the_slot_check() {
        let repo = InMemoryAppointmentRepository::new();
        let clinic = Uuid::new_v4();
        repo.reserve_if_free(&appointment(clinic, 10)).await.unwrap();

        let mut cancelled = appointment(clinic, 10);
        cancelled.status = AppointmentStatus::Cancelled;

        assert!(repo.reserve_if_free(&cancelled).await.is_ok());
        let active = repo
            .active_in_window(clinic, cancelled.start_time, cancelled.end_time().unwrap(), None)
            .await
            .unwrap();
        assert_eq!(active.len(), 1);
    }

    #[tokio::test]
    async fn active_window_lookup_uses_half_open_overlap() {
        let repo = InMemoryAppointmentRepository::new();
        let clinic = Uuid::new_v4();
        let ten = appointment(clinic, 10);
        repo.reserve_if_free(&ten).await.unwrap();

        let eleven = Utc.with_ymd_and_hms(2030, 2, 1, 11, 0, 0).unwrap();
        let after = repo.active_in_window(clinic, eleven, eleven + chrono::Duration::hours(1), None).await.unwrap();
        assert!(after.is_empty());

        let half_past = Utc.with_ymd_and_hms(2030, 2, 1, 10, 30, 0).unwrap();
        let inside = repo.active_in_window(clinic, half_past, eleven, None).await.unwrap();
        assert_eq!(inside.iter().map(|a| a.id).collect::<Vec<_>>(), vec![ten.id]);
    }
}

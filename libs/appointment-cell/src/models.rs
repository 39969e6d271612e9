// libs/appointment-cell/src/models.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Duration, Utc};
use std::fmt;

pub const DEFAULT_DURATION_MINUTES: i32 = 60;
pub const MIN_DURATION_MINUTES: i32 = 15;

fn default_duration() -> i32 {
    DEFAULT_DURATION_MINUTES
}

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub created_by: Uuid,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: String,
    pub procedure: String,
    pub start_time: DateTime<Utc>,
    #[serde(default = "default_duration")]
    pub duration_minutes: i32,
    pub status: AppointmentStatus,
    pub price: Option<f64>,
    pub notes: Option<String>,
    #[serde(default)]
    pub confirmed_by_client: bool,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Exclusive end of `[start, start + duration)`, or `None` past chrono's range.
pub fn window_end(start: DateTime<Utc>, duration_minutes: i32) -> Option<DateTime<Utc>> {
    start.checked_add_signed(Duration::minutes(i64::from(duration_minutes)))
}

impl Appointment {
    /// Exclusive end of the booked window.
    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        window_end(self.start_time, self.duration_minutes)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    #[default]
    #[serde(alias = "agendado")]
    Scheduled,
    #[serde(alias = "confirmado")]
    Confirmed,
    #[serde(alias = "realizado")]
    Completed,
    #[serde(alias = "cancelado")]
    Cancelled,
    #[serde(alias = "faltou")]
    NoShow,
}

impl AppointmentStatus {
    pub const ACTIVE: [AppointmentStatus; 3] = [
        AppointmentStatus::Scheduled,
        AppointmentStatus::Confirmed,
        AppointmentStatus::Completed,
    ];

    /// Active appointments occupy their slot; cancelled and no-show ones free it.
    pub fn is_active(&self) -> bool {
        !matches!(self, AppointmentStatus::Cancelled | AppointmentStatus::NoShow)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Scheduled => write!(f, "scheduled"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::NoShow => write!(f, "no_show"),
        }
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub client_name: String,
    pub client_email: String,
    pub client_phone: String,
    pub procedure: String,
    pub start_time: DateTime<Utc>,
    #[serde(default = "default_duration")]
    pub duration_minutes: i32,
    #[serde(default)]
    pub status: AppointmentStatus,
    pub price: Option<f64>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub client_name: Option<String>,
    pub client_email: Option<String>,
    pub client_phone: Option<String>,
    pub procedure: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i32>,
    pub status: Option<AppointmentStatus>,
    pub price: Option<f64>,
    pub notes: Option<String>,
    pub confirmed_by_client: Option<bool>,
}

impl UpdateAppointmentRequest {
    /// Merge the provided fields into `appointment`. A client confirmation
    /// stamps `confirmed_at` the first time it is set.
    pub fn apply_to(self, appointment: &mut Appointment, now: DateTime<Utc>) {
        if let Some(client_name) = self.client_name {
            appointment.client_name = client_name;
        }
        if let Some(client_email) = self.client_email {
            appointment.client_email = client_email;
        }
        if let Some(client_phone) = self.client_phone {
            appointment.client_phone = client_phone;
        }
        if let Some(procedure) = self.procedure {
            appointment.procedure = procedure;
        }
        if let Some(start_time) = self.start_time {
            appointment.start_time = start_time;
        }
        if let Some(duration_minutes) = self.duration_minutes {
            appointment.duration_minutes = duration_minutes;
        }
        if let Some(status) = self.status {
            appointment.status = status;
        }
        if let Some(price) = self.price {
            appointment.price = Some(price);
        }
        if let Some(notes) = self.notes {
            appointment.notes = Some(notes);
        }
        if let Some(confirmed) = self.confirmed_by_client {
            if confirmed && !appointment.confirmed_by_client {
                appointment.confirmed_at = Some(now);
            } else if !confirmed {
                appointment.confirmed_at = None;
            }
            appointment.confirmed_by_client = confirmed;
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentSearchQuery {
    pub status: Option<AppointmentStatus>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
}

impl AppointmentSearchQuery {
    /// The period filter only applies when both bounds are present.
    pub fn period(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        match (self.from_date, self.to_date) {
            (Some(from), Some(to)) => Some((from, to)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictCheckQuery {
    pub start_time: DateTime<Utc>,
    #[serde(default = "default_duration")]
    pub duration_minutes: i32,
    pub exclude_appointment_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConflictCheckResponse {
    pub has_conflict: bool,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub conflicting_appointments: Vec<Uuid>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error, PartialEq)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Appointment slot conflicts with {} existing booking(s)", .conflicting_ids.len())]
    ConflictDetected { conflicting_ids: Vec<Uuid> },

    #[error("Not authorized: {0}")]
    Unauthorized(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

pub mod booking;
pub mod conflict;
pub mod lifecycle;
pub mod repository;

pub use booking::AppointmentBookingService;
pub use conflict::{check_appointment_conflict, ensure_slot_available, find_conflicts, intervals_overlap};
pub use repository::{AppointmentRepository, InMemoryAppointmentRepository, SupabaseAppointmentRepository};

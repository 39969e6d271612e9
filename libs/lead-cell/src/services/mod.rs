pub mod lead;
pub mod repository;
pub mod scoring;

pub use lead::LeadService;
pub use repository::{InMemoryLeadRepository, LeadRepository, SupabaseLeadRepository};
pub use scoring::{compute_lead_score, score_breakdown, ScoreBreakdown, ScoringRule};

// libs/lead-cell/src/models.rs
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use std::fmt;

// ==============================================================================
// CORE LEAD MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Lead {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub created_by: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub status: LeadStatus,
    pub procedure_of_interest: Option<String>,
    pub notes: Option<String>,
    pub source: LeadSource,
    #[serde(default)]
    pub has_messaging_contact: bool,
    pub age_bracket: Option<i32>,
    #[serde(default)]
    pub has_prior_procedure: bool,
    pub score: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    /// Snapshot of the attributes the scoring engine reads.
    pub fn scoring_input(&self) -> LeadScoringInput {
        LeadScoringInput {
            has_messaging_contact: self.has_messaging_contact,
            age_bracket: self.age_bracket,
            has_prior_procedure: self.has_prior_procedure,
            procedure_of_interest: self.procedure_of_interest.clone(),
            source: Some(self.source.clone()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    #[default]
    #[serde(alias = "novo")]
    New,
    #[serde(alias = "contatado")]
    Contacted,
    #[serde(alias = "qualificado")]
    Qualified,
    #[serde(alias = "convertido")]
    Converted,
    #[serde(alias = "perdido")]
    Lost,
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeadStatus::New => write!(f, "new"),
            LeadStatus::Contacted => write!(f, "contacted"),
            LeadStatus::Qualified => write!(f, "qualified"),
            LeadStatus::Converted => write!(f, "converted"),
            LeadStatus::Lost => write!(f, "lost"),
        }
    }
}

/// Acquisition channel of a lead.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LeadSource {
    #[default]
    Site,
    Instagram,
    Facebook,
    #[serde(alias = "indicacao")]
    Referral,
    #[serde(alias = "google")]
    Search,
    #[serde(alias = "outro")]
    Other,
}

impl LeadSource {
    pub fn is_qualified(&self) -> bool {
        matches!(self, LeadSource::Referral | LeadSource::Search)
    }
}

impl fmt::Display for LeadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeadSource::Site => write!(f, "site"),
            LeadSource::Instagram => write!(f, "instagram"),
            LeadSource::Facebook => write!(f, "facebook"),
            LeadSource::Referral => write!(f, "referral"),
            LeadSource::Search => write!(f, "search"),
            LeadSource::Other => write!(f, "other"),
        }
    }
}

/// Scoring-relevant lead attributes. Every field may be absent; absence never
/// contributes points.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LeadScoringInput {
    #[serde(default)]
    pub has_messaging_contact: bool,
    pub age_bracket: Option<i32>,
    #[serde(default)]
    pub has_prior_procedure: bool,
    pub procedure_of_interest: Option<String>,
    pub source: Option<LeadSource>,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLeadRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub procedure_of_interest: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub source: LeadSource,
    #[serde(default)]
    pub has_messaging_contact: bool,
    pub age_bracket: Option<i32>,
    #[serde(default)]
    pub has_prior_procedure: bool,
}

/// A present field, `null` included. Lets a PATCH body tell "clear this"
/// (`Some(None)`) apart from "leave it" (`None`).
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateLeadRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub status: Option<LeadStatus>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub procedure_of_interest: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
    pub source: Option<LeadSource>,
    pub has_messaging_contact: Option<bool>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub age_bracket: Option<Option<i32>>,
    pub has_prior_procedure: Option<bool>,
}

impl UpdateLeadRequest {
    /// Merge the provided fields into `lead`. The score is left untouched;
    /// callers recompute it afterwards.
    pub fn apply_to(self, lead: &mut Lead) {
        if let Some(name) = self.name {
            lead.name = name;
        }
        if let Some(email) = self.email {
            lead.email = email;
        }
        if let Some(phone) = self.phone {
            lead.phone = phone;
        }
        if let Some(status) = self.status {
            lead.status = status;
        }
        if let Some(procedure) = self.procedure_of_interest {
            lead.procedure_of_interest = procedure;
        }
        if let Some(notes) = self.notes {
            lead.notes = notes;
        }
        if let Some(source) = self.source {
            lead.source = source;
        }
        if let Some(has_messaging_contact) = self.has_messaging_contact {
            lead.has_messaging_contact = has_messaging_contact;
        }
        if let Some(age_bracket) = self.age_bracket {
            lead.age_bracket = age_bracket;
        }
        if let Some(has_prior_procedure) = self.has_prior_procedure {
            lead.has_prior_procedure = has_prior_procedure;
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeadSearchQuery {
    pub status: Option<LeadStatus>,
    pub min_score: Option<i32>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum LeadError {
    #[error("Lead not found")]
    NotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

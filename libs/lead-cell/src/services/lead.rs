// libs/lead-cell/src/services/lead.rs
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;

use crate::models::{
    CreateLeadRequest, Lead, LeadError, LeadSearchQuery, LeadStatus, UpdateLeadRequest,
};
use crate::services::repository::{LeadRepository, SupabaseLeadRepository};
use crate::services::scoring::{compute_lead_score, MAX_SCORE, MIN_SCORE};

pub struct LeadService {
    repository: Arc<dyn LeadRepository>,
}

impl LeadService {
    pub fn new(config: &AppConfig, auth_token: &str) -> Self {
        Self {
            repository: Arc::new(SupabaseLeadRepository::new(config, auth_token)),
        }
    }

    pub fn with_repository(repository: Arc<dyn LeadRepository>) -> Self {
        Self { repository }
    }

    pub async fn create_lead(
        &self,
        clinic_id: Uuid,
        created_by: Uuid,
        request: CreateLeadRequest,
    ) -> Result<Lead, LeadError> {
        debug!("Creating lead for clinic {}", clinic_id);

        let now = Utc::now();
        let mut lead = Lead {
            id: Uuid::new_v4(),
            clinic_id,
            created_by,
            name: request.name,
            email: request.email,
            phone: request.phone,
            status: LeadStatus::New,
            procedure_of_interest: request.procedure_of_interest,
            notes: request.notes,
            source: request.source,
            has_messaging_contact: request.has_messaging_contact,
            age_bracket: request.age_bracket,
            has_prior_procedure: request.has_prior_procedure,
            score: 0,
            created_at: now,
            updated_at: now,
        };
        rescore(&mut lead);

        let created = self.repository.insert(&lead).await?;
        info!(lead_id = %created.id, clinic_id = %clinic_id, score = created.score, "Lead created");
        Ok(created)
    }

    pub async fn get_lead(&self, clinic_id: Uuid, lead_id: Uuid) -> Result<Lead, LeadError> {
        self.repository
            .get(clinic_id, lead_id)
            .await?
            .ok_or(LeadError::NotFound)
    }

    pub async fn list_leads(
        &self,
        clinic_id: Uuid,
        query: LeadSearchQuery,
    ) -> Result<Vec<Lead>, LeadError> {
        if let Some(min_score) = query.min_score {
            if !(MIN_SCORE..=MAX_SCORE).contains(&min_score) {
                return Err(LeadError::ValidationError(format!(
                    "min_score must be between {} and {}", MIN_SCORE, MAX_SCORE
                )));
            }
        }

        self.repository.list(clinic_id, &query).await
    }

    pub async fn update_lead(
        &self,
        clinic_id: Uuid,
        lead_id: Uuid,
        request: UpdateLeadRequest,
    ) -> Result<Lead, LeadError> {
        let mut lead = self.get_lead(clinic_id, lead_id).await?;
        let previous_score = lead.score;

        request.apply_to(&mut lead);
        rescore(&mut lead);
        lead.updated_at = Utc::now();

        let updated = self.repository.update(&lead).await?;
        if updated.score != previous_score {
            info!(lead_id = %lead_id, from = previous_score, to = updated.score, "Lead score changed");
        }
        Ok(updated)
    }

    pub async fn delete_lead(&self, clinic_id: Uuid, lead_id: Uuid) -> Result<(), LeadError> {
        if !self.repository.delete(clinic_id, lead_id).await? {
            return Err(LeadError::NotFound);
        }
        info!(lead_id = %lead_id, clinic_id = %clinic_id, "Lead deleted");
        Ok(())
    }
}

/// Score is always derived from the lead's own attributes right before a write.
fn rescore(lead: &mut Lead) {
    lead.score = compute_lead_score(&lead.scoring_input());
}

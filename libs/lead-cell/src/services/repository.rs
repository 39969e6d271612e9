// libs/lead-cell/src/services/repository.rs
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{Lead, LeadError, LeadSearchQuery};

/// Persistence seam for leads. Implementations store whatever score they are
/// given; scoring happens in `LeadService` before any write reaches here.
#[async_trait]
pub trait LeadRepository: Send + Sync {
    async fn insert(&self, lead: &Lead) -> Result<Lead, LeadError>;

    async fn get(&self, clinic_id: Uuid, lead_id: Uuid) -> Result<Option<Lead>, LeadError>;

    /// Leads of one clinic, highest score first, then newest first.
    async fn list(&self, clinic_id: Uuid, query: &LeadSearchQuery) -> Result<Vec<Lead>, LeadError>;

    async fn update(&self, lead: &Lead) -> Result<Lead, LeadError>;

    /// Returns `false` when nothing matched.
    async fn delete(&self, clinic_id: Uuid, lead_id: Uuid) -> Result<bool, LeadError>;
}

// ==============================================================================
// SUPABASE (POSTGREST) REPOSITORY
// ==============================================================================

pub struct SupabaseLeadRepository {
    supabase: Arc<SupabaseClient>,
    auth_token: String,
}

impl SupabaseLeadRepository {
    pub fn new(config: &AppConfig, auth_token: &str) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
            auth_token: auth_token.to_string(),
        }
    }

    fn parse_rows(rows: Vec<Value>) -> Result<Vec<Lead>, LeadError> {
        rows.into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Lead>, _>>()
            .map_err(|e| LeadError::DatabaseError(format!("Failed to parse leads: {}", e)))
    }

    fn first_row(rows: Vec<Value>, action: &str) -> Result<Lead, LeadError> {
        Self::parse_rows(rows)?
            .into_iter()
            .next()
            .ok_or_else(|| LeadError::DatabaseError(format!("Failed to {} lead", action)))
    }

    fn to_row(lead: &Lead) -> Result<Value, LeadError> {
        serde_json::to_value(lead)
            .map_err(|e| LeadError::DatabaseError(format!("Failed to serialize lead: {}", e)))
    }
}

#[async_trait]
impl LeadRepository for SupabaseLeadRepository {
    async fn insert(&self, lead: &Lead) -> Result<Lead, LeadError> {
        let rows: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/leads",
            Some(&self.auth_token),
            Some(Self::to_row(lead)?),
            Some(SupabaseClient::representation_headers()),
        ).await.map_err(|e| LeadError::DatabaseError(e.to_string()))?;

        Self::first_row(rows, "create")
    }

    async fn get(&self, clinic_id: Uuid, lead_id: Uuid) -> Result<Option<Lead>, LeadError> {
        let path = format!("/rest/v1/leads?id=eq.{}&clinic_id=eq.{}", lead_id, clinic_id);
        let rows: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(&self.auth_token),
            None,
        ).await.map_err(|e| LeadError::DatabaseError(e.to_string()))?;

        Ok(Self::parse_rows(rows)?.into_iter().next())
    }

    async fn list(&self, clinic_id: Uuid, query: &LeadSearchQuery) -> Result<Vec<Lead>, LeadError> {
        let mut query_parts = vec![format!("clinic_id=eq.{}", clinic_id)];

        if let Some(status) = &query.status {
            query_parts.push(format!("status=eq.{}", status));
        }
        if let Some(min_score) = query.min_score {
            query_parts.push(format!("score=gte.{}", min_score));
        }

        let path = format!("/rest/v1/leads?{}&order=score.desc,created_at.desc",
                           query_parts.join("&"));
        debug!("Listing leads: {}", path);

        let rows: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(&self.auth_token),
            None,
        ).await.map_err(|e| LeadError::DatabaseError(e.to_string()))?;

        Self::parse_rows(rows)
    }

    async fn update(&self, lead: &Lead) -> Result<Lead, LeadError> {
        let path = format!("/rest/v1/leads?id=eq.{}&clinic_id=eq.{}", lead.id, lead.clinic_id);
        let rows: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(&self.auth_token),
            Some(Self::to_row(lead)?),
            Some(SupabaseClient::representation_headers()),
        ).await.map_err(|e| LeadError::DatabaseError(e.to_string()))?;

        Self::first_row(rows, "update")
    }

    async fn delete(&self, clinic_id: Uuid, lead_id: Uuid) -> Result<bool, LeadError> {
        let path = format!("/rest/v1/leads?id=eq.{}&clinic_id=eq.{}", lead_id, clinic_id);
        let rows: Vec<Value> = self.supabase.request_with_headers(
            Method::DELETE,
            &path,
            Some(&self.auth_token),
            None,
            Some(SupabaseClient::representation_headers()),
        ).await.map_err(|e| LeadError::DatabaseError(e.to_string()))?;

        Ok(!rows.is_empty())
    }
}

// ==============================================================================
// IN-MEMORY REPOSITORY
// ==============================================================================

/// Process-local store, used by tests and local runs without Supabase.
#[derive(Default)]
pub struct InMemoryLeadRepository {
    leads: RwLock<HashMap<Uuid, Lead>>,
}

impl InMemoryLeadRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LeadRepository for InMemoryLeadRepository {
    async fn insert(&self, lead: &Lead) -> Result<Lead, LeadError> {
        let mut leads = self.leads.write().await;
        if leads.contains_key(&lead.id) {
            return Err(LeadError::DatabaseError(format!("Lead {} already exists", lead.id)));
        }
        leads.insert(lead.id, lead.clone());
        Ok(lead.clone())
    }

    async fn get(&self, clinic_id: Uuid, lead_id: Uuid) -> Result<Option<Lead>, LeadError> {
        let leads = self.leads.read().await;
        Ok(leads.get(&lead_id).filter(|lead| lead.clinic_id == clinic_id).cloned())
    }

    async fn list(&self, clinic_id: Uuid, query: &LeadSearchQuery) -> Result<Vec<Lead>, LeadError> {
        let leads = self.leads.read().await;
        let mut matching: Vec<Lead> = leads
            .values()
            .filter(|lead| lead.clinic_id == clinic_id)
            .filter(|lead| query.status.as_ref().map_or(true, |status| &lead.status == status))
            .filter(|lead| query.min_score.map_or(true, |min| lead.score >= min))
            .cloned()
            .collect();

        matching.sort_by(|a, b| {
            b.score.cmp(&a.score).then_with(|| b.created_at.cmp(&a.created_at))
        });

        Ok(matching)
    }

    async fn update(&self, lead: &Lead) -> Result<Lead, LeadError> {
        let mut leads = self.leads.write().await;
        match leads.get_mut(&lead.id) {
            Some(stored) if stored.clinic_id == lead.clinic_id => {
                *stored = lead.clone();
                Ok(lead.clone())
            }
            _ => Err(LeadError::NotFound),
        }
    }

    async fn delete(&self, clinic_id: Uuid, lead_id: Uuid) -> Result<bool, LeadError> {
        let mut leads = self.leads.write().await;
        let owned = leads.get(&lead_id).is_some_and(|lead| lead.clinic_id == clinic_id);
        if owned {
            leads.remove(&lead_id);
        }
        Ok(owned)
    }
}

//! Collaborator seams for the diagnosis orchestrator.
//!
//! All collaborators are synchronous trait objects; the orchestrator blocks
//! only inside these calls.

use uuid::Uuid;

use super::error::AnalysisError;
use crate::db::DatabaseError;
use crate::models::{HealthAnalysis, ImageRef, PlantMetadata};

/// Remote plant health assessment. Untrusted and unreliable; callers do not
/// retry inside the orchestrator.
pub trait AnalysisCapability: Send + Sync {
    fn analyze(
        &self,
        image_ref: &ImageRef,
        plant: &PlantMetadata,
        auth: &CallerAuth,
    ) -> Result<HealthAnalysis, AnalysisError>;
}

/// The two writes a fresh diagnosis performs, issued in this order.
pub trait PersistenceGateway: Send + Sync {
    fn update_observation_analysis(
        &self,
        observation_id: &Uuid,
        analysis: &HealthAnalysis,
    ) -> Result<(), DatabaseError>;

    fn update_plant_health_score(&self, plant_id: &Uuid, score: f64) -> Result<(), DatabaseError>;
}

/// Cheap pre-flight existence check before spending an analysis call.
pub trait ImageProbe: Send + Sync {
    fn exists(&self, image_ref: &ImageRef) -> bool;
}

/// Identity and credentials of the caller requesting a diagnosis.
/// The token is never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct CallerAuth {
    pub owner_id: Uuid,
    token: Option<String>,
}

impl CallerAuth {
    pub fn new(owner_id: Uuid) -> Self {
        Self { owner_id, token: None }
    }

    pub fn with_token(owner_id: Uuid, token: impl Into<String>) -> Self {
        Self {
            owner_id,
            token: Some(token.into()),
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

impl std::fmt::Debug for CallerAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallerAuth")
            .field("owner_id", &self.owner_id)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

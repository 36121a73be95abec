//! Diagnosis orchestrator: fresh analysis with fallback to the last known one.
//!
//! Steps run strictly in order: pick latest observation → probe image →
//! analyze → validate → persist analysis → persist score → invalidate
//! aggregates. A failure while probing, analyzing or validating falls back
//! to the analysis already on the observation; persistence failures are
//! surfaced as-is.

use std::sync::Arc;

use super::error::{DiagnosisError, FailureStage, PersistenceStage};
use super::traits::{AnalysisCapability, CallerAuth, ImageProbe, PersistenceGateway};
use super::types::{DiagnosisOutcome, DiagnosisSource};
use crate::aggregates::{AggregateInvalidator, MutationEvent};
use crate::models::{HealthAnalysis, Observation, Plant};
use crate::scoring::{display_score, normalize};

pub struct DiagnosisOrchestrator {
    analyzer: Arc<dyn AnalysisCapability>,
    gateway: Arc<dyn PersistenceGateway>,
    probe: Arc<dyn ImageProbe>,
    invalidator: AggregateInvalidator,
}

impl DiagnosisOrchestrator {
    pub fn new(
        analyzer: Arc<dyn AnalysisCapability>,
        gateway: Arc<dyn PersistenceGateway>,
        probe: Arc<dyn ImageProbe>,
        invalidator: AggregateInvalidator,
    ) -> Self {
        Self {
            analyzer,
            gateway,
            probe,
            invalidator,
        }
    }

    /// Refresh the diagnosis of the plant's most recent observation.
    ///
    /// Concurrent calls for the same plant are not serialized; the last
    /// health score write wins.
    pub fn update_diagnosis(
        &self,
        plant: &Plant,
        auth: &CallerAuth,
    ) -> Result<DiagnosisOutcome, DiagnosisError> {
        let Some(latest) = plant.latest_observation() else {
            tracing::warn!(
                plant_id = %plant.id,
                stage = FailureStage::Precondition.as_str(),
                "Diagnosis requested for plant without observations"
            );
            return Err(DiagnosisError::NoObservations { plant_id: plant.id });
        };

        let _span = tracing::info_span!(
            "update_diagnosis",
            plant_id = %plant.id,
            observation_id = %latest.id,
        )
        .entered();

        match self.request_fresh_analysis(plant, latest, auth) {
            Ok((analysis, score)) => self.persist_fresh(plant, latest, analysis, score),
            Err(cause) => {
                tracing::warn!(
                    plant_id = %plant.id,
                    observation_id = %latest.id,
                    stage = cause.stage().as_str(),
                    error = %cause,
                    "Fresh analysis failed, trying last known analysis"
                );
                self.fallback(plant, latest, cause)
            }
        }
    }

    /// Probe, analyze and validate. Any error here is eligible for fallback.
    fn request_fresh_analysis(
        &self,
        plant: &Plant,
        latest: &Observation,
        auth: &CallerAuth,
    ) -> Result<(HealthAnalysis, f64), DiagnosisError> {
        if !self.probe.exists(&latest.image_ref) {
            return Err(DiagnosisError::ImageUnreachable {
                image_ref: latest.image_ref.clone(),
            });
        }

        let start = std::time::Instant::now();
        let analysis = self
            .analyzer
            .analyze(&latest.image_ref, &plant.metadata(), auth)?;
        tracing::debug!(
            elapsed_ms = %start.elapsed().as_millis(),
            "Analysis service responded"
        );

        if analysis.recognized_health().is_none() {
            return Err(DiagnosisError::IncompleteAnalysis);
        }
        let score = normalize(Some(&analysis)).ok_or(DiagnosisError::IncompleteAnalysis)?;
        Ok((analysis, score))
    }

    fn persist_fresh(
        &self,
        plant: &Plant,
        latest: &Observation,
        analysis: HealthAnalysis,
        score: f64,
    ) -> Result<DiagnosisOutcome, DiagnosisError> {
        self.gateway
            .update_observation_analysis(&latest.id, &analysis)
            .map_err(|source| {
                tracing::error!(
                    plant_id = %plant.id,
                    observation_id = %latest.id,
                    stage = FailureStage::Persistence.as_str(),
                    error = %source,
                    "Failed to persist observation analysis"
                );
                DiagnosisError::PersistenceFailure {
                    stage: PersistenceStage::ObservationAnalysis,
                    analysis_persisted: false,
                    source,
                }
            })?;

        // The analysis write has landed; aggregates are stale from here on,
        // whatever happens to the score write.
        let event = MutationEvent::DiagnosisUpdated {
            owner_id: plant.owner_id,
            plant_id: plant.id,
            observation_id: latest.id,
        };

        if let Err(source) = self
            .gateway
            .update_plant_health_score(&plant.id, display_score(score))
        {
            tracing::error!(
                plant_id = %plant.id,
                observation_id = %latest.id,
                stage = FailureStage::Persistence.as_str(),
                error = %source,
                "Analysis saved but health score write failed; score will be recomputed on read"
            );
            self.invalidator.record(&event);
            return Err(DiagnosisError::PersistenceFailure {
                stage: PersistenceStage::PlantHealthScore,
                analysis_persisted: true,
                source,
            });
        }

        self.invalidator.record(&event);

        tracing::info!(
            plant_id = %plant.id,
            observation_id = %latest.id,
            health_score = score,
            overall_health = ?analysis.overall_health,
            "Diagnosis updated"
        );

        let mut updated_observation = latest.clone();
        updated_observation.health_analysis = Some(analysis.clone());

        Ok(DiagnosisOutcome {
            health_score: score,
            health_analysis: analysis,
            updated_observation,
            source: DiagnosisSource::Fresh,
        })
    }

    /// Reuse the observation's existing analysis. No persistence, no invalidation.
    fn fallback(
        &self,
        plant: &Plant,
        latest: &Observation,
        cause: DiagnosisError,
    ) -> Result<DiagnosisOutcome, DiagnosisError> {
        let usable = latest
            .health_analysis
            .as_ref()
            .filter(|a| a.recognized_health().is_some())
            .and_then(|a| normalize(Some(a)).map(|score| (a, score)));

        match usable {
            Some((analysis, score)) => {
                tracing::info!(
                    plant_id = %plant.id,
                    observation_id = %latest.id,
                    health_score = score,
                    "Using last known analysis"
                );
                Ok(DiagnosisOutcome {
                    health_score: score,
                    health_analysis: analysis.clone(),
                    updated_observation: latest.clone(),
                    source: DiagnosisSource::Fallback {
                        failed_stage: cause.stage(),
                    },
                })
            }
            None => {
                tracing::error!(
                    plant_id = %plant.id,
                    observation_id = %latest.id,
                    stage = cause.stage().as_str(),
                    error = %cause,
                    "No usable analysis to fall back on"
                );
                Err(DiagnosisError::DiagnosisUnavailable {
                    plant_id: plant.id,
                    cause: Box::new(cause),
                })
            }
        }
    }
}

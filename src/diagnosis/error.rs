//! Diagnosis error taxonomy.
//!
//! `AnalysisError` covers the remote analysis service and image access.
//! `DiagnosisError` is what the orchestrator surfaces to its caller.

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::ImageRef;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Analysis service is not reachable at {0}")]
    NotReachable(String),

    #[error("Analysis service returned an error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Analysis request timed out after {0} seconds")]
    Timeout(u64),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Analysis service rejected the caller's credentials")]
    Unauthorized,

    #[error("Could not read image {image_ref}: {reason}")]
    ImageRead { image_ref: String, reason: String },

    #[error("Image too large ({0} bytes), maximum is 20 MB")]
    ImageTooLarge(usize),

    #[error("Malformed analysis response: {0}")]
    MalformedResponse(String),
}

/// Where in the diagnosis pipeline a failure happened. Logged with every failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Precondition,
    ImageProbe,
    Analysis,
    Validation,
    Persistence,
}

impl FailureStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Precondition => "precondition",
            Self::ImageProbe => "image_probe",
            Self::Analysis => "analysis",
            Self::Validation => "validation",
            Self::Persistence => "persistence",
        }
    }
}

/// Which of the two sequential writes failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistenceStage {
    ObservationAnalysis,
    PlantHealthScore,
}

impl std::fmt::Display for PersistenceStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::ObservationAnalysis => "observation analysis",
            Self::PlantHealthScore => "plant health score",
        })
    }
}

/// Lets the caller decide between offering a retry and showing an empty state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Network or service trouble; retrying may help.
    Service,
    /// Nothing to diagnose; retrying will not help.
    NoData,
}

#[derive(Error, Debug)]
pub enum DiagnosisError {
    #[error("Plant {plant_id} has no observations")]
    NoObservations { plant_id: Uuid },

    #[error("Image {image_ref} is not reachable")]
    ImageUnreachable { image_ref: ImageRef },

    #[error("Analysis did not include a recognized overall health")]
    IncompleteAnalysis,

    #[error("Analysis service failed: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("No diagnosis available for plant {plant_id}: {cause}")]
    DiagnosisUnavailable {
        plant_id: Uuid,
        #[source]
        cause: Box<DiagnosisError>,
    },

    #[error("Failed to persist {stage} (analysis persisted: {analysis_persisted}): {source}")]
    PersistenceFailure {
        stage: PersistenceStage,
        analysis_persisted: bool,
        #[source]
        source: DatabaseError,
    },
}

impl DiagnosisError {
    pub fn stage(&self) -> FailureStage {
        match self {
            Self::NoObservations { .. } => FailureStage::Precondition,
            Self::ImageUnreachable { .. } => FailureStage::ImageProbe,
            Self::IncompleteAnalysis => FailureStage::Validation,
            Self::Analysis(_) => FailureStage::Analysis,
            Self::DiagnosisUnavailable { cause, .. } => cause.stage(),
            Self::PersistenceFailure { .. } => FailureStage::Persistence,
        }
    }

    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::NoObservations { .. } => FailureKind::NoData,
            // A missing local photo stays missing on retry.
            Self::ImageUnreachable { image_ref } if !image_ref.is_remote() => FailureKind::NoData,
            Self::DiagnosisUnavailable { cause, .. } => cause.failure_kind(),
            _ => FailureKind::Service,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.failure_kind() == FailureKind::Service
    }

    /// Text suitable for showing to the plant owner.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NoObservations { .. } => {
                "There are no photos of this plant yet. Add a photo to get a health assessment."
            }
            Self::ImageUnreachable { image_ref } if !image_ref.is_remote() => {
                "The photo for this plant could not be found. Add a new photo to get a health assessment."
            }
            Self::DiagnosisUnavailable { cause, .. } => cause.user_message(),
            Self::PersistenceFailure { .. } => {
                "The new health assessment could not be saved. Please try again."
            }
            _ => "The plant health service could not be reached. Check your connection and try again.",
        }
    }
}

//! Plant diagnosis: fresh AI health analysis of the latest observation,
//! with graceful fallback to the last known analysis.
//!
//! The orchestrator only talks to its collaborators through the traits in
//! [`traits`]; the Ollama analyzer and filesystem/HTTP image access are the
//! production implementations.

pub mod error;
pub mod images;
pub mod ollama;
pub mod orchestrator;
pub mod traits;
pub mod types;

pub use error::*;
pub use images::{ImageAccess, MAX_IMAGE_BYTES};
pub use ollama::{parse_analysis_response, OllamaPlantAnalyzer, OllamaVisionClient, VisionChat};
pub use orchestrator::DiagnosisOrchestrator;
pub use traits::*;
pub use types::*;

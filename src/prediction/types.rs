use crate::config::GenerationConfig;
use serde::{Deserialize, Serialize};

/// Body of the prediction-creation call.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionRequest {
    pub version: String,
    pub input: GenerationInput,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationInput {
    pub prompt: String,
    pub model_version: String,
    pub duration: u32,
    pub top_k: u32,
    pub top_p: f32,
    pub temperature: f32,
    pub classifier_free_guidance: u32,
    pub output_format: String,
    pub normalization_strategy: String,
    pub continuation: bool,
    pub multi_band_diffusion: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionHandle {
    pub id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionState {
    Starting,
    Processing,
    Succeeded,
    Failed,
    Canceled,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PredictionStatus {
    pub status: PredictionState,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl PredictionRequest {
    pub fn new(version: impl Into<String>, prompt: impl Into<String>, params: &GenerationConfig) -> Self {
        Self {
            version: version.into(),
            input: GenerationInput {
                prompt: prompt.into(),
                model_version: params.model_version.clone(),
                duration: params.duration,
                top_k: params.top_k,
                top_p: params.top_p,
                temperature: params.temperature,
                classifier_free_guidance: params.classifier_free_guidance,
                output_format: params.output_format.clone(),
                normalization_strategy: params.normalization_strategy.clone(),
                continuation: params.continuation,
                multi_band_diffusion: params.multi_band_diffusion,
            },
        }
    }
}

impl PredictionState {
    /// `Failed` and `Canceled` end a prediction without output.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed | Self::Canceled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Processing => "processing",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
            Self::Unknown => "unknown",
        }
    }
}

impl PredictionStatus {
    /// Output URL, only once the prediction has succeeded and the output parses.
    pub fn output_url(&self) -> Option<url::Url> {
        if self.status != PredictionState::Succeeded {
            return None;
        }
        self.output
            .as_deref()
            .and_then(|output| url::Url::parse(output).ok())
    }
}

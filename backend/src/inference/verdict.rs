use shared::{ClassLabel, DISEASE_NAME, PredictionResponse};
use uuid::Uuid;

use super::model::{Classifier, InferenceError};
use super::preprocess::{UploadedImage, preprocess};

/// Confidence (in percent) at or above which the label is reported as a finding.
pub const DISEASE_THRESHOLD: f32 = 50.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub label: ClassLabel,
    pub disease_finding: bool,
    /// Percentage shown to the user.
    pub confidence: f32,
}

impl Verdict {
    /// A confident prediction is always phrased as a disease finding, even when
    /// the winning class is `Healthy`.
    pub fn from_scores(predicted: ClassLabel, confidence: f32) -> Self {
        if confidence >= DISEASE_THRESHOLD {
            Self {
                label: predicted,
                disease_finding: true,
                confidence,
            }
        } else {
            Self {
                label: ClassLabel::Healthy,
                disease_finding: false,
                confidence: 100.0 - confidence,
            }
        }
    }

    pub fn headline(&self) -> String {
        if self.disease_finding {
            format!("{}: {}", self.label, DISEASE_NAME)
        } else {
            self.label.to_string()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResult {
    pub probabilities: Vec<f32>,
    pub predicted: ClassLabel,
    /// `max(probabilities) * 100`.
    pub confidence: f32,
    pub verdict: Verdict,
}

impl PredictionResult {
    pub fn from_probabilities(probabilities: Vec<f32>) -> Result<Self, InferenceError> {
        if probabilities.len() != ClassLabel::ALL.len() {
            return Err(InferenceError::UnexpectedOutput(format!(
                "expected {} probabilities, got {}",
                ClassLabel::ALL.len(),
                probabilities.len()
            )));
        }
        if let Some(bad) = probabilities
            .iter()
            .find(|p| !p.is_finite() || **p < 0.0 || **p > 1.0)
        {
            return Err(InferenceError::UnexpectedOutput(format!(
                "probability {bad} outside [0, 1]"
            )));
        }

        // First maximum wins ties, as argmax does.
        let (index, max) = probabilities
            .iter()
            .copied()
            .enumerate()
            .fold((0, probabilities[0]), |best, (i, p)| {
                if p > best.1 { (i, p) } else { best }
            });
        let predicted = ClassLabel::from_index(index).ok_or_else(|| {
            InferenceError::UnexpectedOutput(format!("no class for index {index}"))
        })?;
        let confidence = max * 100.0;

        Ok(Self {
            verdict: Verdict::from_scores(predicted, confidence),
            probabilities,
            predicted,
            confidence,
        })
    }

    pub fn into_response(self, id: Uuid) -> PredictionResponse {
        PredictionResponse {
            id,
            headline: self.verdict.headline(),
            predictions: self.probabilities,
            class_labels: ClassLabel::names(),
            predicted_class: self.verdict.label,
            disease_finding: self.verdict.disease_finding,
            confidence: self.verdict.confidence,
        }
    }
}

/// Runs one upload through the classifier.
pub fn classify(
    classifier: &dyn Classifier,
    image: &UploadedImage,
    input_size: u32,
) -> Result<PredictionResult, InferenceError> {
    let input = preprocess(&image.pixels, input_size);
    let probabilities = classifier.predict(&input)?;
    PredictionResult::from_probabilities(probabilities)
}

pub mod advisory;

use derive_more::Display;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumIter};
use uuid::Uuid;

/// File extensions the upload control accepts.
pub const ACCEPTED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Appended to the label whenever the classifier is confident enough.
pub const DISEASE_NAME: &str = "Maize Downy Mildew Disease";

/// Output classes in model index order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr, EnumIter,
)]
pub enum ClassLabel {
    Unhealthy,
    Healthy,
}

impl ClassLabel {
    pub const ALL: [ClassLabel; 2] = [ClassLabel::Unhealthy, ClassLabel::Healthy];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        match self {
            ClassLabel::Unhealthy => 0,
            ClassLabel::Healthy => 1,
        }
    }

    pub fn names() -> Vec<String> {
        Self::ALL.iter().map(|label| label.to_string()).collect()
    }
}

/// Confidence rendered the way the dashboard prints it.
#[derive(Debug, Clone, Copy, PartialEq, Display)]
#[display(fmt = "{:.2}%", _0)]
pub struct Percent(pub f32);

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PredictionResponse {
    pub id: Uuid,
    pub predictions: Vec<f32>,
    pub class_labels: Vec<String>,
    pub predicted_class: ClassLabel,
    pub disease_finding: bool,
    pub headline: String,
    pub confidence: f32,
}

impl PredictionResponse {
    pub fn confidence_text(&self) -> String {
        Percent(self.confidence).to_string()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

/// Case-insensitive check of a file name against [`ACCEPTED_EXTENSIONS`].
pub fn has_accepted_extension(file_name: &str) -> bool {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| {
            ACCEPTED_EXTENSIONS
                .iter()
                .any(|accepted| accepted.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

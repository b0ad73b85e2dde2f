use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ExtractError;
use crate::media::{ResolutionAttempt, Strategy};

/// Longest cooking time accepted on a recipe or version (one week).
pub const MAX_COOKING_TIME_MINUTES: u32 = 60 * 24 * 7;

/// A single ingredient line, in recipe order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
}

impl Ingredient {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            amount: None,
            unit: None,
        }
    }

    /// Trimmed copy with blank amount/unit dropped; `None` for a blank name.
    pub fn normalized(self) -> Option<Self> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return None;
        }
        Some(Self {
            name,
            amount: non_blank(self.amount),
            unit: non_blank(self.unit),
        })
    }
}

/// Trim an optional string, mapping blank to `None`.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Trim each line and drop the blank ones.
pub fn non_blank_lines(lines: Vec<String>) -> Vec<String> {
    lines
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    /// Lenient parse used for model output and stored values.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

/// Step-zero narration: the summary and its audio always travel together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepZero {
    pub summary: String,
    pub audio_url: String,
}

impl StepZero {
    /// Build the pair from two independently nullable values.
    ///
    /// Returns `Ok(None)` when both are absent and `Err` when only one is present.
    pub fn from_parts(
        summary: Option<String>,
        audio_url: Option<String>,
    ) -> Result<Option<Self>, &'static str> {
        match (summary, audio_url) {
            (Some(summary), Some(audio_url)) => Ok(Some(Self { summary, audio_url })),
            (None, None) => Ok(None),
            (Some(_), None) => Err("step0_summary requires step0_audio_url"),
            (None, Some(_)) => Err("step0_audio_url requires step0_summary"),
        }
    }
}

/// Structured recipe produced by content understanding, before persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub ingredients: Vec<Ingredient>,
    pub instructions: Vec<String>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub cooking_time_minutes: Option<u32>,
    #[serde(default)]
    pub step_zero_summary: Option<String>,
    #[serde(default)]
    pub thumbnail_ref: Option<String>,
}

impl RecipeDraft {
    /// Reject drafts that are unusable downstream.
    pub fn validate(&self) -> Result<(), ExtractError> {
        if self.title.trim().is_empty() {
            return Err(ExtractError::MissingField("title".to_string()));
        }
        if !self.ingredients.iter().any(|i| !i.name.trim().is_empty()) {
            return Err(ExtractError::MissingField("ingredients".to_string()));
        }
        if !self.instructions.iter().any(|s| !s.trim().is_empty()) {
            return Err(ExtractError::MissingField("instructions".to_string()));
        }
        Ok(())
    }

    /// Drop blank ingredient and instruction entries the model sometimes emits.
    pub fn normalized(mut self) -> Self {
        self.title = self.title.trim().to_string();
        self.description = self.description.trim().to_string();
        self.ingredients = self
            .ingredients
            .into_iter()
            .filter_map(Ingredient::normalized)
            .collect();
        self.instructions = non_blank_lines(self.instructions);
        self.step_zero_summary = non_blank(self.step_zero_summary);
        self.cooking_time_minutes = self
            .cooking_time_minutes
            .filter(|m| *m <= MAX_COOKING_TIME_MINUTES);
        self
    }
}

/// Preparation guidance for one instruction step (1-based).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepPreparation {
    pub step: u32,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub equipment: Vec<String>,
    #[serde(default)]
    pub actions: Vec<String>,
}

/// Output from the extract_recipe step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractRecipeOutput {
    pub draft: RecipeDraft,
    /// Which strategy produced the draft
    pub strategy_used: Strategy,
    /// Every strategy that was attempted, in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attempts: Vec<ResolutionAttempt>,
    /// Platform description gathered while resolving the media
    #[serde(default)]
    pub auxiliary_description: Option<String>,
    #[serde(default)]
    pub creator: Option<String>,
}

/// Output from the persist_thumbnail step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistThumbnailOutput {
    pub thumbnail_url: Option<String>,
    /// True when the URL was uploaded to durable storage by this step
    pub rehosted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Output from the generate_embedding step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateEmbeddingOutput {
    pub embedding: Vec<f32>,
}

/// Output from the synthesize_narration step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesizeNarrationOutput {
    pub step_zero: Option<StepZero>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Output from the save_recipe step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveRecipeOutput {
    pub recipe_id: Uuid,
}

/// Output from the notify_devices step
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotifyDevicesOutput {
    pub sent: usize,
    pub failed: usize,
}

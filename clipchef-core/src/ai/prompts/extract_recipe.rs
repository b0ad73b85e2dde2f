//! Recipe extraction prompt: video in, structured draft out.

use serde::Deserialize;

use super::strip_code_fence;
use crate::ai::AiError;
use crate::types::{Difficulty, Ingredient, RecipeDraft};

/// Prompt name used in logs.
pub const EXTRACT_RECIPE_PROMPT_NAME: &str = "extract_recipe";

/// Render the extraction prompt, appending the platform description when present.
pub fn render_extract_prompt(auxiliary: Option<&str>) -> String {
    let mut prompt = String::from(
        r#"You are a recipe extraction assistant. Watch the attached cooking video and write down the recipe it demonstrates.

Rules:
- List every ingredient in the order it is used, with amount and unit when they are stated or shown.
- Write each instruction as one short imperative step, in order.
- Estimate difficulty as "easy", "medium" or "hard" and the total cooking time in minutes.
- Write a two or three sentence spoken-style overview of the dish in "step_zero_summary", suitable for reading aloud before cooking starts.
- If the video does not show a recipe, return an empty ingredients list.

Respond with JSON only, no other text:
{"title": "...", "description": "...", "ingredients": [{"name": "...", "amount": "...", "unit": "..."}], "instructions": ["..."], "difficulty": "easy", "cooking_time_minutes": 30, "step_zero_summary": "..."}"#,
    );

    if let Some(aux) = auxiliary.map(str::trim).filter(|s| !s.is_empty()) {
        prompt.push_str("\n\nThe creator's post description, which may contain the ingredient list:\n");
        prompt.push_str(aux);
    }

    prompt
}

#[derive(Debug, Deserialize)]
struct DraftResponse {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    ingredients: Vec<IngredientResponse>,
    #[serde(default)]
    instructions: Vec<String>,
    #[serde(default)]
    difficulty: Option<String>,
    #[serde(default)]
    cooking_time_minutes: Option<f64>,
    #[serde(default)]
    step_zero_summary: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IngredientResponse {
    name: String,
    #[serde(default)]
    amount: Option<String>,
    #[serde(default)]
    unit: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Parse the model's JSON into a normalized draft. Structural validation is left
/// to the caller.
pub fn parse_draft_response(content: &str) -> Result<RecipeDraft, AiError> {
    let raw: DraftResponse = serde_json::from_str(strip_code_fence(content))
        .map_err(|e| AiError::ParseError(format!("Failed to parse recipe draft: {}", e)))?;

    let draft = RecipeDraft {
        title: raw.title,
        description: raw.description.unwrap_or_default(),
        ingredients: raw
            .ingredients
            .into_iter()
            .map(|i| Ingredient {
                name: i.name,
                amount: non_empty(i.amount),
                unit: non_empty(i.unit),
            })
            .collect(),
        instructions: raw.instructions,
        difficulty: raw.difficulty.as_deref().and_then(Difficulty::parse),
        cooking_time_minutes: raw
            .cooking_time_minutes
            .filter(|m| m.is_finite() && *m > 0.0)
            .map(|m| m.round() as u32),
        step_zero_summary: raw.step_zero_summary,
        thumbnail_ref: None,
    };

    Ok(draft.normalized())
}

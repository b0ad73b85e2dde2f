//! Per-step preparation guide prompt.

use serde::Deserialize;

use super::strip_code_fence;
use crate::ai::AiError;
use crate::types::{Ingredient, StepPreparation};

/// Prompt name used in logs.
pub const STEP_PREPARATION_PROMPT_NAME: &str = "step_preparation";

/// Render the preparation prompt for a recipe's ingredients and numbered steps.
pub fn render_step_preparation_prompt(
    title: &str,
    ingredients: &[Ingredient],
    instructions: &[String],
) -> String {
    let ingredient_lines = ingredients
        .iter()
        .map(|i| {
            let qty = [i.amount.as_deref(), i.unit.as_deref()]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ");
            if qty.is_empty() {
                format!("- {}", i.name)
            } else {
                format!("- {} {}", qty, i.name)
            }
        })
        .collect::<Vec<_>>()
        .join("\n");

    let step_lines = instructions
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{}. {}", i + 1, s))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are a kitchen assistant. For each numbered step of the recipe below, list what the cook needs ready before starting that step: the ingredients it uses, the equipment, and any preparation actions (chopping, preheating, measuring).

Recipe: {title}

Ingredients:
{ingredient_lines}

Steps:
{step_lines}

Respond with JSON only, no other text. Return one entry per step, using the step number:
{{"steps": [{{"step": 1, "ingredients": ["..."], "equipment": ["..."], "actions": ["..."]}}]}}"#,
        title = title,
        ingredient_lines = ingredient_lines,
        step_lines = step_lines,
    )
}

#[derive(Debug, Deserialize)]
struct StepPreparationResponse {
    steps: Vec<StepPreparation>,
}

/// Parse the model's response, dropping entries that reference steps outside
/// `1..=step_count` and keeping the first entry per step.
pub fn parse_step_preparation_response(
    content: &str,
    step_count: usize,
) -> Result<Vec<StepPreparation>, AiError> {
    let response: StepPreparationResponse = serde_json::from_str(strip_code_fence(content))
        .map_err(|e| AiError::ParseError(format!("Failed to parse step preparation: {}", e)))?;

    let mut steps: Vec<StepPreparation> = Vec::with_capacity(step_count);
    for prep in response.steps {
        let in_range = prep.step >= 1 && (prep.step as usize) <= step_count;
        if in_range && !steps.iter().any(|s| s.step == prep.step) {
            steps.push(prep);
        }
    }
    steps.sort_by_key(|s| s.step);
    Ok(steps)
}

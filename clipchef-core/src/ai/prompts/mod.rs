//! AI prompt templates and response parsers.

pub mod extract_recipe;
pub mod step_preparation;

pub use extract_recipe::{parse_draft_response, render_extract_prompt, EXTRACT_RECIPE_PROMPT_NAME};
pub use step_preparation::{
    parse_step_preparation_response, render_step_preparation_prompt,
    STEP_PREPARATION_PROMPT_NAME,
};

/// Strip a Markdown code fence the model sometimes wraps JSON in.
pub(crate) fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

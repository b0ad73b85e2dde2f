//! Recipe versioning state machine.
//!
//! A recipe starts `Unversioned`. Its first remix snapshots the current recipe
//! as version 1 ("Original") and writes the remix as version 2; every later
//! remix appends exactly one version. Both paths overwrite the recipe's
//! mutable fields with the remix content.
//!
//! [`plan_remix`] is pure and shared by every [`RecipeStore`]; stores only
//! have to commit the plan atomically. [`save_remix`] validates input and
//! retries commits that lost a race for a version number.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::storage::is_durable_audio;
use crate::store::{NewRecipeVersion, Recipe, RecipeStore, RecipeUpdate, RecipeVersion, StoreError};
use crate::types::{
    non_blank, non_blank_lines, Difficulty, Ingredient, StepZero, MAX_COOKING_TIME_MINUTES,
};

/// Title given to the snapshot of the pre-remix recipe.
pub const ORIGINAL_VERSION_TITLE: &str = "Original";

/// Commit attempts before a remix gives up on version conflicts.
pub const MAX_REMIX_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionState {
    Unversioned,
    Versioned { latest: i32 },
}

impl VersionState {
    /// State from the highest stored version number, if any.
    pub fn from_latest(latest: Option<i32>) -> Self {
        match latest {
            Some(latest) => VersionState::Versioned { latest },
            None => VersionState::Unversioned,
        }
    }
}

/// User-submitted content for a new version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Remix {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub ingredients: Vec<Ingredient>,
    pub instructions: Vec<String>,
    #[serde(default)]
    pub chefs_note: Option<String>,
    /// Names of the ingredients the user changed. Taken as given.
    #[serde(default)]
    pub changed_ingredients: Vec<String>,
    #[serde(default)]
    pub step0_summary: Option<String>,
    #[serde(default)]
    pub step0_audio_url: Option<String>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub cooking_time_minutes: Option<u32>,
}

impl Remix {
    /// Trim text fields and drop blank ingredient, instruction and
    /// changed-ingredient entries.
    pub fn normalized(mut self) -> Self {
        self.title = self.title.trim().to_string();
        self.description = self.description.trim().to_string();
        self.ingredients = self
            .ingredients
            .into_iter()
            .filter_map(Ingredient::normalized)
            .collect();
        self.instructions = non_blank_lines(self.instructions);
        self.chefs_note = non_blank(self.chefs_note);
        self.changed_ingredients = non_blank_lines(self.changed_ingredients);
        self.step0_summary = non_blank(self.step0_summary);
        self.step0_audio_url = non_blank(self.step0_audio_url);
        self
    }

    /// Reject input that can never produce a valid version.
    pub fn validate(&self) -> Result<(), VersionError> {
        if self.title.trim().is_empty() {
            return Err(VersionError::Invalid("title must not be empty".to_string()));
        }
        if !self.ingredients.iter().any(|i| !i.name.trim().is_empty()) {
            return Err(VersionError::Invalid(
                "at least one ingredient is required".to_string(),
            ));
        }
        if !self.instructions.iter().any(|s| !s.trim().is_empty()) {
            return Err(VersionError::Invalid(
                "at least one instruction is required".to_string(),
            ));
        }
        if let Some(minutes) = self.cooking_time_minutes {
            if minutes > MAX_COOKING_TIME_MINUTES {
                return Err(VersionError::Invalid(format!(
                    "cooking_time_minutes must be at most {}",
                    MAX_COOKING_TIME_MINUTES
                )));
            }
        }
        if let Some(step_zero) = self.step_zero()? {
            if !is_durable_audio(&step_zero.audio_url) {
                return Err(VersionError::Invalid(
                    "step0_audio_url must point into durable narration storage".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// The remix's step-zero pair; a half-present pair is an error.
    pub fn step_zero(&self) -> Result<Option<StepZero>, VersionError> {
        StepZero::from_parts(self.step0_summary.clone(), self.step0_audio_url.clone())
            .map_err(|e| VersionError::Invalid(e.to_string()))
    }
}

#[derive(Error, Debug)]
pub enum VersionError {
    #[error("Invalid remix: {0}")]
    Invalid(String),

    #[error("Recipe not found")]
    NotFound,

    #[error("Gave up after {attempts} conflicting attempts to save recipe {recipe_id}")]
    Conflict { recipe_id: Uuid, attempts: usize },

    #[error("Store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for VersionError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => VersionError::NotFound,
            StoreError::Invalid(msg) => VersionError::Invalid(msg),
            other => VersionError::Store(other),
        }
    }
}

/// Versions to write and the recipe update, computed from the current state.
#[derive(Debug, Clone, PartialEq)]
pub struct RemixPlan {
    pub versions: Vec<NewRecipeVersion>,
    pub update: RecipeUpdate,
    pub next_state: VersionState,
}

/// Compute the writes for one remix. Pure: no I/O, no clock reads.
pub fn plan_remix(
    recipe: &Recipe,
    state: VersionState,
    remix: &Remix,
    now: DateTime<Utc>,
) -> Result<RemixPlan, VersionError> {
    let remix = remix.clone().normalized();
    remix.validate()?;
    let step_zero = remix.step_zero()?;

    let mut versions = Vec::with_capacity(2);
    let next = match state {
        VersionState::Unversioned => {
            versions.push(NewRecipeVersion {
                recipe_id: recipe.id,
                version_number: 1,
                title: ORIGINAL_VERSION_TITLE.to_string(),
                description: recipe.description.clone(),
                ingredients: recipe.ingredients.clone(),
                instructions: recipe.instructions.clone(),
                chefs_note: recipe.chefs_note.clone(),
                changed_ingredients: Vec::new(),
                step_zero: recipe.step_zero.clone(),
                difficulty: recipe.difficulty,
                cooking_time_minutes: recipe.cooking_time_minutes,
                created_at: recipe.created_at,
            });
            2
        }
        VersionState::Versioned { latest } => latest + 1,
    };

    versions.push(NewRecipeVersion {
        recipe_id: recipe.id,
        version_number: next,
        title: remix.title.clone(),
        description: remix.description.clone(),
        ingredients: remix.ingredients.clone(),
        instructions: remix.instructions.clone(),
        chefs_note: remix.chefs_note.clone(),
        changed_ingredients: remix.changed_ingredients.clone(),
        step_zero: step_zero.clone(),
        difficulty: remix.difficulty,
        cooking_time_minutes: remix.cooking_time_minutes,
        created_at: now,
    });

    Ok(RemixPlan {
        versions,
        update: RecipeUpdate {
            title: remix.title.clone(),
            description: remix.description.clone(),
            ingredients: remix.ingredients.clone(),
            instructions: remix.instructions.clone(),
            chefs_note: remix.chefs_note.clone(),
            step_zero,
            difficulty: remix.difficulty,
            cooking_time_minutes: remix.cooking_time_minutes,
            updated_at: now,
        },
        next_state: VersionState::Versioned { latest: next },
    })
}

/// Validate and commit a remix, retrying version conflicts with a fresh read.
///
/// Returns the versions written by the successful attempt.
pub async fn save_remix(
    store: &dyn RecipeStore,
    user_id: Uuid,
    recipe_id: Uuid,
    remix: &Remix,
) -> Result<Vec<RecipeVersion>, VersionError> {
    let remix = remix.clone().normalized();
    remix.validate()?;

    for attempt in 1..=MAX_REMIX_ATTEMPTS {
        match store.commit_remix(user_id, recipe_id, &remix).await {
            Ok(versions) => {
                tracing::info!(
                    %recipe_id,
                    %user_id,
                    versions = versions.len(),
                    attempt,
                    "remix saved"
                );
                return Ok(versions);
            }
            Err(StoreError::VersionConflict { version_number, .. }) => {
                tracing::warn!(
                    %recipe_id,
                    version_number,
                    attempt,
                    "remix lost a version race, retrying"
                );
            }
            Err(e) => return Err(e.into()),
        }
    }

    tracing::error!(%recipe_id, %user_id, "remix failed after repeated version conflicts");
    Err(VersionError::Conflict {
        recipe_id,
        attempts: MAX_REMIX_ATTEMPTS,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn recipe() -> Recipe {
        let created = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        Recipe {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Pasta v1".to_string(),
            description: "Tomato pasta".to_string(),
            ingredients: vec![Ingredient::named("spaghetti")],
            instructions: vec!["Boil".to_string()],
            thumbnail_url: None,
            source_url: "https://youtu.be/abc".to_string(),
            creator: None,
            embedding: vec![0.1],
            step_zero: Some(StepZero {
                summary: "Quick pasta".to_string(),
                audio_url: "https://s.test/storage/v1/object/public/step0-audio/a.wav".to_string(),
            }),
            step_preparations: None,
            favorite: false,
            parent_recipe_id: None,
            chefs_note: None,
            difficulty: Some(Difficulty::Easy),
            cooking_time_minutes: Some(20),
            created_at: created,
            updated_at: created,
        }
    }

    fn remix(title: &str) -> Remix {
        Remix {
            title: title.to_string(),
            description: "Hotter".to_string(),
            ingredients: vec![Ingredient::named("spaghetti"), Ingredient::named("chili")],
            instructions: vec!["Boil".to_string(), "Add chili".to_string()],
            chefs_note: Some("Go easy".to_string()),
            changed_ingredients: vec!["chili".to_string()],
            step0_summary: None,
            step0_audio_url: None,
            difficulty: Some(Difficulty::Medium),
            cooking_time_minutes: Some(25),
        }
    }

    #[test]
    fn test_first_remix_snapshots_original() {
        let recipe = recipe();
        let now = Utc::now();
        let plan = plan_remix(&recipe, VersionState::Unversioned, &remix("Pasta Spicy"), now).unwrap();

        assert_eq!(plan.versions.len(), 2);
        let v1 = &plan.versions[0];
        assert_eq!(v1.version_number, 1);
        assert_eq!(v1.title, "Original");
        assert_eq!(v1.description, "Tomato pasta");
        assert_eq!(v1.ingredients, recipe.ingredients);
        assert!(v1.changed_ingredients.is_empty());
        assert_eq!(v1.step_zero, recipe.step_zero);
        assert_eq!(v1.created_at, recipe.created_at);

        let v2 = &plan.versions[1];
        assert_eq!(v2.version_number, 2);
        assert_eq!(v2.title, "Pasta Spicy");
        assert_eq!(v2.changed_ingredients, vec!["chili"]);
        assert_eq!(v2.created_at, now);

        assert_eq!(plan.update.title, "Pasta Spicy");
        assert_eq!(plan.update.step_zero, None);
        assert_eq!(plan.next_state, VersionState::Versioned { latest: 2 });
    }

    #[test]
    fn test_later_remix_appends_one() {
        let plan = plan_remix(
            &recipe(),
            VersionState::Versioned { latest: 2 },
            &remix("Pasta Extra Spicy"),
            Utc::now(),
        )
        .unwrap();

        assert_eq!(plan.versions.len(), 1);
        assert_eq!(plan.versions[0].version_number, 3);
        assert_eq!(plan.update.title, "Pasta Extra Spicy");
        assert_eq!(plan.next_state, VersionState::Versioned { latest: 3 });
    }

    #[test]
    fn test_validation() {
        let mut r = remix("  ");
        assert!(matches!(r.validate(), Err(VersionError::Invalid(_))));

        r = remix("Ok");
        r.ingredients.clear();
        assert!(r.validate().is_err());

        r = remix("Ok");
        r.instructions = vec![" ".to_string()];
        assert!(r.validate().is_err());

        r = remix("Ok");
        r.step0_summary = Some("Only half".to_string());
        assert!(r.validate().is_err());

        r.step0_audio_url = Some(
            "https://s.test/storage/v1/object/public/step0-audio/b.wav".to_string(),
        );
        assert!(r.validate().is_ok());
        assert_eq!(r.step_zero().unwrap().unwrap().summary, "Only half");

        r.step0_audio_url = Some("https://cdn.tiktok.example/tmp/sig=abc/a.mp3".to_string());
        assert!(matches!(r.validate(), Err(VersionError::Invalid(_))));

        r = remix("Ok");
        r.cooking_time_minutes = Some(u32::MAX);
        assert!(matches!(r.validate(), Err(VersionError::Invalid(_))));
        r.cooking_time_minutes = Some(MAX_COOKING_TIME_MINUTES);
        assert!(r.validate().is_ok());
    }

    #[test]
    fn test_remix_is_normalized_before_planning() {
        let mut r = remix("  Pasta Spicy  ");
        r.ingredients.push(Ingredient::named("   "));
        r.ingredients.push(Ingredient {
            name: " basil ".to_string(),
            amount: Some(" ".to_string()),
            unit: None,
        });
        r.instructions.push("  ".to_string());
        r.instructions.push("  Serve  ".to_string());
        r.changed_ingredients.push(String::new());
        r.chefs_note = Some("   ".to_string());

        let plan = plan_remix(&recipe(), VersionState::Versioned { latest: 2 }, &r, Utc::now())
            .unwrap();
        let version = &plan.versions[0];

        assert_eq!(version.title, "Pasta Spicy");
        assert!(version.ingredients.iter().all(|i| !i.name.trim().is_empty()));
        assert_eq!(version.ingredients.last().unwrap(), &Ingredient::named("basil"));
        assert_eq!(version.instructions.last().unwrap(), "Serve");
        assert!(version.instructions.iter().all(|s| !s.is_empty()));
        assert!(version.changed_ingredients.iter().all(|s| !s.is_empty()));
        assert_eq!(version.chefs_note, None);
        assert_eq!(plan.update.ingredients, version.ingredients);
        assert_eq!(plan.update.instructions, version.instructions);
    }

    #[test]
    fn test_state_from_latest() {
        assert_eq!(VersionState::from_latest(None), VersionState::Unversioned);
        assert_eq!(
            VersionState::from_latest(Some(4)),
            VersionState::Versioned { latest: 4 }
        );
    }
}

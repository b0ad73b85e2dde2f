//! PostgreSQL implementation of [`RecipeStore`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use clipchef_core::store::{NewRecipe, Recipe, RecipeStore, RecipeVersion, StoreError};
use clipchef_core::types::StepPreparation;
use clipchef_core::versioning::{plan_remix, Remix, VersionState};
use diesel::dsl::max;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use uuid::Uuid;

use crate::db::DbPool;
use crate::models::{
    NewRecipeRow, NewRecipeVersionRow, NewUserDevice, RecipeChanges, RecipeRow, RecipeVersionRow,
};
use crate::schema::{recipe_versions, recipes, user_devices};

pub struct PgRecipeStore {
    pool: Arc<DbPool>,
}

impl PgRecipeStore {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }

    /// Run blocking diesel work off the async runtime.
    async fn run<T, F>(&self, work: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> Result<T, StoreError> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|e| StoreError::Backend(format!("Database connection failed: {}", e)))?;
            work(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Backend(format!("Database task failed: {}", e)))?
    }
}

fn backend(e: DieselError) -> StoreError {
    match e {
        DieselError::NotFound => StoreError::NotFound,
        e => StoreError::Backend(e.to_string()),
    }
}

/// Error type for the remix transaction; diesel needs `From<diesel::result::Error>`.
enum TxError {
    Store(StoreError),
    Diesel(DieselError),
}

impl From<DieselError> for TxError {
    fn from(e: DieselError) -> Self {
        TxError::Diesel(e)
    }
}

impl From<StoreError> for TxError {
    fn from(e: StoreError) -> Self {
        TxError::Store(e)
    }
}

impl From<TxError> for StoreError {
    fn from(e: TxError) -> Self {
        match e {
            TxError::Store(e) => e,
            TxError::Diesel(e) => backend(e),
        }
    }
}

fn load_owned(
    conn: &mut PgConnection,
    user_id: Uuid,
    recipe_id: Uuid,
) -> Result<RecipeRow, StoreError> {
    recipes::table
        .filter(recipes::id.eq(recipe_id))
        .filter(recipes::user_id.eq(user_id))
        .select(RecipeRow::as_select())
        .first(conn)
        .map_err(backend)
}

fn commit_remix_tx(
    conn: &mut PgConnection,
    user_id: Uuid,
    recipe_id: Uuid,
    remix: &Remix,
) -> Result<Vec<RecipeVersion>, TxError> {
    // Row lock serializes remixes of the same recipe.
    let row: RecipeRow = recipes::table
        .filter(recipes::id.eq(recipe_id))
        .filter(recipes::user_id.eq(user_id))
        .select(RecipeRow::as_select())
        .for_update()
        .first(conn)
        .optional()?
        .ok_or(StoreError::NotFound)?;
    let recipe = row.into_recipe()?;

    let latest: Option<i32> = recipe_versions::table
        .filter(recipe_versions::recipe_id.eq(recipe_id))
        .select(max(recipe_versions::version_number))
        .first(conn)?;

    let plan = plan_remix(&recipe, VersionState::from_latest(latest), remix, Utc::now())
        .map_err(|e| StoreError::Invalid(e.to_string()))?;
    let first_number = plan.versions.first().map(|v| v.version_number).unwrap_or(1);

    let rows = plan
        .versions
        .into_iter()
        .map(NewRecipeVersionRow::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    let written: Vec<RecipeVersionRow> = diesel::insert_into(recipe_versions::table)
        .values(&rows)
        .returning(RecipeVersionRow::as_returning())
        .get_results(conn)
        .map_err(|e| match e {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                TxError::Store(StoreError::VersionConflict {
                    recipe_id,
                    version_number: first_number,
                })
            }
            e => TxError::Diesel(e),
        })?;

    diesel::update(recipes::table.find(recipe_id))
        .set(RecipeChanges::try_from(plan.update)?)
        .execute(conn)?;

    let mut versions = written
        .into_iter()
        .map(RecipeVersionRow::into_version)
        .collect::<Result<Vec<_>, _>>()?;
    versions.sort_by_key(|v| v.version_number);
    Ok(versions)
}

#[async_trait]
impl RecipeStore for PgRecipeStore {
    async fn create_recipe(&self, recipe: NewRecipe) -> Result<Recipe, StoreError> {
        recipe.validate()?;
        let row = NewRecipeRow::try_from(recipe)?;
        self.run(move |conn| {
            diesel::insert_into(recipes::table)
                .values(&row)
                .returning(RecipeRow::as_returning())
                .get_result::<RecipeRow>(conn)
                .map_err(backend)?
                .into_recipe()
        })
        .await
    }

    async fn get_recipe(&self, user_id: Uuid, recipe_id: Uuid) -> Result<Recipe, StoreError> {
        self.run(move |conn| load_owned(conn, user_id, recipe_id)?.into_recipe())
            .await
    }

    async fn list_recipes(&self, user_id: Uuid) -> Result<Vec<Recipe>, StoreError> {
        self.run(move |conn| {
            recipes::table
                .filter(recipes::user_id.eq(user_id))
                .order(recipes::created_at.desc())
                .select(RecipeRow::as_select())
                .load::<RecipeRow>(conn)
                .map_err(backend)?
                .into_iter()
                .map(RecipeRow::into_recipe)
                .collect()
        })
        .await
    }

    async fn set_favorite(
        &self,
        user_id: Uuid,
        recipe_id: Uuid,
        favorite: bool,
    ) -> Result<(), StoreError> {
        self.run(move |conn| {
            let updated = diesel::update(
                recipes::table
                    .filter(recipes::id.eq(recipe_id))
                    .filter(recipes::user_id.eq(user_id)),
            )
            .set(recipes::favorite.eq(favorite))
            .execute(conn)
            .map_err(backend)?;
            if updated == 0 {
                return Err(StoreError::NotFound);
            }
            Ok(())
        })
        .await
    }

    async fn set_step_preparations(
        &self,
        recipe_id: Uuid,
        preparations: Vec<StepPreparation>,
    ) -> Result<(), StoreError> {
        let value = serde_json::to_value(&preparations)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        self.run(move |conn| {
            let updated = diesel::update(recipes::table.find(recipe_id))
                .set(recipes::step_preparations.eq(Some(value)))
                .execute(conn)
                .map_err(backend)?;
            if updated == 0 {
                return Err(StoreError::NotFound);
            }
            Ok(())
        })
        .await
    }

    async fn commit_remix(
        &self,
        user_id: Uuid,
        recipe_id: Uuid,
        remix: &Remix,
    ) -> Result<Vec<RecipeVersion>, StoreError> {
        let remix = remix.clone();
        self.run(move |conn| {
            conn.transaction(|conn| commit_remix_tx(conn, user_id, recipe_id, &remix))
                .map_err(StoreError::from)
        })
        .await
    }

    async fn list_versions(
        &self,
        user_id: Uuid,
        recipe_id: Uuid,
    ) -> Result<Vec<RecipeVersion>, StoreError> {
        self.run(move |conn| {
            load_owned(conn, user_id, recipe_id)?;
            recipe_versions::table
                .filter(recipe_versions::recipe_id.eq(recipe_id))
                .order(recipe_versions::version_number.desc())
                .select(RecipeVersionRow::as_select())
                .load::<RecipeVersionRow>(conn)
                .map_err(backend)?
                .into_iter()
                .map(RecipeVersionRow::into_version)
                .collect()
        })
        .await
    }

    async fn register_device(&self, user_id: Uuid, token: &str) -> Result<(), StoreError> {
        let token = token.to_string();
        self.run(move |conn| {
            diesel::insert_into(user_devices::table)
                .values(&NewUserDevice {
                    user_id,
                    token: &token,
                })
                .on_conflict((user_devices::user_id, user_devices::token))
                .do_nothing()
                .execute(conn)
                .map_err(backend)?;
            Ok(())
        })
        .await
    }

    async fn device_tokens(&self, user_id: Uuid) -> Result<Vec<String>, StoreError> {
        self.run(move |conn| {
            user_devices::table
                .filter(user_devices::user_id.eq(user_id))
                .order(user_devices::created_at.asc())
                .select(user_devices::token)
                .load(conn)
                .map_err(backend)
        })
        .await
    }
}

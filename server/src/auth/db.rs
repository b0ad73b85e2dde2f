use crate::db::DbPool;
use crate::models::User;
use crate::schema::{sessions, users};
use chrono::Utc;
use diesel::prelude::*;

use super::crypto::hash_token;

/// Resolve a bearer token to its live, non-deleted user.
pub fn get_user_from_token(pool: &DbPool, token: &str) -> Option<User> {
    let mut conn = pool.get().ok()?;
    let token_hash = hash_token(token);

    sessions::table
        .inner_join(users::table)
        .filter(sessions::token_hash.eq(&token_hash))
        .filter(sessions::expires_at.gt(Utc::now()))
        .filter(users::deleted_at.is_null())
        .select(User::as_select())
        .first(&mut conn)
        .ok()
}

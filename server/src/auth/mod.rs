//! Bearer-token authentication against the `sessions` table.
//!
//! Sessions are issued elsewhere; this service only validates them.

mod crypto;
mod db;
mod extractor;

pub use extractor::AuthUser;

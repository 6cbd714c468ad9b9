//! # SQLite Database methods
//!
//! This module contains "low-level" SQLite database interactions.
//!
//! All these interactions are simple functions (rather than stateful structs) that accept a `&mut SqliteConnection`
//! argument. Callers can obtain a connection from a pool, or open a transaction as the need arises and call through to
//! the functions without any other changes.
//!
//! Functions that change rows in a transaction that also reads them start with a write (see [`orders::lock_order`]).
//! SQLite takes the database write lock on the first write of a transaction, so issuing the write first means that
//! concurrent transactions queue on the busy timeout instead of failing when they upgrade from a read lock.
use std::env;

use log::info;
use sqlx::{sqlite::SqlitePoolOptions, Error as SqlxError, SqlitePool};

pub mod carts;
pub mod delivery;
pub mod exchange_rates;
pub mod inventory;
pub mod orders;
pub mod payments;

const SQLITE_DB_URL: &str = "sqlite://data/storefront.db";

pub fn db_url() -> String {
    let result = env::var("SFS_DATABASE_URL").unwrap_or_else(|_| {
        info!("SFS_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}

pub(crate) fn is_unique_violation(e: &SqlxError) -> bool {
    e.as_database_error().map(|d| d.is_unique_violation()).unwrap_or(false)
}

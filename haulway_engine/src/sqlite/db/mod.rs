//! # SQLite database methods
//!
//! This module contains the "low-level" SQLite interactions.
//!
//! Everything here is a simple function (rather than a stateful struct) that accepts a
//! `&mut SqliteConnection` argument. Callers can obtain a connection from a pool, or create an
//! atomic transaction as the need arises and call through with `&mut *tx`. The per-deal
//! atomicity guarantee lives in [`super::SqliteDatabase`], which wraps every deal+offers write
//! in one transaction.
use std::env;

use log::info;
use sqlx::{sqlite::SqlitePoolOptions, Error as SqlxError, SqlitePool};

pub mod deals;
pub mod offers;
pub mod parcels;

const SQLITE_DB_URL: &str = "sqlite://data/haulway.db";

pub fn db_url() -> String {
    let result = env::var("HW_DATABASE_URL").unwrap_or_else(|_| {
        info!("HW_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}

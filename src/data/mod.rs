pub mod migrations;
pub mod repository;

use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;

use crate::error::AppError;
use crate::models::search::SearchMode;

/// Name of the SQL function that applies a [`SearchMode`] predicate:
/// `search_matches(mode, candidate, query)`.
pub const SEARCH_MATCHES_FN: &str = "search_matches";

/// Registers per-connection SQL functions. Must run on every new connection
/// before the repository's name search is used.
pub fn register_search_functions(conn: &Connection) -> Result<(), AppError> {
    conn.create_scalar_function(
        SEARCH_MATCHES_FN,
        3,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let mode: String = ctx.get(0)?;
            let candidate: String = ctx.get(1)?;
            let query: String = ctx.get(2)?;
            let mode = mode
                .parse::<SearchMode>()
                .map_err(|e| rusqlite::Error::UserFunctionError(e.into()))?;
            Ok(mode.matches(&candidate, &query))
        },
    )?;
    Ok(())
}

/// Registers functions and brings the schema up to date.
pub fn prepare_connection(conn: &Connection) -> Result<(), AppError> {
    register_search_functions(conn)?;
    migrations::run_migrations(conn)
}

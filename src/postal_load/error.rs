use thiserror::Error;

/// Failure classes for the import pipeline.
///
/// Every variant is fatal: the pipeline stops at the failing stage and the
/// staging connection (plus any attached PostgreSQL session) is released when
/// the importer drops.
#[derive(Debug, Error)]
pub enum ImportError {
    /// A required environment variable is not set.
    #[error("required environment variable {0} is not set")]
    Configuration(String),

    /// Source CSV missing, unreadable, missing a required header column, or
    /// not parseable under the declared column types.
    #[error("failed to read postal data from '{path}': {reason}")]
    FileRead { path: String, reason: String },

    /// The PostgreSQL attach failed (bad credentials, unreachable host, or
    /// the postgres extension could not be loaded).
    #[error("failed to connect to the postgres database: {0}")]
    Connection(#[source] duckdb::Error),

    /// The server rejected the CREATE TABLE statement.
    #[error("failed to create the postal_data table: {0}")]
    Schema(#[source] duckdb::Error),

    /// The insert statement failed. Nothing from this run is persisted.
    #[error("failed to insert postal data: {0}")]
    Insert(#[source] duckdb::Error),

    /// Staging engine failure outside the stages above.
    #[error("staging engine error: {0}")]
    Engine(#[from] duckdb::Error),
}

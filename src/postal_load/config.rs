use std::env;

use crate::postal_load::error::ImportError;

/// Configuration for one import run.
///
/// All values come from the process environment. No defaults are applied and
/// no validation happens here beyond presence: a bad host or port surfaces
/// later as a connection failure.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// Path to the source CSV file.
    pub file_path: String,
    pub db_name: String,
    pub db_user: String,
    pub db_password: String,
    pub db_host: String,
    pub db_port: String,
}

impl ImportConfig {
    /// Read the configuration from the environment.
    ///
    /// The file path is read first so a missing `POSTAL_DATA_FILE_PATH`
    /// aborts before any database variable is even looked at.
    pub fn from_env() -> Result<Self, ImportError> {
        Ok(Self {
            file_path: required("POSTAL_DATA_FILE_PATH")?,
            db_name: required("POSTGRES_DB")?,
            db_user: required("POSTGRES_USER")?,
            db_password: required("POSTGRES_PASSWORD")?,
            db_host: required("POSTGRES_HOST")?,
            db_port: required("POSTGRES_PORT")?,
        })
    }

    /// Conninfo string in the form the postgres extension expects for
    /// `ATTACH ... (TYPE POSTGRES)`.
    pub fn conninfo(&self) -> String {
        format!(
            "dbname={} user={} password={} host={} port={}",
            self.db_name, self.db_user, self.db_password, self.db_host, self.db_port
        )
    }
}

fn required(var: &str) -> Result<String, ImportError> {
    env::var(var).map_err(|_| ImportError::Configuration(var.to_string()))
}

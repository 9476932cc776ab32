use duckdb::Connection;
use std::fs::File;
use std::io::{BufRead, BufReader};

use crate::postal_load::config::ImportConfig;
use crate::postal_load::error::ImportError;

/// Destination table name in PostgreSQL.
pub const POSTAL_TABLE: &str = "postal_data";

// Alias under which the PostgreSQL database is attached in DuckDB.
const ATTACHED_DB: &str = "postal_db";

/// Columns the source CSV header must carry. Extra columns are tolerated.
pub const REQUIRED_COLUMNS: [&str; 10] = [
    "zip",
    "lat",
    "lng",
    "city",
    "state_id",
    "state_name",
    "population",
    "parent_zcta",
    "county_name",
    "timezone",
];

/// Counts for one completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportReport {
    /// Data rows read from the CSV.
    pub rows_read: u64,
    /// Rows newly inserted into the destination table.
    pub rows_inserted: u64,
    /// Rows skipped because their zip already existed, either in the
    /// destination table or earlier in the same file.
    pub rows_skipped: u64,
}

// Importer that stages the CSV in an in-memory DuckDB instance and moves it
// into PostgreSQL through the postgres extension.
pub struct PostalImporter {
    config: ImportConfig,
    conn: Connection,
}

impl PostalImporter {
    /// Open the staging engine. No file or network I/O happens yet.
    pub fn new(config: ImportConfig) -> Result<Self, ImportError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { config, conn })
    }

    /// Load the source CSV into the staging table, returning the number of
    /// data rows read.
    ///
    /// Each declared column is coerced during the read: strings and doubles,
    /// with `population` kept as text for [`normalize`](Self::normalize) to
    /// repair. Rows are tagged with their file ordinal so later steps can
    /// reason about source order.
    pub fn stage_csv(&self) -> Result<u64, ImportError> {
        self.verify_header()?;

        let query = format!(
            "CREATE TABLE data AS
             SELECT row_number() OVER () AS seq, *
             FROM read_csv('{}', header = true, types = {{
                 'zip': 'VARCHAR',
                 'lat': 'DOUBLE',
                 'lng': 'DOUBLE',
                 'city': 'VARCHAR',
                 'state_id': 'VARCHAR',
                 'state_name': 'VARCHAR',
                 'population': 'VARCHAR',
                 'parent_zcta': 'VARCHAR',
                 'county_name': 'VARCHAR',
                 'timezone': 'VARCHAR'
             }});",
            self.config.file_path.replace('\'', "''")
        );
        self.conn
            .execute(&query, [])
            .map_err(|e| self.file_read(e.to_string()))?;

        self.count_rows("data")
    }

    // Header sanity check before handing the file to read_csv. Catches a
    // wrong or truncated file with a clearer error than the CSV reader's.
    fn verify_header(&self) -> Result<(), ImportError> {
        let file = File::open(&self.config.file_path)
            .map_err(|e| self.file_read(e.to_string()))?;

        let mut header = String::new();
        BufReader::new(file)
            .read_line(&mut header)
            .map_err(|e| self.file_read(e.to_string()))?;

        let columns: Vec<&str> = header
            .trim_end()
            .split(',')
            .map(|c| c.trim().trim_matches('"'))
            .collect();
        for required in REQUIRED_COLUMNS {
            if !columns.contains(&required) {
                return Err(self.file_read(format!(
                    "header is missing required column '{}'",
                    required
                )));
            }
        }
        Ok(())
    }

    /// Project the staged rows into the destination shape.
    ///
    /// `population` is parsed numerically, truncated to an integer, and
    /// defaulted to 0 when the source value is missing or non-numeric.
    /// `parent_zcta` is dropped by omission from the projection. Duplicate
    /// zips within the file keep their first occurrence in file order.
    pub fn normalize(&self) -> Result<(), ImportError> {
        let query = "
            CREATE TABLE normalized_data AS
            SELECT
                zip, lat, lng, city, state_id, state_name,
                coalesce(try_cast(trunc(try_cast(population AS DOUBLE)) AS INTEGER), 0) AS population,
                county_name, timezone
            FROM data
            QUALIFY row_number() OVER (PARTITION BY zip ORDER BY seq) = 1;";
        self.conn.execute(query, [])?;
        Ok(())
    }

    /// Attach the target PostgreSQL database through the postgres extension.
    pub fn connect(&self) -> Result<(), ImportError> {
        self.conn
            .execute("INSTALL postgres;", [])
            .map_err(ImportError::Connection)?;
        self.conn
            .execute("LOAD postgres;", [])
            .map_err(ImportError::Connection)?;

        let attach = format!(
            "ATTACH '{}' AS {} (TYPE POSTGRES)",
            self.config.conninfo().replace('\'', "''"),
            ATTACHED_DB
        );
        self.conn
            .execute(&attach, [])
            .map_err(ImportError::Connection)?;
        Ok(())
    }

    /// Create the destination table if it is absent. The statement runs
    /// verbatim on the PostgreSQL server.
    pub fn ensure_schema(&self) -> Result<(), ImportError> {
        let create_table_query = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                zip varchar PRIMARY KEY,
                lat numeric,
                lng numeric,
                city varchar,
                state_id varchar,
                state_name varchar,
                population int,
                county_name varchar,
                timezone varchar
            );",
            POSTAL_TABLE
        );
        let query = format!(
            "CALL postgres_execute('{}', '{}');",
            ATTACHED_DB,
            create_table_query.replace('\'', "''")
        );
        self.conn.execute(&query, []).map_err(ImportError::Schema)?;
        Ok(())
    }

    /// Move the normalized rows into PostgreSQL, skipping any zip already
    /// present in the destination table. Returns the number of rows
    /// inserted.
    ///
    /// One set-based statement instead of a round-trip per row; the anti-join
    /// keeps the observable first-write-wins behaviour of a per-row
    /// `ON CONFLICT (zip) DO NOTHING`.
    pub fn insert(&self) -> Result<u64, ImportError> {
        let query = format!(
            "INSERT INTO {db}.{table}
                 (zip, lat, lng, city, state_id, state_name, population, county_name, timezone)
             SELECT zip, lat, lng, city, state_id, state_name, population, county_name, timezone
             FROM normalized_data n
             WHERE NOT EXISTS (
                 SELECT 1 FROM {db}.{table} p WHERE p.zip = n.zip
             );",
            db = ATTACHED_DB,
            table = POSTAL_TABLE,
        );
        let inserted = self.conn.execute(&query, []).map_err(ImportError::Insert)?;
        Ok(inserted as u64)
    }

    fn count_rows(&self, table: &str) -> Result<u64, ImportError> {
        let query = format!("SELECT count(*) FROM {};", table);
        let mut stmt = self.conn.prepare(&query)?;
        let mut rows = stmt.query([])?;
        match rows.next()? {
            Some(row) => {
                let n: i64 = row.get(0)?;
                Ok(n as u64)
            }
            None => Ok(0),
        }
    }

    fn file_read(&self, reason: String) -> ImportError {
        ImportError::FileRead {
            path: self.config.file_path.clone(),
            reason,
        }
    }

    // Getter methods for attributes that need to be accessed by callers/tests
    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

/// Run the whole pipeline: stage, normalize, connect, ensure schema, insert.
///
/// The staging connection (and with it the attached PostgreSQL session) is
/// released when the importer drops, on success and on every error path.
pub fn launch_import(config: ImportConfig) -> Result<ImportReport, ImportError> {
    let importer = PostalImporter::new(config)?;

    let rows_read = importer.stage_csv()?;
    log::info!("read {} rows from the csv file", rows_read);

    importer.normalize()?;

    log::info!("connecting to the database");
    importer.connect()?;
    log::info!("connected to the database successfully");

    log::info!("creating '{}' table if it does not exist", POSTAL_TABLE);
    importer.ensure_schema()?;

    log::info!("inserting data into the database");
    let rows_inserted = importer.insert()?;
    let rows_skipped = rows_read - rows_inserted;
    log::info!(
        "inserted {} rows, skipped {} already present",
        rows_inserted,
        rows_skipped
    );

    Ok(ImportReport {
        rows_read,
        rows_inserted,
        rows_skipped,
    })
}

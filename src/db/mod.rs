pub mod models;

use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::Connection;
use tracing::{debug, info};

use self::models::Sensor;

/// Errors originating from the SQLite storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The database file could not be opened.
    #[error("failed to open database {path}")]
    Connect {
        path: String,
        #[source]
        source: sqlx::Error,
    },

    /// A statement failed on an open connection.
    #[error("database error")]
    Query(#[from] sqlx::Error),
}

const TABLE_EXISTS: &str = "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'sensors'";

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS sensors (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        name        TEXT,
        description TEXT,
        active      INTEGER
    )
"#;

const INSERT_SEED: &str =
    "INSERT INTO sensors (id, name, description, active) VALUES (?, ?, ?, ?)";

/// Handle on the sensor database file.
///
/// Holds connect options only; every operation opens its own connection with
/// [`Database::connect`] and closes it when done, so no connection is ever
/// shared between requests.
#[derive(Debug, Clone)]
pub struct Database {
    options: SqliteConnectOptions,
}

impl Database {
    /// Point at `path`, creating the file on first connect if it is missing.
    pub fn open(path: impl AsRef<Path>) -> Self {
        Self::with_options(
            SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true),
        )
    }

    pub fn with_options(options: SqliteConnectOptions) -> Self {
        Self { options }
    }

    /// Open a fresh connection private to the caller.
    ///
    /// Dropping the connection releases it; callers on the success path
    /// should still `close()` it to flush the shutdown.
    pub async fn connect(&self) -> Result<SqliteConnection, StorageError> {
        SqliteConnection::connect_with(&self.options)
            .await
            .map_err(|source| StorageError::Connect {
                path: self.options.get_filename().display().to_string(),
                source,
            })
    }

    /// Ensure the `sensors` table exists, seeding it when it is newly created.
    ///
    /// Returns `true` when the table was created and seeded by this call.
    pub async fn initialize(&self) -> Result<bool, StorageError> {
        let mut conn = self.connect().await?;
        let mut tx = conn.begin_with("BEGIN IMMEDIATE").await?;

        let (existing,): (i64,) = sqlx::query_as(TABLE_EXISTS).fetch_one(&mut *tx).await?;
        sqlx::query(CREATE_TABLE).execute(&mut *tx).await?;

        let seeded = existing == 0;
        if seeded {
            for sensor in Sensor::seeds() {
                sqlx::query(INSERT_SEED)
                    .bind(sensor.id)
                    .bind(&sensor.name)
                    .bind(&sensor.description)
                    .bind(sensor.active)
                    .execute(&mut *tx)
                    .await?;
                debug!(sensor_id = sensor.id, name = %sensor.name, "Seed sensor inserted");
            }
        }

        tx.commit().await?;
        conn.close().await?;

        if seeded {
            info!("Sensors table created and populated");
        } else {
            info!("Sensors table already present");
        }
        Ok(seeded)
    }
}

use sqlx::Connection;
use tracing::{debug, info};

use crate::db::{models::Sensor, Database, StorageError};

#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    #[error("{0}")]
    Validation(String),

    #[error("sensor {0} not found")]
    NotFound(i64),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<sqlx::Error> for SensorError {
    fn from(e: sqlx::Error) -> Self {
        Self::Storage(StorageError::Query(e))
    }
}

const SELECT_ALL: &str = "SELECT id, COALESCE(name, '') AS name, \
     COALESCE(description, '') AS description, COALESCE(active, 0) AS active \
     FROM sensors";

const SELECT_BY_ID: &str = "SELECT id, COALESCE(name, '') AS name, \
     COALESCE(description, '') AS description, COALESCE(active, 0) AS active \
     FROM sensors WHERE id = ?";

const INSERT: &str = "INSERT INTO sensors (name, description, active) VALUES (?, ?, ?) \
     RETURNING id, name, description, active";

const UPDATE: &str = "UPDATE sensors SET name = ?, description = ?, active = ? WHERE id = ?";

const DELETE_BY_ID: &str = "DELETE FROM sensors WHERE id = ?";

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// A validated sensor ready for insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSensor {
    pub name: String,
    pub description: String,
    pub active: i64,
}

impl NewSensor {
    /// Validate the raw fields of a create request.
    ///
    /// `name` and `active` are required; `description` defaults to `""`.
    pub fn new(
        name: Option<String>,
        description: Option<String>,
        active: Option<i64>,
    ) -> Result<Self, SensorError> {
        let name = name.ok_or_else(|| missing("name"))?;
        let active = active.ok_or_else(|| missing("active"))?;
        if !is_valid_active(active) {
            return Err(SensorError::Validation(format!(
                "active must be 0 or 1, got {active}"
            )));
        }

        Ok(Self {
            name,
            description: description.unwrap_or_default(),
            active,
        })
    }
}

/// Partial update for an existing sensor. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SensorPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub active: Option<i64>,
}

impl SensorPatch {
    /// Merge this patch into `sensor` field by field.
    ///
    /// A field is overwritten only when the incoming value differs from the
    /// stored one and is valid for that field:
    /// - `name`: non-empty string
    /// - `description`: any string, including empty
    /// - `active`: 0 or 1
    ///
    /// The id is never touched.
    pub fn apply(&self, mut sensor: Sensor) -> Sensor {
        if let Some(name) = self.name.as_deref() {
            if !name.is_empty() && name != sensor.name {
                sensor.name = name.to_owned();
            }
        }
        if let Some(description) = self.description.as_deref() {
            if description != sensor.description {
                sensor.description = description.to_owned();
            }
        }
        if let Some(active) = self.active {
            if is_valid_active(active) && active != sensor.active {
                sensor.active = active;
            }
        }
        sensor
    }
}

fn is_valid_active(active: i64) -> bool {
    active == 0 || active == 1
}

fn missing(field: &str) -> SensorError {
    SensorError::Validation(format!("missing required field: {field}"))
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// CRUD operations over the `sensors` table.
///
/// Each call opens its own connection, runs its statements and closes it.
#[derive(Debug, Clone)]
pub struct SensorService {
    db: Database,
}

impl SensorService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Create and seed the table if needed. See [`Database::initialize`].
    pub async fn initialize(&self) -> Result<bool, SensorError> {
        Ok(self.db.initialize().await?)
    }

    pub async fn create(&self, new: NewSensor) -> Result<Sensor, SensorError> {
        let mut conn = self.db.connect().await?;
        let sensor: Sensor = sqlx::query_as(INSERT)
            .bind(&new.name)
            .bind(&new.description)
            .bind(new.active)
            .fetch_one(&mut conn)
            .await?;
        conn.close().await?;

        info!(sensor_id = sensor.id, name = %sensor.name, "Sensor created");
        Ok(sensor)
    }

    /// All sensors in storage order. No ordering is guaranteed.
    pub async fn list(&self) -> Result<Vec<Sensor>, SensorError> {
        let mut conn = self.db.connect().await?;
        let sensors: Vec<Sensor> = sqlx::query_as(SELECT_ALL).fetch_all(&mut conn).await?;
        conn.close().await?;

        debug!(count = sensors.len(), "Sensors listed");
        Ok(sensors)
    }

    pub async fn get(&self, id: i64) -> Result<Sensor, SensorError> {
        let mut conn = self.db.connect().await?;
        let sensor: Option<Sensor> = sqlx::query_as(SELECT_BY_ID)
            .bind(id)
            .fetch_optional(&mut conn)
            .await?;
        conn.close().await?;

        sensor.ok_or(SensorError::NotFound(id))
    }

    /// Read the stored row, merge `patch` into it and write the result back,
    /// all inside one transaction.
    ///
    /// The write lock is taken up front: overlapping updates wait on the busy
    /// timeout and the last writer wins.
    pub async fn update(&self, id: i64, patch: SensorPatch) -> Result<Sensor, SensorError> {
        let mut conn = self.db.connect().await?;
        let mut tx = conn.begin_with("BEGIN IMMEDIATE").await?;

        let stored: Option<Sensor> = sqlx::query_as(SELECT_BY_ID)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(stored) = stored else {
            return Err(SensorError::NotFound(id));
        };

        let merged = patch.apply(stored);
        sqlx::query(UPDATE)
            .bind(&merged.name)
            .bind(&merged.description)
            .bind(merged.active)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        conn.close().await?;

        info!(sensor_id = id, "Sensor updated");
        Ok(merged)
    }

    /// Delete by id without checking existence first.
    ///
    /// Returns the number of rows removed (0 or 1).
    pub async fn delete(&self, id: i64) -> Result<u64, SensorError> {
        let mut conn = self.db.connect().await?;
        let removed = sqlx::query(DELETE_BY_ID)
            .bind(id)
            .execute(&mut conn)
            .await?
            .rows_affected();
        conn.close().await?;

        info!(sensor_id = id, removed, "Sensor delete issued");
        Ok(removed)
    }
}

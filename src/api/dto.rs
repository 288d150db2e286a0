use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

use crate::db::models::Sensor;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SensorDto {
    pub id: i64,
    pub name: String,
    pub description: String,
    /// 0 = inactive, 1 = active.
    pub active: i64,
}

impl From<Sensor> for SensorDto {
    fn from(s: Sensor) -> Self {
        Self {
            id: s.id,
            name: s.name,
            description: s.description,
            active: s.active,
        }
    }
}

/// Envelope for single-sensor responses: `{"sensor": {...}}`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SensorResponse {
    pub sensor: SensorDto,
}

impl From<Sensor> for SensorResponse {
    fn from(s: Sensor) -> Self {
        Self { sensor: s.into() }
    }
}

/// Envelope for `GET /api/v1/sensors`: `{"sensors": [...]}`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SensorListResponse {
    pub sensors: Vec<SensorDto>,
}

/// Body of `DELETE /api/v1/sensors/{id}`. Always `{"result": true}`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteResponse {
    pub result: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

/// Request body for `POST /api/v1/sensors`.
///
/// Every field is optional at the JSON level so missing ones surface as a
/// 400 with a field-specific message instead of a generic decode failure.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSensorRequest {
    /// Required.
    pub name: Option<String>,
    /// Defaults to an empty string.
    pub description: Option<String>,
    /// Required, 0 or 1. `true`/`false` are read as 1/0.
    #[serde(default, deserialize_with = "active_flag")]
    #[schema(value_type = Option<i64>)]
    pub active: Option<i64>,
}

/// Request body for `PUT /api/v1/sensors/{id}`. Absent fields are left as stored.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateSensorRequest {
    /// Applied only when non-empty.
    pub name: Option<String>,
    pub description: Option<String>,
    /// Applied only when 0 or 1. `true`/`false` are read as 1/0.
    #[serde(default, deserialize_with = "active_flag")]
    #[schema(value_type = Option<i64>)]
    pub active: Option<i64>,
}

/// Accept `active` as an integer or a JSON boolean.
fn active_flag<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Int(i64),
        Bool(bool),
    }

    Ok(Option::<Flag>::deserialize(deserializer)?.map(|flag| match flag {
        Flag::Int(v) => v,
        Flag::Bool(v) => i64::from(v),
    }))
}

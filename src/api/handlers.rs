use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};
use utoipa::OpenApi;

use super::{
    dto::{
        CreateSensorRequest, DeleteResponse, ErrorResponse, SensorDto, SensorListResponse,
        SensorResponse, UpdateSensorRequest,
    },
    errors::AppError,
};
use crate::sensors::{NewSensor, SensorPatch, SensorService};

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Create a sensor. The id is assigned by storage.
#[utoipa::path(
    post,
    path = "/api/v1/sensors",
    request_body = CreateSensorRequest,
    responses(
        (status = 201, description = "Sensor created", body = SensorResponse),
        (status = 400, description = "Missing body, `name` or `active`", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "sensors"
)]
pub async fn create_sensor(
    State(service): State<SensorService>,
    body: Result<Json<CreateSensorRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SensorResponse>), AppError> {
    let Json(req) = body?;
    let new = NewSensor::new(req.name, req.description, req.active)?;
    let sensor = service.create(new).await?;
    Ok((StatusCode::CREATED, Json(sensor.into())))
}

/// List every sensor. Order is whatever storage returns and is not guaranteed.
#[utoipa::path(
    get,
    path = "/api/v1/sensors",
    responses(
        (status = 200, description = "All sensors", body = SensorListResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "sensors"
)]
pub async fn list_sensors(
    State(service): State<SensorService>,
) -> Result<Json<SensorListResponse>, AppError> {
    let sensors = service.list().await?;
    Ok(Json(SensorListResponse {
        sensors: sensors.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/sensors/{id}",
    params(("id" = i64, Path, description = "Sensor id")),
    responses(
        (status = 200, description = "Sensor", body = SensorResponse),
        (status = 404, description = "No sensor with this id", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "sensors"
)]
pub async fn get_sensor(
    State(service): State<SensorService>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<SensorResponse>, AppError> {
    let Path(id) = id?;
    let sensor = service.get(id).await?;
    Ok(Json(sensor.into()))
}

/// Partially update a sensor. Each field is overwritten only when the new
/// value differs from the stored one and is valid: non-empty `name`, any
/// `description`, `active` of 0 or 1. Anything else keeps the stored value.
#[utoipa::path(
    put,
    path = "/api/v1/sensors/{id}",
    params(("id" = i64, Path, description = "Sensor id")),
    request_body = UpdateSensorRequest,
    responses(
        (status = 200, description = "Sensor after the merge", body = SensorResponse),
        (status = 400, description = "Malformed JSON body", body = ErrorResponse),
        (status = 404, description = "No sensor with this id", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "sensors"
)]
pub async fn update_sensor(
    State(service): State<SensorService>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<UpdateSensorRequest>, JsonRejection>,
) -> Result<Json<SensorResponse>, AppError> {
    let Path(id) = id?;
    let Json(req) = body?;
    let patch = SensorPatch {
        name: req.name,
        description: req.description,
        active: req.active,
    };
    let sensor = service.update(id, patch).await?;
    Ok(Json(sensor.into()))
}

/// Delete a sensor. Succeeds whether or not the id existed.
#[utoipa::path(
    delete,
    path = "/api/v1/sensors/{id}",
    params(("id" = i64, Path, description = "Sensor id")),
    responses(
        (status = 200, description = "Delete issued", body = DeleteResponse),
        (status = 404, description = "Id is not an integer", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "sensors"
)]
pub async fn delete_sensor(
    State(service): State<SensorService>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<DeleteResponse>, AppError> {
    let Path(id) = id?;
    service.delete(id).await?;
    Ok(Json(DeleteResponse { result: true }))
}

// ---------------------------------------------------------------------------
// Health check / fallback
// ---------------------------------------------------------------------------

/// Returns `200 OK` with `{"status":"ok"}` when the server is running.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
    ),
    tag = "system"
)]
pub async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "ok" }))
}

/// Any unmatched route answers with the same JSON 404 as an unknown id.
pub async fn not_found() -> AppError {
    AppError::NotFound
}

// ---------------------------------------------------------------------------
// OpenAPI spec
// ---------------------------------------------------------------------------

#[derive(OpenApi)]
#[openapi(
    paths(create_sensor, list_sensors, get_sensor, update_sensor, delete_sensor, health),
    components(schemas(
        SensorDto,
        SensorResponse,
        SensorListResponse,
        CreateSensorRequest,
        UpdateSensorRequest,
        DeleteResponse,
        ErrorResponse,
    )),
    tags(
        (name = "sensors", description = "Sensor registry CRUD endpoints"),
        (name = "system",  description = "System endpoints"),
    ),
    info(
        title = "Sensor Registry API",
        version = "0.1.0",
        description = "REST API for registering and managing sensors"
    )
)]
pub struct ApiDoc;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::{json, Value};
    use sqlx::SqlitePool;

    use crate::{api::router, db::Database, sensors::SensorService};

    async fn test_server(pool: SqlitePool) -> TestServer {
        let service = SensorService::new(Database::with_options(
            (*pool.connect_options()).clone(),
        ));
        service.initialize().await.unwrap();
        TestServer::new(router(service)).unwrap()
    }

    async fn sensor_count(pool: &SqlitePool) -> i64 {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sensors")
            .fetch_one(pool)
            .await
            .unwrap();
        count
    }

    // -----------------------------------------------------------------------
    // GET /api/v1/sensors
    // -----------------------------------------------------------------------

    #[sqlx::test(migrations = false)]
    async fn list_returns_seed_sensors(pool: SqlitePool) {
        let server = test_server(pool).await;
        let resp = server.get("/api/v1/sensors").await;
        resp.assert_status_ok();

        let body: Value = resp.json();
        let sensors = body["sensors"].as_array().unwrap();
        assert_eq!(sensors.len(), 3);

        let first = sensors.iter().find(|s| s["id"] == 1).unwrap();
        assert_eq!(
            *first,
            json!({
                "id": 1,
                "name": "Motion sensor 1",
                "description": "IR motion sensor in location x.",
                "active": 1
            })
        );
        let second = sensors.iter().find(|s| s["id"] == 2).unwrap();
        assert_eq!(second["name"], "Accelerometer X");
        assert_eq!(second["active"], 0);
        let third = sensors.iter().find(|s| s["id"] == 3).unwrap();
        assert_eq!(third["description"], "Y-axis accelerometer.");
    }

    #[sqlx::test(migrations = false)]
    async fn list_empty_table_returns_empty_array(pool: SqlitePool) {
        let server = test_server(pool.clone()).await;
        sqlx::query("DELETE FROM sensors").execute(&pool).await.unwrap();

        let resp = server.get("/api/v1/sensors").await;
        resp.assert_status_ok();
        let body: Value = resp.json();
        assert_eq!(body, json!({ "sensors": [] }));
    }

    // -----------------------------------------------------------------------
    // POST /api/v1/sensors
    // -----------------------------------------------------------------------

    #[sqlx::test(migrations = false)]
    async fn create_returns_201_and_sensor_is_readable(pool: SqlitePool) {
        let server = test_server(pool).await;
        let resp = server
            .post("/api/v1/sensors")
            .json(&json!({ "name": "S", "active": 1 }))
            .await;
        resp.assert_status(StatusCode::CREATED);

        let body: Value = resp.json();
        let created = &body["sensor"];
        let id = created["id"].as_i64().unwrap();
        assert!(id > 3, "id {id} collides with a seed row");
        assert_eq!(created["name"], "S");
        assert_eq!(created["description"], "");
        assert_eq!(created["active"], 1);

        let resp = server.get(&format!("/api/v1/sensors/{id}")).await;
        resp.assert_status_ok();
        let body: Value = resp.json();
        assert_eq!(body["sensor"], *created);
    }

    #[sqlx::test(migrations = false)]
    async fn create_without_name_returns_400_and_creates_nothing(pool: SqlitePool) {
        let server = test_server(pool.clone()).await;
        let resp = server
            .post("/api/v1/sensors")
            .json(&json!({ "description": "no name", "active": 1 }))
            .await;
        resp.assert_status_bad_request();

        let body: Value = resp.json();
        assert!(body["error"].as_str().unwrap().contains("name"));
        assert_eq!(sensor_count(&pool).await, 3);
    }

    #[sqlx::test(migrations = false)]
    async fn create_without_body_returns_400(pool: SqlitePool) {
        let server = test_server(pool.clone()).await;
        let resp = server.post("/api/v1/sensors").await;
        resp.assert_status_bad_request();
        assert_eq!(sensor_count(&pool).await, 3);
    }

    #[sqlx::test(migrations = false)]
    async fn create_without_active_returns_400(pool: SqlitePool) {
        let server = test_server(pool.clone()).await;
        let resp = server
            .post("/api/v1/sensors")
            .json(&json!({ "name": "S" }))
            .await;
        resp.assert_status_bad_request();
        let body: Value = resp.json();
        assert!(body["error"].as_str().unwrap().contains("active"));
        assert_eq!(sensor_count(&pool).await, 3);
    }

    #[sqlx::test(migrations = false)]
    async fn create_and_update_accept_boolean_active(pool: SqlitePool) {
        let server = test_server(pool).await;
        let resp = server
            .post("/api/v1/sensors")
            .json(&json!({ "name": "Door", "active": true }))
            .await;
        resp.assert_status(StatusCode::CREATED);
        let body: Value = resp.json();
        assert_eq!(body["sensor"]["active"], 1);

        let id = body["sensor"]["id"].as_i64().unwrap();
        let resp = server
            .put(&format!("/api/v1/sensors/{id}"))
            .json(&json!({ "active": false }))
            .await;
        resp.assert_status_ok();
        let body: Value = resp.json();
        assert_eq!(body["sensor"]["active"], 0);
    }

    // -----------------------------------------------------------------------
    // GET /api/v1/sensors/{id}
    // -----------------------------------------------------------------------

    #[sqlx::test(migrations = false)]
    async fn get_unknown_id_returns_404(pool: SqlitePool) {
        let server = test_server(pool).await;
        let resp = server.get("/api/v1/sensors/999").await;
        resp.assert_status_not_found();
        let body: Value = resp.json();
        assert_eq!(body, json!({ "error": "Not found" }));
    }

    #[sqlx::test(migrations = false)]
    async fn get_non_integer_id_returns_404(pool: SqlitePool) {
        let server = test_server(pool).await;
        let resp = server.get("/api/v1/sensors/abc").await;
        resp.assert_status_not_found();
        let body: Value = resp.json();
        assert_eq!(body["error"], "Not found");
    }

    // -----------------------------------------------------------------------
    // PUT /api/v1/sensors/{id}
    // -----------------------------------------------------------------------

    #[sqlx::test(migrations = false)]
    async fn update_name_leaves_other_fields(pool: SqlitePool) {
        let server = test_server(pool).await;
        let resp = server
            .put("/api/v1/sensors/1")
            .json(&json!({ "name": "New" }))
            .await;
        resp.assert_status_ok();

        let expected = json!({
            "id": 1,
            "name": "New",
            "description": "IR motion sensor in location x.",
            "active": 1
        });
        let body: Value = resp.json();
        assert_eq!(body["sensor"], expected);

        let body: Value = server.get("/api/v1/sensors/1").await.json();
        assert_eq!(body["sensor"], expected);
    }

    #[sqlx::test(migrations = false)]
    async fn update_active_to_zero_is_applied(pool: SqlitePool) {
        let server = test_server(pool).await;
        let resp = server
            .put("/api/v1/sensors/1")
            .json(&json!({ "active": 0 }))
            .await;
        resp.assert_status_ok();
        let body: Value = resp.json();
        assert_eq!(body["sensor"]["active"], 0);

        let body: Value = server.get("/api/v1/sensors/1").await.json();
        assert_eq!(body["sensor"]["active"], 0);
    }

    #[sqlx::test(migrations = false)]
    async fn update_ignores_empty_name_and_invalid_active(pool: SqlitePool) {
        let server = test_server(pool).await;
        let resp = server
            .put("/api/v1/sensors/2")
            .json(&json!({ "name": "", "active": 7, "description": "tilt" }))
            .await;
        resp.assert_status_ok();

        let body: Value = resp.json();
        assert_eq!(
            body["sensor"],
            json!({ "id": 2, "name": "Accelerometer X", "description": "tilt", "active": 0 })
        );
    }

    #[sqlx::test(migrations = false)]
    async fn update_unknown_id_returns_404(pool: SqlitePool) {
        let server = test_server(pool.clone()).await;
        let resp = server
            .put("/api/v1/sensors/999")
            .json(&json!({ "name": "Ghost" }))
            .await;
        resp.assert_status_not_found();
        let body: Value = resp.json();
        assert_eq!(body, json!({ "error": "Not found" }));
        assert_eq!(sensor_count(&pool).await, 3);
    }

    #[sqlx::test(migrations = false)]
    async fn update_with_malformed_body_returns_400(pool: SqlitePool) {
        let server = test_server(pool).await;
        let resp = server
            .put("/api/v1/sensors/1")
            .json(&json!({ "active": "yes" }))
            .await;
        resp.assert_status_bad_request();
    }

    // -----------------------------------------------------------------------
    // DELETE /api/v1/sensors/{id}
    // -----------------------------------------------------------------------

    #[sqlx::test(migrations = false)]
    async fn delete_then_get_returns_404(pool: SqlitePool) {
        let server = test_server(pool).await;
        let resp = server.delete("/api/v1/sensors/2").await;
        resp.assert_status_ok();
        let body: Value = resp.json();
        assert_eq!(body, json!({ "result": true }));

        server
            .get("/api/v1/sensors/2")
            .await
            .assert_status_not_found();
    }

    #[sqlx::test(migrations = false)]
    async fn delete_unknown_id_still_returns_result_true(pool: SqlitePool) {
        let server = test_server(pool).await;
        let resp = server.delete("/api/v1/sensors/999").await;
        resp.assert_status_ok();
        let body: Value = resp.json();
        assert_eq!(body, json!({ "result": true }));
    }

    #[sqlx::test(migrations = false)]
    async fn list_after_create_and_delete_matches_rows(pool: SqlitePool) {
        let server = test_server(pool).await;
        let created: Value = server
            .post("/api/v1/sensors")
            .json(&json!({ "name": "Thermometer", "description": "Kitchen", "active": 0 }))
            .await
            .json();
        server.delete("/api/v1/sensors/1").await.assert_status_ok();

        let body: Value = server.get("/api/v1/sensors").await.json();
        let sensors = body["sensors"].as_array().unwrap();
        assert_eq!(sensors.len(), 3);
        assert!(sensors.iter().all(|s| s["id"] != 1));
        assert!(sensors.contains(&created["sensor"]));
        assert!(sensors.contains(&json!({
            "id": 3,
            "name": "Accelerometer Y",
            "description": "Y-axis accelerometer.",
            "active": 0
        })));
    }

    // -----------------------------------------------------------------------
    // Storage failure
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn unreachable_database_returns_500() {
        let service = SensorService::new(Database::open("/nonexistent-dir/for/sure/sensors.db"));
        let server = TestServer::new(router(service)).unwrap();

        let resp = server.get("/api/v1/sensors").await;
        resp.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = resp.json();
        assert_eq!(body["error"], "Internal server error");
    }

    // -----------------------------------------------------------------------
    // System routes
    // -----------------------------------------------------------------------

    #[sqlx::test(migrations = false)]
    async fn health_returns_ok(pool: SqlitePool) {
        let server = test_server(pool).await;
        let resp = server.get("/health").await;
        resp.assert_status_ok();
        let body: Value = resp.json();
        assert_eq!(body["status"], "ok");
    }

    #[sqlx::test(migrations = false)]
    async fn unknown_route_returns_json_404(pool: SqlitePool) {
        let server = test_server(pool).await;
        let resp = server.get("/api/v2/things").await;
        resp.assert_status_not_found();
        let body: Value = resp.json();
        assert_eq!(body["error"], "Not found");
    }

    #[sqlx::test(migrations = false)]
    async fn openapi_spec_is_served(pool: SqlitePool) {
        let server = test_server(pool).await;
        let resp = server.get("/api-docs/openapi.json").await;
        resp.assert_status_ok();
        let body: Value = resp.json();
        assert_eq!(body["info"]["title"], "Sensor Registry API");
        assert!(body["paths"]["/api/v1/sensors/{id}"].is_object());
    }
}

//! REST API for the container loading service.
//!
//! Provides HTTP endpoints to pack a catalog into a single container, either
//! as one JSON response or as a stream of progress events.
//! Uses Axum as the web framework and supports CORS.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Router,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use std::sync::OnceLock;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use utoipa::{OpenApi, ToSchema};

use crate::config::{ApiConfig, OptimizerConfig};
use crate::model::{Container, ItemType, ValidationError};
use crate::optimizer::{PackingConfig, PackingResult, pack_with_config, pack_with_progress};

#[derive(Clone)]
struct ApiState {
    optimizer_config: OptimizerConfig,
}

static OPENAPI_DOC: OnceLock<utoipa::openapi::OpenApi> = OnceLock::new();

const DEFAULT_CONTAINER_ID: &str = "container";

// SRI hashes verified against https://unpkg.com/swagger-ui-dist@5.17.14/.
const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="utf-8" />
        <title>afit_packer API Docs</title>
        <link
            rel="stylesheet"
            href="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui.css"
            integrity="sha384-wxLW6kwyHktdDGr6Pv1zgm/VGJh99lfUbzSn6HNHBENZlCN7W602k9VkGdxuFvPn"
            crossorigin="anonymous"
        />
    </head>
    <body>
        <div id="swagger-ui"></div>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-bundle.js"
            integrity="sha384-wmyclcVGX/WhUkdkATwhaK1X1JtiNrr2EoYJ+diV3vj4v6OC5yCeSu+yW13SYJep"
            crossorigin="anonymous"
        ></script>
        <script>
            window.onload = function () {
                window.ui = SwaggerUIBundle({
                    url: "/docs/openapi.json",
                    dom_id: "#swagger-ui",
                });
            };
        </script>
    </body>
</html>"##;

fn openapi_doc() -> &'static utoipa::openapi::OpenApi {
    OPENAPI_DOC.get_or_init(ApiDoc::openapi)
}

/// Container section of a pack request.
#[derive(Deserialize, Clone, ToSchema)]
pub struct ContainerRequest {
    #[serde(default)]
    #[schema(nullable = true)]
    pub id: Option<String>,
    #[schema(value_type = [f64; 3], example = json!([120.0, 100.0, 80.0]))]
    pub dims: (f64, f64, f64),
    pub max_weight: f64,
}

impl ContainerRequest {
    fn into_container(self) -> Result<Container, ValidationError> {
        let id = self
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CONTAINER_ID.to_string());
        Container::new(id, self.dims, self.max_weight)
    }
}

#[derive(Deserialize, ToSchema)]
#[schema(
    example = json!({
        "container": {
            "id": "pallet",
            "dims": [120.0, 100.0, 80.0],
            "max_weight": 500.0
        },
        "items": [
            { "id": "carton", "dims": [30.0, 40.0, 20.0], "quantity": 12, "weight": 5.0 }
        ],
        "weighted": true
    })
)]
pub struct PackRequest {
    pub container: ContainerRequest,
    pub items: Vec<ItemType>,
    /// Overrides the configured weighted mode.
    #[serde(default)]
    #[schema(nullable = true)]
    pub weighted: Option<bool>,
    /// Overrides the configured dimensional weight factor.
    #[serde(default)]
    #[schema(nullable = true)]
    pub dim_factor: Option<f64>,
}

#[derive(Debug)]
struct ValidatedPackRequest {
    container: Container,
    items: Vec<ItemType>,
    weighted: Option<bool>,
    dim_factor: Option<f64>,
}

impl ValidatedPackRequest {
    fn unit_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Applies the request-level overrides on top of the configured values.
    fn packing_config(&self, base: PackingConfig) -> PackingConfig {
        let mut config = base;
        if let Some(weighted) = self.weighted {
            config.weighted = weighted;
        }
        if let Some(dim_factor) = self.dim_factor {
            config.dim_factor = dim_factor;
        }
        config
    }
}

#[derive(Debug)]
enum PackRequestValidationError {
    InvalidContainer(ValidationError),
    InvalidItem(ValidationError),
    InvalidDimFactor(f64),
    TooManyUnits { units: u64, limit: u64 },
}

impl PackRequest {
    /// Validates the request; `max_units` bounds the summed item quantities.
    fn into_validated(
        self,
        max_units: u64,
    ) -> Result<ValidatedPackRequest, PackRequestValidationError> {
        let container = self
            .container
            .into_container()
            .map_err(PackRequestValidationError::InvalidContainer)?;

        let items = self
            .items
            .into_iter()
            .map(|item| ItemType::new(item.id, item.dims, item.quantity, item.weight))
            .collect::<Result<Vec<_>, ValidationError>>()
            .map_err(PackRequestValidationError::InvalidItem)?;

        if let Some(factor) = self.dim_factor {
            if !(factor.is_finite() && factor > 0.0) {
                return Err(PackRequestValidationError::InvalidDimFactor(factor));
            }
        }

        let validated = ValidatedPackRequest {
            container,
            items,
            weighted: self.weighted,
            dim_factor: self.dim_factor,
        };
        let units = validated.unit_count();
        if units > max_units {
            return Err(PackRequestValidationError::TooManyUnits {
                units,
                limit: max_units,
            });
        }

        Ok(validated)
    }
}

/// Response of the packing endpoint.
#[derive(Serialize, ToSchema)]
pub struct PackResponse {
    pub container_id: String,
    #[schema(value_type = [f64; 3], example = json!([120.0, 100.0, 80.0]))]
    pub dims: (f64, f64, f64),
    pub max_weight: f64,
    pub total_weight: f64,
    pub utilization_percent: f64,
    pub is_complete: bool,
    pub packed: Vec<PackedObject>,
    pub unpacked: Vec<UnpackedObject>,
    /// Number of trials evaluated.
    pub trials: usize,
    /// Container orientation of the chosen trial.
    pub orientation: Option<usize>,
    /// Initial layer thickness of the chosen trial.
    pub layer_thickness: Option<f64>,
}

/// Single placed unit in the response.
///
/// # Fields
/// * `id` - Item type ID
/// * `pos` - Position (x, y, z) in the container
/// * `dims` - Extent along (x, y, z) as packed
/// * `original_dims` - Dimensions as supplied in the request
/// * `weight` - Unit weight
#[derive(Serialize, ToSchema)]
pub struct PackedObject {
    pub id: String,
    #[schema(value_type = [f64; 3], example = json!([0.0, 0.0, 0.0]))]
    pub pos: (f64, f64, f64),
    #[schema(value_type = [f64; 3], example = json!([40.0, 20.0, 30.0]))]
    pub dims: (f64, f64, f64),
    #[schema(value_type = [f64; 3], example = json!([30.0, 40.0, 20.0]))]
    pub original_dims: (f64, f64, f64),
    pub weight: f64,
}

#[derive(Serialize, ToSchema)]
pub struct UnpackedObject {
    pub id: String,
    #[schema(value_type = [f64; 3], example = json!([35.0, 45.0, 25.0]))]
    pub dims: (f64, f64, f64),
    pub weight: f64,
}

#[derive(Serialize, ToSchema)]
struct ErrorResponse {
    error: String,
    details: String,
}

impl ErrorResponse {
    fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: details.into(),
        }
    }
}

#[derive(Serialize, ToSchema)]
struct HealthResponse {
    status: &'static str,
}

fn error_response(
    status: StatusCode,
    error: impl Into<String>,
    details: impl Into<String>,
) -> Response {
    (status, Json(ErrorResponse::new(error, details))).into_response()
}

fn json_deserialize_error(err: JsonRejection) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid JSON data",
        err.to_string(),
    )
}

fn validation_error(details: impl Into<String>) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid input data",
        details,
    )
}

fn container_config_error(details: impl Into<String>) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid container configuration",
        details,
    )
}

fn parse_pack_request(
    payload: Result<Json<PackRequest>, JsonRejection>,
    max_units: u64,
) -> Result<ValidatedPackRequest, Response> {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(err) => return Err(json_deserialize_error(err)),
    };

    match payload.into_validated(max_units) {
        Ok(validated) => Ok(validated),
        Err(PackRequestValidationError::InvalidContainer(err)) => {
            Err(container_config_error(err.to_string()))
        }
        Err(PackRequestValidationError::InvalidItem(err)) => Err(validation_error(err.to_string())),
        Err(PackRequestValidationError::InvalidDimFactor(factor)) => Err(validation_error(
            format!("dim_factor must be positive, got: {}", factor),
        )),
        Err(PackRequestValidationError::TooManyUnits { units, limit }) => Err(validation_error(
            format!("request contains {} units, at most {} are allowed", units, limit),
        )),
    }
}

impl PackResponse {
    /// Creates a PackResponse from a PackingResult.
    pub fn from_packing_result(result: PackingResult) -> Self {
        let utilization_percent = result.utilization_percent();
        let is_complete = result.is_complete();
        let PackingResult {
            container,
            packed,
            unpacked,
            total_weight,
            trials,
            orientation,
            layer_thickness,
        } = result;

        Self {
            container_id: container.id,
            dims: container.dims,
            max_weight: container.max_weight,
            total_weight,
            utilization_percent,
            is_complete,
            packed: packed
                .into_iter()
                .map(|p| PackedObject {
                    id: p.id,
                    pos: p.position,
                    dims: p.packed_dims,
                    original_dims: p.dims,
                    weight: p.weight,
                })
                .collect(),
            unpacked: unpacked
                .into_iter()
                .map(|u| UnpackedObject {
                    id: u.id,
                    dims: u.dims,
                    weight: u.weight,
                })
                .collect(),
            trials,
            orientation,
            layer_thickness,
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(handle_pack, handle_pack_stream, handle_health),
    components(
        schemas(
            PackRequest,
            ContainerRequest,
            ItemType,
            PackResponse,
            PackedObject,
            UnpackedObject,
            ErrorResponse,
            HealthResponse
        )
    ),
    tags((name = "packing", description = "Endpoints for container loading"))
)]
struct ApiDoc;

fn router(optimizer_config: OptimizerConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let state = ApiState { optimizer_config };

    Router::new()
        .route("/pack", post(handle_pack))
        .route("/pack_stream", post(handle_pack_stream))
        .route("/up", get(handle_health))
        .route("/docs/openapi.json", get(serve_openapi_json))
        .route("/docs", get(serve_openapi_ui))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Starts the API server on the configured address.
///
/// Blocks until the server is terminated.
pub async fn start_api_server(
    config: ApiConfig,
    optimizer_config: OptimizerConfig,
) -> std::io::Result<()> {
    let app = router(optimizer_config);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(
        "Server running on http://{}:{}",
        config.display_host(),
        config.port()
    );
    if config.binds_to_all_interfaces() {
        info!("Local access: http://localhost:{}", config.port());
    }
    info!("Endpoints: POST /pack, POST /pack_stream, GET /up, GET /docs, GET /docs/openapi.json");

    axum::serve(listener, app).await
}

/// Handler for POST /pack endpoint.
///
/// Packs the catalog into the container and returns the placements.
///
/// # Parameters
/// * `payload` - JSON payload with the container and the item catalog
///
/// # Returns
/// JSON response with packed and unpacked units
#[utoipa::path(
    post,
    path = "/pack",
    request_body = PackRequest,
    responses(
        (status = 200, description = "Successfully packed the container", body = PackResponse),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request or container configuration",
            body = ErrorResponse
        )
    ),
    tag = "packing"
)]
async fn handle_pack(
    State(state): State<ApiState>,
    payload: Result<Json<PackRequest>, JsonRejection>,
) -> impl IntoResponse {
    let max_units = state.optimizer_config.max_units();
    let request = match parse_pack_request(payload, max_units) {
        Ok(request) => request,
        Err(response) => return response,
    };

    info!(
        container = %request.container.id,
        item_types = request.items.len(),
        units = request.unit_count(),
        "new pack request"
    );
    let packing_config = request.packing_config(state.optimizer_config.packing_config());
    let ValidatedPackRequest {
        container, items, ..
    } = request;

    let packing_result =
        tokio::task::spawn_blocking(move || pack_with_config(&container, &items, packing_config))
            .await;

    match packing_result {
        Ok(result) => {
            info!(
                packed = result.packed_count(),
                unpacked = result.unpacked_count(),
                total_weight = result.total_weight,
                "pack request finished"
            );
            let response = PackResponse::from_packing_result(result);
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => {
            error!("packing task failed: {err}");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Packing failed",
                err.to_string(),
            )
        }
    }
}

/// Handler for POST /pack_stream endpoint (SSE).
///
/// Streams pack events in real-time as Server-Sent Events (text/event-stream):
/// one event per evaluated trial, one per placed unit, and a final summary.
#[utoipa::path(
    post,
    path = "/pack_stream",
    request_body = PackRequest,
    responses(
        (
            status = 200,
            description = "Streams pack events in real-time",
            content_type = "text/event-stream",
            body = String
        ),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request or container configuration",
            body = ErrorResponse
        )
    ),
    tag = "packing"
)]
async fn handle_pack_stream(
    State(state): State<ApiState>,
    payload: Result<Json<PackRequest>, JsonRejection>,
) -> impl IntoResponse {
    let max_units = state.optimizer_config.max_units();
    let request = match parse_pack_request(payload, max_units) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let packing_config = request.packing_config(state.optimizer_config.packing_config());
    let ValidatedPackRequest {
        container, items, ..
    } = request;

    let (tx, rx) = mpsc::channel::<String>(32);

    tokio::task::spawn_blocking(move || {
        let _ = pack_with_progress(&container, &items, packing_config, |evt| {
            if let Ok(json) = serde_json::to_string(evt) {
                // A closed receiver only means the client went away.
                let _ = tx.blocking_send(json);
            }
        });
    });

    let stream = ReceiverStream::new(rx)
        .map(|msg| Ok::<_, std::convert::Infallible>(Event::default().data(msg)));
    Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(std::time::Duration::from_secs(10))
                .text("keep-alive"),
        )
        .into_response()
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/up",
    responses((status = 200, description = "Service is running", body = HealthResponse)),
    tag = "packing"
)]
async fn handle_health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

async fn serve_openapi_json(State(_state): State<ApiState>) -> impl IntoResponse {
    Json(openapi_doc())
}

async fn serve_openapi_ui(State(_state): State<ApiState>) -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PackedItem;

    fn request_json(extra: &str) -> String {
        format!(
            r#"{{
                "container": {{"dims": [10.0, 10.0, 10.0], "max_weight": 100.0}},
                "items": [{{"id": "A", "dims": [5.0, 5.0, 5.0], "quantity": 2, "weight": 10.0}}]
                {extra}
            }}"#
        )
    }

    fn state() -> ApiState {
        ApiState {
            optimizer_config: crate::config::AppConfig::from_env().optimizer,
        }
    }

    #[test]
    fn openapi_doc_lists_expected_paths() {
        let doc = openapi_doc();
        let paths = &doc.paths.paths;
        for path in ["/pack", "/pack_stream", "/up"] {
            assert!(
                paths.contains_key(path),
                "OpenAPI documentation is missing the {} path",
                path
            );
        }
    }

    #[test]
    fn openapi_doc_contains_key_schemas() {
        let doc = openapi_doc();
        let components = doc
            .components
            .as_ref()
            .expect("OpenAPI documentation contains no components");
        for name in ["PackRequest", "PackResponse", "ItemType", "ErrorResponse"] {
            assert!(
                components.schemas.contains_key(name),
                "Expected schema '{}' is missing from the OpenAPI document",
                name
            );
        }
    }

    #[test]
    fn pack_request_without_overrides_uses_config() {
        let request: PackRequest =
            serde_json::from_str(&request_json("")).expect("Should parse valid JSON");
        assert_eq!(request.weighted, None);
        assert_eq!(request.container.id, None);

        let validated = request
            .into_validated(OptimizerConfig::DEFAULT_MAX_UNITS)
            .expect("Should validate");
        assert_eq!(validated.container.id, DEFAULT_CONTAINER_ID);
        assert_eq!(validated.unit_count(), 2);

        let base = PackingConfig::builder().weighted(true).dim_factor(5.0).build();
        assert_eq!(validated.packing_config(base), base);
    }

    #[test]
    fn pack_request_overrides_replace_config() {
        let request: PackRequest =
            serde_json::from_str(&request_json(r#", "weighted": false, "dim_factor": 6000.0"#))
                .expect("Should parse valid JSON");
        let validated = request
            .into_validated(OptimizerConfig::DEFAULT_MAX_UNITS)
            .expect("Should validate");

        let config = validated.packing_config(PackingConfig::default());
        assert!(!config.weighted);
        assert_eq!(config.dim_factor, 6000.0);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let negative_item = PackRequest {
            container: ContainerRequest {
                id: None,
                dims: (10.0, 10.0, 10.0),
                max_weight: 100.0,
            },
            items: vec![ItemType {
                id: "A".to_string(),
                dims: (-1.0, 5.0, 5.0),
                quantity: 1,
                weight: 1.0,
            }],
            weighted: None,
            dim_factor: None,
        };
        assert!(matches!(
            negative_item.into_validated(OptimizerConfig::DEFAULT_MAX_UNITS),
            Err(PackRequestValidationError::InvalidItem(_))
        ));

        let request: PackRequest =
            serde_json::from_str(&request_json(r#", "dim_factor": 0.0"#)).expect("valid JSON");
        assert!(matches!(
            request.into_validated(OptimizerConfig::DEFAULT_MAX_UNITS),
            Err(PackRequestValidationError::InvalidDimFactor(_))
        ));

        let flat_container: PackRequest = serde_json::from_str(
            r#"{"container": {"dims": [0.0, 1.0, 1.0], "max_weight": 1.0}, "items": []}"#,
        )
        .expect("valid JSON");
        assert!(matches!(
            flat_container.into_validated(OptimizerConfig::DEFAULT_MAX_UNITS),
            Err(PackRequestValidationError::InvalidContainer(_))
        ));
    }

    #[test]
    fn unit_limit_bounds_summed_quantities() {
        let request: PackRequest =
            serde_json::from_str(&request_json("")).expect("valid JSON");
        assert!(request.into_validated(2).is_ok());

        let request: PackRequest =
            serde_json::from_str(&request_json("")).expect("valid JSON");
        assert!(matches!(
            request.into_validated(1),
            Err(PackRequestValidationError::TooManyUnits { units: 2, limit: 1 })
        ));
    }

    #[test]
    fn response_is_built_from_result() {
        let container = Container::new("box", (10.0, 10.0, 10.0), 50.0).unwrap();
        let result = PackingResult {
            container,
            packed: vec![PackedItem {
                id: "A".to_string(),
                dims: (1.0, 2.0, 5.0),
                weight: 3.0,
                position: (0.0, 0.0, 0.0),
                packed_dims: (5.0, 2.0, 1.0),
            }],
            unpacked: vec![ItemType::new("B", (20.0, 1.0, 1.0), 1, 1.0).unwrap()],
            total_weight: 3.0,
            trials: 4,
            orientation: Some(4),
            layer_thickness: Some(2.0),
        };

        let response = PackResponse::from_packing_result(result);
        assert_eq!(response.container_id, "box");
        assert!(!response.is_complete);
        assert_eq!(response.packed[0].dims, (5.0, 2.0, 1.0));
        assert_eq!(response.packed[0].original_dims, (1.0, 2.0, 5.0));
        assert_eq!(response.unpacked.len(), 1);
        assert!((response.utilization_percent - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn pack_handler_returns_ok_for_valid_request() {
        let request: PackRequest =
            serde_json::from_str(&request_json("")).expect("Should parse valid JSON");
        let response = handle_pack(State(state()), Ok(Json(request)))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn pack_handler_rejects_huge_quantities() {
        let request: PackRequest = serde_json::from_str(
            r#"{
                "container": {"dims": [5.0, 5.0, 5.0], "max_weight": 10.0},
                "items": [{"id": "big", "dims": [6.0, 6.0, 6.0], "quantity": 4000000000, "weight": 1.0}]
            }"#,
        )
        .expect("valid JSON");
        let response = handle_pack(State(state()), Ok(Json(request)))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn stream_handler_respects_configured_unit_limit() {
        let request: PackRequest =
            serde_json::from_str(&request_json("")).expect("valid JSON");
        let state = ApiState {
            optimizer_config: crate::config::AppConfig::from_env()
                .optimizer
                .with_max_units(1),
        };
        let response = handle_pack_stream(State(state), Ok(Json(request)))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn pack_handler_rejects_invalid_container() {
        let request: PackRequest = serde_json::from_str(
            r#"{"container": {"dims": [-1.0, 1.0, 1.0], "max_weight": 1.0}, "items": []}"#,
        )
        .expect("valid JSON");
        let response = handle_pack(State(state()), Ok(Json(request)))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}

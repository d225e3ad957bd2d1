use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use clap::Parser;
use collabrec::services::serving::ServingStats;
use collabrec::{init_tracing, AppState, Config, Error, ItemId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,
}

#[derive(Debug, Deserialize)]
struct PromptQuery {
    count: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct PopularQuery {
    limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    message: String,
}

impl<T> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: "Success".to_string(),
        }
    }

    fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message,
        }
    }
}

struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::NotReady => StatusCode::SERVICE_UNAVAILABLE,
            e if e.is_client_error() => StatusCode::BAD_REQUEST,
            e => {
                error!("Request failed: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(ApiResponse::<()>::error(self.0.to_string()))).into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

async fn health_check() -> Json<ApiResponse<HashMap<String, String>>> {
    let mut status = HashMap::new();
    status.insert("status".to_string(), "healthy".to_string());
    status.insert("service".to_string(), "collabrec".to_string());
    status.insert("version".to_string(), env!("CARGO_PKG_VERSION").to_string());

    Json(ApiResponse::success(status))
}

async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<ApiResponse<bool>>) {
    if state.recommendation_service.is_ready() {
        (StatusCode::OK, Json(ApiResponse::success(true)))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse::error("Ratings corpus is still loading".to_string())),
        )
    }
}

async fn serving_stats(State(state): State<AppState>) -> Json<ApiResponse<ServingStats>> {
    Json(ApiResponse::success(state.serving_service.stats()))
}

async fn ranking_prompt(
    State(state): State<AppState>,
    Query(params): Query<PromptQuery>,
) -> ApiResult<collabrec::RankingPrompt> {
    let prompt = state.onboarding_service.ranking_prompt(params.count)?;
    Ok(Json(ApiResponse::success(prompt)))
}

async fn get_recommendations(
    State(state): State<AppState>,
    Json(request): Json<collabrec::RecommendationRequest>,
) -> ApiResult<collabrec::RecommendationResponse> {
    let response = state.serving_service.serve_recommendations(request).await?;
    Ok(Json(ApiResponse::success(response)))
}

async fn get_ranking_recommendations(
    State(state): State<AppState>,
    Json(request): Json<collabrec::RankingRequest>,
) -> ApiResult<collabrec::RecommendationResponse> {
    let response = state.serving_service.serve_ranking(request).await?;
    Ok(Json(ApiResponse::success(response)))
}

async fn get_batch_recommendations(
    State(state): State<AppState>,
    Json(requests): Json<Vec<collabrec::RecommendationRequest>>,
) -> ApiResult<Vec<ApiResponse<collabrec::RecommendationResponse>>> {
    let responses = state
        .serving_service
        .serve_batch(requests)
        .await?
        .into_iter()
        .map(|result| match result {
            Ok(response) => ApiResponse::success(response),
            Err(e) => ApiResponse::error(e.to_string()),
        })
        .collect();
    Ok(Json(ApiResponse::success(responses)))
}

async fn popular_items(
    State(state): State<AppState>,
    Query(params): Query<PopularQuery>,
) -> ApiResult<Vec<collabrec::ItemPopularity>> {
    let limit = params.limit.unwrap_or(state.config.onboarding.popular_pool);
    let items = state.recommendation_service.popular_items(limit)?;
    Ok(Json(ApiResponse::success(items)))
}

async fn item_title(
    State(state): State<AppState>,
    Path(item_id): Path<ItemId>,
) -> ApiResult<String> {
    let title = state.recommendation_service.item_title(item_id)?;
    Ok(Json(ApiResponse::success(title)))
}

async fn user_ratings(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> ApiResult<collabrec::RatingVector> {
    let ratings = state.recommendation_service.user_ratings(user_id)?;
    Ok(Json(ApiResponse::success(ratings)))
}

fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness))
        .route("/stats", get(serving_stats))
        .route("/onboarding", get(ranking_prompt))
        .route("/recommendations", post(get_recommendations))
        .route("/recommendations/ranking", post(get_ranking_recommendations))
        .route("/recommendations/batch", post(get_batch_recommendations))
        .route("/items/popular", get(popular_items))
        .route("/items/:item_id", get(item_title))
        .route("/users/:user_id/ratings", get(user_ratings))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    if !std::path::Path::new(&args.config).exists() {
        info!("Config file {} not found, using defaults and environment", args.config);
    }
    let config = Config::load(&args.config)?;
    info!("Starting collabrec server with config: {:?}", config.server);

    let state = AppState::new(config)?;

    // Serve immediately; requests get 503 until the corpus is in memory.
    let loader = state.recommendation_service.clone();
    tokio::spawn(async move {
        if let Err(e) = loader.load().await {
            error!("Failed to load ratings corpus: {}", e);
            std::process::exit(1);
        }
    });

    let addr = state.config.server.socket_addr()?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use collabrec::config::DataConfig;
    use tower::ServiceExt;

    fn state_with_corpus(dir: &std::path::Path) -> AppState {
        let ratings = (1..=3u32)
            .flat_map(|user_id| {
                [10, 11, 12, 20].map(|item_id| format!("{}\t{}\t4\t880000000\n", user_id, item_id))
            })
            .collect::<String>();
        let path = dir.join("u.data");
        std::fs::write(&path, ratings).unwrap();

        let mut config = Config::default();
        config.data = DataConfig::new(path);
        config.server.workers = 1;
        AppState::new(config).unwrap()
    }

    fn post_json(uri: &str, body: &'static str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_not_ready_maps_to_service_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(state_with_corpus(dir.path()));

        let response = app.clone().oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.clone().oneshot(get("/ready")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = r#"{"ratings": {"10": 5.0, "11": 4.0}}"#;
        let response = app.clone().oneshot(post_json("/recommendations", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let response = app.oneshot(get("/items/popular?limit=3")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_client_errors_map_to_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with_corpus(dir.path());
        state.recommendation_service.load().await.unwrap();
        let app = create_router(state);

        let response = app.clone().oneshot(get("/ready")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(post_json("/recommendations", r#"{"ratings": {}}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = r#"{"ratings": {"10": 9.0}}"#;
        let response = app.clone().oneshot(post_json("/recommendations", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app.clone().oneshot(get("/onboarding?count=0")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = r#"{"ratings": {"10": 5.0, "11": 4.0, "12": 4.5}}"#;
        let response = app.oneshot(post_json("/recommendations", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}

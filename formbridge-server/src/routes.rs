//! HTTP route handlers for the formbridge API.

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::{Path, State};
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::middleware::map_response_with_state;
use axum::response::Json;
use axum::routing::{get, post};
use formbridge::core::rules::visibility_map;
use formbridge::core::types::AnswersMap;
use formbridge::error::Error;
use formbridge::{forms, submit};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{self, Caller};
use crate::error::{ApiError, reveal_upstream_errors};
use crate::state::AppState;

/// Full application: `/api` routes plus tracing, CORS and error rendering.
pub fn app(state: AppState) -> Result<Router> {
    let origin = HeaderValue::from_str(&state.config.server.frontend_url)
        .context("server.frontend_url is not a valid origin header")?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true);

    Ok(Router::new()
        .nest("/api", api_router())
        .layer(map_response_with_state(state.clone(), reveal_upstream_errors))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state))
}

/// Build the API router.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .nest("/v1", v1_router())
}

fn v1_router() -> Router<AppState> {
    Router::new()
        .nest("/auth/airtable", auth::router())
        .route("/airtable/bases", get(list_bases))
        .route("/airtable/bases/{base_id}/tables", get(list_tables))
        .route(
            "/airtable/bases/{base_id}/tables/{table_id}/fields",
            get(list_fields),
        )
        .route("/forms/create-form", post(create_form))
        .route("/forms/{form_id}", get(get_form))
        .route("/forms/{form_id}/visibility", post(preview_visibility))
        .route("/responses/{form_id}/submit", post(submit_response))
        .route("/responses/{form_id}/get-all-responses", get(list_responses))
}

async fn health() -> &'static str {
    "ok"
}

/// GET /api/v1/airtable/bases
async fn list_bases(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<Value>, ApiError> {
    let bases = state.remote.list_bases(&caller.token).await?;
    Ok(Json(json!({ "bases": bases })))
}

/// GET /api/v1/airtable/bases/{base_id}/tables
async fn list_tables(
    State(state): State<AppState>,
    caller: Caller,
    Path(base_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let tables = state.remote.list_tables(&caller.token, &base_id).await?;
    let summaries: Vec<_> = tables.iter().map(|table| table.summary()).collect();
    Ok(Json(json!({ "tables": summaries })))
}

/// GET /api/v1/airtable/bases/{base_id}/tables/{table_id}/fields
async fn list_fields(
    State(state): State<AppState>,
    caller: Caller,
    Path((base_id, table_id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let fields =
        forms::table_fields(state.remote.as_ref(), &caller.token, &base_id, &table_id).await?;
    Ok(Json(json!({ "fields": fields })))
}

/// POST /api/v1/forms/create-form
async fn create_form(
    State(state): State<AppState>,
    caller: Caller,
    Json(definition): Json<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let owner = caller.user_id(&state).await?;
    let form = forms::create_form(&state.store, &owner, &definition)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Form created successfully", "form": form })),
    ))
}

/// GET /api/v1/forms/{form_id}
async fn get_form(
    State(state): State<AppState>,
    _caller: Caller,
    Path(form_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let form = forms::load_form(&state.store, &form_id)?;
    Ok(Json(json!({ "message": "Form fetched successfully", "form": form })))
}

#[derive(Debug, Deserialize)]
struct AnswersBody {
    #[serde(default)]
    answers: Option<Value>,
}

impl AnswersBody {
    fn into_answers(self) -> Result<AnswersMap, ApiError> {
        match self.answers {
            Some(Value::Object(map)) => Ok(map.into_iter().collect()),
            _ => Err(ApiError::BadRequest(
                "answers object is required".to_string(),
            )),
        }
    }
}

/// POST /api/v1/forms/{form_id}/visibility - which questions show for a draft
/// set of answers.
async fn preview_visibility(
    State(state): State<AppState>,
    _caller: Caller,
    Path(form_id): Path<String>,
    Json(body): Json<AnswersBody>,
) -> Result<Json<Value>, ApiError> {
    let form = forms::load_form(&state.store, &form_id)?;
    let answers = body.into_answers()?;
    Ok(Json(json!({ "visibility": visibility_map(&form, &answers) })))
}

/// POST /api/v1/responses/{form_id}/submit
async fn submit_response(
    State(state): State<AppState>,
    caller: Caller,
    Path(form_id): Path<String>,
    Json(body): Json<AnswersBody>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let answers = body.into_answers()?;
    let receipt = submit::submit_response(
        &state.store,
        state.remote.as_ref(),
        &caller.token,
        &form_id,
        &answers,
    )
    .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Form submitted successfully",
            "responseId": receipt.response_id,
            "airtableRecordId": receipt.airtable_record_id,
        })),
    ))
}

/// GET /api/v1/responses/{form_id}/get-all-responses - owner only.
async fn list_responses(
    State(state): State<AppState>,
    caller: Caller,
    Path(form_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let form = forms::load_form(&state.store, &form_id)?;
    if form.owner_user_id != caller.user_id(&state).await? {
        return Err(Error::NotFound(format!("form {}", form_id)).into());
    }
    let responses = submit::list_responses(&state.store, &form.id)?;
    Ok(Json(json!({
        "message": "Responses fetched successfully",
        "responses": responses,
    })))
}

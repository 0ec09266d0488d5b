use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde_json::{json, Value};

use crate::{
    auth::require_user_id,
    error::{AppError, AppResult},
    extract::AppQuery,
    schemas::{ContractorPath, ContractorsQuery},
    services::contractors::{find_contractor, list_contractors, Contractor},
    state::AppState,
};

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/contractors", axum::routing::get(list_directory))
        .route(
            "/contractors/{contractor_id}",
            axum::routing::get(get_contractor),
        )
}

async fn list_directory(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ContractorsQuery>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    require_user_id(&state, &headers)?;
    Ok(Json(json!({ "data": list_contractors(query.trade.as_deref()) })))
}

async fn get_contractor(
    State(state): State<AppState>,
    Path(path): Path<ContractorPath>,
    headers: HeaderMap,
) -> AppResult<Json<Contractor>> {
    require_user_id(&state, &headers)?;
    find_contractor(&path.contractor_id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Contractor not found.".to_string()))
}

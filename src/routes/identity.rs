use axum::{extract::State, http::HeaderMap, Json};
use serde_json::{json, Value};

use crate::{auth::require_user, error::AppResult, state::AppState};

pub fn router() -> axum::Router<AppState> {
    axum::Router::new().route("/me", axum::routing::get(me))
}

async fn me(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Json<Value>> {
    let user = require_user(&state, &headers)?;
    Ok(Json(json!({
        "id": user.id,
        "email": user.email,
    })))
}

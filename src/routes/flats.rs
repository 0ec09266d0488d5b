use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde_json::{json, Map, Value};

use crate::{
    access::load_owned_flat,
    auth::require_user_id,
    db::db_pool,
    error::AppResult,
    extract::{AppJson, AppQuery},
    models::Flat,
    repository::{
        flats::{list_owner_flats, FLATS_TABLE},
        table_service::{create_row, delete_row, update_row},
    },
    schemas::{
        clamp_limit, remove_nulls, serialize_to_map, validate_input, CreateFlatInput, FlatPath,
        FlatsQuery, UpdateFlatInput,
    },
    services::audit::write_audit_log,
    state::AppState,
};

const COPY_SUFFIX: &str = " (copy)";

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/flats", axum::routing::get(list_flats).post(create_flat))
        .route(
            "/flats/{flat_id}",
            axum::routing::get(get_flat)
                .patch(update_flat)
                .delete(delete_flat),
        )
        .route(
            "/flats/{flat_id}/duplicate",
            axum::routing::post(duplicate_flat),
        )
}

async fn list_flats(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<FlatsQuery>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    let user_id = require_user_id(&state, &headers)?;
    let pool = db_pool(&state)?;

    let flats = list_owner_flats(pool, &user_id, query.vacant, clamp_limit(query.limit)).await?;
    Ok(Json(json!({ "data": flats })))
}

async fn create_flat(
    State(state): State<AppState>,
    headers: HeaderMap,
    AppJson(payload): AppJson<CreateFlatInput>,
) -> AppResult<impl IntoResponse> {
    let user_id = require_user_id(&state, &headers)?;
    validate_input(&payload)?;
    let pool = db_pool(&state)?;

    let mut record = remove_nulls(serialize_to_map(&payload));
    normalize_flat_payload_for_write(&mut record);
    record.insert("owner_id".to_string(), Value::String(user_id.clone()));
    record.insert("is_vacant".to_string(), Value::Bool(true));

    let created = Flat::from_row(create_row(pool, FLATS_TABLE, &record).await?)?;
    tracing::info!(flat_id = %created.id, owner_id = %user_id, "Flat created");

    write_audit_log(
        state.db_pool.as_ref(),
        &user_id,
        "create",
        FLATS_TABLE,
        Some(created.id.as_str()),
        None,
        Some(serde_json::to_value(&created)?),
    )
    .await;

    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_flat(
    State(state): State<AppState>,
    Path(path): Path<FlatPath>,
    headers: HeaderMap,
) -> AppResult<Json<Flat>> {
    let user_id = require_user_id(&state, &headers)?;
    let pool = db_pool(&state)?;

    let flat = load_owned_flat(pool, &user_id, &path.flat_id).await?;
    Ok(Json(flat))
}

async fn update_flat(
    State(state): State<AppState>,
    Path(path): Path<FlatPath>,
    headers: HeaderMap,
    AppJson(payload): AppJson<UpdateFlatInput>,
) -> AppResult<Json<Flat>> {
    let user_id = require_user_id(&state, &headers)?;
    validate_input(&payload)?;
    let pool = db_pool(&state)?;

    let existing = load_owned_flat(pool, &user_id, &path.flat_id).await?;

    let mut patch = remove_nulls(serialize_to_map(&payload));
    normalize_flat_payload_for_write(&mut patch);
    if patch.is_empty() {
        return Ok(Json(existing));
    }
    patch.insert(
        "updated_at".to_string(),
        Value::String(Utc::now().to_rfc3339()),
    );

    let updated = Flat::from_row(update_row(pool, FLATS_TABLE, &existing.id, &patch, "id").await?)?;

    write_audit_log(
        state.db_pool.as_ref(),
        &user_id,
        "update",
        FLATS_TABLE,
        Some(existing.id.as_str()),
        Some(serde_json::to_value(&existing)?),
        Some(serde_json::to_value(&updated)?),
    )
    .await;

    Ok(Json(updated))
}

async fn delete_flat(
    State(state): State<AppState>,
    Path(path): Path<FlatPath>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    let user_id = require_user_id(&state, &headers)?;
    let pool = db_pool(&state)?;

    let existing = load_owned_flat(pool, &user_id, &path.flat_id).await?;
    let deleted = delete_row(pool, FLATS_TABLE, &existing.id, "id").await?;
    tracing::info!(flat_id = %existing.id, owner_id = %user_id, "Flat deleted");

    write_audit_log(
        state.db_pool.as_ref(),
        &user_id,
        "delete",
        FLATS_TABLE,
        Some(existing.id.as_str()),
        Some(deleted.clone()),
        None,
    )
    .await;

    Ok(Json(deleted))
}

async fn duplicate_flat(
    State(state): State<AppState>,
    Path(path): Path<FlatPath>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    let user_id = require_user_id(&state, &headers)?;
    let pool = db_pool(&state)?;

    let source = load_owned_flat(pool, &user_id, &path.flat_id).await?;
    let record = listing_copy_record(&source);
    let created = Flat::from_row(create_row(pool, FLATS_TABLE, &record).await?)?;

    write_audit_log(
        state.db_pool.as_ref(),
        &user_id,
        "duplicate",
        FLATS_TABLE,
        Some(created.id.as_str()),
        None,
        Some(json!({ "source_flat_id": source.id })),
    )
    .await;

    Ok((StatusCode::CREATED, Json(created)))
}

/// Listing fields of `source` as a new vacant flat with no tenant or history.
fn listing_copy_record(source: &Flat) -> Map<String, Value> {
    let mut record = Map::new();
    record.insert("owner_id".to_string(), Value::String(source.owner_id.clone()));
    record.insert(
        "name".to_string(),
        Value::String(format!("{}{COPY_SUFFIX}", source.name)),
    );
    record.insert("address".to_string(), Value::String(source.address.clone()));
    record.insert("bedrooms".to_string(), json!(source.bedrooms));
    record.insert("monthly_rent".to_string(), json!(source.monthly_rent));
    record.insert("is_vacant".to_string(), Value::Bool(true));
    for (key, value) in [
        ("city", &source.city),
        ("postcode", &source.postcode),
        ("description", &source.description),
    ] {
        if let Some(value) = value {
            record.insert(key.to_string(), Value::String(value.clone()));
        }
    }
    record
}

fn normalize_flat_payload_for_write(payload: &mut Map<String, Value>) {
    for key in ["name", "address", "city", "description"] {
        if let Some(Value::String(text)) = payload.get_mut(key) {
            *text = text.trim().to_string();
        }
    }
    if let Some(Value::String(postcode)) = payload.get_mut("postcode") {
        *postcode = postcode.trim().to_ascii_uppercase();
    }
}

#[cfg(test)]
mod tests {
    use super::{listing_copy_record, normalize_flat_payload_for_write};
    use crate::models::Flat;
    use serde_json::{json, Map, Value};

    #[test]
    fn normalizes_text_fields_and_postcode() {
        let mut payload = Map::new();
        payload.insert("name".to_string(), json!("  Canal View  "));
        payload.insert("postcode".to_string(), json!(" e1 6an "));
        payload.insert("monthly_rent".to_string(), json!(900));

        normalize_flat_payload_for_write(&mut payload);

        assert_eq!(payload.get("name").and_then(Value::as_str), Some("Canal View"));
        assert_eq!(payload.get("postcode").and_then(Value::as_str), Some("E1 6AN"));
        assert_eq!(payload.get("monthly_rent"), Some(&json!(900)));
    }

    #[test]
    fn copy_keeps_listing_and_drops_history() {
        let source = Flat::from_row(json!({
            "id": "f-1",
            "owner_id": "user-1",
            "name": "Canal View",
            "address": "3 Canal St",
            "postcode": "E1 6AN",
            "bedrooms": 2,
            "monthly_rent": 1250.0,
            "is_vacant": false,
            "tenant": { "name": "Ada", "email": "ada@example.com" },
            "invoices": [{
                "id": "i-1",
                "amount": 1250,
                "issued_at": "2026-09-01T00:00:00Z",
                "due_date": "2026-09-15T00:00:00Z"
            }]
        }))
        .expect("flat should parse");

        let record = listing_copy_record(&source);
        assert_eq!(
            record.get("name").and_then(Value::as_str),
            Some("Canal View (copy)")
        );
        assert_eq!(record.get("postcode").and_then(Value::as_str), Some("E1 6AN"));
        assert_eq!(record.get("is_vacant"), Some(&Value::Bool(true)));
        assert!(!record.contains_key("city"));
        assert!(!record.contains_key("tenant"));
        assert!(!record.contains_key("invoices"));
        assert!(!record.contains_key("id"));
    }
}

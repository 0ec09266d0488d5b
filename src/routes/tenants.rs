use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use sqlx::PgConnection;

use crate::{
    access::{load_owned_tenant, lock_owned_flat, lock_owned_tenant},
    auth::require_user_id,
    db::db_pool,
    error::{AppError, AppResult},
    extract::{AppJson, AppQuery},
    models::{TenantRecord, TenantSnapshot},
    repository::{
        flats::{lock_flat, save_flat_documents_tx},
        table_service::{create_row_tx, delete_row_tx, update_row_tx},
        tenants::{list_owner_tenants, TENANTS_TABLE},
    },
    schemas::{
        clamp_limit, remove_nulls, serialize_to_map, validate_input, validate_lease_window,
        CreateTenantInput, TenantPath, TenantsQuery, UpdateTenantInput,
    },
    services::audit::write_audit_log,
    state::AppState,
};

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route(
            "/tenants",
            axum::routing::get(list_tenants).post(create_tenant),
        )
        .route(
            "/tenants/{tenant_id}",
            axum::routing::get(get_tenant)
                .patch(update_tenant)
                .delete(delete_tenant),
        )
}

async fn list_tenants(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<TenantsQuery>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    let user_id = require_user_id(&state, &headers)?;
    let pool = db_pool(&state)?;

    let flat_id = query
        .flat_id
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty());
    let tenants = list_owner_tenants(pool, &user_id, flat_id, clamp_limit(query.limit)).await?;
    Ok(Json(json!({ "data": tenants })))
}

async fn create_tenant(
    State(state): State<AppState>,
    headers: HeaderMap,
    AppJson(payload): AppJson<CreateTenantInput>,
) -> AppResult<impl IntoResponse> {
    let user_id = require_user_id(&state, &headers)?;
    validate_input(&payload)?;
    validate_lease_window(payload.lease_start, payload.lease_end)?;
    let pool = db_pool(&state)?;

    let flat_id = payload.flat_id.as_deref().map(str::trim).unwrap_or_default();
    let mut record = remove_nulls(serialize_to_map(&payload));
    record.insert("owner_id".to_string(), Value::String(user_id.clone()));
    if let Some(Value::String(email)) = record.get_mut("email") {
        *email = email.trim().to_ascii_lowercase();
    }

    // Flat row stays locked until commit; a concurrent assignment waits here.
    let mut tx = pool
        .begin()
        .await
        .map_err(|e| AppError::Dependency(format!("txn begin: {e}")))?;

    let mut flat = lock_owned_flat(&mut tx, &user_id, flat_id).await?;
    if flat.has_tenant() {
        return Err(AppError::Conflict(
            "Flat already has a tenant. Remove the current tenant first.".to_string(),
        ));
    }
    record.insert("flat_id".to_string(), Value::String(flat.id.clone()));

    let tenant = TenantRecord::from_row(create_row_tx(&mut tx, TENANTS_TABLE, &record).await?)?;
    flat.assign_tenant(TenantSnapshot::from(&tenant));
    save_flat_documents_tx(&mut tx, &flat).await?;

    tx.commit()
        .await
        .map_err(|e| AppError::Dependency(format!("txn commit: {e}")))?;
    tracing::info!(tenant_id = %tenant.id, flat_id = %flat.id, "Tenant assigned to flat");

    write_audit_log(
        state.db_pool.as_ref(),
        &user_id,
        "create",
        TENANTS_TABLE,
        Some(tenant.id.as_str()),
        None,
        Some(serde_json::to_value(&tenant)?),
    )
    .await;

    Ok((StatusCode::CREATED, Json(tenant)))
}

async fn get_tenant(
    State(state): State<AppState>,
    Path(path): Path<TenantPath>,
    headers: HeaderMap,
) -> AppResult<Json<TenantRecord>> {
    let user_id = require_user_id(&state, &headers)?;
    let pool = db_pool(&state)?;

    let tenant = load_owned_tenant(pool, &user_id, &path.tenant_id).await?;
    Ok(Json(tenant))
}

async fn update_tenant(
    State(state): State<AppState>,
    Path(path): Path<TenantPath>,
    headers: HeaderMap,
    AppJson(payload): AppJson<UpdateTenantInput>,
) -> AppResult<Json<TenantRecord>> {
    let user_id = require_user_id(&state, &headers)?;
    validate_input(&payload)?;
    let pool = db_pool(&state)?;

    let mut tx = pool
        .begin()
        .await
        .map_err(|e| AppError::Dependency(format!("txn begin: {e}")))?;

    let existing = lock_owned_tenant(&mut tx, &user_id, &path.tenant_id).await?;
    validate_lease_window(
        payload.lease_start.or(existing.lease_start),
        payload.lease_end.or(existing.lease_end),
    )?;

    let mut patch = remove_nulls(serialize_to_map(&payload));
    if patch.is_empty() {
        return Ok(Json(existing));
    }
    if let Some(Value::String(email)) = patch.get_mut("email") {
        *email = email.trim().to_ascii_lowercase();
    }
    patch.insert(
        "updated_at".to_string(),
        Value::String(Utc::now().to_rfc3339()),
    );

    let updated = TenantRecord::from_row(
        update_row_tx(&mut tx, TENANTS_TABLE, &existing.id, &patch, "id").await?,
    )?;
    sync_flat_snapshot(&mut tx, &updated, Some(TenantSnapshot::from(&updated))).await?;

    tx.commit()
        .await
        .map_err(|e| AppError::Dependency(format!("txn commit: {e}")))?;

    write_audit_log(
        state.db_pool.as_ref(),
        &user_id,
        "update",
        TENANTS_TABLE,
        Some(existing.id.as_str()),
        Some(serde_json::to_value(&existing)?),
        Some(serde_json::to_value(&updated)?),
    )
    .await;

    Ok(Json(updated))
}

async fn delete_tenant(
    State(state): State<AppState>,
    Path(path): Path<TenantPath>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    let user_id = require_user_id(&state, &headers)?;
    let pool = db_pool(&state)?;

    let mut tx = pool
        .begin()
        .await
        .map_err(|e| AppError::Dependency(format!("txn begin: {e}")))?;

    let existing = lock_owned_tenant(&mut tx, &user_id, &path.tenant_id).await?;
    let deleted = delete_row_tx(&mut tx, TENANTS_TABLE, &existing.id, "id").await?;
    sync_flat_snapshot(&mut tx, &existing, None).await?;

    tx.commit()
        .await
        .map_err(|e| AppError::Dependency(format!("txn commit: {e}")))?;
    tracing::info!(tenant_id = %existing.id, flat_id = %existing.flat_id, "Tenant removed");

    write_audit_log(
        state.db_pool.as_ref(),
        &user_id,
        "delete",
        TENANTS_TABLE,
        Some(existing.id.as_str()),
        Some(deleted.clone()),
        None,
    )
    .await;

    Ok(Json(deleted))
}

/// Replaces (or with `None`, clears) the flat's embedded snapshot, but only
/// while that snapshot still belongs to `tenant`. Runs inside the caller's
/// transaction with the flat row locked.
async fn sync_flat_snapshot(
    conn: &mut PgConnection,
    tenant: &TenantRecord,
    snapshot: Option<TenantSnapshot>,
) -> AppResult<()> {
    let mut flat = match lock_flat(conn, &tenant.flat_id).await {
        Ok(flat) => flat,
        Err(AppError::NotFound(_)) => return Ok(()),
        Err(error) => return Err(error),
    };
    if !flat.snapshot_points_at(&tenant.id) {
        return Ok(());
    }

    match snapshot {
        Some(snapshot) => flat.assign_tenant(snapshot),
        None => flat.vacate(),
    }
    save_flat_documents_tx(conn, &flat).await?;
    Ok(())
}

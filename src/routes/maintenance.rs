use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};

use crate::{
    access::load_owned_flat,
    auth::require_user_id,
    db::db_pool,
    error::{AppError, AppResult},
    extract::{AppJson, AppQuery},
    models::Flat,
    repository::flats::{save_flat_documents, FLATS_TABLE},
    schemas::{
        validate_input, CreateMaintenanceReportInput, FlatPath, MaintenanceQuery,
        MaintenanceReportPath, UpdateMaintenanceReportInput,
    },
    services::{
        audit::write_audit_log,
        contractors::{find_contractor, recommend_for_category},
        maintenance::{open_report, remove_report, reports_with_status, update_report},
        notifications::{notify_maintenance_opened, notify_maintenance_status},
    },
    state::AppState,
};

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route(
            "/flats/{flat_id}/maintenance",
            axum::routing::get(list_reports).post(create_report),
        )
        .route(
            "/flats/{flat_id}/maintenance/{report_id}",
            axum::routing::patch(patch_report).delete(delete_report),
        )
        .route(
            "/flats/{flat_id}/maintenance/{report_id}/contractor",
            axum::routing::get(report_contractor),
        )
}

async fn list_reports(
    State(state): State<AppState>,
    Path(path): Path<FlatPath>,
    AppQuery(query): AppQuery<MaintenanceQuery>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    let user_id = require_user_id(&state, &headers)?;
    let pool = db_pool(&state)?;

    let flat = load_owned_flat(pool, &user_id, &path.flat_id).await?;
    Ok(Json(json!({ "data": reports_with_status(&flat, query.status) })))
}

async fn create_report(
    State(state): State<AppState>,
    Path(path): Path<FlatPath>,
    headers: HeaderMap,
    AppJson(payload): AppJson<CreateMaintenanceReportInput>,
) -> AppResult<impl IntoResponse> {
    let user_id = require_user_id(&state, &headers)?;
    validate_input(&payload)?;
    let pool = db_pool(&state)?;

    let mut flat = load_owned_flat(pool, &user_id, &path.flat_id).await?;
    let report = open_report(&mut flat, &payload, Utc::now())?;
    let saved = save_flat_documents(pool, &flat).await?;
    notify_maintenance_opened(&saved, &report);

    audit_flat_change(&state, &user_id, "maintenance_open", &saved).await;
    Ok((StatusCode::CREATED, Json(saved)))
}

async fn patch_report(
    State(state): State<AppState>,
    Path(path): Path<MaintenanceReportPath>,
    headers: HeaderMap,
    AppJson(payload): AppJson<UpdateMaintenanceReportInput>,
) -> AppResult<Json<Flat>> {
    let user_id = require_user_id(&state, &headers)?;
    validate_input(&payload)?;
    let pool = db_pool(&state)?;

    let mut flat = load_owned_flat(pool, &user_id, &path.flat_id).await?;
    let update = update_report(&mut flat, &path.report_id, &payload, Utc::now())?;
    let saved = save_flat_documents(pool, &flat).await?;
    if let Some(previous) = update.previous_status {
        notify_maintenance_status(&saved, &update.report, previous);
    }

    audit_flat_change(&state, &user_id, "maintenance_update", &saved).await;
    Ok(Json(saved))
}

async fn delete_report(
    State(state): State<AppState>,
    Path(path): Path<MaintenanceReportPath>,
    headers: HeaderMap,
) -> AppResult<Json<Flat>> {
    let user_id = require_user_id(&state, &headers)?;
    let pool = db_pool(&state)?;

    let mut flat = load_owned_flat(pool, &user_id, &path.flat_id).await?;
    let removed = remove_report(&mut flat, &path.report_id)?;
    let saved = save_flat_documents(pool, &flat).await?;
    tracing::info!(flat_id = %saved.id, report_id = %removed.id, "Maintenance report removed");

    audit_flat_change(&state, &user_id, "maintenance_delete", &saved).await;
    Ok(Json(saved))
}

/// The assigned contractor, or the best match for the report category.
async fn report_contractor(
    State(state): State<AppState>,
    Path(path): Path<MaintenanceReportPath>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    let user_id = require_user_id(&state, &headers)?;
    let pool = db_pool(&state)?;

    let flat = load_owned_flat(pool, &user_id, &path.flat_id).await?;
    let report = flat
        .maintenance_reports
        .iter()
        .find(|report| report.id == path.report_id)
        .ok_or_else(|| AppError::NotFound("Maintenance report not found.".to_string()))?;

    let assigned = report.contractor_id.as_deref().and_then(find_contractor);
    let (contractor, source) = match assigned {
        Some(contractor) => (Some(contractor), "assigned"),
        None => (recommend_for_category(&report.category), "recommended"),
    };
    let contractor = contractor.ok_or_else(|| {
        AppError::NotFound("No contractor available for this report.".to_string())
    })?;

    Ok(Json(json!({
        "report_id": report.id,
        "source": source,
        "contractor": contractor,
    })))
}

async fn audit_flat_change(state: &AppState, user_id: &str, action: &str, flat: &Flat) {
    write_audit_log(
        state.db_pool.as_ref(),
        user_id,
        action,
        FLATS_TABLE,
        Some(flat.id.as_str()),
        None,
        Some(json!({ "maintenance_reports": flat.maintenance_reports })),
    )
    .await;
}

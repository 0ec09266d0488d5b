use axum::{
    body::Bytes,
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
    error::AppResult,
    extract::{AppJson, optional_json},
    models::Flat,
    repository::flats::{list_owner_flats, save_flat_documents, FLATS_TABLE},
    schemas::{
        validate_input, CreateInvoiceInput, FlatPath, InvoicePath, MarkInvoicePaidInput,
        RecordPaymentInput,
    },
    services::{
        arrears::compute_arrears,
        audit::write_audit_log,
        ledger::{
            cancel_invoice, invoice_views, issue_invoice, mark_invoice_paid,
            payments_newest_first, record_payment, summarize_invoices,
        },
        notifications::notify_invoice_issued,
    },
    state::AppState,
};

/// Arrears are computed over at most this many flats per owner.
const ARREARS_SCAN_LIMIT: i64 = 1000;

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route(
            "/flats/{flat_id}/invoices",
            axum::routing::get(list_invoices).post(create_invoice),
        )
        .route(
            "/flats/{flat_id}/invoices/{invoice_id}/mark-paid",
            axum::routing::post(mark_paid),
        )
        .route(
            "/flats/{flat_id}/invoices/{invoice_id}/cancel",
            axum::routing::post(cancel),
        )
        .route(
            "/flats/{flat_id}/payments",
            axum::routing::get(list_payments).post(create_payment),
        )
        .route("/payments/arrears", axum::routing::get(arrears_report))
}

async fn list_invoices(
    State(state): State<AppState>,
    Path(path): Path<FlatPath>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    let user_id = require_user_id(&state, &headers)?;
    let pool = db_pool(&state)?;

    let flat = load_owned_flat(pool, &user_id, &path.flat_id).await?;
    let now = Utc::now();
    Ok(Json(json!({
        "data": invoice_views(&flat, now),
        "summary": summarize_invoices(&flat, now),
    })))
}

async fn create_invoice(
    State(state): State<AppState>,
    Path(path): Path<FlatPath>,
    headers: HeaderMap,
    AppJson(payload): AppJson<CreateInvoiceInput>,
) -> AppResult<impl IntoResponse> {
    let user_id = require_user_id(&state, &headers)?;
    validate_input(&payload)?;
    let pool = db_pool(&state)?;

    let mut flat = load_owned_flat(pool, &user_id, &path.flat_id).await?;
    let invoice = issue_invoice(&mut flat, &payload, Utc::now())?;
    let saved = save_flat_documents(pool, &flat).await?;
    notify_invoice_issued(&saved, &invoice);

    audit_ledger_change(&state, &user_id, "invoice_issue", &saved).await;
    Ok((StatusCode::CREATED, Json(saved)))
}

async fn mark_paid(
    State(state): State<AppState>,
    Path(path): Path<InvoicePath>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<Flat>> {
    let user_id = require_user_id(&state, &headers)?;
    let payload: MarkInvoicePaidInput = optional_json(&body)?;
    let pool = db_pool(&state)?;

    let mut flat = load_owned_flat(pool, &user_id, &path.flat_id).await?;
    let payment = mark_invoice_paid(&mut flat, &path.invoice_id, &payload, Utc::now())?;
    let saved = save_flat_documents(pool, &flat).await?;
    tracing::info!(
        flat_id = %saved.id,
        invoice_id = %path.invoice_id,
        payment_id = %payment.id,
        amount = payment.amount,
        "Invoice marked paid"
    );

    audit_ledger_change(&state, &user_id, "invoice_paid", &saved).await;
    Ok(Json(saved))
}

async fn cancel(
    State(state): State<AppState>,
    Path(path): Path<InvoicePath>,
    headers: HeaderMap,
) -> AppResult<Json<Flat>> {
    let user_id = require_user_id(&state, &headers)?;
    let pool = db_pool(&state)?;

    let mut flat = load_owned_flat(pool, &user_id, &path.flat_id).await?;
    cancel_invoice(&mut flat, &path.invoice_id)?;
    let saved = save_flat_documents(pool, &flat).await?;

    audit_ledger_change(&state, &user_id, "invoice_cancel", &saved).await;
    Ok(Json(saved))
}

async fn list_payments(
    State(state): State<AppState>,
    Path(path): Path<FlatPath>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    let user_id = require_user_id(&state, &headers)?;
    let pool = db_pool(&state)?;

    let flat = load_owned_flat(pool, &user_id, &path.flat_id).await?;
    Ok(Json(json!({ "data": payments_newest_first(&flat) })))
}

async fn create_payment(
    State(state): State<AppState>,
    Path(path): Path<FlatPath>,
    headers: HeaderMap,
    AppJson(payload): AppJson<RecordPaymentInput>,
) -> AppResult<impl IntoResponse> {
    let user_id = require_user_id(&state, &headers)?;
    validate_input(&payload)?;
    let pool = db_pool(&state)?;

    let mut flat = load_owned_flat(pool, &user_id, &path.flat_id).await?;
    let payment = record_payment(&mut flat, &payload, Utc::now())?;
    let saved = save_flat_documents(pool, &flat).await?;
    tracing::info!(
        flat_id = %saved.id,
        payment_id = %payment.id,
        amount = payment.amount,
        "Payment recorded"
    );

    audit_ledger_change(&state, &user_id, "payment_record", &saved).await;
    Ok((StatusCode::CREATED, Json(saved)))
}

async fn arrears_report(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    let user_id = require_user_id(&state, &headers)?;
    let pool = db_pool(&state)?;

    let flats = list_owner_flats(pool, &user_id, None, ARREARS_SCAN_LIMIT).await?;
    let report = compute_arrears(&flats, &user_id, Utc::now());
    tracing::debug!(
        owner_id = %user_id,
        flats_scanned = flats.len(),
        flats_in_arrears = report.flats_in_arrears,
        "Arrears report computed"
    );
    Ok(Json(serde_json::to_value(report)?))
}

async fn audit_ledger_change(state: &AppState, user_id: &str, action: &str, flat: &Flat) {
    write_audit_log(
        state.db_pool.as_ref(),
        user_id,
        action,
        FLATS_TABLE,
        Some(flat.id.as_str()),
        None,
        Some(json!({
            "invoices": flat.invoices,
            "payment_logs": flat.payment_logs,
        })),
    )
    .await;
}

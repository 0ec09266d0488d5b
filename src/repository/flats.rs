use chrono::Utc;
use serde_json::{json, Map, Value};
use sqlx::{PgConnection, PgPool};

use crate::{
    error::AppResult,
    models::Flat,
    repository::table_service::{
        get_row, get_row_for_update_tx, list_rows, update_row, update_row_tx,
    },
};

pub const FLATS_TABLE: &str = "flats";

pub async fn fetch_flat(pool: &PgPool, flat_id: &str) -> AppResult<Flat> {
    let row = get_row(pool, FLATS_TABLE, flat_id, "id").await?;
    Flat::from_row(row)
}

/// Loads a flat and locks its row for the rest of the transaction.
pub async fn lock_flat(conn: &mut PgConnection, flat_id: &str) -> AppResult<Flat> {
    let row = get_row_for_update_tx(conn, FLATS_TABLE, flat_id, "id").await?;
    Flat::from_row(row)
}

pub async fn list_owner_flats(
    pool: &PgPool,
    owner_id: &str,
    vacant: Option<bool>,
    limit: i64,
) -> AppResult<Vec<Flat>> {
    let mut filters = Map::new();
    filters.insert("owner_id".to_string(), Value::String(owner_id.to_string()));
    if let Some(vacant) = vacant {
        filters.insert("is_vacant".to_string(), Value::Bool(vacant));
    }

    let rows = list_rows(pool, FLATS_TABLE, Some(&filters), limit, 0, "created_at", false).await?;
    rows.into_iter().map(Flat::from_row).collect()
}

/// Writes back the vacancy flag, tenant snapshot and embedded collections.
pub async fn save_flat_documents(pool: &PgPool, flat: &Flat) -> AppResult<Flat> {
    let patch = documents_patch(flat)?;
    let row = update_row(pool, FLATS_TABLE, &flat.id, &patch, "id").await?;
    Flat::from_row(row)
}

pub async fn save_flat_documents_tx(conn: &mut PgConnection, flat: &Flat) -> AppResult<Flat> {
    let patch = documents_patch(flat)?;
    let row = update_row_tx(conn, FLATS_TABLE, &flat.id, &patch, "id").await?;
    Flat::from_row(row)
}

fn documents_patch(flat: &Flat) -> AppResult<Map<String, Value>> {
    let mut patch = Map::new();
    patch.insert("is_vacant".to_string(), Value::Bool(flat.is_vacant));
    patch.insert("tenant".to_string(), serde_json::to_value(&flat.tenant)?);
    patch.insert(
        "maintenance_reports".to_string(),
        serde_json::to_value(&flat.maintenance_reports)?,
    );
    patch.insert(
        "payment_logs".to_string(),
        serde_json::to_value(&flat.payment_logs)?,
    );
    patch.insert("invoices".to_string(), serde_json::to_value(&flat.invoices)?);
    patch.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));
    Ok(patch)
}

use serde_json::{Map, Value};
use sqlx::PgPool;

use crate::repository::table_service::create_row;

/// Best-effort audit trail; failures are logged and never fail the request.
pub async fn write_audit_log(
    pool: Option<&PgPool>,
    actor_id: &str,
    action: &str,
    entity_name: &str,
    entity_id: Option<&str>,
    before: Option<Value>,
    after: Option<Value>,
) {
    let Some(pool) = pool else {
        return;
    };

    let record = audit_record(actor_id, action, entity_name, entity_id, before, after);
    if let Err(error) = create_row(pool, "audit_logs", &record).await {
        tracing::warn!(
            action,
            entity_name,
            entity_id = entity_id.unwrap_or_default(),
            error = %error,
            "Could not write audit log"
        );
    }
}

fn audit_record(
    actor_id: &str,
    action: &str,
    entity_name: &str,
    entity_id: Option<&str>,
    before: Option<Value>,
    after: Option<Value>,
) -> Map<String, Value> {
    let mut record = Map::new();
    record.insert("actor_id".to_string(), Value::String(actor_id.to_string()));
    record.insert("action".to_string(), Value::String(action.to_string()));
    record.insert(
        "entity_name".to_string(),
        Value::String(entity_name.to_string()),
    );
    if let Some(entity_id) = entity_id {
        record.insert("entity_id".to_string(), Value::String(entity_id.to_string()));
    }
    if let Some(before) = before {
        record.insert("before".to_string(), before);
    }
    if let Some(after) = after {
        record.insert("after".to_string(), after);
    }
    record
}

//! Prometheus-compatible metrics for store, search and bulk operations

use std::time::Duration;

/// Record a successful document write (`create`, `update` or `delete`)
pub fn record_document_write(op: &'static str) {
    metrics::counter!("pgelastic_documents_written_total", "op" => op).increment(1);
}

/// Record provisioning of a new backing relation
pub fn record_relation_provisioned(index: &str, type_name: &str) {
    metrics::counter!(
        "pgelastic_relations_provisioned_total",
        "index" => index.to_string(),
        "type" => type_name.to_string(),
    )
    .increment(1);
}

/// Record the outcome of one bulk item
pub fn record_bulk_item(action: &'static str, status: u16) {
    metrics::counter!(
        "pgelastic_bulk_items_total",
        "action" => action,
        "status" => status.to_string(),
    )
    .increment(1);
}

/// Record the duration of one relation scan for a search
pub fn record_search_duration(duration: Duration) {
    metrics::histogram!("pgelastic_search_duration_seconds").record(duration.as_secs_f64());
}

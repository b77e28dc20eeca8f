//! CSV export of persisted results

use crate::error::{CarMatchError, Result};
use crate::store::ResultRecord;

pub const CSV_HEADER: [&str; 7] = [
    "id",
    "created_at",
    "email",
    "guest_id",
    "source",
    "top_pick",
    "picks",
];

fn id_text(record: &ResultRecord) -> String {
    match &record.id {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

pub fn results_to_csv(rows: &[ResultRecord]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;
    for row in rows {
        let picks = row
            .picks
            .iter()
            .map(|p| format!("{} {}", p.brand, p.model))
            .collect::<Vec<_>>()
            .join("; ");
        writer.write_record([
            id_text(row),
            row.created_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
            row.email.clone().unwrap_or_default(),
            row.guest_id.clone().unwrap_or_default(),
            row.source.clone(),
            row.top_pick.clone(),
            picks,
        ])?;
    }
    let bytes = writer.into_inner().map_err(|e| CarMatchError::Serialization {
        message: format!("CSV flush failed: {}", e.error()),
    })?;
    String::from_utf8(bytes).map_err(|e| CarMatchError::Serialization {
        message: e.to_string(),
    })
}

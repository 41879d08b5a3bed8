use outline_core::model::{Outline, OutlineId, OutlineStatus, Section};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn outline_id_from_i64(v: i64) -> Result<OutlineId, StorageError> {
    u64::try_from(v)
        .map(OutlineId::new)
        .map_err(|_| StorageError::Serialization("outline_id sign overflow".into()))
}

pub(crate) fn outline_id_to_i64(id: OutlineId) -> Result<i64, StorageError> {
    i64::try_from(id.value()).map_err(|_| StorageError::Serialization("outline_id overflow".into()))
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn map_section_row(row: &SqliteRow) -> Result<Section, StorageError> {
    let duration = u32_from_i64(
        "duration_minutes",
        row.try_get::<i64, _>("duration_minutes").map_err(ser)?,
    )?;
    let completed = match row.try_get::<i64, _>("completed").map_err(ser)? {
        0 => false,
        1 => true,
        other => {
            return Err(StorageError::Serialization(format!(
                "invalid completed flag: {other}"
            )));
        }
    };

    Section::from_persisted(
        row.try_get::<String, _>("title").map_err(ser)?,
        row.try_get::<Option<String>, _>("content").map_err(ser)?,
        duration,
        completed,
    )
    .map_err(ser)
}

/// Build an `Outline` from its row plus its already-ordered sections.
pub(crate) fn map_outline_row(
    row: &SqliteRow,
    sections: Vec<Section>,
) -> Result<Outline, StorageError> {
    let status: String = row.try_get("status").map_err(ser)?;
    let status = status.parse::<OutlineStatus>().map_err(ser)?;

    Outline::from_persisted(
        outline_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        row.try_get::<String, _>("title").map_err(ser)?,
        row.try_get::<Option<String>, _>("description").map_err(ser)?,
        sections,
        u32_from_i64(
            "total_duration_minutes",
            row.try_get::<i64, _>("total_duration_minutes").map_err(ser)?,
        )?,
        status,
        row.try_get("created_at").map_err(ser)?,
        row.try_get("updated_at").map_err(ser)?,
    )
    .map_err(ser)
}

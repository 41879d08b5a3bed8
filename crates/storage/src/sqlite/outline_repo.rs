use std::collections::HashMap;

use outline_core::model::{NewOutline, Outline, OutlineId, OutlinePatch, Section};
use sqlx::{Row, SqliteConnection};

use super::SqliteRepository;
use super::mapping::{map_outline_row, map_section_row, outline_id_from_i64, outline_id_to_i64, ser};
use crate::repository::{OutlineRepository, OutlineSort, StorageError};

fn conn_err(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn order_by(sort: OutlineSort) -> &'static str {
    match sort {
        OutlineSort::CreatedDesc => "created_at DESC, id DESC",
        OutlineSort::CreatedAsc => "created_at ASC, id ASC",
        OutlineSort::UpdatedDesc => "updated_at DESC, id DESC",
        OutlineSort::TitleAsc => "title COLLATE NOCASE ASC, id ASC",
    }
}

async fn insert_sections(
    conn: &mut SqliteConnection,
    outline_id: i64,
    sections: &[Section],
) -> Result<(), StorageError> {
    for (position, section) in sections.iter().enumerate() {
        let position = i64::try_from(position)
            .map_err(|_| StorageError::Serialization("position overflow".into()))?;
        sqlx::query(
            r"
                INSERT INTO outline_sections (outline_id, position, title, content, duration_minutes, completed)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(outline_id)
        .bind(position)
        .bind(section.title())
        .bind(section.content())
        .bind(i64::from(section.duration_minutes()))
        .bind(i64::from(section.is_completed()))
        .execute(&mut *conn)
        .await
        .map_err(conn_err)?;
    }
    Ok(())
}

async fn load_outline(conn: &mut SqliteConnection, id: i64) -> Result<Outline, StorageError> {
    let row = sqlx::query(
        r"
            SELECT id, title, description, total_duration_minutes, status, created_at, updated_at
            FROM outlines WHERE id = ?1
        ",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(conn_err)?
    .ok_or(StorageError::NotFound)?;

    let section_rows = sqlx::query(
        r"
            SELECT title, content, duration_minutes, completed
            FROM outline_sections
            WHERE outline_id = ?1
            ORDER BY position ASC
        ",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await
    .map_err(conn_err)?;

    let sections = section_rows
        .iter()
        .map(map_section_row)
        .collect::<Result<Vec<_>, _>>()?;
    map_outline_row(&row, sections)
}

#[async_trait::async_trait]
impl OutlineRepository for SqliteRepository {
    async fn create_outline(&self, outline: NewOutline) -> Result<Outline, StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn_err)?;

        let res = sqlx::query(
            r"
                INSERT INTO outlines (title, description, total_duration_minutes, status, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            ",
        )
        .bind(outline.title.as_str())
        .bind(outline.description.as_deref())
        .bind(i64::from(outline.total_duration_minutes))
        .bind(outline.status.as_str())
        .bind(outline.created_at)
        .execute(&mut *tx)
        .await
        .map_err(conn_err)?;

        let raw_id = res.last_insert_rowid();
        insert_sections(&mut *tx, raw_id, &outline.sections).await?;
        tx.commit().await.map_err(conn_err)?;

        let id = outline_id_from_i64(raw_id)?;
        tracing::debug!(outline_id = %id, sections = outline.sections.len(), "created outline");
        Ok(outline.assign_id(id))
    }

    async fn get_outline(&self, id: OutlineId) -> Result<Outline, StorageError> {
        let mut conn = self.pool.acquire().await.map_err(conn_err)?;
        load_outline(&mut *conn, outline_id_to_i64(id)?).await
    }

    async fn update_outline(
        &self,
        id: OutlineId,
        patch: OutlinePatch,
    ) -> Result<Outline, StorageError> {
        let raw_id = outline_id_to_i64(id)?;
        let mut tx = self.pool.begin().await.map_err(conn_err)?;

        let mut outline = load_outline(&mut *tx, raw_id).await?;
        let replace_sections = patch.sections.is_some();
        outline
            .apply_patch(patch, self.clock.now())
            .map_err(|e| StorageError::Conflict(e.to_string()))?;

        sqlx::query("UPDATE outlines SET status = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(outline.status().as_str())
            .bind(outline.updated_at())
            .bind(raw_id)
            .execute(&mut *tx)
            .await
            .map_err(conn_err)?;

        if replace_sections {
            sqlx::query("DELETE FROM outline_sections WHERE outline_id = ?1")
                .bind(raw_id)
                .execute(&mut *tx)
                .await
                .map_err(conn_err)?;
            insert_sections(&mut *tx, raw_id, outline.sections()).await?;
        }

        tx.commit().await.map_err(conn_err)?;
        Ok(outline)
    }

    async fn list_outlines(&self, sort: OutlineSort) -> Result<Vec<Outline>, StorageError> {
        let query = format!(
            r"
                SELECT id, title, description, total_duration_minutes, status, created_at, updated_at
                FROM outlines
                ORDER BY {}
            ",
            order_by(sort)
        );
        let mut tx = self.pool.begin().await.map_err(conn_err)?;
        let rows = sqlx::query(&query)
            .fetch_all(&mut *tx)
            .await
            .map_err(conn_err)?;

        let section_rows = sqlx::query(
            r"
                SELECT outline_id, title, content, duration_minutes, completed
                FROM outline_sections
                ORDER BY outline_id ASC, position ASC
            ",
        )
        .fetch_all(&mut *tx)
        .await
        .map_err(conn_err)?;
        tx.commit().await.map_err(conn_err)?;

        let mut sections: HashMap<i64, Vec<Section>> = HashMap::new();
        for row in &section_rows {
            let outline_id: i64 = row.try_get("outline_id").map_err(ser)?;
            sections
                .entry(outline_id)
                .or_default()
                .push(map_section_row(row)?);
        }

        let mut outlines = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: i64 = row.try_get("id").map_err(ser)?;
            outlines.push(map_outline_row(row, sections.remove(&id).unwrap_or_default())?);
        }
        Ok(outlines)
    }
}

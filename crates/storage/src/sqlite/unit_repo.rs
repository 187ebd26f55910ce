use practice_core::model::{Topic, Unit, UnitId};

use super::{
    SqliteRepository,
    mapping::{id_i64, map_topic_row, map_unit_row},
};
use crate::repository::{StorageError, UnitRepository};

#[async_trait::async_trait]
impl UnitRepository for SqliteRepository {
    async fn get_unit(&self, id: UnitId) -> Result<Option<Unit>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, unit_number, name, description, icon, color, is_active
            FROM units
            WHERE id = ?1
            ",
        )
        .bind(id_i64("unit_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_unit_row).transpose()
    }

    async fn list_units(&self) -> Result<Vec<Unit>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, unit_number, name, description, icon, color, is_active
            FROM units
            WHERE is_active = 1
            ORDER BY unit_number ASC, id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_unit_row).collect()
    }

    async fn list_topics(&self, unit_id: UnitId) -> Result<Vec<Topic>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, unit_id, name, description, order_index
            FROM topics
            WHERE unit_id = ?1
            ORDER BY order_index ASC, id ASC
            ",
        )
        .bind(id_i64("unit_id", unit_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_topic_row).collect()
    }

    async fn upsert_unit(&self, unit: &Unit) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO units (id, unit_number, name, description, icon, color, is_active)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                unit_number = excluded.unit_number,
                name = excluded.name,
                description = excluded.description,
                icon = excluded.icon,
                color = excluded.color,
                is_active = excluded.is_active
            ",
        )
        .bind(id_i64("unit_id", unit.id.value())?)
        .bind(i64::from(unit.unit_number))
        .bind(&unit.name)
        .bind(unit.description.as_deref())
        .bind(unit.icon.as_deref())
        .bind(unit.color.as_deref())
        .bind(unit.is_active)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn upsert_topic(&self, topic: &Topic) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO topics (id, unit_id, name, description, order_index)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                unit_id = excluded.unit_id,
                name = excluded.name,
                description = excluded.description,
                order_index = excluded.order_index
            ",
        )
        .bind(id_i64("topic_id", topic.id.value())?)
        .bind(id_i64("unit_id", topic.unit_id.value())?)
        .bind(&topic.name)
        .bind(topic.description.as_deref())
        .bind(i64::from(topic.order_index))
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }
}

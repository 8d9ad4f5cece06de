//! Row store consumed by the merge engine
//!
//! The engine only ever needs three operations: fetch the latest row of a
//! user and discriminant, insert a row, and rewrite a row's payload.

use async_trait::async_trait;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

use super::models::{NewTimelineRecord, TimelineId, TimelineRecord};
use crate::{Error, Result};

#[async_trait]
pub trait TimelineStore: Send + Sync {
    /// Most recent row of `user_id` with exactly this category and subtype
    async fn get_latest(
        &self,
        user_id: u32,
        category: u8,
        subtype: u16,
    ) -> Result<Option<TimelineRecord>>;

    async fn insert(&self, record: &NewTimelineRecord) -> Result<TimelineId>;

    /// Rewrite memo, image and batch flag; every other column stays as is
    async fn update_payload(
        &self,
        id: TimelineId,
        memo: &[u8],
        image: &[u8],
        batch: bool,
    ) -> Result<()>;
}

/// [`TimelineStore`] over the SQLite `timeline` table
#[derive(Clone)]
pub struct SqliteTimelineStore {
    pool: SqlitePool,
}

const COLUMNS: &str =
    "id, uid, cat, type, related, memo, img, batch, source, replies, dateline";

fn narrow<T: TryFrom<i64>>(row: &SqliteRow, column: &str) -> Result<T> {
    let raw: i64 = row.try_get(column)?;
    T::try_from(raw)
        .map_err(|_| Error::Internal(format!("timeline.{} out of range: {}", column, raw)))
}

fn record_from_row(row: &SqliteRow) -> Result<TimelineRecord> {
    Ok(TimelineRecord {
        id: TimelineId(row.try_get("id")?),
        user_id: narrow(row, "uid")?,
        category: narrow(row, "cat")?,
        subtype: narrow(row, "type")?,
        related: row.try_get("related")?,
        memo: row.try_get("memo")?,
        image: row.try_get("img")?,
        batch: row.try_get::<i64, _>("batch")? != 0,
        source: narrow(row, "source")?,
        replies: narrow(row, "replies")?,
        dateline: row.try_get("dateline")?,
    })
}

impl SqliteTimelineStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Fetch a single row by id
    pub async fn get_by_id(&self, id: TimelineId) -> Result<Option<TimelineRecord>> {
        let row = sqlx::query(&format!("SELECT {} FROM timeline WHERE id = ?", COLUMNS))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(record_from_row).transpose()
    }
}

#[async_trait]
impl TimelineStore for SqliteTimelineStore {
    async fn get_latest(
        &self,
        user_id: u32,
        category: u8,
        subtype: u16,
    ) -> Result<Option<TimelineRecord>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM timeline
            WHERE uid = ? AND cat = ? AND type = ?
            ORDER BY dateline DESC, id DESC
            LIMIT 1
            "#,
            COLUMNS
        ))
        .bind(user_id as i64)
        .bind(category as i64)
        .bind(subtype as i64)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(record_from_row).transpose()
    }

    async fn insert(&self, record: &NewTimelineRecord) -> Result<TimelineId> {
        let result = sqlx::query(
            r#"
            INSERT INTO timeline (uid, cat, type, related, memo, img, batch, source, replies, dateline)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, ?)
            "#,
        )
        .bind(record.user_id as i64)
        .bind(record.category as i64)
        .bind(record.subtype as i64)
        .bind(&record.related)
        .bind(&record.memo)
        .bind(&record.image)
        .bind(record.batch as i64)
        .bind(record.source as i64)
        .bind(record.dateline)
        .execute(&self.pool)
        .await?;

        Ok(TimelineId(result.last_insert_rowid()))
    }

    async fn update_payload(
        &self,
        id: TimelineId,
        memo: &[u8],
        image: &[u8],
        batch: bool,
    ) -> Result<()> {
        let result = sqlx::query("UPDATE timeline SET memo = ?, img = ?, batch = ? WHERE id = ?")
            .bind(memo)
            .bind(image)
            .bind(batch as i64)
            .bind(id.0)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("timeline row {}", id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database;
    use tempfile::TempDir;

    async fn setup() -> (TempDir, SqliteTimelineStore) {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&dir.path().join("timeline.db")).await.unwrap();
        (dir, SqliteTimelineStore::new(pool))
    }

    fn new_record(user_id: u32, subtype: u16, dateline: i64) -> NewTimelineRecord {
        NewTimelineRecord {
            user_id,
            category: 3,
            subtype,
            related: "100".into(),
            memo: b"a:0:{}".to_vec(),
            image: Vec::new(),
            batch: false,
            source: 5,
            dateline,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get_by_id() {
        let (_dir, store) = setup().await;
        let record = new_record(7, 2, 1_000);
        let id = store.insert(&record).await.unwrap();

        let stored = store.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.id, id);
        assert_eq!(stored.user_id, 7);
        assert_eq!(stored.discriminant(), record.discriminant());
        assert_eq!(stored.memo, record.memo);
        assert!(stored.image.is_empty());
        assert!(!stored.batch);
        assert_eq!(stored.replies, 0);
        assert!(store.get_by_id(TimelineId(id.0 + 1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_latest_filters_by_user_and_discriminant() {
        let (_dir, store) = setup().await;
        store.insert(&new_record(7, 2, 1_000)).await.unwrap();
        let newest = store.insert(&new_record(7, 2, 2_000)).await.unwrap();
        store.insert(&new_record(7, 6, 3_000)).await.unwrap();
        store.insert(&new_record(8, 2, 4_000)).await.unwrap();

        let latest = store.get_latest(7, 3, 2).await.unwrap().unwrap();
        assert_eq!(latest.id, newest);
        assert!(store.get_latest(9, 3, 2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_payload_touches_only_payload_columns() {
        let (_dir, store) = setup().await;
        let id = store.insert(&new_record(7, 2, 1_000)).await.unwrap();
        let before = store.get_by_id(id).await.unwrap().unwrap();

        store
            .update_payload(id, b"a:1:{i:0;N;}", b"a:0:{}", true)
            .await
            .unwrap();

        let after = store.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(after.memo, b"a:1:{i:0;N;}".to_vec());
        assert_eq!(after.image, b"a:0:{}".to_vec());
        assert!(after.batch);
        assert_eq!(after.dateline, before.dateline);
        assert_eq!(after.related, before.related);
        assert_eq!(after.subtype, before.subtype);
    }

    #[tokio::test]
    async fn test_update_missing_row_is_not_found() {
        let (_dir, store) = setup().await;
        let err = store
            .update_payload(TimelineId(99), b"", b"", false)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}

//! Database repository for events.
//!
//! Every mutation of an event is a conditional UPDATE on its version, so a
//! writer that read a stale row changes nothing and learns about it.

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use crate::errors::AppError;
use crate::models::{Event, Roster};

const EVENT_COLUMNS: &str = "id, title, description, banner_url, reference_url, date_time, slot_unlock_time, creator_id, creator_name, roster, created_at, updated_at, version";

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// List all events, soonest first.
    pub async fn list_events(&self) -> Result<Vec<Event>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {EVENT_COLUMNS} FROM events ORDER BY date_time, created_at"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(event_from_row).collect()
    }

    /// Get an event by ID, always read fresh from storage.
    pub async fn get_event(&self, id: &str) -> Result<Option<Event>, AppError> {
        let row = sqlx::query(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(event_from_row).transpose()
    }

    /// Insert a new event.
    pub async fn insert_event(&self, event: &Event) -> Result<(), AppError> {
        let roster_json = serde_json::to_string(&event.roster)?;

        sqlx::query(&format!(
            "INSERT INTO events ({EVENT_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(&event.id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.banner_url)
        .bind(&event.reference_url)
        .bind(event.date_time)
        .bind(event.slot_unlock_time)
        .bind(&event.creator_id)
        .bind(&event.creator_name)
        .bind(&roster_json)
        .bind(event.created_at)
        .bind(event.updated_at)
        .bind(event.version)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Replace the whole roster if the row is still at `expected_version`.
    ///
    /// Returns the new version, or `None` when another writer got there first.
    pub async fn save_roster(
        &self,
        id: &str,
        roster: &Roster,
        expected_version: i64,
    ) -> Result<Option<(i64, DateTime<Utc>)>, AppError> {
        let roster_json = serde_json::to_string(roster)?;
        let now = Utc::now();
        let new_version = expected_version + 1;

        let result = sqlx::query(
            "UPDATE events SET roster = ?, updated_at = ?, version = ? WHERE id = ? AND version = ?",
        )
        .bind(&roster_json)
        .bind(now)
        .bind(new_version)
        .bind(id)
        .bind(expected_version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Ok(Some((new_version, now)))
    }

    /// Write title, description, links and times if the row is still at `expected_version`.
    ///
    /// Returns the new version, or `None` on a version mismatch.
    pub async fn save_details(
        &self,
        event: &Event,
        expected_version: i64,
    ) -> Result<Option<i64>, AppError> {
        let new_version = expected_version + 1;

        let result = sqlx::query(
            r#"UPDATE events SET
                title = ?, description = ?, banner_url = ?, reference_url = ?,
                date_time = ?, slot_unlock_time = ?, updated_at = ?, version = ?
            WHERE id = ? AND version = ?"#,
        )
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.banner_url)
        .bind(&event.reference_url)
        .bind(event.date_time)
        .bind(event.slot_unlock_time)
        .bind(event.updated_at)
        .bind(new_version)
        .bind(&event.id)
        .bind(expected_version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Ok(Some(new_version))
    }

    /// Delete an event.
    pub async fn delete_event(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM events WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Event {} not found", id)));
        }
        Ok(())
    }
}

fn event_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Event, AppError> {
    let roster_json: String = row.get("roster");
    let roster: Roster = serde_json::from_str(&roster_json)?;

    Ok(Event {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        banner_url: row.get("banner_url"),
        reference_url: row.get("reference_url"),
        date_time: row.get("date_time"),
        slot_unlock_time: row.get("slot_unlock_time"),
        creator_id: row.get("creator_id"),
        creator_name: row.get("creator_name"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        version: row.get("version"),
        roster,
    })
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::db::init_database;
    use crate::slotting::policy::fixtures;

    async fn repository() -> (Repository, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let pool = init_database(&temp_dir.path().join("test.sqlite"))
            .await
            .expect("Failed to init DB");
        (Repository::new(pool), temp_dir)
    }

    fn event(id: &str, date_time: DateTime<Utc>) -> Event {
        let now = Utc::now();
        Event {
            id: id.to_string(),
            title: format!("Operation {}", id),
            description: Some("Night insertion".to_string()),
            banner_url: None,
            reference_url: None,
            date_time,
            slot_unlock_time: None,
            creator_id: "creator".to_string(),
            creator_name: "Creator".to_string(),
            created_at: now,
            updated_at: now,
            version: 1,
            roster: fixtures::roster(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_get_round_trip() {
        let (repo, _dir) = repository().await;
        let original = event("E1", Utc::now());
        repo.insert_event(&original).await.unwrap();

        let loaded = repo.get_event("E1").await.unwrap().unwrap();
        assert_eq!(loaded.title, original.title);
        assert_eq!(loaded.roster, original.roster);
        assert_eq!(loaded.version, 1);
        assert_eq!(loaded.date_time.timestamp(), original.date_time.timestamp());

        assert!(repo.get_event("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_orders_by_date_time() {
        let (repo, _dir) = repository().await;
        let now = Utc::now();
        repo.insert_event(&event("late", now + chrono::Duration::days(3)))
            .await
            .unwrap();
        repo.insert_event(&event("early", now + chrono::Duration::days(1)))
            .await
            .unwrap();

        let ids: Vec<String> = repo
            .list_events()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec!["early", "late"]);
    }

    #[tokio::test]
    async fn test_save_roster_refuses_stale_version() {
        let (repo, _dir) = repository().await;
        repo.insert_event(&event("E1", Utc::now())).await.unwrap();

        let mut roster = fixtures::roster();
        roster.groups[0].roles[0].slotted_user_id = Some("u1".to_string());
        roster.groups[0].roles[0].slotted_user_display_name = Some("U1".to_string());

        let (version, _) = repo.save_roster("E1", &roster, 1).await.unwrap().unwrap();
        assert_eq!(version, 2);

        // A writer still holding version 1 must not overwrite
        assert!(repo
            .save_roster("E1", &fixtures::roster(), 1)
            .await
            .unwrap()
            .is_none());

        let loaded = repo.get_event("E1").await.unwrap().unwrap();
        assert_eq!(loaded.version, 2);
        assert_eq!(loaded.roster, roster);
    }

    #[tokio::test]
    async fn test_save_details_bumps_version() {
        let (repo, _dir) = repository().await;
        let mut stored = event("E1", Utc::now());
        repo.insert_event(&stored).await.unwrap();

        stored.title = "Operation Renamed".to_string();
        assert_eq!(repo.save_details(&stored, 1).await.unwrap(), Some(2));
        assert_eq!(repo.save_details(&stored, 1).await.unwrap(), None);

        let loaded = repo.get_event("E1").await.unwrap().unwrap();
        assert_eq!(loaded.title, "Operation Renamed");
    }

    #[tokio::test]
    async fn test_delete_event() {
        let (repo, _dir) = repository().await;
        repo.insert_event(&event("E1", Utc::now())).await.unwrap();

        repo.delete_event("E1").await.unwrap();
        assert!(repo.get_event("E1").await.unwrap().is_none());
        assert!(matches!(
            repo.delete_event("E1").await,
            Err(AppError::NotFound(_))
        ));
    }
}

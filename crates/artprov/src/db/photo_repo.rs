//! Installation photo repository.

use std::fmt;
use std::str::FromStr;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use super::DatabaseError;

/// Processing state of an installation photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessedStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ProcessedStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessedStatus::Pending => "pending",
            ProcessedStatus::Processing => "processing",
            ProcessedStatus::Completed => "completed",
            ProcessedStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ProcessedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessedStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ProcessedStatus::Pending),
            "processing" => Ok(ProcessedStatus::Processing),
            "completed" => Ok(ProcessedStatus::Completed),
            "failed" => Ok(ProcessedStatus::Failed),
            other => Err(format!("unknown processed status '{}'", other)),
        }
    }
}

impl ToSql for ProcessedStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for ProcessedStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}

/// An installation photo joined with the name of its exhibition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhotoRow {
    pub id: i64,
    pub exhibition_id: i64,
    pub exhibition_name: String,
    pub photo_url: String,
    pub processed_status: ProcessedStatus,
}

impl PhotoRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            exhibition_id: row.get("exhibition_id")?,
            exhibition_name: row.get("exhibition_name")?,
            photo_url: row.get("photo_url")?,
            processed_status: row.get("processed_status")?,
        })
    }
}

/// Inserts a photo with status `pending` and returns its ID.
pub fn insert(conn: &Connection, exhibition_id: i64, photo_url: &str) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO installation_photos (exhibition_id, photo_url, processed_status)
         VALUES (?1, ?2, ?3)",
        params![exhibition_id, photo_url, ProcessedStatus::Pending],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Finds a photo with its exhibition name.
pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<PhotoRow>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT p.id, p.exhibition_id, e.name AS exhibition_name, p.photo_url, p.processed_status
             FROM installation_photos p
             JOIN exhibitions e ON e.id = p.exhibition_id
             WHERE p.id = ?1",
            params![id],
            PhotoRow::from_row,
        )
        .optional()?;
    Ok(row)
}

/// Sets the processing status. Returns true if the photo exists.
pub fn update_status(
    conn: &Connection,
    id: i64,
    status: ProcessedStatus,
) -> Result<bool, DatabaseError> {
    let affected = conn.execute(
        "UPDATE installation_photos SET processed_status = ?2 WHERE id = ?1",
        params![id, status],
    )?;
    Ok(affected > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::exhibition_repo::{self, NewExhibition};
    use crate::db::Database;

    fn setup() -> (Database, i64) {
        let db = Database::open_in_memory().unwrap();
        let exhibition_id = db
            .with_conn(|c| {
                exhibition_repo::insert(
                    c,
                    &NewExhibition {
                        name: "Surrealism Today".to_string(),
                        venue: "Tate".to_string(),
                        start_date: None,
                        end_date: None,
                    },
                )
            })
            .unwrap();
        (db, exhibition_id)
    }

    #[test]
    fn test_insert_defaults_to_pending() {
        let (db, exhibition_id) = setup();
        let id = db
            .with_conn(|c| insert(c, exhibition_id, "https://example.com/room.jpg"))
            .unwrap();

        let photo = db.with_conn(|c| find_by_id(c, id)).unwrap().unwrap();
        assert_eq!(photo.processed_status, ProcessedStatus::Pending);
        assert_eq!(photo.exhibition_name, "Surrealism Today");
        assert_eq!(photo.photo_url, "https://example.com/room.jpg");
    }

    #[test]
    fn test_update_status() {
        let (db, exhibition_id) = setup();
        let id = db.with_conn(|c| insert(c, exhibition_id, "u")).unwrap();

        assert!(db
            .with_conn(|c| update_status(c, id, ProcessedStatus::Completed))
            .unwrap());
        let photo = db.with_conn(|c| find_by_id(c, id)).unwrap().unwrap();
        assert_eq!(photo.processed_status, ProcessedStatus::Completed);

        assert!(!db
            .with_conn(|c| update_status(c, id + 100, ProcessedStatus::Failed))
            .unwrap());
    }

    #[test]
    fn test_insert_requires_exhibition() {
        let (db, exhibition_id) = setup();
        assert!(db.with_conn(|c| insert(c, exhibition_id + 1, "u")).is_err());
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("failed".parse::<ProcessedStatus>(), Ok(ProcessedStatus::Failed));
        assert!("archived".parse::<ProcessedStatus>().is_err());
        assert_eq!(ProcessedStatus::Processing.to_string(), "processing");
    }
}

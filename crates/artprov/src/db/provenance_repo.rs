//! Provenance record repository.
//!
//! A UNIQUE index on `detection_id` keeps at most one record per detection;
//! callers upsert through [`find_by_detection`] + [`update_artwork`] or
//! [`insert`].

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{date_column, format_timestamp, parse_timestamp, DatabaseError};

#[derive(Debug, Clone, PartialEq)]
pub struct ProvenanceRow {
    pub id: i64,
    pub artwork_id: i64,
    pub exhibition_id: i64,
    pub detection_id: i64,
    pub created_at: DateTime<Utc>,
}

impl ProvenanceRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let created_at: String = row.get("created_at")?;
        Ok(Self {
            id: row.get("id")?,
            artwork_id: row.get("artwork_id")?,
            exhibition_id: row.get("exhibition_id")?,
            detection_id: row.get("detection_id")?,
            created_at: parse_timestamp(&created_at),
        })
    }
}

/// A provenance record joined with its exhibition and originating detection.
#[derive(Debug, Clone, PartialEq)]
pub struct ProvenanceHistoryRow {
    pub record_id: i64,
    pub exhibition_id: i64,
    pub exhibition_name: String,
    pub venue: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub confidence_score: f64,
    pub created_at: DateTime<Utc>,
}

impl ProvenanceHistoryRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let created_at: String = row.get("created_at")?;
        Ok(Self {
            record_id: row.get("record_id")?,
            exhibition_id: row.get("exhibition_id")?,
            exhibition_name: row.get("exhibition_name")?,
            venue: row.get("venue")?,
            start_date: date_column(row, "start_date")?,
            end_date: date_column(row, "end_date")?,
            confidence_score: row.get("confidence_score")?,
            created_at: parse_timestamp(&created_at),
        })
    }
}

pub fn find_by_detection(
    conn: &Connection,
    detection_id: i64,
) -> Result<Option<ProvenanceRow>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT * FROM provenance_records WHERE detection_id = ?1",
            params![detection_id],
            ProvenanceRow::from_row,
        )
        .optional()?;
    Ok(row)
}

/// Inserts a record and returns its ID.
pub fn insert(
    conn: &Connection,
    artwork_id: i64,
    exhibition_id: i64,
    detection_id: i64,
    created_at: DateTime<Utc>,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO provenance_records (artwork_id, exhibition_id, detection_id, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            artwork_id,
            exhibition_id,
            detection_id,
            format_timestamp(created_at)
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_artwork(conn: &Connection, id: i64, artwork_id: i64) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE provenance_records SET artwork_id = ?2 WHERE id = ?1",
        params![id, artwork_id],
    )?;
    Ok(())
}

/// Lists the exhibition history of an artwork, most recent record first.
pub fn list_for_artwork(
    conn: &Connection,
    artwork_id: i64,
) -> Result<Vec<ProvenanceHistoryRow>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT pr.id AS record_id, pr.created_at, e.id AS exhibition_id,
                e.name AS exhibition_name, e.venue, e.start_date, e.end_date,
                d.confidence_score
         FROM provenance_records pr
         JOIN exhibitions e ON e.id = pr.exhibition_id
         JOIN detections d ON d.id = pr.detection_id
         WHERE pr.artwork_id = ?1
         ORDER BY pr.created_at DESC, pr.id DESC",
    )?;
    let rows = stmt
        .query_map(params![artwork_id], ProvenanceHistoryRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn count_for_detection(conn: &Connection, detection_id: i64) -> Result<u32, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM provenance_records WHERE detection_id = ?1",
        params![detection_id],
        |r| r.get(0),
    )?;
    Ok(count)
}

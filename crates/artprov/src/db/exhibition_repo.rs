//! Exhibition repository.

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use super::{date_column, format_date, DatabaseError};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExhibitionRow {
    pub id: i64,
    pub name: String,
    pub venue: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl ExhibitionRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            venue: row.get("venue")?,
            start_date: date_column(row, "start_date")?,
            end_date: date_column(row, "end_date")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewExhibition {
    pub name: String,
    pub venue: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Inserts an exhibition and returns its ID.
pub fn insert(conn: &Connection, exhibition: &NewExhibition) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO exhibitions (name, venue, start_date, end_date) VALUES (?1, ?2, ?3, ?4)",
        params![
            exhibition.name,
            exhibition.venue,
            exhibition.start_date.map(format_date),
            exhibition.end_date.map(format_date),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<ExhibitionRow>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT * FROM exhibitions WHERE id = ?1",
            params![id],
            ExhibitionRow::from_row,
        )
        .optional()?;
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    #[test]
    fn test_insert_and_find_with_dates() {
        let db = Database::open_in_memory().unwrap();
        let new = NewExhibition {
            name: "Post-Impressionism".to_string(),
            venue: "MoMA".to_string(),
            start_date: NaiveDate::from_ymd_opt(2019, 3, 1),
            end_date: NaiveDate::from_ymd_opt(2020, 1, 15),
        };
        let id = db.with_conn(|c| insert(c, &new)).unwrap();

        let found = db.with_conn(|c| find_by_id(c, id)).unwrap().unwrap();
        assert_eq!(found.name, "Post-Impressionism");
        assert_eq!(found.venue, "MoMA");
        assert_eq!(found.start_date, NaiveDate::from_ymd_opt(2019, 3, 1));
        assert_eq!(found.end_date, NaiveDate::from_ymd_opt(2020, 1, 15));
    }

    #[test]
    fn test_dates_are_optional() {
        let db = Database::open_in_memory().unwrap();
        let new = NewExhibition {
            name: "Undated".to_string(),
            venue: "Somewhere".to_string(),
            start_date: None,
            end_date: None,
        };
        let id = db.with_conn(|c| insert(c, &new)).unwrap();

        let found = db.with_conn(|c| find_by_id(c, id)).unwrap().unwrap();
        assert!(found.start_date.is_none());
        assert!(found.end_date.is_none());
        assert!(db.with_conn(|c| find_by_id(c, id + 1)).unwrap().is_none());
    }
}

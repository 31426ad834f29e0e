//! Detection repository: hypothesized sightings of catalog artworks.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use super::{json_column, DatabaseError};

/// Pixel-space region of a detection inside its photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// A detection joined with the exhibition of its photo.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionRow {
    pub id: i64,
    pub installation_photo_id: i64,
    pub exhibition_id: i64,
    pub artwork_id: i64,
    pub confidence_score: f64,
    pub bounding_box: Option<BoundingBox>,
}

impl DetectionRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            installation_photo_id: row.get("installation_photo_id")?,
            exhibition_id: row.get("exhibition_id")?,
            artwork_id: row.get("artwork_id")?,
            confidence_score: row.get("confidence_score")?,
            bounding_box: json_column(row, "bounding_box")?,
        })
    }
}

/// A detection joined with the title and year of its current artwork.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionWithArtwork {
    pub id: i64,
    pub installation_photo_id: i64,
    pub artwork_id: i64,
    pub confidence_score: f64,
    pub bounding_box: Option<BoundingBox>,
    pub artwork_title: String,
    pub artwork_year: Option<i32>,
}

impl DetectionWithArtwork {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            installation_photo_id: row.get("installation_photo_id")?,
            artwork_id: row.get("artwork_id")?,
            confidence_score: row.get("confidence_score")?,
            bounding_box: json_column(row, "bounding_box")?,
            artwork_title: row.get("artwork_title")?,
            artwork_year: row.get("artwork_year")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewDetection {
    pub installation_photo_id: i64,
    pub artwork_id: i64,
    pub confidence_score: f64,
    pub bounding_box: Option<BoundingBox>,
}

/// Inserts a detection and returns its ID.
pub fn insert(conn: &Connection, detection: &NewDetection) -> Result<i64, DatabaseError> {
    let bbox_json = detection
        .bounding_box
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| DatabaseError::Json {
            column: "bounding_box",
            source: e,
        })?;
    conn.execute(
        "INSERT INTO detections (installation_photo_id, artwork_id, confidence_score, bounding_box)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            detection.installation_photo_id,
            detection.artwork_id,
            detection.confidence_score,
            bbox_json,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<DetectionRow>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT d.*, p.exhibition_id
             FROM detections d
             JOIN installation_photos p ON p.id = d.installation_photo_id
             WHERE d.id = ?1",
            params![id],
            DetectionRow::from_row,
        )
        .optional()?;
    Ok(row)
}

/// Lists the detections of a photo in creation order.
pub fn list_for_photo(
    conn: &Connection,
    photo_id: i64,
) -> Result<Vec<DetectionWithArtwork>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT d.*, a.title AS artwork_title, a.year AS artwork_year
         FROM detections d
         JOIN artworks a ON a.id = d.artwork_id
         WHERE d.installation_photo_id = ?1
         ORDER BY d.id",
    )?;
    let rows = stmt
        .query_map(params![photo_id], DetectionWithArtwork::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Points a detection at a different artwork.
pub fn reassign_artwork(
    conn: &Connection,
    id: i64,
    artwork_id: i64,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE detections SET artwork_id = ?2 WHERE id = ?1",
        params![id, artwork_id],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::artwork_repo::{self, NewArtwork};
    use crate::db::exhibition_repo::{self, NewExhibition};
    use crate::db::{photo_repo, Database};

    struct Fixture {
        db: Database,
        photo_id: i64,
        exhibition_id: i64,
        artwork_ids: Vec<i64>,
    }

    fn fixture() -> Fixture {
        let db = Database::open_in_memory().unwrap();
        let (exhibition_id, photo_id, artwork_ids) = db
            .with_conn(|c| {
                let exhibition_id = exhibition_repo::insert(
                    c,
                    &NewExhibition {
                        name: "Hall".to_string(),
                        venue: "Venue".to_string(),
                        start_date: None,
                        end_date: None,
                    },
                )?;
                let photo_id = photo_repo::insert(c, exhibition_id, "u")?;
                let mut ids = Vec::new();
                for (title, year) in [("First", 1900), ("Second", 1950)] {
                    ids.push(artwork_repo::insert(
                        c,
                        &NewArtwork {
                            title: title.to_string(),
                            year: Some(year),
                            ..Default::default()
                        },
                        None,
                    )?);
                }
                Ok((exhibition_id, photo_id, ids))
            })
            .unwrap();
        Fixture {
            db,
            photo_id,
            exhibition_id,
            artwork_ids,
        }
    }

    #[test]
    fn test_insert_and_find() {
        let f = fixture();
        let bbox = BoundingBox {
            x: 60,
            y: 70,
            width: 120,
            height: 200,
        };
        let id = f
            .db
            .with_conn(|c| {
                insert(
                    c,
                    &NewDetection {
                        installation_photo_id: f.photo_id,
                        artwork_id: f.artwork_ids[0],
                        confidence_score: 0.82,
                        bounding_box: Some(bbox),
                    },
                )
            })
            .unwrap();

        let found = f.db.with_conn(|c| find_by_id(c, id)).unwrap().unwrap();
        assert_eq!(found.artwork_id, f.artwork_ids[0]);
        assert_eq!(found.exhibition_id, f.exhibition_id);
        assert_eq!(found.bounding_box, Some(bbox));
        assert!((found.confidence_score - 0.82).abs() < 1e-9);
    }

    #[test]
    fn test_confidence_out_of_range_is_rejected() {
        let f = fixture();
        let result = f.db.with_conn(|c| {
            insert(
                c,
                &NewDetection {
                    installation_photo_id: f.photo_id,
                    artwork_id: f.artwork_ids[0],
                    confidence_score: 1.5,
                    bounding_box: None,
                },
            )
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_list_for_photo_and_reassign() {
        let f = fixture();
        let id = f
            .db
            .with_conn(|c| {
                insert(
                    c,
                    &NewDetection {
                        installation_photo_id: f.photo_id,
                        artwork_id: f.artwork_ids[0],
                        confidence_score: 0.9,
                        bounding_box: None,
                    },
                )
            })
            .unwrap();

        f.db.with_conn(|c| reassign_artwork(c, id, f.artwork_ids[1]))
            .unwrap();

        let listed = f.db.with_conn(|c| list_for_photo(c, f.photo_id)).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].artwork_id, f.artwork_ids[1]);
        assert_eq!(listed[0].artwork_title, "Second");
        assert_eq!(listed[0].artwork_year, Some(1950));
        assert!(listed[0].bounding_box.is_none());
    }
}

//! Exhibition history of an artwork, rebuilt from confirmed records.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Serialize;

use crate::db::provenance_repo::{self, ProvenanceHistoryRow};
use crate::db::{artwork_repo, Database};
use crate::error::{Entity, ServiceError};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProvenanceEntry {
    pub exhibition_id: i64,
    pub exhibition_name: String,
    pub venue: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub detection_confidence: f64,
    pub detected_at: DateTime<Utc>,
}

impl From<ProvenanceHistoryRow> for ProvenanceEntry {
    fn from(row: ProvenanceHistoryRow) -> Self {
        Self {
            exhibition_id: row.exhibition_id,
            exhibition_name: row.exhibition_name,
            venue: row.venue,
            start_date: row.start_date,
            end_date: row.end_date,
            detection_confidence: row.confidence_score,
            detected_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProvenanceResponse {
    pub artwork_id: i64,
    pub artwork_title: String,
    pub artwork_year: Option<i32>,
    pub provenance_entries: Vec<ProvenanceEntry>,
    pub total_exhibitions: usize,
    pub date_range: Option<String>,
}

/// Most recent record first.
pub fn artwork_provenance(
    db: &Database,
    artwork_id: i64,
) -> Result<ProvenanceResponse, ServiceError> {
    let (artwork, rows) = db.with_conn(|c| {
        let artwork = artwork_repo::find_by_id(c, artwork_id)?;
        let rows = match artwork {
            Some(_) => provenance_repo::list_for_artwork(c, artwork_id)?,
            None => Vec::new(),
        };
        Ok((artwork, rows))
    })?;
    let artwork = artwork.ok_or_else(|| ServiceError::not_found(Entity::Artwork, artwork_id))?;

    let entries: Vec<ProvenanceEntry> = rows.into_iter().map(ProvenanceEntry::from).collect();
    let date_range = date_range(&entries);

    Ok(ProvenanceResponse {
        artwork_id: artwork.id,
        artwork_title: artwork.title,
        artwork_year: artwork.year,
        total_exhibitions: entries.len(),
        provenance_entries: entries,
        date_range,
    })
}

/// `"1889"` when every known year agrees, `"1889-1931"` otherwise, `None`
/// without any dated exhibition.
pub fn date_range(entries: &[ProvenanceEntry]) -> Option<String> {
    let years = entries
        .iter()
        .flat_map(|e| [e.start_date, e.end_date])
        .flatten()
        .map(|d| d.year());

    let (min, max) = years.fold(None, |acc: Option<(i32, i32)>, y| match acc {
        Some((lo, hi)) => Some((lo.min(y), hi.max(y))),
        None => Some((y, y)),
    })?;

    if min == max {
        Some(min.to_string())
    } else {
        Some(format!("{}-{}", min, max))
    }
}

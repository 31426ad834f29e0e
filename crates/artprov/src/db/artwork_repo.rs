//! Artwork repository: catalog rows and their stored embeddings.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use super::{json_column, DatabaseError};

/// A catalog artwork row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtworkRow {
    pub id: i64,
    pub title: String,
    pub year: Option<i32>,
    pub format_type: Option<String>,
    pub dimensions: Option<String>,
    pub image_url: Option<String>,
    /// L2-normalized embedding, absent until one has been generated.
    #[serde(skip_serializing)]
    pub vector_embedding: Option<Vec<f32>>,
}

impl ArtworkRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            title: row.get("title")?,
            year: row.get("year")?,
            format_type: row.get("format_type")?,
            dimensions: row.get("dimensions")?,
            image_url: row.get("image_url")?,
            vector_embedding: json_column(row, "vector_embedding")?,
        })
    }

    pub fn has_embedding(&self) -> bool {
        self.vector_embedding
            .as_ref()
            .is_some_and(|v| !v.is_empty())
    }
}

/// Fields supplied when adding an artwork to the catalog.
#[derive(Debug, Clone, Default)]
pub struct NewArtwork {
    pub title: String,
    pub year: Option<i32>,
    pub format_type: Option<String>,
    pub dimensions: Option<String>,
    pub image_url: Option<String>,
}

/// Metadata filters for the heuristic candidate query.
#[derive(Debug, Clone, Default)]
pub struct MetadataFilter<'a> {
    /// Artwork to leave out of the result (the detected one).
    pub exclude_id: i64,
    pub format_type: Option<&'a str>,
    /// Inclusive year range.
    pub year_range: Option<(i32, i32)>,
    pub limit: u32,
}

fn encode_embedding(embedding: Option<&[f32]>) -> Result<Option<String>, DatabaseError> {
    embedding
        .map(|v| {
            serde_json::to_string(v).map_err(|e| DatabaseError::Json {
                column: "vector_embedding",
                source: e,
            })
        })
        .transpose()
}

/// Inserts a new artwork and returns its ID.
pub fn insert(
    conn: &Connection,
    artwork: &NewArtwork,
    embedding: Option<&[f32]>,
) -> Result<i64, DatabaseError> {
    let embedding_json = encode_embedding(embedding)?;
    conn.execute(
        "INSERT INTO artworks (title, year, format_type, dimensions, image_url, vector_embedding)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            artwork.title,
            artwork.year,
            artwork.format_type,
            artwork.dimensions,
            artwork.image_url,
            embedding_json,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Finds an artwork by its ID.
pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<ArtworkRow>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT * FROM artworks WHERE id = ?1",
            params![id],
            ArtworkRow::from_row,
        )
        .optional()?;
    Ok(row)
}

/// Lists artworks in ID order, optionally bounded.
pub fn list(conn: &Connection, limit: Option<u32>) -> Result<Vec<ArtworkRow>, DatabaseError> {
    let limit = limit.map(i64::from).unwrap_or(-1);
    let mut stmt = conn.prepare("SELECT * FROM artworks ORDER BY id LIMIT ?1")?;
    let rows = stmt
        .query_map(params![limit], ArtworkRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Finds artworks sharing metadata with a detected artwork.
pub fn find_by_metadata(
    conn: &Connection,
    filter: &MetadataFilter<'_>,
) -> Result<Vec<ArtworkRow>, DatabaseError> {
    let mut conditions = vec!["id != ?1".to_string()];
    let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = vec![Box::new(filter.exclude_id)];

    if let Some(format_type) = filter.format_type {
        conditions.push(format!("format_type = ?{}", param_values.len() + 1));
        param_values.push(Box::new(format_type.to_string()));
    }
    if let Some((low, high)) = filter.year_range {
        conditions.push(format!(
            "year BETWEEN ?{} AND ?{}",
            param_values.len() + 1,
            param_values.len() + 2
        ));
        param_values.push(Box::new(low));
        param_values.push(Box::new(high));
    }

    param_values.push(Box::new(i64::from(filter.limit)));
    let sql = format!(
        "SELECT * FROM artworks WHERE {} ORDER BY id LIMIT ?{}",
        conditions.join(" AND "),
        param_values.len()
    );

    let params_ref: Vec<&dyn rusqlite::types::ToSql> =
        param_values.iter().map(|p| p.as_ref()).collect();
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_ref.as_slice(), ArtworkRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Replaces the stored embedding of an artwork.
pub fn update_embedding(
    conn: &Connection,
    id: i64,
    embedding: Option<&[f32]>,
) -> Result<(), DatabaseError> {
    let embedding_json = encode_embedding(embedding)?;
    conn.execute(
        "UPDATE artworks SET vector_embedding = ?2 WHERE id = ?1",
        params![id, embedding_json],
    )?;
    Ok(())
}

/// Updates the image reference of an artwork.
pub fn update_image_url(conn: &Connection, id: i64, image_url: &str) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE artworks SET image_url = ?2 WHERE id = ?1",
        params![id, image_url],
    )?;
    Ok(())
}

/// Deletes an artwork. Returns true if a row was removed.
pub fn delete(conn: &Connection, id: i64) -> Result<bool, DatabaseError> {
    let affected = conn.execute("DELETE FROM artworks WHERE id = ?1", params![id])?;
    Ok(affected > 0)
}

/// Finds artworks by ID, skipping IDs that do not exist.
pub fn find_many(conn: &Connection, ids: &[i64]) -> Result<Vec<ArtworkRow>, DatabaseError> {
    let mut rows = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(row) = find_by_id(conn, *id)? {
            rows.push(row);
        }
    }
    Ok(rows)
}

/// Lists artworks that have no stored embedding yet.
pub fn list_without_embedding(conn: &Connection) -> Result<Vec<ArtworkRow>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT * FROM artworks WHERE vector_embedding IS NULL ORDER BY id")?;
    let rows = stmt
        .query_map([], ArtworkRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

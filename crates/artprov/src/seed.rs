//! Demo catalog: five well-known artworks and three exhibitions.

use chrono::NaiveDate;

use crate::catalog::index_metadata;
use crate::db::artwork_repo::{self, NewArtwork};
use crate::db::exhibition_repo::{self, NewExhibition};
use crate::db::{Database, DatabaseError};
use crate::embedding::{embed_seed, known_title_embedding};
use crate::vector::VectorIndex;

struct SeedArtwork {
    title: &'static str,
    year: i32,
    format_type: &'static str,
    dimensions: &'static str,
    image: &'static str,
}

const ARTWORKS: [SeedArtwork; 5] = [
    SeedArtwork {
        title: "Starry Night",
        year: 1889,
        format_type: "painting",
        dimensions: "73.7 cm × 92.1 cm",
        image: "starry_night.jpg",
    },
    SeedArtwork {
        title: "The Persistence of Memory",
        year: 1931,
        format_type: "painting",
        dimensions: "24 cm × 33 cm",
        image: "persistence_memory.jpg",
    },
    SeedArtwork {
        title: "Campbell's Soup Cans",
        year: 1962,
        format_type: "silkscreen",
        dimensions: "51 cm × 41 cm each",
        image: "campbells_soup.jpg",
    },
    SeedArtwork {
        title: "Girl with a Pearl Earring",
        year: 1665,
        format_type: "painting",
        dimensions: "44.5 cm × 39 cm",
        image: "girl_pearl_earring.jpg",
    },
    SeedArtwork {
        title: "The Thinker",
        year: 1904,
        format_type: "sculpture",
        dimensions: "186 cm height",
        image: "the_thinker.jpg",
    },
];

const EXHIBITIONS: [(&str, &str, (i32, u32, u32), (i32, u32, u32)); 3] = [
    (
        "Masters of Modern Art",
        "Metropolitan Museum of Art",
        (2023, 3, 15),
        (2023, 8, 20),
    ),
    (
        "Contemporary Visions",
        "Museum of Modern Art",
        (2023, 5, 1),
        (2023, 9, 15),
    ),
    (
        "European Classics",
        "Guggenheim Museum",
        (2023, 2, 10),
        (2023, 7, 30),
    ),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedSummary {
    pub artwork_ids: Vec<i64>,
    pub exhibition_ids: Vec<i64>,
}

/// Inserts the demo catalog in one transaction and mirrors the artwork
/// embeddings into `index` when it is available.
pub fn seed_demo_catalog(db: &Database, index: &VectorIndex) -> Result<SeedSummary, DatabaseError> {
    let summary = db.with_transaction(|tx| {
        let mut artwork_ids = Vec::with_capacity(ARTWORKS.len());
        for (position, artwork) in ARTWORKS.iter().enumerate() {
            let embedding = known_title_embedding(artwork.title)
                .unwrap_or_else(|| embed_seed(position as u64 + 1));
            let id = artwork_repo::insert(
                tx,
                &NewArtwork {
                    title: artwork.title.to_string(),
                    year: Some(artwork.year),
                    format_type: Some(artwork.format_type.to_string()),
                    dimensions: Some(artwork.dimensions.to_string()),
                    image_url: Some(format!("https://example.com/images/{}", artwork.image)),
                },
                Some(&embedding),
            )?;
            artwork_ids.push(id);
        }

        let mut exhibition_ids = Vec::with_capacity(EXHIBITIONS.len());
        for (name, venue, start, end) in EXHIBITIONS {
            let id = exhibition_repo::insert(
                tx,
                &NewExhibition {
                    name: name.to_string(),
                    venue: venue.to_string(),
                    start_date: NaiveDate::from_ymd_opt(start.0, start.1, start.2),
                    end_date: NaiveDate::from_ymd_opt(end.0, end.1, end.2),
                },
            )?;
            exhibition_ids.push(id);
        }

        Ok::<_, DatabaseError>(SeedSummary {
            artwork_ids,
            exhibition_ids,
        })
    })?;

    if index.is_available() {
        let rows = db.with_conn(|c| artwork_repo::find_many(c, &summary.artwork_ids))?;
        let mut indexed = 0;
        for row in &rows {
            let Some(vector) = row.vector_embedding.as_deref() else {
                continue;
            };
            if index.upsert(&row.id.to_string(), vector, &index_metadata(row)) {
                indexed += 1;
            }
        }
        log::info!("Indexed {} seed artworks", indexed);
    } else {
        log::info!("Vector index unavailable, seed embeddings kept in the database only");
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::EMBEDDING_DIMENSION;

    #[test]
    fn test_seed_inserts_catalog() {
        let db = Database::open_in_memory().unwrap();
        let summary = seed_demo_catalog(&db, &VectorIndex::Disabled).unwrap();
        assert_eq!(summary.artwork_ids.len(), 5);
        assert_eq!(summary.exhibition_ids.len(), 3);

        let rows = db.with_conn(|c| artwork_repo::list(c, None)).unwrap();
        assert!(rows.iter().all(|r| r.has_embedding()));
        assert_eq!(rows[0].vector_embedding, Some(embed_seed(1)));
    }

    #[test]
    fn test_seed_populates_index() {
        let db = Database::open_in_memory().unwrap();
        let index = VectorIndex::memory(EMBEDDING_DIMENSION);
        let summary = seed_demo_catalog(&db, &index).unwrap();

        assert_eq!(index.stats().unwrap().total_vector_count, 5);
        let thinker = summary.artwork_ids[4].to_string();
        assert_eq!(index.fetch(&thinker), Some(embed_seed(5)));
    }
}

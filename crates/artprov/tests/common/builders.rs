//! Builders for catalog rows used across integration tests.

#![allow(dead_code)]

use chrono::NaiveDate;

use artprov::db::artwork_repo::NewArtwork;
use artprov::db::exhibition_repo::NewExhibition;

/// Builder for a catalog artwork.
pub struct ArtworkBuilder {
    artwork: NewArtwork,
}

impl ArtworkBuilder {
    pub fn new(title: &str) -> Self {
        Self {
            artwork: NewArtwork {
                title: title.to_string(),
                ..Default::default()
            },
        }
    }

    pub fn year(mut self, year: i32) -> Self {
        self.artwork.year = Some(year);
        self
    }

    pub fn format(mut self, format_type: &str) -> Self {
        self.artwork.format_type = Some(format_type.to_string());
        self
    }

    pub fn image(mut self, image_url: &str) -> Self {
        self.artwork.image_url = Some(image_url.to_string());
        self
    }

    pub fn build(self) -> NewArtwork {
        self.artwork
    }
}

/// Builder for an exhibition.
pub struct ExhibitionBuilder {
    exhibition: NewExhibition,
}

impl ExhibitionBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            exhibition: NewExhibition {
                name: name.to_string(),
                venue: "Test Venue".to_string(),
                start_date: None,
                end_date: None,
            },
        }
    }

    pub fn venue(mut self, venue: &str) -> Self {
        self.exhibition.venue = venue.to_string();
        self
    }

    pub fn dates(mut self, start: (i32, u32, u32), end: (i32, u32, u32)) -> Self {
        self.exhibition.start_date = NaiveDate::from_ymd_opt(start.0, start.1, start.2);
        self.exhibition.end_date = NaiveDate::from_ymd_opt(end.0, end.1, end.2);
        self
    }

    pub fn build(self) -> NewExhibition {
        self.exhibition
    }
}

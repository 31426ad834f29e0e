//! Exact in-process vector search.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::embedding::cosine_similarity;

use super::{IndexStats, Metadata, VectorBackend, VectorError, VectorMatch};

struct Entry {
    id: String,
    vector: Vec<f32>,
    metadata: Metadata,
}

/// Brute-force cosine index kept in insertion order.
pub struct MemoryBackend {
    dimension: usize,
    entries: RwLock<Vec<Entry>>,
}

impl MemoryBackend {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            entries: RwLock::new(Vec::new()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Entry>> {
        match self.entries.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Memory index lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Entry>> {
        match self.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Memory index lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<(), VectorError> {
        if vector.len() != self.dimension {
            return Err(VectorError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

fn matches_filter(metadata: &Metadata, filter: Option<&Metadata>) -> bool {
    filter.map_or(true, |filter| {
        filter
            .iter()
            .all(|(key, expected)| metadata.get(key) == Some(expected))
    })
}

impl VectorBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn upsert(&self, id: &str, vector: &[f32], metadata: &Metadata) -> Result<(), VectorError> {
        self.check_dimension(vector)?;
        let mut entries = self.write();
        match entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.vector = vector.to_vec();
                entry.metadata = metadata.clone();
            }
            None => entries.push(Entry {
                id: id.to_string(),
                vector: vector.to_vec(),
                metadata: metadata.clone(),
            }),
        }
        Ok(())
    }

    fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&Metadata>,
    ) -> Result<Vec<VectorMatch>, VectorError> {
        self.check_dimension(vector)?;
        let entries = self.read();
        let mut hits: Vec<VectorMatch> = entries
            .iter()
            .filter(|e| matches_filter(&e.metadata, filter))
            .map(|e| VectorMatch {
                id: e.id.clone(),
                score: cosine_similarity(vector, &e.vector),
                metadata: e.metadata.clone(),
            })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(top_k);
        Ok(hits)
    }

    fn fetch(&self, id: &str) -> Result<Option<Vec<f32>>, VectorError> {
        Ok(self
            .read()
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.vector.clone()))
    }

    fn delete(&self, id: &str) -> Result<(), VectorError> {
        self.write().retain(|e| e.id != id);
        Ok(())
    }

    fn stats(&self) -> Result<IndexStats, VectorError> {
        Ok(IndexStats {
            total_vector_count: self.read().len() as u64,
            dimension: self.dimension,
            index_fullness: None,
        })
    }
}

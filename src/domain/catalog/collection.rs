//! Ordered recordings catalog

use std::iter::FusedIterator;
use std::slice;

use crate::domain::error::CatalogViolation;

use super::record::{LocationRef, RecordingRecord};

/// Ordered collection of recording records.
///
/// Insertion order is save order. `location_ref` is unique across records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    records: Vec<RecordingRecord>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from records, rejecting duplicate locations
    pub fn from_records(records: Vec<RecordingRecord>) -> Result<Self, CatalogViolation> {
        let mut catalog = Self::new();
        for record in records {
            catalog.append(record)?;
        }
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[RecordingRecord] {
        &self.records
    }

    pub fn iter(&self) -> slice::Iter<'_, RecordingRecord> {
        self.records.iter()
    }

    pub fn contains(&self, location: &LocationRef) -> bool {
        self.position(location).is_some()
    }

    pub fn get(&self, location: &LocationRef) -> Option<&RecordingRecord> {
        self.records.iter().find(|r| &r.location_ref == location)
    }

    fn position(&self, location: &LocationRef) -> Option<usize> {
        self.records.iter().position(|r| &r.location_ref == location)
    }

    /// Insert at the end
    pub fn append(&mut self, record: RecordingRecord) -> Result<(), CatalogViolation> {
        if self.contains(&record.location_ref) {
            return Err(CatalogViolation::DuplicateAsset(record.location_ref));
        }
        self.records.push(record);
        Ok(())
    }

    /// Change a record's display name, returning the previous one
    pub fn rename(
        &mut self,
        location: &LocationRef,
        new_name: impl Into<String>,
    ) -> Result<String, CatalogViolation> {
        let index = self
            .position(location)
            .ok_or_else(|| CatalogViolation::NotFound(location.clone()))?;
        Ok(std::mem::replace(
            &mut self.records[index].display_name,
            new_name.into(),
        ))
    }

    /// Remove a record in place, keeping the order of the rest
    pub fn remove(&mut self, location: &LocationRef) -> Result<RecordingRecord, CatalogViolation> {
        let index = self
            .position(location)
            .ok_or_else(|| CatalogViolation::NotFound(location.clone()))?;
        Ok(self.records.remove(index))
    }

    /// Records whose display name contains `query`, ignoring case.
    /// An empty query yields every record in stored order.
    pub fn filter(&self, query: &str) -> Filter<'_> {
        Filter {
            inner: self.records.iter(),
            needle: query.to_lowercase(),
        }
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a RecordingRecord;
    type IntoIter = slice::Iter<'a, RecordingRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Lazy search over a catalog. Clone it to restart from the beginning.
#[derive(Debug, Clone)]
pub struct Filter<'a> {
    inner: slice::Iter<'a, RecordingRecord>,
    needle: String,
}

impl<'a> Iterator for Filter<'a> {
    type Item = &'a RecordingRecord;

    fn next(&mut self) -> Option<Self::Item> {
        let needle = &self.needle;
        self.inner.find(|r| r.matches_lowercase(needle))
    }
}

impl FusedIterator for Filter<'_> {}

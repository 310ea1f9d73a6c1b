//! Result filters applied to each inflated candidate.
//!
//! A filter either accepts a place or returns a [`FilterRejection`]; a
//! rejection drops the candidate and is never surfaced as a query error.

use std::fmt;

use async_trait::async_trait;

use crate::document::Existential;
use crate::error::FilterRejection;
use crate::spr::StandardPlaceResult;

#[async_trait]
pub trait Filter: Send + Sync {
    fn name(&self) -> &str;

    async fn apply(&self, place: &StandardPlaceResult) -> Result<(), FilterRejection>;
}

/// Attribute filter over the standard place fields. Empty lists mean "any".
#[derive(Debug, Clone, Default)]
pub struct PlaceFilter {
    pub placetypes: Vec<String>,
    pub exclude_placetypes: Vec<String>,
    pub countries: Vec<String>,
    pub is_current: Vec<Existential>,
    pub is_deprecated: Vec<Existential>,
    pub is_ceased: Vec<Existential>,
    pub is_superseded: Vec<Existential>,
    pub is_superseding: Vec<Existential>,
    pub modified_since: Option<i64>,
}

impl PlaceFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn placetype(mut self, placetype: impl Into<String>) -> Self {
        self.placetypes.push(placetype.into());
        self
    }

    pub fn exclude_placetype(mut self, placetype: impl Into<String>) -> Self {
        self.exclude_placetypes.push(placetype.into());
        self
    }

    pub fn country(mut self, country: impl Into<String>) -> Self {
        self.countries.push(country.into());
        self
    }

    pub fn is_current(mut self, flag: Existential) -> Self {
        self.is_current.push(flag);
        self
    }

    pub fn is_deprecated(mut self, flag: Existential) -> Self {
        self.is_deprecated.push(flag);
        self
    }

    pub fn is_ceased(mut self, flag: Existential) -> Self {
        self.is_ceased.push(flag);
        self
    }

    pub fn is_superseded(mut self, flag: Existential) -> Self {
        self.is_superseded.push(flag);
        self
    }

    pub fn is_superseding(mut self, flag: Existential) -> Self {
        self.is_superseding.push(flag);
        self
    }

    pub fn modified_since(mut self, timestamp: i64) -> Self {
        self.modified_since = Some(timestamp);
        self
    }

    /// Whether every criterion is unset.
    pub fn is_empty(&self) -> bool {
        self.placetypes.is_empty()
            && self.exclude_placetypes.is_empty()
            && self.countries.is_empty()
            && self.is_current.is_empty()
            && self.is_deprecated.is_empty()
            && self.is_ceased.is_empty()
            && self.is_superseded.is_empty()
            && self.is_superseding.is_empty()
            && self.modified_since.is_none()
    }

    fn reject(&self, reason: String) -> Result<(), FilterRejection> {
        Err(FilterRejection::new(self.name(), reason))
    }

    fn check_flag(&self, field: &str, allowed: &[Existential], value: Existential) -> Result<(), FilterRejection> {
        if allowed.is_empty() || allowed.contains(&value) {
            Ok(())
        } else {
            self.reject(format!("{} is {}", field, value.as_i8()))
        }
    }
}

#[async_trait]
impl Filter for PlaceFilter {
    fn name(&self) -> &str {
        "place"
    }

    async fn apply(&self, place: &StandardPlaceResult) -> Result<(), FilterRejection> {
        if !self.placetypes.is_empty() && !self.placetypes.iter().any(|p| p == &place.placetype) {
            return self.reject(format!("placetype {} not in {:?}", place.placetype, self.placetypes));
        }
        if self.exclude_placetypes.iter().any(|p| p == &place.placetype) {
            return self.reject(format!("placetype {} is excluded", place.placetype));
        }
        if !self.countries.is_empty() && !self.countries.iter().any(|c| c.eq_ignore_ascii_case(&place.country)) {
            return self.reject(format!("country {} not in {:?}", place.country, self.countries));
        }

        self.check_flag("is_current", &self.is_current, place.is_current)?;
        self.check_flag("is_deprecated", &self.is_deprecated, place.is_deprecated)?;
        self.check_flag("is_ceased", &self.is_ceased, place.is_ceased)?;
        self.check_flag("is_superseded", &self.is_superseded, place.is_superseded)?;
        self.check_flag("is_superseding", &self.is_superseding, place.is_superseding)?;

        if let Some(since) = self.modified_since {
            if place.last_modified < since {
                return self.reject(format!("last modified {} before {}", place.last_modified, since));
            }
        }

        Ok(())
    }
}

/// A filter backed by a predicate, for ad hoc criteria.
pub struct PredicateFilter<F> {
    name: String,
    predicate: F,
}

impl<F> PredicateFilter<F>
where
    F: Fn(&StandardPlaceResult) -> bool + Send + Sync,
{
    pub fn new(name: impl Into<String>, predicate: F) -> Self {
        Self {
            name: name.into(),
            predicate,
        }
    }
}

impl<F> fmt::Debug for PredicateFilter<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredicateFilter").field("name", &self.name).finish()
    }
}

#[async_trait]
impl<F> Filter for PredicateFilter<F>
where
    F: Fn(&StandardPlaceResult) -> bool + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn apply(&self, place: &StandardPlaceResult) -> Result<(), FilterRejection> {
        if (self.predicate)(place) {
            Ok(())
        } else {
            Err(FilterRejection::new(&self.name, format!("record {} did not match", place.id)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use serde_json::json;

    fn place(props: serde_json::Value) -> StandardPlaceResult {
        let body = serde_json::to_vec(&json!({
            "type": "Feature",
            "properties": props,
            "geometry": {"type": "Point", "coordinates": [1.0, 2.0]}
        }))
        .unwrap();
        StandardPlaceResult::from_document(&Document::parse(&body).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_empty_filter_accepts() {
        let filter = PlaceFilter::new();
        assert!(filter.is_empty());
        assert!(filter.apply(&place(json!({"wof:id": 1}))).await.is_ok());
    }

    #[tokio::test]
    async fn test_placetype_include_and_exclude() {
        let county = place(json!({"wof:id": 1, "wof:placetype": "county"}));

        let include = PlaceFilter::new().placetype("locality");
        let rejection = include.apply(&county).await.unwrap_err();
        assert_eq!(rejection.filter, "place");

        let exclude = PlaceFilter::new().exclude_placetype("county");
        assert!(exclude.apply(&county).await.is_err());

        let both = PlaceFilter::new().placetype("county").exclude_placetype("locality");
        assert!(both.apply(&county).await.is_ok());
    }

    #[tokio::test]
    async fn test_existential_flags() {
        let current = place(json!({"wof:id": 1, "mz:is_current": 1}));
        let unknown = place(json!({"wof:id": 2}));

        let filter = PlaceFilter::new().is_current(Existential::True);
        assert!(filter.apply(&current).await.is_ok());
        assert!(filter.apply(&unknown).await.is_err());

        let lenient = PlaceFilter::new()
            .is_current(Existential::True)
            .is_current(Existential::Unknown);
        assert!(lenient.apply(&unknown).await.is_ok());
    }

    #[tokio::test]
    async fn test_country_is_case_insensitive() {
        let filter = PlaceFilter::new().country("us");
        assert!(filter.apply(&place(json!({"wof:id": 1, "wof:country": "US"}))).await.is_ok());
        assert!(filter.apply(&place(json!({"wof:id": 1, "wof:country": "CA"}))).await.is_err());
    }

    #[tokio::test]
    async fn test_modified_since() {
        let filter = PlaceFilter::new().modified_since(1_700_000_000);
        assert!(!filter.is_empty());

        let fresh = place(json!({"wof:id": 1, "wof:lastmodified": 1_700_000_000}));
        assert!(filter.apply(&fresh).await.is_ok());

        let stale = place(json!({"wof:id": 2, "wof:lastmodified": 1_600_000_000}));
        let rejection = filter.apply(&stale).await.unwrap_err();
        assert!(rejection.reason.contains("1600000000"), "{}", rejection.reason);

        // Missing lastmodified is stored as -1 and never counts as recent.
        assert!(filter.apply(&place(json!({"wof:id": 3}))).await.is_err());
    }

    #[tokio::test]
    async fn test_predicate_filter() {
        let filter = PredicateFilter::new("even", |p: &StandardPlaceResult| p.id % 2 == 0);
        assert!(filter.apply(&place(json!({"wof:id": 4}))).await.is_ok());
        let rejection = filter.apply(&place(json!({"wof:id": 5}))).await.unwrap_err();
        assert_eq!(rejection.filter, "even");
    }
}

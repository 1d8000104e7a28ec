//! Point-in-polygon lookup against reference features, backed by a cache of
//! previously resolved points.

use crate::models::{envelope_of, to_geo_geometry, FeatureCollection};
use geo::algorithm::contains::Contains;
use geo::{Geometry as GeoGeometry, Point};
use odp_core::error::CacheError;
use odp_core::models::format_float;
use odp_core::ports::{CacheEntry, FeatureCacheStore};
use rstar::{RTree, RTreeObject, AABB};
use std::cell::Cell;
use std::collections::HashMap;

/// Result of a lookup that matched no feature
pub const NO_MATCH: &str = "0";

/// Decimal digits kept in cache keys
pub const KEY_PRECISION: i32 = 4;

/// Truncate toward zero to [`KEY_PRECISION`] decimal digits
pub fn truncate(value: f64) -> f64 {
    let scale = 10f64.powi(KEY_PRECISION);
    (value * scale).trunc() / scale
}

/// Cache key of a point: `"{lat}_{lon}"` with both components truncated
pub fn cache_key(lat: f64, lon: f64) -> String {
    format!("{}_{}", format_float(truncate(lat)), format_float(truncate(lon)))
}

/// Reference feature prepared for containment tests
#[derive(Debug, Clone)]
struct IndexedFeature {
    /// Position in the source collection
    order: usize,
    feature_id: String,
    geometry: GeoGeometry<f64>,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedFeature {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Spatial index over the features of a reference collection
pub struct SpatialLookup {
    tree: RTree<IndexedFeature>,
    scans: Cell<usize>,
}

impl SpatialLookup {
    /// Index every feature that has an id and a usable geometry.
    ///
    /// The id is taken from `properties.id`, falling back to the feature id.
    /// Features that cannot be indexed are logged and skipped.
    pub fn new(collection: &FeatureCollection) -> Self {
        let mut indexed = Vec::with_capacity(collection.features.len());

        for (order, feature) in collection.features.iter().enumerate() {
            let Some(feature_id) = feature.feature_id() else {
                tracing::warn!("Reference feature {} has no id, skipping", order);
                continue;
            };
            let Some(geometry) = &feature.geometry else {
                continue;
            };
            let geometry = match to_geo_geometry(geometry, &feature_id) {
                Ok(g) => g,
                Err(e) => {
                    tracing::warn!("Skipping reference feature: {}", e);
                    continue;
                }
            };
            let Some(envelope) = envelope_of(&geometry) else {
                continue;
            };
            indexed.push(IndexedFeature { order, feature_id, geometry, envelope });
        }

        tracing::debug!("Indexed {} reference features", indexed.len());

        Self { tree: RTree::bulk_load(indexed), scans: Cell::new(0) }
    }

    /// Number of indexed features
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// How many geometry scans have run, cache hits excluded
    pub fn scan_count(&self) -> usize {
        self.scans.get()
    }

    /// Id of the feature strictly containing the point, without the cache.
    ///
    /// When several features contain the point, the one appearing last in
    /// the reference collection wins.
    pub fn find(&self, lat: f64, lon: f64) -> Option<&str> {
        self.scans.set(self.scans.get() + 1);

        let point = Point::new(lon, lat);
        self.tree
            .locate_in_envelope_intersecting(&AABB::from_point([lon, lat]))
            .filter(|candidate| candidate.geometry.contains(&point))
            .max_by_key(|candidate| candidate.order)
            .map(|candidate| candidate.feature_id.as_str())
    }

    /// Resolve a point to a feature id, consulting and filling the cache.
    ///
    /// Containment is tested on the truncated point, so every point sharing
    /// a cache key resolves to the same feature. Cache hits return without
    /// any geometry evaluation. Misses are not cached, so a point outside
    /// every feature is scanned again next time.
    pub fn resolve(
        &self,
        lat: f64,
        lon: f64,
        cache: &mut SpatialFeatureCache,
    ) -> Result<String, CacheError> {
        let key = cache_key(lat, lon);
        if let Some(feature_id) = cache.get(&key) {
            return Ok(feature_id.to_string());
        }

        match self.find(truncate(lat), truncate(lon)) {
            Some(feature_id) => {
                let feature_id = feature_id.to_string();
                cache.insert(CacheEntry::new(key, feature_id.clone()))?;
                Ok(feature_id)
            }
            None => Ok(NO_MATCH.to_string()),
        }
    }
}

/// Resolve `(lat, lon)` to the id of the containing reference feature
pub fn resolve_spatial_id(
    coordinate: (f64, f64),
    lookup: &SpatialLookup,
    cache: &mut SpatialFeatureCache,
) -> Result<String, CacheError> {
    lookup.resolve(coordinate.0, coordinate.1, cache)
}

/// Key to feature-id index that outlives a single run.
///
/// Entries are write-once: inserting an existing key keeps the first value.
/// Every new entry is handed to the backing store before it becomes visible.
pub struct SpatialFeatureCache {
    entries: HashMap<String, String>,
    store: Option<Box<dyn FeatureCacheStore>>,
}

impl std::fmt::Debug for SpatialFeatureCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpatialFeatureCache")
            .field("entries", &self.entries.len())
            .field("store", &self.store.as_ref().map(|s| s.describe()))
            .finish()
    }
}

impl SpatialFeatureCache {
    /// Cache that lives only as long as this value
    pub fn ephemeral() -> Self {
        Self { entries: HashMap::new(), store: None }
    }

    /// Load all entries from a store and persist new ones into it
    pub fn open(store: Box<dyn FeatureCacheStore>) -> Result<Self, CacheError> {
        let mut entries = HashMap::new();
        for entry in store.load()? {
            entries.entry(entry.key).or_insert(entry.feature_id);
        }

        tracing::debug!("Loaded {} cached points from {}", entries.len(), store.describe());

        Ok(Self { entries, store: Some(store) })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Insert and persist a new entry. Returns `false` if the key was already
    /// present, in which case nothing is written.
    pub fn insert(&mut self, entry: CacheEntry) -> Result<bool, CacheError> {
        if self.entries.contains_key(&entry.key) {
            return Ok(false);
        }
        if let Some(store) = &self.store {
            store.append(&entry)?;
        }
        self.entries.insert(entry.key, entry.feature_id);
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Coordinates, FeatureGeometry, GeoFeature};
    use proptest::prelude::*;
    use std::sync::{Arc, Mutex};

    fn square(id: &str, min_lon: f64, min_lat: f64, size: f64) -> GeoFeature {
        let ring = Coordinates::ring(&[
            (min_lon, min_lat),
            (min_lon + size, min_lat),
            (min_lon + size, min_lat + size),
            (min_lon, min_lat + size),
            (min_lon, min_lat),
        ]);
        GeoFeature::new(Some(FeatureGeometry::new("Polygon", Coordinates::Nested(vec![ring]))))
            .with_property("id", id)
    }

    fn berlin() -> FeatureCollection {
        FeatureCollection::new(vec![
            square("01011101", 13.40, 52.50, 0.02),
            square("12214125", 13.20, 52.55, 0.05),
        ])
    }

    /// Store that records appended entries
    #[derive(Clone, Default)]
    struct RecordingStore {
        appended: Arc<Mutex<Vec<CacheEntry>>>,
        preloaded: Vec<CacheEntry>,
    }

    impl FeatureCacheStore for RecordingStore {
        fn load(&self) -> Result<Vec<CacheEntry>, CacheError> {
            Ok(self.preloaded.clone())
        }

        fn append(&self, entry: &CacheEntry) -> Result<(), CacheError> {
            self.appended.lock().unwrap().push(entry.clone());
            Ok(())
        }

        fn describe(&self) -> String {
            "recording".to_string()
        }
    }

    #[test]
    fn test_cache_key_truncates() {
        assert_eq!(cache_key(52.51234, 13.40567), "52.5123_13.4056");
        assert_eq!(cache_key(52.51238, 13.40561), "52.5123_13.4056");
        assert_eq!(cache_key(-33.99999, 18.0), "-33.9999_18.0");
    }

    #[test]
    fn test_cache_hit_skips_geometry() {
        let lookup = SpatialLookup::new(&berlin());
        let mut cache = SpatialFeatureCache::ephemeral();

        let first = lookup.resolve(52.51234, 13.40567, &mut cache).unwrap();
        assert_eq!(first, "01011101");
        assert_eq!(lookup.scan_count(), 1);

        let second = lookup.resolve(52.51238, 13.40561, &mut cache).unwrap();
        assert_eq!(second, first);
        assert_eq!(lookup.scan_count(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_nearby_points_in_different_cells_scan_again() {
        // 52.51229 truncates to 52.5122, so this is a different cache cell
        let lookup = SpatialLookup::new(&berlin());
        let mut cache = SpatialFeatureCache::ephemeral();

        lookup.resolve(52.51234, 13.40567, &mut cache).unwrap();
        let id = lookup.resolve(52.51229, 13.40571, &mut cache).unwrap();

        assert_eq!(id, "01011101");
        assert_eq!(lookup.scan_count(), 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_miss_is_not_cached() {
        let lookup = SpatialLookup::new(&berlin());
        let mut cache = SpatialFeatureCache::ephemeral();

        assert_eq!(lookup.resolve(48.1, 11.5, &mut cache).unwrap(), NO_MATCH);
        assert_eq!(lookup.resolve(48.1, 11.5, &mut cache).unwrap(), NO_MATCH);
        assert_eq!(lookup.scan_count(), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_last_match_wins() {
        let collection = FeatureCollection::new(vec![
            square("outer", 0.0, 0.0, 10.0),
            square("inner", 2.0, 2.0, 2.0),
        ]);
        let lookup = SpatialLookup::new(&collection);
        assert_eq!(lookup.find(3.0, 3.0), Some("inner"));

        let reversed = FeatureCollection::new(vec![
            square("inner", 2.0, 2.0, 2.0),
            square("outer", 0.0, 0.0, 10.0),
        ]);
        let lookup = SpatialLookup::new(&reversed);
        assert_eq!(lookup.find(3.0, 3.0), Some("outer"));
    }

    #[test]
    fn test_boundary_is_not_contained() {
        let lookup = SpatialLookup::new(&FeatureCollection::new(vec![square("a", 0.0, 0.0, 1.0)]));
        assert_eq!(lookup.find(0.0, 0.5), None);
        assert_eq!(lookup.find(0.5, 0.5), Some("a"));
    }

    #[test]
    fn test_features_without_id_are_skipped() {
        let mut anonymous = square("x", 0.0, 0.0, 1.0);
        anonymous.properties.clear();
        let lookup = SpatialLookup::new(&FeatureCollection::new(vec![anonymous]));
        assert!(lookup.is_empty());
    }

    #[test]
    fn test_cache_persists_new_entries_once() {
        let store = RecordingStore {
            preloaded: vec![CacheEntry::new("52.5123_13.4056", "preloaded")],
            ..Default::default()
        };
        let appended = store.appended.clone();

        let mut cache = SpatialFeatureCache::open(Box::new(store)).unwrap();
        let lookup = SpatialLookup::new(&berlin());

        // Preloaded entry answers without a scan
        assert_eq!(lookup.resolve(52.51234, 13.40567, &mut cache).unwrap(), "preloaded");
        assert_eq!(lookup.scan_count(), 0);

        lookup.resolve(52.56, 13.21, &mut cache).unwrap();
        assert!(!cache.insert(CacheEntry::new(cache_key(52.56, 13.21), "other")).unwrap());

        let appended = appended.lock().unwrap();
        assert_eq!(appended.len(), 1);
        assert_eq!(appended[0], CacheEntry::new(cache_key(52.56, 13.21), "12214125"));
    }

    #[test]
    fn test_resolve_spatial_id() {
        let lookup = SpatialLookup::new(&berlin());
        let mut cache = SpatialFeatureCache::ephemeral();
        let id = resolve_spatial_id((52.57, 13.22), &lookup, &mut cache).unwrap();
        assert_eq!(id, "12214125");
    }

    proptest! {
        #[test]
        fn prop_truncate_moves_toward_zero(value in -180.0f64..180.0) {
            let truncated = truncate(value);
            prop_assert!(truncated.abs() <= value.abs() + 1e-9);
            prop_assert!((value - truncated).abs() < 1e-4 + 1e-9);
        }
    }
}

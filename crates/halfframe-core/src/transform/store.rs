//! LUT Store: resolves a LUT reference to a parsed, shared [`Lut3D`].
//!
//! Sources are registered up front (embedded `.cube` text or pre-parsed
//! sample arrays) and parsed lazily on first [`LutStore::load`]. Parsed tables
//! are cached for the lifetime of the store and never mutated, so readers
//! only hold the lock long enough to clone an `Arc`.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use super::lut::Lut3D;
use crate::error::LutError;

/// LUTs bundled with the crate, keyed by their file name.
const BUILTIN_CUBES: &[(&str, &str)] = &[
    ("kodak-250D.cube", include_str!("../../assets/luts/kodak-250D.cube")),
    (
        "moonrise-kingdom.cube",
        include_str!("../../assets/luts/moonrise-kingdom.cube"),
    ),
    (
        "vintage-overlay.cube",
        include_str!("../../assets/luts/vintage-overlay.cube"),
    ),
    ("clean-raw.cube", include_str!("../../assets/luts/clean-raw.cube")),
];

#[derive(Debug, Clone)]
enum LutSource {
    Cube(Arc<str>),
    Samples {
        size: u32,
        title: String,
        flat_rgb: Arc<[f32]>,
    },
}

impl LutSource {
    fn parse(&self) -> Result<Lut3D, LutError> {
        match self {
            Self::Cube(text) => Lut3D::parse_cube(text),
            Self::Samples {
                size,
                title,
                flat_rgb,
            } => Lut3D::from_samples(*size, title.clone(), flat_rgb),
        }
    }
}

#[derive(Debug, Clone)]
struct Registered {
    /// Bumped on every registration; a parse only caches if its source is
    /// still current.
    generation: u64,
    source: LutSource,
}

/// Reference-keyed LUT cache.
///
/// Lock order is `cache` then `sources` wherever both are held.
#[derive(Debug, Default)]
pub struct LutStore {
    sources: RwLock<HashMap<String, Registered>>,
    cache: RwLock<HashMap<String, Arc<Lut3D>>>,
    generation: AtomicU64,
}

impl LutStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-registered with the bundled film LUTs.
    pub fn with_builtin() -> Self {
        let store = Self::new();
        for (reference, text) in BUILTIN_CUBES {
            store.register_cube_text(*reference, *text);
        }
        store
    }

    /// Register `.cube` text under `reference`. Parsing is deferred to the
    /// first [`load`](Self::load). Replaces any previous source and drops its
    /// cached table.
    pub fn register_cube_text(&self, reference: impl Into<String>, text: impl Into<Arc<str>>) {
        self.register(reference.into(), LutSource::Cube(text.into()));
    }

    /// Register a pre-parsed flat `[r, g, b, ...]` sample array.
    pub fn register_samples(
        &self,
        reference: impl Into<String>,
        size: u32,
        title: impl Into<String>,
        flat_rgb: impl Into<Arc<[f32]>>,
    ) {
        self.register(
            reference.into(),
            LutSource::Samples {
                size,
                title: title.into(),
                flat_rgb: flat_rgb.into(),
            },
        );
    }

    /// Insert an already built table.
    pub fn insert(&self, reference: impl Into<String>, lut: Lut3D) -> Arc<Lut3D> {
        let lut = Arc::new(lut);
        self.cache.write().insert(reference.into(), lut.clone());
        lut
    }

    fn register(&self, reference: String, source: LutSource) {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let mut cache = self.cache.write();
        cache.remove(&reference);
        self.sources
            .write()
            .insert(reference, Registered { generation, source });
    }

    /// Whether `reference` has a registered source or cached table.
    pub fn contains(&self, reference: &str) -> bool {
        self.cache.read().contains_key(reference) || self.sources.read().contains_key(reference)
    }

    /// All known references, sorted.
    pub fn references(&self) -> Vec<String> {
        let mut refs: Vec<String> = self.sources.read().keys().cloned().collect();
        for key in self.cache.read().keys() {
            if !refs.contains(key) {
                refs.push(key.clone());
            }
        }
        refs.sort();
        refs
    }

    /// Resolve `reference`, parsing and caching it on first use.
    ///
    /// Two threads missing the cache at once may both parse; the first insert
    /// wins and both get its table. A table parsed from a source that was
    /// replaced mid-parse is returned but not cached.
    pub fn load(&self, reference: &str) -> Result<Arc<Lut3D>, LutError> {
        if let Some(lut) = self.cache.read().get(reference) {
            return Ok(lut.clone());
        }

        let Registered { generation, source } = self
            .sources
            .read()
            .get(reference)
            .cloned()
            .ok_or_else(|| LutError::NotFound(reference.to_string()))?;

        let start = std::time::Instant::now();
        let lut = Arc::new(source.parse().map_err(|e| e.with_reference(reference))?);
        tracing::debug!(
            reference,
            size = lut.size(),
            "parsed LUT in {:.1}ms",
            start.elapsed().as_secs_f64() * 1000.0
        );

        let mut cache = self.cache.write();
        let current = self.sources.read().get(reference).map(|r| r.generation);
        if current != Some(generation) {
            tracing::debug!(reference, "LUT re-registered while parsing, not caching");
            return Ok(lut);
        }
        Ok(cache.entry(reference.to_string()).or_insert(lut).clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_luts_parse() {
        let store = LutStore::with_builtin();
        for (reference, _) in BUILTIN_CUBES {
            let lut = store.load(reference).unwrap_or_else(|e| panic!("{reference}: {e}"));
            assert_eq!(lut.size(), 17, "{reference}");
        }
    }

    #[test]
    fn test_load_is_cached() {
        let store = LutStore::with_builtin();
        let a = store.load("kodak-250D.cube").expect("load");
        let b = store.load("kodak-250D.cube").expect("load");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_unknown_reference_not_found() {
        let store = LutStore::new();
        let err = store.load("nope.cube").unwrap_err();
        assert!(matches!(err, LutError::NotFound(ref r) if r == "nope.cube"));
    }

    #[test]
    fn test_malformed_carries_reference() {
        let store = LutStore::new();
        store.register_cube_text("broken.cube", "LUT_3D_SIZE 2\n0 0 0\n1 1 1\n");
        let err = store.load("broken.cube").unwrap_err();
        match err {
            LutError::Malformed {
                reference,
                expected,
                found,
            } => {
                assert_eq!(reference, "broken.cube");
                assert_eq!((expected, found), (8, 2));
            }
            other => panic!("expected Malformed, got {other:?}"),
        }
        // Failures are not cached as successes.
        assert!(store.load("broken.cube").is_err());
    }

    #[test]
    fn test_register_samples_entry_point() {
        let store = LutStore::new();
        let identity = Lut3D::identity(3).expect("identity");
        let flat: Vec<f32> = identity.samples().iter().flatten().copied().collect();
        store.register_samples("ident", 3, "Identity", flat);
        let lut = store.load("ident").expect("load");
        assert!(lut.is_identity(0.0));
        assert_eq!(store.references(), vec!["ident".to_string()]);
    }

    #[test]
    fn test_reregister_invalidates_cache() {
        let store = LutStore::new();
        store.register_samples("x", 2, "a", vec![0.0; 24]);
        let first = store.load("x").expect("load");
        store.register_samples("x", 2, "b", vec![1.0; 24]);
        let second = store.load("x").expect("load");
        assert_eq!(first.title(), "a");
        assert_eq!(second.title(), "b");
    }

    #[test]
    fn test_register_during_load_never_caches_stale_table() {
        for _ in 0..50 {
            let store = Arc::new(LutStore::new());
            store.register_samples("x", 17, "old", vec![0.25; 17 * 17 * 17 * 3]);
            let loader = {
                let store = store.clone();
                std::thread::spawn(move || store.load("x").map(|lut| lut.title().to_string()))
            };
            store.register_samples("x", 2, "new", vec![0.75; 24]);
            let seen = loader.join().expect("thread").expect("load");
            assert!(seen == "old" || seen == "new", "{seen}");
            assert_eq!(store.load("x").expect("load").title(), "new");
        }
    }

    #[test]
    fn test_concurrent_loads_agree() {
        let store = Arc::new(LutStore::with_builtin());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || store.load("moonrise-kingdom.cube").map(|l| l.sample([0.3, 0.6, 0.9])))
            })
            .collect();
        let results: Vec<[f32; 3]> = handles
            .into_iter()
            .map(|h| h.join().expect("thread").expect("load"))
            .collect();
        assert!(results.windows(2).all(|w| w[0] == w[1]));
    }
}

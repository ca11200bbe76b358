//! Read-mostly catalog store with atomic wholesale replacement.
//!
//! Generators build a catalog off to the side, persist it to a temp file
//! renamed into place, and only then swap the in-memory entry. Readers
//! hold the lock for the duration of a map lookup, never a scrape.

use rand::Rng;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use tracing::warn;

use crate::catalog::reddit::REDDIT_CATALOG;
use crate::catalog::DomainCatalog;
use crate::error::{Error, Result};

pub struct CatalogStore {
    dir: PathBuf,
    catalogs: RwLock<HashMap<String, Arc<DomainCatalog>>>,
}

impl CatalogStore {
    /// Open the store rooted at `dir`, loading every previously
    /// persisted catalog.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let mut catalogs = HashMap::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if !path.extension().is_some_and(|e| e == "json") {
                continue;
            }
            match load_catalog(&path) {
                Ok(catalog) => {
                    catalogs.insert(catalog.name.clone(), Arc::new(catalog));
                }
                Err(e) => warn!("skipping unreadable catalog {}: {e}", path.display()),
            }
        }

        Ok(Self {
            dir,
            catalogs: RwLock::new(catalogs),
        })
    }

    pub fn get(&self, name: &str) -> Option<Arc<DomainCatalog>> {
        self.read_lock().get(name).cloned()
    }

    /// All catalog names, sorted for stable output.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read_lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Install one catalog: persist, then swap the in-memory entry.
    pub fn install(&self, catalog: DomainCatalog) -> Result<()> {
        self.persist(&catalog)?;
        self.write_lock()
            .insert(catalog.name.clone(), Arc::new(catalog));
        Ok(())
    }

    /// Install a batch under a single write lock, so a reader never
    /// observes some entries from the new run and some from the old.
    pub fn install_all(&self, batch: Vec<DomainCatalog>) -> Result<()> {
        for catalog in &batch {
            self.persist(catalog)?;
        }
        let mut map = self.write_lock();
        for catalog in batch {
            map.insert(catalog.name.clone(), Arc::new(catalog));
        }
        Ok(())
    }

    /// Draw one domain uniformly from the generated news catalog.
    pub fn random_domain<R: Rng>(&self, rng: &mut R) -> Result<String> {
        let catalog = self
            .get(REDDIT_CATALOG)
            .ok_or_else(|| Error::CatalogMissing(REDDIT_CATALOG.to_string()))?;
        if catalog.domains.is_empty() {
            return Err(Error::CatalogEmpty(REDDIT_CATALOG.to_string()));
        }
        let idx = rng.gen_range(0..catalog.domains.len());
        Ok(catalog.domains[idx].clone())
    }

    /// Resolve a country key (case-insensitive) to its scraped domains.
    pub fn resolve_national(&self, key: &str) -> Result<Vec<String>> {
        let key = key.trim().to_ascii_lowercase();
        let catalog = self
            .get(&key)
            .ok_or_else(|| Error::CatalogMissing(key.clone()))?;
        if catalog.domains.is_empty() {
            return Err(Error::CatalogEmpty(key));
        }
        Ok(catalog.domains.clone())
    }

    /// Where a catalog's persisted file lives (whether or not it exists
    /// yet). Reported back in generator responses.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem_for(name)))
    }

    fn persist(&self, catalog: &DomainCatalog) -> Result<()> {
        let stem = file_stem_for(&catalog.name);
        let tmp = self.dir.join(format!("{stem}.json.tmp"));
        let dest = self.dir.join(format!("{stem}.json"));
        fs::write(&tmp, serde_json::to_vec_pretty(catalog)?)?;
        fs::rename(&tmp, &dest)?;
        Ok(())
    }

    fn read_lock(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Arc<DomainCatalog>>> {
        self.catalogs.read().expect("catalog lock poisoned")
    }

    fn write_lock(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Arc<DomainCatalog>>> {
        self.catalogs.write().expect("catalog lock poisoned")
    }
}

fn load_catalog(path: &std::path::Path) -> Result<DomainCatalog> {
    Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
}

/// Catalog names come from scraped page titles; keep file names tame.
fn file_stem_for(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn store() -> (tempfile::TempDir, CatalogStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = CatalogStore::open(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_install_and_get() {
        let (_dir, store) = store();
        store
            .install(DomainCatalog::new("reddit", vec!["cnn.com".into()]))
            .unwrap();
        let catalog = store.get("reddit").unwrap();
        assert_eq!(catalog.domains, vec!["cnn.com"]);
    }

    #[test]
    fn test_persistence_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = CatalogStore::open(dir.path()).unwrap();
            store
                .install(DomainCatalog::new(
                    "american",
                    vec!["cnn.com".into(), "nytimes.com".into()],
                ))
                .unwrap();
        }
        let reopened = CatalogStore::open(dir.path()).unwrap();
        assert_eq!(
            reopened.resolve_national("AMERICAN").unwrap(),
            vec!["cnn.com", "nytimes.com"]
        );
    }

    #[test]
    fn test_random_before_generation_fails() {
        let (_dir, store) = store();
        let mut rng = StdRng::seed_from_u64(7);
        let err = store.random_domain(&mut rng).unwrap_err();
        assert_eq!(err.code(), "CatalogMissing");

        store.install(DomainCatalog::new("reddit", vec![])).unwrap();
        let err = store.random_domain(&mut rng).unwrap_err();
        assert_eq!(err.code(), "CatalogEmpty");
    }

    #[test]
    fn test_random_draws_stay_in_catalog() {
        let (_dir, store) = store();
        let domains: Vec<String> = (0..12).map(|i| format!("site{i}.com")).collect();
        store
            .install(DomainCatalog::new("reddit", domains.clone()))
            .unwrap();

        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..10_000 {
            let drawn = store.random_domain(&mut rng).unwrap();
            assert!(domains.contains(&drawn));
        }
    }

    #[test]
    fn test_random_is_deterministic_under_fixed_seed() {
        let (_dir, store) = store();
        store
            .install(DomainCatalog::new(
                "reddit",
                vec!["a.com".into(), "b.com".into(), "c.com".into()],
            ))
            .unwrap();

        let draw = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..5)
                .map(|_| store.random_domain(&mut rng).unwrap())
                .collect::<Vec<_>>()
        };
        assert_eq!(draw(9), draw(9));
    }

    #[test]
    fn test_resolve_national_is_case_insensitive() {
        let (_dir, store) = store();
        store
            .install(DomainCatalog::new("french", vec!["lemonde.fr".into()]))
            .unwrap();
        assert_eq!(store.resolve_national("French").unwrap(), vec!["lemonde.fr"]);
        assert_eq!(
            store.resolve_national("german").unwrap_err().code(),
            "CatalogMissing"
        );
    }

    #[test]
    fn test_install_replaces_wholesale() {
        let (_dir, store) = store();
        store
            .install(DomainCatalog::new("reddit", vec!["old.com".into()]))
            .unwrap();
        store
            .install(DomainCatalog::new(
                "reddit",
                vec!["new1.com".into(), "new2.com".into()],
            ))
            .unwrap();
        assert_eq!(store.get("reddit").unwrap().domains.len(), 2);
    }

    #[test]
    fn test_concurrent_readers_never_see_partial_swap() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(CatalogStore::open(dir.path()).unwrap());
        let old: Vec<String> = (0..4).map(|i| format!("old{i}.com")).collect();
        let new: Vec<String> = (0..9).map(|i| format!("new{i}.com")).collect();
        store
            .install(DomainCatalog::new("american", old.clone()))
            .unwrap();

        let reader = {
            let store = Arc::clone(&store);
            let (old_len, new_len) = (old.len(), new.len());
            std::thread::spawn(move || {
                for _ in 0..2_000 {
                    let seen = store.resolve_national("american").unwrap().len();
                    assert!(
                        seen == old_len || seen == new_len,
                        "reader saw a partial catalog of {seen} domains"
                    );
                }
            })
        };

        for i in 0..50 {
            let domains = if i % 2 == 0 { new.clone() } else { old.clone() };
            store
                .install_all(vec![DomainCatalog::new("american", domains)])
                .unwrap();
        }
        reader.join().unwrap();
    }

    #[test]
    fn test_file_stem_sanitization() {
        assert_eq!(file_stem_for("new zealand"), "new-zealand");
        assert_eq!(file_stem_for("wikipedia-countries"), "wikipedia-countries");
    }
}

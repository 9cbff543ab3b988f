//! In-memory cache of generated artifacts per annotated type.
//!
//! Entries are keyed by qualified name and arity and validated by an xxh64
//! fingerprint over everything synthesis reads: the documents holding the
//! type's declarations, the member types of every declared type (argument
//! typing follows member chains into other types), and the configuration.

use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use xxhash_rust::xxh64::Xxh64;

use crate::config::SigmuxConfig;
use crate::semantic::{NamedType, SymbolTable};

use super::TypeArtifacts;

const SEED: u64 = 0;

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct CacheKey {
    pub qualified_name: String,
    pub arity: usize,
}

impl CacheKey {
    pub fn of(ty: &NamedType<'_>) -> Self {
        Self {
            qualified_name: ty.qualified_name.clone(),
            arity: ty.arity,
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    fingerprint: u64,
    artifacts: TypeArtifacts,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: usize,
    pub misses: usize,
}

#[derive(Debug, Default)]
pub struct GenerationCache {
    entries: DashMap<CacheKey, CacheEntry>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl GenerationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Artifacts stored under `key` with a matching fingerprint.
    pub fn get(&self, key: &CacheKey, fingerprint: u64) -> Option<TypeArtifacts> {
        let hit = self
            .entries
            .get(key)
            .filter(|entry| entry.fingerprint == fingerprint)
            .map(|entry| entry.artifacts.clone());
        let counter = if hit.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        hit
    }

    pub fn insert(&self, key: CacheKey, fingerprint: u64, artifacts: TypeArtifacts) {
        self.entries.insert(
            key,
            CacheEntry {
                fingerprint,
                artifacts,
            },
        );
    }

    /// Drops entries for types that no longer exist.
    pub fn retain(&self, live: &[CacheKey]) {
        self.entries.retain(|key, _| live.contains(key));
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

fn update_str(hasher: &mut Xxh64, text: &str) {
    hasher.update(&(text.len() as u64).to_le_bytes());
    hasher.update(text.as_bytes());
}

/// Digest of every declared type's name and member types.
pub fn symbol_digest(symbols: &SymbolTable<'_>) -> u64 {
    let mut hasher = Xxh64::new(SEED);
    for ty in symbols.types() {
        update_str(&mut hasher, &ty.qualified_name);
        hasher.update(&(ty.arity as u64).to_le_bytes());
        for (_, field) in ty.fields() {
            update_str(&mut hasher, &field.ty.text);
            for declarator in &field.declarators {
                update_str(&mut hasher, &declarator.name);
            }
        }
        for (_, property) in ty.properties() {
            update_str(&mut hasher, &property.ty.text);
            update_str(&mut hasher, &property.name);
        }
    }
    hasher.digest()
}

pub fn fingerprint(ty: &NamedType<'_>, symbols_digest: u64, config: &SigmuxConfig) -> u64 {
    let mut hasher = Xxh64::new(SEED);
    update_str(&mut hasher, &format!("{config:?}"));
    hasher.update(&symbols_digest.to_le_bytes());
    update_str(&mut hasher, &ty.qualified_name);
    for fragment in &ty.fragments {
        update_str(&mut hasher, &fragment.path().to_string_lossy());
        update_str(&mut hasher, fragment.tree.text());
    }
    hasher.digest()
}

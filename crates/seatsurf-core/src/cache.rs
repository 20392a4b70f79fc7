//! Entity cache - persisted snapshot of locations and their spaces
//!
//! The cache is a best-effort accelerator, not a source of truth. It is
//! replaced wholesale on every refresh, has no TTL of its own, and a missing
//! or damaged file simply reads as empty.

use chrono::{SecondsFormat, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::paths::Paths;
use crate::session::SessionManager;

/// Id and display name; the only fields kept for locations and spaces
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedEntity {
    pub id: String,
    pub name: String,
}

/// The persisted snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceCache {
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub locations: Vec<CachedEntity>,
    /// Location id -> spaces. Keys without a matching location are tolerated.
    #[serde(default)]
    pub spaces: BTreeMap<String, Vec<CachedEntity>>,
}

impl SpaceCache {
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty() && self.spaces.is_empty()
    }

    pub fn location_name(&self, location_id: &str) -> Option<&str> {
        self.locations
            .iter()
            .find(|l| l.id == location_id)
            .map(|l| l.name.as_str())
    }

    pub fn spaces_for(&self, location_id: &str) -> &[CachedEntity] {
        self.spaces.get(location_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn total_spaces(&self) -> usize {
        self.spaces.values().map(Vec::len).sum()
    }
}

/// Result of a refresh
#[derive(Debug, Clone)]
pub struct CacheSummary {
    pub locations: usize,
    pub spaces: usize,
    /// Locations whose space list could not be fetched (recorded as empty)
    pub failed_locations: usize,
    pub snapshot: SpaceCache,
}

/// File-backed store for the snapshot
#[derive(Debug, Clone)]
pub struct CacheStore {
    path: PathBuf,
}

impl CacheStore {
    pub fn new(paths: &Paths) -> Self {
        Self {
            path: paths.spaces_cache(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the snapshot; never fails
    pub fn load(&self) -> SpaceCache {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(_) => return SpaceCache::default(),
        };

        serde_json::from_str(&content).unwrap_or_else(|e| {
            debug!("Ignoring unparsable cache at {}: {}", self.path.display(), e);
            SpaceCache::default()
        })
    }

    /// Write the snapshot in compact form, replacing whatever was there
    pub fn save(&self, cache: &SpaceCache) -> Result<()> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        let content = serde_json::to_string(cache)
            .map_err(|e| crate::Error::Decode(format!("Failed to serialize cache: {}", e)))?;

        // Each writer gets its own temp file; the rename is atomic and the
        // last one wins.
        let mut tmp = NamedTempFile::new_in(parent)?;
        tmp.write_all(content.as_bytes())?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Fetch every location and its spaces, then replace the snapshot.
    ///
    /// A location whose space list fails to load is kept with an empty list
    /// instead of failing the whole refresh. Losing the session midway is
    /// the exception: the refresh fails and the old snapshot stays.
    pub async fn refresh(&self, session: &SessionManager) -> Result<CacheSummary> {
        session.ensure_authenticated().await?;

        let locations = session.locations().await?;
        let fetches = locations.iter().map(|location| async move {
            (location.id.as_str(), session.spaces(&location.id).await)
        });
        let results = join_all(fetches).await;

        let mut spaces = BTreeMap::new();
        let mut failed_locations = 0;
        for (location_id, result) in results {
            let entries = match result {
                Ok(list) => list
                    .into_iter()
                    .map(|s| CachedEntity { id: s.id, name: s.name })
                    .collect(),
                Err(e) if e.requires_login() => return Err(e),
                Err(e) => {
                    warn!("Failed to fetch spaces for location {}: {}", location_id, e);
                    failed_locations += 1;
                    Vec::new()
                }
            };
            spaces.insert(location_id.to_string(), entries);
        }

        let snapshot = SpaceCache {
            updated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            locations: locations
                .iter()
                .map(|l| CachedEntity {
                    id: l.id.clone(),
                    name: l.name.clone(),
                })
                .collect(),
            spaces,
        };

        self.save(&snapshot)?;

        let summary = CacheSummary {
            locations: snapshot.locations.len(),
            spaces: snapshot.total_spaces(),
            failed_locations,
            snapshot,
        };
        info!(
            "Cached {} location(s) and {} space(s) to {}",
            summary.locations,
            summary.spaces,
            self.path.display()
        );
        Ok(summary)
    }
}

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::catalog::MediaCatalog;
use crate::error::AppError;
use crate::models::media::MediaEntry;

/// On-disk mirror of the last catalog scan. The file is an inspectable
/// artifact, not a cache: every read path re-scans the media root and
/// overwrites it wholesale, so a racing writer can only ever be replaced by
/// another complete, self-consistent snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub images: BTreeMap<String, Vec<MediaEntry>>,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotStats {
    pub total_categories: usize,
    pub total_images: usize,
    pub total_videos: usize,
    pub total_files: usize,
    pub total_size: u64,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    catalog: MediaCatalog,
    snapshot_path: PathBuf,
}

impl SnapshotStore {
    pub fn new(catalog: MediaCatalog, snapshot_path: impl Into<PathBuf>) -> Self {
        Self {
            catalog,
            snapshot_path: snapshot_path.into(),
        }
    }

    /// Full re-scan of the media root; persists the result and returns it.
    pub fn refresh(&self) -> Result<Snapshot, AppError> {
        let snapshot = Snapshot {
            images: self.catalog.scan_categories()?,
            last_updated: Utc::now(),
        };
        self.persist(&snapshot);
        Ok(snapshot)
    }

    pub fn all(&self) -> Result<Snapshot, AppError> {
        self.refresh()
    }

    pub fn by_category(&self, category: &str) -> Result<Vec<MediaEntry>, AppError> {
        let snapshot = self.refresh()?;
        Ok(snapshot.images.get(category).cloned().unwrap_or_default())
    }

    pub fn by_path(&self, rel: &str) -> Result<Option<MediaEntry>, AppError> {
        let snapshot = self.refresh()?;
        Ok(snapshot
            .images
            .values()
            .flatten()
            .find(|entry| entry.path == rel)
            .cloned())
    }

    pub fn stats(&self) -> Result<SnapshotStats, AppError> {
        let snapshot = self.refresh()?;
        Ok(compute_stats(&snapshot))
    }

    // The snapshot file is advisory; a failed write must not fail the request.
    fn persist(&self, snapshot: &Snapshot) {
        let result = (|| {
            if let Some(parent) = self.snapshot_path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            let json = serde_json::to_string_pretty(snapshot)
                .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err))?;
            fs::write(&self.snapshot_path, json)
        })();
        if let Err(err) = result {
            warn!(
                path = %self.snapshot_path.display(),
                error = %err,
                "failed to persist media snapshot"
            );
        }
    }
}

fn compute_stats(snapshot: &Snapshot) -> SnapshotStats {
    use crate::models::media::MediaKind;

    let mut stats = SnapshotStats {
        total_categories: snapshot.images.len(),
        total_images: 0,
        total_videos: 0,
        total_files: 0,
        total_size: 0,
        last_updated: snapshot.last_updated,
    };
    for entry in snapshot.images.values().flatten() {
        stats.total_size += entry.size;
        match entry.kind {
            MediaKind::Video => stats.total_videos += 1,
            MediaKind::Image => stats.total_images += 1,
        }
    }
    stats.total_files = stats.total_images + stats.total_videos;
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::path::Path;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str, bytes: usize) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        File::create(&path).unwrap().write_all(&vec![0; bytes]).unwrap();
    }

    fn store() -> (TempDir, SnapshotStore) {
        let dir = TempDir::new().unwrap();
        let catalog = MediaCatalog::new(dir.path().join("media"));
        let store = SnapshotStore::new(catalog, dir.path().join("data/images.json"));
        (dir, store)
    }

    #[test]
    fn refresh_writes_a_complete_snapshot_file() {
        let (dir, store) = store();
        touch(&dir.path().join("media"), "gallery/portraits/a.jpg", 10);

        let snapshot = store.refresh().unwrap();
        assert_eq!(snapshot.images.len(), 1);

        let written = fs::read_to_string(dir.path().join("data/images.json")).unwrap();
        let parsed: Snapshot = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed.images["gallery/portraits"][0].filename, "a.jpg");
    }

    #[test]
    fn reads_observe_filesystem_changes_immediately() {
        let (dir, store) = store();
        let media = dir.path().join("media");
        touch(&media, "gallery/a.jpg", 1);
        assert_eq!(store.by_category("gallery").unwrap().len(), 1);

        // No explicit invalidation needed: every read is a fresh scan.
        touch(&media, "gallery/b.jpg", 1);
        assert_eq!(store.by_category("gallery").unwrap().len(), 2);
    }

    #[test]
    fn stats_count_kinds_and_sizes() {
        let (dir, store) = store();
        let media = dir.path().join("media");
        touch(&media, "gallery/a.jpg", 10);
        touch(&media, "gallery/b.png", 20);
        touch(&media, "home/clip.mp4", 30);
        touch(&media, "home/notes.txt", 99);

        let stats = store.stats().unwrap();
        assert_eq!(stats.total_categories, 2);
        assert_eq!(stats.total_images, 2);
        assert_eq!(stats.total_videos, 1);
        assert_eq!(stats.total_files, 3);
        assert_eq!(stats.total_size, 60);
    }

    #[test]
    fn by_path_finds_one_entry() {
        let (dir, store) = store();
        touch(&dir.path().join("media"), "gallery/a.jpg", 1);

        let found = store.by_path("gallery/a.jpg").unwrap();
        assert_eq!(found.unwrap().filename, "a.jpg");
        assert!(store.by_path("gallery/missing.jpg").unwrap().is_none());
    }

    #[test]
    fn unknown_category_is_empty() {
        let (_dir, store) = store();
        assert!(store.by_category("nope").unwrap().is_empty());
    }
}

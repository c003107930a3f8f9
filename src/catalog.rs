use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use walkdir::WalkDir;

use crate::error::AppError;
use crate::models::media::{MediaEntry, MediaItem, MediaKind, MediaTreeNode};

/// Prefix under which the static file handler exposes the media root.
pub const PUBLIC_PREFIX: &str = "/media";

/// Category directories created at startup so the client's fixed sections
/// always resolve, even on a fresh deployment.
const DEFAULT_STRUCTURE: &[&str] = &[
    "heroes/home",
    "heroes/gallery",
    "heroes/about",
    "contact/backgrounds",
    "gallery/portraits",
    "gallery/wides",
    "about/approach",
    "home/intro",
    "home/homepage_video",
];

/// Read-only view over the media directory tree. Every operation is a fresh
/// scan of the filesystem; nothing is cached between calls.
#[derive(Debug, Clone)]
pub struct MediaCatalog {
    root: PathBuf,
}

impl MediaCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn ensure_default_structure(&self) -> Result<(), AppError> {
        for rel in DEFAULT_STRUCTURE {
            fs::create_dir_all(self.root.join(rel))?;
        }
        Ok(())
    }

    /// Resolves a client-supplied relative path against the root, rejecting
    /// anything that could escape it. Returns the normalized relative path
    /// (slash-separated) and the absolute path on disk.
    pub fn resolve(&self, rel: &str) -> Result<(String, PathBuf), AppError> {
        let mut segments: Vec<String> = Vec::new();
        for component in Path::new(rel).components() {
            match component {
                Component::Normal(segment) => {
                    let segment = segment
                        .to_str()
                        .ok_or_else(|| AppError::InvalidPath(rel.to_string()))?;
                    segments.push(segment.to_string());
                }
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(AppError::InvalidPath(rel.to_string()));
                }
            }
        }
        let normalized = segments.join("/");
        let mut absolute = self.root.clone();
        for segment in &segments {
            absolute.push(segment);
        }
        Ok((normalized, absolute))
    }

    /// Immediate recognized files of one category directory, sorted by
    /// filename. An absent directory is an empty listing, not an error.
    pub fn list_by_category(&self, rel: &str) -> Result<Vec<MediaItem>, AppError> {
        let (normalized, dir) = self.resolve(rel)?;
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut items = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(kind) = MediaKind::from_path(Path::new(name)) else {
                continue;
            };
            items.push(MediaItem {
                filename: name.to_string(),
                url: join_url(&normalized, name),
                kind,
            });
        }
        items.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(items)
    }

    /// Full recursive tree of the media root: directories first, then files,
    /// both name-ordered; unrecognized files are skipped. Each call builds a
    /// fresh owned tree.
    pub fn tree(&self) -> Result<Vec<MediaTreeNode>, AppError> {
        walk_tree(&self.root, PUBLIC_PREFIX)
    }

    /// Recursive scan grouping every recognized file by its parent directory
    /// path (the category), entries sorted by filename. Feeds the snapshot
    /// endpoints.
    pub fn scan_categories(&self) -> Result<BTreeMap<String, Vec<MediaEntry>>, AppError> {
        let mut categories: BTreeMap<String, Vec<MediaEntry>> = BTreeMap::new();

        for entry in WalkDir::new(&self.root).into_iter().filter_map(Result::ok) {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let Some(kind) = MediaKind::from_path(path) else {
                continue;
            };
            let Some(filename) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            let rel = path.strip_prefix(&self.root).unwrap_or(path);
            let rel = rel.to_string_lossy().replace('\\', "/");
            let category = match rel.rsplit_once('/') {
                Some((parent, _)) => parent.to_string(),
                None => String::new(),
            };

            let metadata = entry.metadata().map_err(|err| {
                AppError::Io(err.into_io_error().unwrap_or_else(|| {
                    std::io::Error::new(std::io::ErrorKind::Other, "walkdir error")
                }))
            })?;
            let modified: DateTime<Utc> = metadata
                .modified()
                .map(DateTime::from)
                .unwrap_or_else(|_| Utc::now());
            let extension = Path::new(filename)
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
                .unwrap_or_default();

            categories.entry(category).or_default().push(MediaEntry {
                filename: filename.to_string(),
                path: rel.clone(),
                url: encode_url(&rel),
                kind,
                size: metadata.len(),
                last_modified: modified,
                extension,
            });
        }

        for entries in categories.values_mut() {
            entries.sort_by(|a, b| a.filename.cmp(&b.filename));
        }
        Ok(categories)
    }
}

fn walk_tree(dir: &Path, base_url: &str) -> Result<Vec<MediaTreeNode>, AppError> {
    let mut entries: Vec<fs::DirEntry> = fs::read_dir(dir)?.collect::<Result<_, _>>()?;
    entries.sort_by_key(|entry| {
        let is_dir = entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false);
        (!is_dir, entry.file_name())
    });

    let mut nodes = Vec::new();
    for entry in entries {
        let name = entry.file_name();
        let Some(name) = name.to_str().map(str::to_string) else {
            continue;
        };
        let child_url = format!("{base_url}/{}", urlencoding::encode(&name));
        if entry.file_type()?.is_dir() {
            nodes.push(MediaTreeNode::Dir {
                children: walk_tree(&entry.path(), &child_url)?,
                name,
            });
        } else if MediaKind::from_path(Path::new(&name)).is_some() {
            nodes.push(MediaTreeNode::File {
                name,
                url: child_url,
            });
        }
    }
    Ok(nodes)
}

/// `/media` plus the percent-encoded segments of a relative path.
pub fn encode_url(rel: &str) -> String {
    join_url(rel, "")
}

fn join_url(rel: &str, filename: &str) -> String {
    let mut url = String::from(PUBLIC_PREFIX);
    for segment in rel.split('/').filter(|s| !s.is_empty()) {
        url.push('/');
        url.push_str(&urlencoding::encode(segment));
    }
    if !filename.is_empty() {
        url.push('/');
        url.push_str(&urlencoding::encode(filename));
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::media::MediaKind;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        File::create(&path).unwrap().write_all(b"x").unwrap();
    }

    fn catalog() -> (TempDir, MediaCatalog) {
        let dir = TempDir::new().unwrap();
        let catalog = MediaCatalog::new(dir.path());
        (dir, catalog)
    }

    #[test]
    fn lists_recognized_files_sorted_by_filename() {
        let (dir, catalog) = catalog();
        touch(dir.path(), "gallery/portraits/b.png");
        touch(dir.path(), "gallery/portraits/a.jpg");
        touch(dir.path(), "gallery/portraits/c.txt");

        let items = catalog.list_by_category("gallery/portraits").unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].filename, "a.jpg");
        assert_eq!(items[1].filename, "b.png");
        assert!(items.iter().all(|item| item.kind == MediaKind::Image));
        assert_eq!(items[0].url, "/media/gallery/portraits/a.jpg");
    }

    #[test]
    fn mixed_category_keeps_both_kinds() {
        let (dir, catalog) = catalog();
        touch(dir.path(), "home/video/clip.mp4");
        touch(dir.path(), "home/video/poster.jpg");

        let items = catalog.list_by_category("home/video").unwrap();
        let video = items.iter().find(|i| i.kind == MediaKind::Video).unwrap();
        let image = items.iter().find(|i| i.kind == MediaKind::Image).unwrap();
        assert_eq!(video.filename, "clip.mp4");
        assert_eq!(image.filename, "poster.jpg");
    }

    #[test]
    fn listing_is_not_recursive() {
        let (dir, catalog) = catalog();
        touch(dir.path(), "gallery/top.jpg");
        touch(dir.path(), "gallery/nested/deep.jpg");

        let items = catalog.list_by_category("gallery").unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].filename, "top.jpg");
    }

    #[test]
    fn absent_category_is_empty_not_an_error() {
        let (_dir, catalog) = catalog();
        assert!(catalog.list_by_category("does/not/exist").unwrap().is_empty());
    }

    #[test]
    fn traversal_outside_root_is_rejected() {
        let (dir, catalog) = catalog();
        touch(dir.path(), "gallery/a.jpg");

        for bad in ["../secrets", "gallery/../../etc", "/etc/passwd"] {
            let err = catalog.list_by_category(bad).unwrap_err();
            assert!(matches!(err, AppError::InvalidPath(_)), "accepted {bad:?}");
        }
    }

    #[test]
    fn url_segments_are_percent_encoded() {
        let (dir, catalog) = catalog();
        touch(dir.path(), "wedding shoots/first day.jpg");

        let items = catalog.list_by_category("wedding shoots").unwrap();
        assert_eq!(items[0].url, "/media/wedding%20shoots/first%20day.jpg");
    }

    #[test]
    fn tree_is_idempotent_and_skips_unrecognized() {
        let (dir, catalog) = catalog();
        touch(dir.path(), "gallery/portraits/a.jpg");
        touch(dir.path(), "gallery/readme.md");
        touch(dir.path(), "heroes/home/hero.webp");

        let first = catalog.tree().unwrap();
        let second = catalog.tree().unwrap();
        assert_eq!(first, second);

        // Top level: directories only, name-ordered.
        let names: Vec<_> = first
            .iter()
            .map(|node| match node {
                MediaTreeNode::Dir { name, .. } => name.clone(),
                MediaTreeNode::File { name, .. } => name.clone(),
            })
            .collect();
        assert_eq!(names, vec!["gallery", "heroes"]);

        let MediaTreeNode::Dir { children, .. } = &first[0] else {
            panic!("expected dir node");
        };
        // readme.md skipped, portraits subdir kept.
        assert_eq!(children.len(), 1);
    }

    #[test]
    fn scan_groups_by_category_with_sorted_entries() {
        let (dir, catalog) = catalog();
        touch(dir.path(), "gallery/portraits/b.png");
        touch(dir.path(), "gallery/portraits/a.jpg");
        touch(dir.path(), "home/intro/clip.mp4");
        touch(dir.path(), "home/intro/skip.txt");

        let categories = catalog.scan_categories().unwrap();
        assert_eq!(categories.len(), 2);

        let portraits = &categories["gallery/portraits"];
        assert_eq!(portraits[0].filename, "a.jpg");
        assert_eq!(portraits[1].filename, "b.png");
        assert_eq!(portraits[0].path, "gallery/portraits/a.jpg");
        assert_eq!(portraits[0].url, "/media/gallery/portraits/a.jpg");
        assert_eq!(portraits[0].extension, ".jpg");
        assert_eq!(portraits[0].size, 1);

        let intro = &categories["home/intro"];
        assert_eq!(intro.len(), 1);
        assert_eq!(intro[0].kind, MediaKind::Video);
    }

    #[test]
    fn ensure_default_structure_creates_category_dirs() {
        let (dir, catalog) = catalog();
        catalog.ensure_default_structure().unwrap();
        assert!(dir.path().join("gallery/portraits").is_dir());
        assert!(dir.path().join("home/homepage_video").is_dir());
    }
}

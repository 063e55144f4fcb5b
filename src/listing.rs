//! Directory scanning: builds the [`ListingPage`] every renderer consumes.
//!
//! Nothing here is cached. Each listing request reads the directory afresh.

use std::cmp::Ordering;
use std::fs::Metadata;
use std::io;
use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::debug;

use crate::resolve;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One child of the listed directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryEntry {
    pub name: String,
    pub is_dir: bool,
    /// Human-readable size; `-` for directories.
    pub size: String,
    pub size_bytes: u64,
    pub modified: String,
    /// Decoded request path of the child, e.g. `/docs/a b.txt`.
    pub path: String,
    /// Percent-encoded link target; directories end in `/`.
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Crumb {
    pub name: String,
    pub url: String,
}

/// Everything a renderer needs for one directory.
#[derive(Debug, Clone, Serialize)]
pub struct ListingPage {
    /// Decoded directory path with a trailing `/`, e.g. `/docs/`.
    pub dir_path: String,
    pub entries: Vec<DirectoryEntry>,
    /// Decoded parent path; empty at the root.
    pub parent_dir: String,
    /// Encoded parent link; empty at the root.
    pub parent_url: String,
    pub breadcrumbs: Vec<Crumb>,
    pub summary: String,
    pub timestamp: String,
}

/// Human-readable byte count: `512 B`, `1.0 KB`, `3.4 MB`.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 6] = ["KB", "MB", "GB", "TB", "PB", "EB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

/// Directories first, then case-insensitive name order.
pub fn sort_entries(entries: &mut [DirectoryEntry]) {
    entries.sort_by(|a, b| match (a.is_dir, b.is_dir) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => a
            .name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name)),
    });
}

/// Scan `dir` (already resolved and confined to `root`) and build its listing.
///
/// `request_path` is the decoded URL path of the directory, e.g. `/docs`.
pub async fn read_listing(root: &Path, dir: &Path, request_path: &str) -> io::Result<ListingPage> {
    let segments = segments(request_path);
    let mut entries = Vec::new();

    let mut reader = tokio::fs::read_dir(dir).await?;
    while let Some(child) = reader.next_entry().await? {
        let name = child.file_name().to_string_lossy().into_owned();
        match child_metadata(root, &child.path()).await {
            Ok(meta) => entries.push(entry_for(&segments, name, &meta)),
            Err(e) => debug!(name = %name, error = %e, "skipping unreadable entry"),
        }
    }
    sort_entries(&mut entries);

    let (parent_dir, parent_url) = parent_of(&segments);
    Ok(ListingPage {
        dir_path: join_decoded(&segments, true),
        summary: summarize(&entries),
        entries,
        parent_dir,
        parent_url,
        breadcrumbs: breadcrumbs(&segments),
        timestamp: Local::now().format(TIME_FORMAT).to_string(),
    })
}

/// Metadata shown for one child. Symlinks whose target stays inside `root`
/// report the target; dangling or escaping ones report the link itself.
async fn child_metadata(root: &Path, path: &Path) -> io::Result<Metadata> {
    let own = tokio::fs::symlink_metadata(path).await?;
    if !own.file_type().is_symlink() {
        return Ok(own);
    }
    match resolve::confine(root, path).await {
        Ok(target) => tokio::fs::metadata(target).await.or(Ok(own)),
        Err(_) => Ok(own),
    }
}

fn entry_for(parent: &[&str], name: String, meta: &Metadata) -> DirectoryEntry {
    let is_dir = meta.is_dir();
    let size_bytes = if is_dir { 0 } else { meta.len() };

    let mut child: Vec<&str> = parent.to_vec();
    child.push(&name);
    let path = join_decoded(&child, false);
    let url = join_encoded(&child, is_dir);

    DirectoryEntry {
        size: if is_dir {
            "-".to_string()
        } else {
            format_size(size_bytes)
        },
        size_bytes,
        modified: meta.modified().map(format_time).unwrap_or_else(|_| "-".to_string()),
        is_dir,
        path,
        url,
        name,
    }
}

fn format_time(time: SystemTime) -> String {
    DateTime::<Local>::from(time).format(TIME_FORMAT).to_string()
}

fn segments(request_path: &str) -> Vec<&str> {
    request_path.split('/').filter(|s| !s.is_empty()).collect()
}

fn join_decoded(segments: &[&str], trailing_slash: bool) -> String {
    let mut out = String::from("/");
    out.push_str(&segments.join("/"));
    if trailing_slash && !segments.is_empty() {
        out.push('/');
    }
    out
}

fn join_encoded(segments: &[&str], trailing_slash: bool) -> String {
    let encoded: Vec<_> = segments.iter().map(|s| urlencoding::encode(s)).collect();
    let mut out = String::from("/");
    out.push_str(&encoded.join("/"));
    if trailing_slash && !segments.is_empty() {
        out.push('/');
    }
    out
}

fn parent_of(segments: &[&str]) -> (String, String) {
    match segments.split_last() {
        None => (String::new(), String::new()),
        Some((_, parent)) => (join_decoded(parent, true), join_encoded(parent, true)),
    }
}

fn breadcrumbs(segments: &[&str]) -> Vec<Crumb> {
    let mut crumbs = vec![Crumb {
        name: "/".to_string(),
        url: "/".to_string(),
    }];
    for depth in 1..=segments.len() {
        crumbs.push(Crumb {
            name: segments[depth - 1].to_string(),
            url: join_encoded(&segments[..depth], true),
        });
    }
    crumbs
}

fn summarize(entries: &[DirectoryEntry]) -> String {
    if entries.is_empty() {
        return "empty directory".to_string();
    }
    let dirs = entries.iter().filter(|e| e.is_dir).count();
    let files = entries.len() - dirs;
    let total: u64 = entries.iter().map(|e| e.size_bytes).sum();

    let mut parts = Vec::new();
    if dirs > 0 {
        parts.push(plural(dirs, "directory", "directories"));
    }
    if files > 0 {
        parts.push(plural(files, "file", "files"));
        if total > 0 {
            parts.push(format!("{} total", format_size(total)));
        }
    }
    parts.join(", ")
}

fn plural(n: usize, one: &str, many: &str) -> String {
    format!("{n} {}", if n == 1 { one } else { many })
}

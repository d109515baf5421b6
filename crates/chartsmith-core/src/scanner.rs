//! Chart discovery
//!
//! Walks a directory tree and returns every directory holding a `Chart.yaml`,
//! minus excluded paths, ordered so that nested charts come before the chart
//! that vendors them.
//!
//! The ordering is a path heuristic: `a/charts/sub` sorts after `a` in
//! ascending order, so sorting descending yields children first. Charts that
//! depend on siblings rather than nested directories are not ordered
//! correctly by this.

use glob::{MatchOptions, Pattern};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use crate::descriptor::is_descriptor_name;
use crate::error::{CoreError, Result};

/// Version-control and OS metadata that never contains charts worth building
pub const DEFAULT_EXCLUDES: &[&str] = &[
    "**/*~",
    "**/#*#",
    "**/.#*",
    "**/%*%",
    "**/._*",
    "**/CVS",
    "**/CVS/**",
    "**/.cvsignore",
    "**/RCS",
    "**/RCS/**",
    "**/SCCS",
    "**/SCCS/**",
    "**/.svn",
    "**/.svn/**",
    "**/.arch-ids",
    "**/.arch-ids/**",
    "**/.bzr",
    "**/.bzr/**",
    "**/_MTN",
    "**/_MTN/**",
    "**/.DS_Store",
    "**/.hg",
    "**/.hg/**",
    "**/.git",
    "**/.git/**",
];

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A directory containing exactly one chart descriptor
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChartDir(PathBuf);

impl ChartDir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    pub fn into_path(self) -> PathBuf {
        self.0
    }
}

impl AsRef<Path> for ChartDir {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for ChartDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Compiled exclude patterns: caller patterns followed by [`DEFAULT_EXCLUDES`]
#[derive(Debug, Clone)]
pub struct ExclusionSet {
    patterns: Vec<Pattern>,
}

impl ExclusionSet {
    /// Compile caller patterns together with the defaults
    pub fn new<S: AsRef<str>>(user_excludes: &[S]) -> Result<Self> {
        let patterns = user_excludes
            .iter()
            .map(AsRef::as_ref)
            .chain(DEFAULT_EXCLUDES.iter().copied())
            .map(|pattern| {
                Pattern::new(pattern).map_err(|source| CoreError::InvalidPattern {
                    pattern: pattern.to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { patterns })
    }

    /// Patterns in match order
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(Pattern::as_str)
    }

    /// Match a directory against every pattern
    ///
    /// Both the full path and the path relative to the scan root are tried,
    /// so `charts/legacy` and `**/charts/legacy` exclude the same directory.
    pub fn is_excluded(&self, path: &Path, root: &Path) -> bool {
        matches_any(self.patterns.iter(), path, root)
    }

    /// True when `dir` and everything below it is excluded
    ///
    /// Only patterns ending in `/**` qualify: once one of them matches a
    /// directory it matches every descendant too, so the walk can skip it.
    pub fn covers_subtree(&self, dir: &Path, root: &Path) -> bool {
        let subtree = self
            .patterns
            .iter()
            .filter(|pattern| pattern.as_str().ends_with("/**"));
        matches_any(subtree, dir, root)
    }
}

fn matches_any<'a>(
    mut patterns: impl Iterator<Item = &'a Pattern>,
    path: &Path,
    root: &Path,
) -> bool {
    let full = path.to_string_lossy();
    let relative = path
        .strip_prefix(root)
        .ok()
        .map(|p| p.to_string_lossy().into_owned())
        .filter(|p| !p.is_empty());

    patterns.any(|pattern| {
        pattern.matches_with(&full, MATCH_OPTIONS)
            || relative
                .as_deref()
                .is_some_and(|rel| pattern.matches_with(rel, MATCH_OPTIONS))
    })
}

/// Find chart directories below `root`
///
/// Symbolic links are followed. Directories whose whole subtree is excluded
/// are not descended into. Any error while walking aborts the scan and
/// nothing is returned. An empty result is not an error.
pub fn scan<S: AsRef<str>>(root: &Path, user_excludes: &[S]) -> Result<Vec<ChartDir>> {
    let excludes = ExclusionSet::new(user_excludes)?;

    let root = std::path::absolute(root).map_err(|e| CoreError::io(root, e))?;
    if !root.is_dir() {
        return Err(CoreError::RootNotFound { path: root });
    }

    let mut found: Vec<PathBuf> = Vec::new();

    let walker = WalkDir::new(&root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|entry| {
            let pruned = entry.depth() > 0
                && entry.file_type().is_dir()
                && excludes.covers_subtree(entry.path(), &root);
            if pruned {
                debug!(dir = %entry.path().display(), "excluded tree skipped");
            }
            !pruned
        });

    for entry in walker {
        let entry = entry.map_err(|source| CoreError::Scan {
            path: source
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| root.clone()),
            source,
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        let is_descriptor = entry.file_name().to_str().is_some_and(is_descriptor_name);
        if !is_descriptor {
            continue;
        }

        let Some(dir) = entry.path().parent() else {
            continue;
        };

        if excludes.is_excluded(dir, &root) {
            debug!(dir = %dir.display(), "chart directory excluded");
            continue;
        }

        found.push(dir.to_path_buf());
    }

    let mut keyed: Vec<(String, PathBuf)> = found
        .into_iter()
        .map(|p| (p.to_string_lossy().into_owned(), p))
        .collect();
    keyed.sort_by(|a, b| b.0.cmp(&a.0));
    keyed.dedup_by(|a, b| a.0 == b.0);

    debug!(root = %root.display(), count = keyed.len(), "chart scan complete");

    Ok(keyed.into_iter().map(|(_, p)| ChartDir(p)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CHART: &str = "apiVersion: v2\nname: test\nversion: 0.1.0\n";

    fn chart_at(root: &Path, rel: &str) -> PathBuf {
        let dir = root.join(rel);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("Chart.yaml"), CHART).unwrap();
        dir
    }

    fn rel_paths(root: &Path, dirs: &[ChartDir]) -> Vec<String> {
        let root = std::path::absolute(root).unwrap();
        dirs.iter()
            .map(|d| {
                d.path()
                    .strip_prefix(&root)
                    .unwrap()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect()
    }

    #[test]
    fn test_nested_charts_come_first() {
        let tmp = TempDir::new().unwrap();
        chart_at(tmp.path(), "a");
        chart_at(tmp.path(), "a/charts/sub");

        let dirs = scan::<&str>(tmp.path(), &[]).unwrap();
        assert_eq!(rel_paths(tmp.path(), &dirs), vec!["a/charts/sub", "a"]);
    }

    #[test]
    fn test_descending_order() {
        let tmp = TempDir::new().unwrap();
        chart_at(tmp.path(), "b");
        chart_at(tmp.path(), "a");
        chart_at(tmp.path(), "c");

        let dirs = scan::<&str>(tmp.path(), &[]).unwrap();
        assert_eq!(rel_paths(tmp.path(), &dirs), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_user_exclude() {
        let tmp = TempDir::new().unwrap();
        chart_at(tmp.path(), "a");
        chart_at(tmp.path(), "a/sub");
        chart_at(tmp.path(), "b");

        let dirs = scan(tmp.path(), &["**/a/sub"]).unwrap();
        assert_eq!(rel_paths(tmp.path(), &dirs), vec!["b", "a"]);
    }

    #[test]
    fn test_relative_exclude() {
        let tmp = TempDir::new().unwrap();
        chart_at(tmp.path(), "a");
        chart_at(tmp.path(), "a/sub");

        let dirs = scan(tmp.path(), &["a/sub"]).unwrap();
        assert_eq!(rel_paths(tmp.path(), &dirs), vec!["a"]);
    }

    #[test]
    fn test_single_star_stays_in_segment() {
        let tmp = TempDir::new().unwrap();
        chart_at(tmp.path(), "charts/one");
        chart_at(tmp.path(), "charts/one/nested");

        let dirs = scan(tmp.path(), &["charts/*"]).unwrap();
        assert_eq!(rel_paths(tmp.path(), &dirs), vec!["charts/one/nested"]);
    }

    #[test]
    fn test_default_excludes_vcs() {
        let tmp = TempDir::new().unwrap();
        chart_at(tmp.path(), "app");
        chart_at(tmp.path(), ".git/refs/chart");
        chart_at(tmp.path(), ".git");

        let dirs = scan::<&str>(tmp.path(), &[]).unwrap();
        assert_eq!(rel_paths(tmp.path(), &dirs), vec!["app"]);
    }

    #[test]
    fn test_covers_subtree_only_for_recursive_patterns() {
        let set = ExclusionSet::new(&["vendor/**", "charts/*"]).unwrap();
        let root = Path::new("/work");

        assert!(set.covers_subtree(Path::new("/work/vendor/pkg"), root));
        assert!(set.covers_subtree(Path::new("/work/app/.git/objects"), root));
        assert!(!set.covers_subtree(Path::new("/work/vendor"), root));
        assert!(!set.covers_subtree(Path::new("/work/charts/one"), root));
        assert!(set.is_excluded(Path::new("/work/charts/one"), root));
    }

    #[cfg(unix)]
    #[test]
    fn test_excluded_tree_is_not_walked() {
        let tmp = TempDir::new().unwrap();
        chart_at(tmp.path(), "app");
        chart_at(tmp.path(), "vendor");
        let pkg = tmp.path().join("vendor/pkg");
        std::fs::create_dir_all(&pkg).unwrap();
        // walking into this link would report a filesystem loop
        std::os::unix::fs::symlink(&pkg, pkg.join("loop")).unwrap();

        let err = scan::<&str>(tmp.path(), &[]).unwrap_err();
        assert!(err.is_scan_error());

        let dirs = scan(tmp.path(), &["vendor/**"]).unwrap();
        assert_eq!(rel_paths(tmp.path(), &dirs), vec!["vendor", "app"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_follows_symlinked_chart() {
        let tmp = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        chart_at(tmp.path(), "local");
        let target = chart_at(outside.path(), "shared");
        std::os::unix::fs::symlink(&target, tmp.path().join("linked")).unwrap();

        let dirs = scan::<&str>(tmp.path(), &[]).unwrap();
        assert_eq!(rel_paths(tmp.path(), &dirs), vec!["local", "linked"]);
    }

    #[test]
    fn test_case_insensitive_descriptor() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("lower");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("chart.yaml"), CHART).unwrap();

        let dirs = scan::<&str>(tmp.path(), &[]).unwrap();
        assert_eq!(rel_paths(tmp.path(), &dirs), vec!["lower"]);
    }

    #[test]
    fn test_empty_tree() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("docs")).unwrap();

        let dirs = scan::<&str>(tmp.path(), &[]).unwrap();
        assert!(dirs.is_empty());
    }

    #[test]
    fn test_missing_root() {
        let tmp = TempDir::new().unwrap();
        let err = scan::<&str>(&tmp.path().join("nope"), &[]).unwrap_err();
        assert!(err.is_scan_error());
        assert!(matches!(err, CoreError::RootNotFound { .. }));
    }

    #[test]
    fn test_invalid_pattern() {
        let tmp = TempDir::new().unwrap();
        let err = scan(tmp.path(), &["a/***"]).unwrap_err();
        assert!(matches!(err, CoreError::InvalidPattern { .. }));
    }

    #[test]
    fn test_exclusion_set_includes_defaults() {
        let set = ExclusionSet::new(&["custom/**"]).unwrap();
        let patterns: Vec<_> = set.patterns().collect();
        assert_eq!(patterns[0], "custom/**");
        assert!(patterns.contains(&"**/.git/**"));
    }
}

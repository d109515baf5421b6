//! Format-preserving dependency override
//!
//! Charts under development usually reference sibling charts through
//! `repository: file://../sibling`. Before packaging for a registry those
//! references have to point at the registry instead. Re-serializing Chart.yaml
//! would drop comments and reorder keys, so the file is patched line by line:
//! the descriptor is parsed for values only, then the raw lines are walked
//! with a small per-entry state machine and exactly two substrings are
//! replaced (repository and, when requested, version). Every other byte is
//! written back unchanged.

use std::io::ErrorKind;
use std::ops::Range;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::descriptor::{scalar_text, DependencyEntry, LoadedChart};
use crate::error::{CoreError, Result};

const DEPENDENCIES_TOKEN: &str = "dependencies:";
const NAME_TOKEN: &str = "name:";
const VERSION_TOKEN: &str = "version:";
const REPOSITORY_TOKEN: &str = "repository:";

/// Replacement coordinates for local dependencies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyOverride {
    /// Registry URI written in place of `file://...`
    pub repository: String,

    /// Version written for overridden entries; `None` keeps the existing one
    pub version: Option<String>,
}

impl DependencyOverride {
    pub fn new(repository: impl Into<String>, version: Option<String>) -> Self {
        Self {
            repository: repository.into(),
            version,
        }
    }

    /// Reject an override that would blank out repositories
    pub fn validate(&self) -> Result<()> {
        if self.repository.trim().is_empty() {
            return Err(CoreError::Configuration {
                message: "override repository must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// What a rewrite call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteOutcome {
    /// The directory has no Chart.yaml
    NoDescriptor,
    /// Chart.yaml declares no dependencies
    NoDependencies,
    /// No dependency uses a `file://` repository
    NoCandidates,
    /// The descriptor was patched
    Rewritten {
        /// Number of entries redirected to the registry
        candidates: usize,
        /// Whether a stale Chart.lock was deleted
        lock_removed: bool,
    },
}

/// Patch the chart's descriptor in place
pub fn rewrite(dir: &Path, ov: &DependencyOverride) -> Result<RewriteOutcome> {
    rewrite_inner(dir, ov, None)
}

/// Patch the chart's descriptor, writing the result to `output`
///
/// The original descriptor is left as is; the lock artifact is still removed
/// when the patch applies.
pub fn rewrite_to(dir: &Path, ov: &DependencyOverride, output: &Path) -> Result<RewriteOutcome> {
    rewrite_inner(dir, ov, Some(output))
}

fn rewrite_inner(
    dir: &Path,
    ov: &DependencyOverride,
    output: Option<&Path>,
) -> Result<RewriteOutcome> {
    ov.validate()?;

    let Some(chart) = LoadedChart::load(dir)? else {
        warn!(dir = %dir.display(), "no Chart.yaml found, skipping dependency override");
        return Ok(RewriteOutcome::NoDescriptor);
    };

    let dependencies = &chart.descriptor.dependencies;
    if dependencies.is_empty() {
        debug!(chart = %chart.descriptor.name, "no dependencies declared");
        return Ok(RewriteOutcome::NoDependencies);
    }

    let candidates = dependencies
        .iter()
        .filter(|d| d.is_override_candidate())
        .count();
    if candidates == 0 {
        debug!(chart = %chart.descriptor.name, "no local dependencies to override");
        return Ok(RewriteOutcome::NoCandidates);
    }

    let patched = patch_dependencies(&chart.content, dependencies, ov, &chart.descriptor_path)?;

    let target = output.unwrap_or(&chart.descriptor_path);
    std::fs::write(target, patched).map_err(|e| CoreError::io(target, e))?;

    let lock_removed = remove_lock(&chart);

    info!(
        chart = %chart.descriptor.name,
        candidates,
        repository = %ov.repository,
        path = %target.display(),
        "overrode local dependencies"
    );

    Ok(RewriteOutcome::Rewritten {
        candidates,
        lock_removed,
    })
}

/// Best-effort removal of Chart.lock; failures are logged, not returned
fn remove_lock(chart: &LoadedChart) -> bool {
    let lock = chart.lock_path();
    match std::fs::remove_file(&lock) {
        Ok(()) => {
            debug!(path = %lock.display(), "removed stale lock file");
            true
        }
        Err(e) if e.kind() == ErrorKind::NotFound => false,
        Err(e) => {
            warn!(path = %lock.display(), error = %e, "failed to remove stale lock file");
            false
        }
    }
}

/// Per-entry progress through the raw lines
#[derive(Debug, Clone, Copy)]
struct EntryProgress {
    name: bool,
    version: bool,
    repository: bool,
}

impl EntryProgress {
    /// Fields absent from the parsed entry never show up as lines, so they
    /// count as seen from the start.
    fn for_entry(entry: &DependencyEntry) -> Self {
        Self {
            name: false,
            version: entry.version.is_none(),
            repository: entry.repository.is_none(),
        }
    }

    fn complete(&self) -> bool {
        self.name && self.version && self.repository
    }
}

#[derive(Debug, Clone, Copy)]
enum State {
    Outside,
    Inside { cursor: usize, progress: EntryProgress },
    Done,
}

/// Rewrite repository/version values of local entries in raw content
///
/// `dependencies` must be the entries parsed from `content`, in file order;
/// `path` is only used for error reporting. Line endings are preserved
/// exactly. A candidate whose value cannot be located on its line fails the
/// whole patch, so a partial rewrite is never produced.
pub fn patch_dependencies(
    content: &str,
    dependencies: &[DependencyEntry],
    ov: &DependencyOverride,
    path: &Path,
) -> Result<String> {
    let mut out = String::with_capacity(content.len() + 64);
    let mut state = State::Outside;

    for line in content.split_inclusive('\n') {
        match state {
            State::Outside => {
                if line.contains(DEPENDENCIES_TOKEN) {
                    state = match dependencies.first() {
                        Some(first) => State::Inside {
                            cursor: 0,
                            progress: EntryProgress::for_entry(first),
                        },
                        None => State::Done,
                    };
                }
                out.push_str(line);
            }
            State::Done => out.push_str(line),
            State::Inside {
                cursor,
                mut progress,
            } => {
                let entry = &dependencies[cursor];
                let candidate = entry.is_override_candidate();
                let mut patched: Option<String> = None;

                let fail = |field: &'static str, reason: &str| CoreError::Patch {
                    path: path.to_path_buf(),
                    dependency: entry.name.clone(),
                    field,
                    reason: reason.to_string(),
                };

                if line.contains(NAME_TOKEN) {
                    progress.name = true;
                }

                if line.contains(VERSION_TOKEN) {
                    progress.version = true;
                    if let (true, Some(new), Some(old)) =
                        (candidate, ov.version.as_deref(), entry.version.as_deref())
                    {
                        let p = replace_value(line, VERSION_TOKEN, old, new)
                            .map_err(|reason| fail("version", reason))?;
                        patched = Some(p);
                    }
                }

                if line.contains(REPOSITORY_TOKEN) {
                    progress.repository = true;
                    if let (true, Some(old)) = (candidate, entry.repository.as_deref()) {
                        let current = patched.as_deref().unwrap_or(line);
                        let p = replace_value(current, REPOSITORY_TOKEN, old, &ov.repository)
                            .map_err(|reason| fail("repository", reason))?;
                        patched = Some(p);
                    }
                }

                out.push_str(patched.as_deref().unwrap_or(line));

                state = if progress.complete() {
                    let next = cursor + 1;
                    match dependencies.get(next) {
                        Some(entry) => State::Inside {
                            cursor: next,
                            progress: EntryProgress::for_entry(entry),
                        },
                        None => State::Done,
                    }
                } else {
                    State::Inside { cursor, progress }
                };
            }
        }
    }

    Ok(out)
}

/// Replace the scalar written after `token` with `new`
///
/// The raw text on the line is replaced, not a re-rendering of the parsed
/// value: unquoted `1.10` parses as the number `1.1`. The raw text must still
/// denote `expected`, otherwise the line is not the one the parser read.
/// Quotes, trailing comments and the line ending are kept.
fn replace_value(
    line: &str,
    token: &str,
    expected: &str,
    new: &str,
) -> std::result::Result<String, &'static str> {
    let span = value_span(line, token).ok_or("no value after the key")?;
    let raw = &line[span.range.clone()];

    let denotes_expected = if span.quoted {
        raw == expected
    } else {
        serde_yaml::from_str::<serde_yaml::Value>(raw)
            .ok()
            .and_then(|v| scalar_text(&v))
            .is_some_and(|text| text == expected)
    };
    if !denotes_expected {
        return Err("value on the line does not match the parsed descriptor");
    }

    let mut patched = String::with_capacity(line.len() + new.len());
    patched.push_str(&line[..span.range.start]);
    patched.push_str(new);
    patched.push_str(&line[span.range.end..]);
    Ok(patched)
}

/// Location of a scalar value on a line, quotes excluded
#[derive(Debug, PartialEq, Eq)]
struct ValueSpan {
    range: Range<usize>,
    quoted: bool,
}

/// Find the scalar following the first `token` on `line`
fn value_span(line: &str, token: &str) -> Option<ValueSpan> {
    let after = line.find(token)? + token.len();
    let rest = &line[after..];
    let start = after + rest.len() - rest.trim_start_matches([' ', '\t']).len();
    let value = &line[start..];

    match value.chars().next()? {
        quote @ ('"' | '\'') => {
            let len = value[1..].find(quote)?;
            Some(ValueSpan {
                range: start + 1..start + 1 + len,
                quoted: true,
            })
        }
        '#' | '\r' | '\n' => None,
        _ => {
            let body = &value[..value.find(['\r', '\n']).unwrap_or(value.len())];
            // `#` opens a comment only after whitespace
            let end = body
                .char_indices()
                .find(|&(i, c)| c == '#' && body[..i].ends_with(|p: char| p == ' ' || p == '\t'))
                .map_or(body.len(), |(i, _)| i);
            let len = body[..end].trim_end_matches([' ', '\t']).len();
            Some(ValueSpan {
                range: start..start + len,
                quoted: false,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::ChartDescriptor;
    use tempfile::TempDir;

    const REGISTRY: &str = "oci://registry.example.com/charts";

    const MIXED: &str = r#"# Umbrella chart
apiVersion: v2
name: umbrella
version: 1.0.0

dependencies:
  # shared helpers
  - name: common
    version: 0.1.0   # pinned
    repository: "file://../common"
  - name: redis
    version: ^17.0.0
    repository: https://charts.bitnami.com/bitnami

  - name: api
    repository: file://charts/api
    version: 2.3.4
    condition: api.enabled
appVersion: "1.16.0"
"#;

    fn write_chart(content: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("Chart.yaml"), content).unwrap();
        dir
    }

    fn read_chart(dir: &TempDir) -> String {
        std::fs::read_to_string(dir.path().join("Chart.yaml")).unwrap()
    }

    fn patch(content: &str, ov: &DependencyOverride) -> String {
        patch_dependencies(content, &deps(content), ov, Path::new("Chart.yaml")).unwrap()
    }

    fn deps(content: &str) -> Vec<DependencyEntry> {
        ChartDescriptor::parse(content, Path::new("Chart.yaml"))
            .unwrap()
            .dependencies
    }

    #[test]
    fn test_patch_repository_only() {
        let ov = DependencyOverride::new(REGISTRY, None);
        let patched = patch(MIXED, &ov);

        let expected = MIXED
            .replace("\"file://../common\"", &format!("\"{REGISTRY}\""))
            .replace("file://charts/api", REGISTRY);
        assert_eq!(patched, expected);
    }

    #[test]
    fn test_patch_repository_and_version() {
        let ov = DependencyOverride::new(REGISTRY, Some("9.9.9".to_string()));
        let patched = patch(MIXED, &ov);

        assert!(patched.contains("    version: 9.9.9   # pinned\n"));
        assert!(patched.contains("    version: ^17.0.0\n"));
        assert!(patched.contains("    repository: https://charts.bitnami.com/bitnami\n"));
        assert!(patched.contains(&format!("    repository: {REGISTRY}\n")));
        assert!(patched.contains("    version: 9.9.9\n    condition: api.enabled\n"));
        // top-level fields are outside the dependency block
        assert!(patched.contains("\nversion: 1.0.0\n"));
        assert!(patched.ends_with("appVersion: \"1.16.0\"\n"));
    }

    #[test]
    fn test_non_candidate_block_untouched() {
        let ov = DependencyOverride::new(REGISTRY, Some("9.9.9".to_string()));
        let patched = patch(MIXED, &ov);

        let block = "  - name: redis\n    version: ^17.0.0\n    repository: https://charts.bitnami.com/bitnami\n\n";
        assert!(MIXED.contains(block));
        assert!(patched.contains(block));
        assert_eq!(patched.lines().count(), MIXED.lines().count());
    }

    #[test]
    fn test_missing_repository_does_not_stall() {
        let content = "apiVersion: v2\nname: app\nversion: 0.1.0\ndependencies:\n  - name: bundled\n    version: 1.0.0\n  - name: local\n    version: 1.0.0\n    repository: file://../local\n";
        let ov = DependencyOverride::new(REGISTRY, None);
        let patched = patch(content, &ov);

        assert_eq!(
            patched,
            content.replace("file://../local", REGISTRY)
        );
    }

    #[test]
    fn test_field_order_within_entry() {
        let content = "apiVersion: v2\nname: app\nversion: 0.1.0\ndependencies:\n- repository: file://../a\n  version: 1.0.0\n  name: a\n";
        let ov = DependencyOverride::new(REGISTRY, Some("2.0.0".to_string()));
        let patched = patch(content, &ov);

        assert_eq!(
            patched,
            "apiVersion: v2\nname: app\nversion: 0.1.0\ndependencies:\n- repository: oci://registry.example.com/charts\n  version: 2.0.0\n  name: a\n"
        );
    }

    #[test]
    fn test_crlf_preserved() {
        let content = "apiVersion: v2\r\nname: app\r\nversion: 0.1.0\r\ndependencies:\r\n  - name: a\r\n    version: 1.0.0\r\n    repository: file://../a\r\n";
        let ov = DependencyOverride::new(REGISTRY, None);
        let patched = patch(content, &ov);

        assert_eq!(patched, content.replace("file://../a", REGISTRY));
    }

    #[test]
    fn test_value_span_plain_quoted_and_commented() {
        let line = "    version: 1.0.0   # pinned\n";
        let span = value_span(line, VERSION_TOKEN).unwrap();
        assert_eq!(&line[span.range], "1.0.0");
        assert!(!span.quoted);

        let line = "    repository: \"file://../a#b\" # local\r\n";
        let span = value_span(line, REPOSITORY_TOKEN).unwrap();
        assert_eq!(&line[span.range], "file://../a#b");
        assert!(span.quoted);

        assert!(value_span("    version:\n", VERSION_TOKEN).is_none());
        assert!(value_span("    version: # todo\n", VERSION_TOKEN).is_none());
    }

    #[test]
    fn test_replace_value_keeps_comment() {
        assert_eq!(
            replace_value("  version: 1.0.0 # 1.0.0\n", VERSION_TOKEN, "1.0.0", "2.0.0").as_deref(),
            Ok("  version: 2.0.0 # 1.0.0\n")
        );
        assert!(replace_value("  version: 1.0.0\n", VERSION_TOKEN, "3.0.0", "2.0.0").is_err());
    }

    #[test]
    fn test_numeric_looking_versions_replaced_whole() {
        for raw in ["1.10", "1.0e0", "'1.10'"] {
            let content = format!(
                "apiVersion: v2\nname: app\nversion: 0.1.0\ndependencies:\n  - name: a\n    version: {raw}\n    repository: file://../a\n"
            );
            let ov = DependencyOverride::new(REGISTRY, Some("2.0.0".to_string()));
            let patched = patch(&content, &ov);

            let expected_line = if raw.starts_with('\'') {
                "    version: '2.0.0'\n"
            } else {
                "    version: 2.0.0\n"
            };
            assert!(patched.contains(expected_line), "{raw}: {patched}");

            let reparsed = ChartDescriptor::parse(&patched, Path::new("Chart.yaml")).unwrap();
            assert_eq!(reparsed.dependencies[0].version.as_deref(), Some("2.0.0"));
        }
    }

    #[test]
    fn test_unlocatable_value_fails_without_writing() {
        // flow-style entries put several keys on one line
        let content = "apiVersion: v2\nname: app\nversion: 0.1.0\ndependencies:\n  - {name: a, version: 1.0.0, repository: file://../a}\n";
        let dir = write_chart(content);
        std::fs::write(dir.path().join("Chart.lock"), "lock").unwrap();

        let ov = DependencyOverride::new(REGISTRY, Some("2.0.0".to_string()));
        let err = rewrite(dir.path(), &ov).unwrap_err();

        assert!(matches!(err, CoreError::Patch { field: "version", .. }));
        assert_eq!(read_chart(&dir), content);
        assert!(dir.path().join("Chart.lock").exists());
    }

    #[test]
    fn test_rewrite_in_place_removes_lock() {
        let dir = write_chart(MIXED);
        std::fs::write(dir.path().join("Chart.lock"), "dependencies: []\n").unwrap();

        let ov = DependencyOverride::new(REGISTRY, None);
        let outcome = rewrite(dir.path(), &ov).unwrap();

        assert_eq!(
            outcome,
            RewriteOutcome::Rewritten {
                candidates: 2,
                lock_removed: true
            }
        );
        assert!(!dir.path().join("Chart.lock").exists());
        assert!(!read_chart(&dir).contains("file://"));
        assert!(read_chart(&dir).contains("# shared helpers"));
    }

    #[test]
    fn test_rewrite_without_lock() {
        let dir = write_chart(MIXED);
        let ov = DependencyOverride::new(REGISTRY, None);

        let outcome = rewrite(dir.path(), &ov).unwrap();
        assert_eq!(
            outcome,
            RewriteOutcome::Rewritten {
                candidates: 2,
                lock_removed: false
            }
        );
    }

    #[test]
    fn test_no_candidates_is_noop() {
        let content = "apiVersion: v2\nname: app\nversion: 0.1.0\ndependencies:\n  # remote only\n  - name: redis\n    version: 17.0.0\n    repository: https://charts.bitnami.com/bitnami\n";
        let dir = write_chart(content);
        std::fs::write(dir.path().join("Chart.lock"), "lock").unwrap();

        let ov = DependencyOverride::new(REGISTRY, Some("1.0.0".to_string()));
        let outcome = rewrite(dir.path(), &ov).unwrap();

        assert_eq!(outcome, RewriteOutcome::NoCandidates);
        assert_eq!(read_chart(&dir), content);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("Chart.lock")).unwrap(),
            "lock"
        );
    }

    #[test]
    fn test_no_dependencies_is_noop() {
        let content = "apiVersion: v2\nname: app\nversion: 0.1.0\n";
        let dir = write_chart(content);

        let ov = DependencyOverride::new(REGISTRY, None);
        assert_eq!(rewrite(dir.path(), &ov).unwrap(), RewriteOutcome::NoDependencies);
        assert_eq!(read_chart(&dir), content);
    }

    #[test]
    fn test_missing_descriptor_is_noop() {
        let dir = TempDir::new().unwrap();
        let ov = DependencyOverride::new(REGISTRY, None);
        assert_eq!(rewrite(dir.path(), &ov).unwrap(), RewriteOutcome::NoDescriptor);
    }

    #[test]
    fn test_empty_repository_rejected_before_io() {
        let dir = write_chart(MIXED);
        std::fs::write(dir.path().join("Chart.lock"), "lock").unwrap();

        let ov = DependencyOverride::new("  ", None);
        let err = rewrite(dir.path(), &ov).unwrap_err();

        assert!(matches!(err, CoreError::Configuration { .. }));
        assert!(dir.path().join("Chart.lock").exists());
        assert_eq!(read_chart(&dir), MIXED);
    }

    #[test]
    fn test_unparsable_descriptor_fails() {
        let dir = write_chart("apiVersion: v2\nname: [broken\n");
        let ov = DependencyOverride::new(REGISTRY, None);
        let err = rewrite(dir.path(), &ov).unwrap_err();
        assert!(matches!(err, CoreError::DescriptorParse { .. }));
    }

    #[test]
    fn test_rewrite_to_alternate_output() {
        let dir = write_chart(MIXED);
        let out = dir.path().join("patched.yaml");
        let ov = DependencyOverride::new(REGISTRY, Some("3.0.0".to_string()));

        rewrite_to(dir.path(), &ov, &out).unwrap();

        assert_eq!(read_chart(&dir), MIXED);
        let patched = std::fs::read_to_string(&out).unwrap();
        let reparsed = ChartDescriptor::parse(&patched, &out).unwrap();
        assert_eq!(reparsed.dependencies[0].repository.as_deref(), Some(REGISTRY));
        assert_eq!(reparsed.dependencies[0].version.as_deref(), Some("3.0.0"));
        assert_eq!(reparsed.dependencies[2].repository.as_deref(), Some(REGISTRY));
        assert_eq!(reparsed.dependencies[2].version.as_deref(), Some("3.0.0"));
        assert_eq!(reparsed.dependencies[1].version.as_deref(), Some("^17.0.0"));
    }

    #[test]
    fn test_write_failure_surfaces() {
        let dir = write_chart(MIXED);
        let out = dir.path().join("missing").join("Chart.yaml");
        let ov = DependencyOverride::new(REGISTRY, None);

        let err = rewrite_to(dir.path(), &ov, &out).unwrap_err();
        assert!(matches!(err, CoreError::Io { .. }));
    }
}

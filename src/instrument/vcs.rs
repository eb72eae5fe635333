//! A small read-only table of known VCS hosting prefixes, used by
//! [`super::package::discover`] when no positional import path is given and
//! the root package must be guessed by walking up from the working
//! directory (`original_source/instrument/vcs.go`'s `vcsPaths` table,
//! trimmed to the hosts worth recognizing without a network round-trip).

/// Hostnames whose import paths are conventionally `host/org/repo/...`
/// rather than a single path segment — used only to decide how many path
/// segments form a "project root" when guessing `base_import_path`.
pub const KNOWN_HOSTS: &[&str] = &[
    "github.com",
    "gitlab.com",
    "bitbucket.org",
    "golang.org",
    "google.golang.org",
    "gopkg.in",
];

/// Given an import path, returns the path prefix that should be treated as
/// "the project root" for relevance-prefix comparisons (spec.md §4.5 item 2):
/// for a recognized host, `host/org/repo`; otherwise the first path segment.
pub fn project_root_prefix(import_path: &str) -> &str {
    let segments: Vec<&str> = import_path.split('/').collect();
    if let Some(host) = segments.first() {
        if KNOWN_HOSTS.contains(host) && segments.len() >= 3 {
            let end = segments[..3].iter().map(|s| s.len()).sum::<usize>() + 2;
            return &import_path[..end.min(import_path.len())];
        }
    }
    segments.first().copied().unwrap_or(import_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognized_host_keeps_three_segments() {
        assert_eq!(project_root_prefix("github.com/foo/bar/sub/pkg"), "github.com/foo/bar");
    }

    #[test]
    fn unrecognized_host_falls_back_to_first_segment() {
        assert_eq!(project_root_prefix("example.com/foo/bar"), "example.com");
    }
}

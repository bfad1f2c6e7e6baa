//! Gitignore-style pattern matching for tree walks
//!
//! A matcher is compiled fresh from the repository's pattern list whenever
//! that list changes; it is never persisted. Later patterns override earlier
//! ones, `!` un-ignores, a trailing `/` restricts a pattern to directories,
//! and a directory match excludes the whole subtree.
//!
//! Two implicit exclusions are always appended: the local history directory
//! and the config file itself. They are never eligible for tracking or
//! deletion, whatever the repository's own patterns say.

use crate::areas::config::CONFIG_FILE_NAME;
use crate::areas::history::HISTORY_DIR;

#[derive(Debug)]
pub struct IgnoreMatcher {
    patterns: Vec<Pattern>,
}

#[derive(Debug)]
struct Pattern {
    negated: bool,
    dir_only: bool,
    anchored: bool,
    segments: Vec<String>,
}

impl IgnoreMatcher {
    /// Compile a pattern list. Blank lines and `#` comments are skipped.
    pub fn new<S: AsRef<str>>(lines: &[S]) -> Self {
        let mut patterns = lines
            .iter()
            .filter_map(|line| Pattern::parse(line.as_ref()))
            .collect::<Vec<_>>();

        // implicit exclusions, appended last so nothing can un-ignore them
        patterns.push(Pattern::parse(&format!("/{HISTORY_DIR}/")).unwrap_or_else(|| {
            unreachable!("history dir pattern is never blank")
        }));
        patterns.push(Pattern::parse(&format!("/{CONFIG_FILE_NAME}")).unwrap_or_else(|| {
            unreachable!("config file pattern is never blank")
        }));

        IgnoreMatcher { patterns }
    }

    /// Whether the path, given as repo-relative segments, is excluded.
    ///
    /// Patterns are consulted in reverse so that later lines take precedence;
    /// the first pattern that matches the path or one of its ancestor
    /// directories decides.
    pub fn matches(&self, path: &[&str], is_dir: bool) -> bool {
        for pattern in self.patterns.iter().rev() {
            if pattern.matches(path, is_dir) {
                return !pattern.negated;
            }
        }
        false
    }
}

impl Pattern {
    fn parse(line: &str) -> Option<Self> {
        let mut line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }

        let negated = line.starts_with('!');
        if negated {
            line = &line[1..];
        }

        let dir_only = line.ends_with('/');
        if dir_only {
            line = &line[..line.len() - 1];
        }

        // a separator anywhere in the body anchors the pattern to the root
        let anchored = line.contains('/');
        let segments = line
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect::<Vec<_>>();
        if segments.is_empty() {
            return None;
        }

        Some(Pattern {
            negated,
            dir_only,
            anchored,
            segments,
        })
    }

    /// A path matches if the pattern matches it directly or matches any of
    /// its ancestor directories (an ignored directory ignores its contents).
    fn matches(&self, path: &[&str], is_dir: bool) -> bool {
        for end in 1..=path.len() {
            let prefix_is_dir = end < path.len() || is_dir;
            if self.matches_exact(&path[..end], prefix_is_dir) {
                return true;
            }
        }
        false
    }

    fn matches_exact(&self, path: &[&str], is_dir: bool) -> bool {
        if self.dir_only && !is_dir {
            return false;
        }
        if self.anchored {
            match_segments(&self.segments, path)
        } else {
            // unanchored patterns are single globs matched against the basename
            path.last()
                .is_some_and(|name| match_glob(&self.segments[0], name))
        }
    }
}

fn match_segments(pattern: &[String], path: &[&str]) -> bool {
    match pattern.first() {
        None => path.is_empty(),
        Some(p) if p == "**" => {
            // `**` spans zero or more directories
            if match_segments(&pattern[1..], path) {
                return true;
            }
            !path.is_empty() && match_segments(pattern, &path[1..])
        }
        Some(p) => path
            .first()
            .is_some_and(|s| match_glob(p, s) && match_segments(&pattern[1..], &path[1..])),
    }
}

/// Single-segment glob: `*` and `?` never cross a separator, `[...]`
/// matches a character class (leading `!` negates it).
fn match_glob(pattern: &str, name: &str) -> bool {
    let pattern = pattern.chars().collect::<Vec<_>>();
    let name = name.chars().collect::<Vec<_>>();
    match_glob_chars(&pattern, &name)
}

fn match_glob_chars(pattern: &[char], name: &[char]) -> bool {
    match pattern.first() {
        None => name.is_empty(),
        Some('*') => {
            (0..=name.len()).any(|skip| match_glob_chars(&pattern[1..], &name[skip..]))
        }
        Some('?') => !name.is_empty() && match_glob_chars(&pattern[1..], &name[1..]),
        Some('[') => match_class(pattern, name),
        Some(c) => name.first() == Some(c) && match_glob_chars(&pattern[1..], &name[1..]),
    }
}

fn match_class(pattern: &[char], name: &[char]) -> bool {
    let Some(close) = pattern.iter().position(|&c| c == ']').filter(|&i| i > 1) else {
        // malformed class, treat '[' as a literal
        return name.first() == Some(&'[') && match_glob_chars(&pattern[1..], &name[1..]);
    };
    let Some(&candidate) = name.first() else {
        return false;
    };

    let mut class = &pattern[1..close];
    let negated = class.first() == Some(&'!');
    if negated {
        class = &class[1..];
    }

    let mut hit = false;
    let mut i = 0;
    while i < class.len() {
        if i + 2 < class.len() && class[i + 1] == '-' {
            if class[i] <= candidate && candidate <= class[i + 2] {
                hit = true;
            }
            i += 3;
        } else {
            if class[i] == candidate {
                hit = true;
            }
            i += 1;
        }
    }

    hit != negated && match_glob_chars(&pattern[close + 1..], &name[1..])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(lines: &[&str]) -> IgnoreMatcher {
        IgnoreMatcher::new(lines)
    }

    #[test]
    fn negation_overrides_earlier_patterns() {
        let m = matcher(&["*.tmp", "!keep.tmp"]);

        assert!(m.matches(&["a.tmp"], false));
        assert!(!m.matches(&["keep.tmp"], false));
        assert!(!m.matches(&["b.txt"], false));
    }

    #[test]
    fn blank_lines_and_comments_are_skipped() {
        let m = matcher(&["", "   ", "# a comment", "*.log"]);

        assert!(m.matches(&["debug.log"], false));
        assert!(!m.matches(&["# a comment"], false));
    }

    #[test]
    fn directory_pattern_ignores_contents() {
        let m = matcher(&["target/"]);

        assert!(m.matches(&["target"], true));
        assert!(m.matches(&["target", "debug", "app"], false));
        // dir-only patterns never match plain files
        assert!(!m.matches(&["target"], false));
    }

    #[test]
    fn anchored_pattern_only_matches_at_root() {
        let m = matcher(&["/build"]);

        assert!(m.matches(&["build"], false));
        assert!(!m.matches(&["src", "build"], false));
    }

    #[test]
    fn unanchored_basename_matches_at_any_depth() {
        let m = matcher(&[".DS_Store"]);

        assert!(m.matches(&[".DS_Store"], false));
        assert!(m.matches(&["deep", "nested", ".DS_Store"], false));
    }

    #[test]
    fn double_star_spans_directories() {
        let m = matcher(&["docs/**/draft.md"]);

        assert!(m.matches(&["docs", "draft.md"], false));
        assert!(m.matches(&["docs", "a", "b", "draft.md"], false));
        assert!(!m.matches(&["docs", "final.md"], false));
    }

    #[test]
    fn character_classes_match_single_characters() {
        let m = matcher(&["file[0-9].txt"]);

        assert!(m.matches(&["file3.txt"], false));
        assert!(!m.matches(&["filex.txt"], false));
    }

    #[test]
    fn metadata_dir_and_config_are_always_excluded() {
        // even an aggressive un-ignore cannot expose them
        let m = matcher(&["!.quill", "!.quill.toml"]);

        assert!(m.matches(&[HISTORY_DIR], true));
        assert!(m.matches(&[HISTORY_DIR, "1a2b.json"], false));
        assert!(m.matches(&[CONFIG_FILE_NAME], false));
    }
}

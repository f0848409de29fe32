//! Shell-style pattern matching for remote paths
//!
//! Syntax:
//! - `*` matches any run of characters other than `/`
//! - `?` matches one character other than `/`
//! - `[abc]`, `[a-z]`, `[^a-z]` match one character from (or not from) a class
//! - `\c` matches `c` literally
//!
//! Malformed patterns are reported up front with [`Error::BadPattern`], before
//! any remote directory is listed.

use crate::error::{Error, Result};

const SEPARATOR: char = '/';

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Literal(char),
    AnyChar,
    AnyRun,
    Class {
        negated: bool,
        ranges: Vec<(char, char)>,
    },
}

impl Token {
    fn matches_char(&self, c: char) -> bool {
        match self {
            Token::Literal(l) => *l == c,
            Token::AnyChar => c != SEPARATOR,
            // runs are expanded by `match_tokens`
            Token::AnyRun => false,
            Token::Class { negated, ranges } => {
                if c == SEPARATOR {
                    return false;
                }
                let hit = ranges.iter().any(|(lo, hi)| *lo <= c && c <= *hi);
                hit != *negated
            }
        }
    }
}

/// A compiled pattern for one path or path component
#[derive(Debug, Clone)]
pub struct Pattern {
    tokens: Vec<Token>,
}

impl Pattern {
    pub fn new(pattern: &str) -> Result<Self> {
        let bad = || Error::BadPattern(pattern.to_string());
        let mut tokens = Vec::new();
        let mut chars = pattern.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '*' => {
                    // consecutive stars behave like one
                    if tokens.last() != Some(&Token::AnyRun) {
                        tokens.push(Token::AnyRun);
                    }
                }
                '?' => tokens.push(Token::AnyChar),
                '\\' => tokens.push(Token::Literal(chars.next().ok_or_else(bad)?)),
                '[' => {
                    let negated = chars.next_if(|c| *c == '^' || *c == '!').is_some();
                    let mut ranges = Vec::new();
                    loop {
                        let lo = match chars.next().ok_or_else(bad)? {
                            ']' if !ranges.is_empty() => break,
                            ']' | '-' => return Err(bad()),
                            '\\' => chars.next().ok_or_else(bad)?,
                            c => c,
                        };
                        let hi = if chars.next_if_eq(&'-').is_some() {
                            match chars.next().ok_or_else(bad)? {
                                ']' | '-' => return Err(bad()),
                                '\\' => chars.next().ok_or_else(bad)?,
                                c => c,
                            }
                        } else {
                            lo
                        };
                        if hi < lo {
                            return Err(bad());
                        }
                        ranges.push((lo, hi));
                    }
                    tokens.push(Token::Class { negated, ranges });
                }
                c => tokens.push(Token::Literal(c)),
            }
        }

        Ok(Self { tokens })
    }

    pub fn matches(&self, name: &str) -> bool {
        let name: Vec<char> = name.chars().collect();
        match_tokens(&self.tokens, &name)
    }
}

fn match_tokens(tokens: &[Token], name: &[char]) -> bool {
    match tokens.split_first() {
        None => name.is_empty(),
        Some((Token::AnyRun, rest)) => {
            for skip in 0..=name.len() {
                if match_tokens(rest, &name[skip..]) {
                    return true;
                }
                if name.get(skip) == Some(&SEPARATOR) {
                    break;
                }
            }
            false
        }
        Some((token, rest)) => match name.split_first() {
            Some((c, tail)) if token.matches_char(*c) => match_tokens(rest, tail),
            _ => false,
        },
    }
}

/// Whether `path` contains any pattern syntax at all
pub fn has_meta(path: &str) -> bool {
    path.contains(['*', '?', '[', '\\'])
}

/// Split a pattern at its last separator into directory and file parts.
///
/// The directory is `"."` when the pattern has no separator and `"/"` for
/// entries directly under the root.
pub fn split(pattern: &str) -> (&str, &str) {
    match pattern.rfind(SEPARATOR) {
        Some(0) => ("/", &pattern[1..]),
        Some(i) => (&pattern[..i], &pattern[i + 1..]),
        None => (".", pattern),
    }
}

/// Join a listed directory and an entry name back into a match
pub fn join(dir: &str, name: &str) -> String {
    match dir {
        "." => name.to_string(),
        "/" => format!("/{}", name),
        dir => format!("{}/{}", dir, name),
    }
}

/// Match a flat directory listing against `pattern`.
///
/// `names` are entries of the pattern's directory part, in listing order.
/// Servers that answer with full paths are handled by taking the last path
/// component of each entry.
pub fn filter_listing<I, S>(pattern: &str, names: I) -> Result<Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let (dir, file) = split(pattern);
    let file_pattern = Pattern::new(file)?;

    Ok(names
        .into_iter()
        .filter_map(|entry| {
            let entry = entry.as_ref();
            let name = entry.rsplit(SEPARATOR).next().unwrap_or(entry);
            (!matches!(name, "" | "." | "..") && file_pattern.matches(name))
                .then(|| join(dir, name))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(pattern: &str, name: &str) -> bool {
        Pattern::new(pattern).unwrap().matches(name)
    }

    #[test]
    fn star_stops_at_separator() {
        assert!(matches("*.txt", "a.txt"));
        assert!(matches("*", ""));
        assert!(!matches("*.txt", "dir/a.txt"));
        assert!(matches("*/a.txt", "dir/a.txt"));
        assert!(matches("a*b*c", "aXXbYYc"));
        assert!(!matches("a*b", "a/b"));
    }

    #[test]
    fn question_mark_matches_one_char() {
        assert!(matches("?.log", "a.log"));
        assert!(!matches("?.log", "ab.log"));
        assert!(!matches("a?b", "a/b"));
    }

    #[test]
    fn character_classes() {
        assert!(matches("[abc].txt", "b.txt"));
        assert!(!matches("[abc].txt", "d.txt"));
        assert!(matches("[a-c]1", "c1"));
        assert!(matches("[^a-c]1", "d1"));
        assert!(!matches("[^a-c]1", "a1"));
        assert!(matches("[!x]", "y"));
        assert!(matches("[\\]]", "]"));
        assert!(!matches("[^x]", "/"));
    }

    #[test]
    fn escapes_are_literal() {
        assert!(matches("a\\*b", "a*b"));
        assert!(!matches("a\\*b", "aXb"));
    }

    #[test]
    fn malformed_patterns_are_rejected() {
        for pattern in ["[", "dir/[a-", "[]", "[a", "\\", "[z-a]", "[-a]", "a[b-]"] {
            assert!(
                matches!(Pattern::new(pattern), Err(Error::BadPattern(_))),
                "pattern {:?} should be rejected",
                pattern
            );
        }
    }

    #[test]
    fn meta_detection() {
        assert!(has_meta("/etc/*.conf"));
        assert!(has_meta("file[0-9]"));
        assert!(!has_meta("/etc/hosts"));
    }

    #[test]
    fn split_and_join() {
        assert_eq!(split("dir/*.txt"), ("dir", "*.txt"));
        assert_eq!(split("/a/b/*.txt"), ("/a/b", "*.txt"));
        assert_eq!(split("/*.txt"), ("/", "*.txt"));
        assert_eq!(split("*.txt"), (".", "*.txt"));
        assert_eq!(join("dir", "a.txt"), "dir/a.txt");
        assert_eq!(join("/", "a.txt"), "/a.txt");
        assert_eq!(join(".", "a.txt"), "a.txt");
    }

    #[test]
    fn listing_filter_keeps_listing_order() {
        let matched = filter_listing("dir/*.txt", ["a.txt", "b.txt", "a.log"]).unwrap();
        assert_eq!(matched, vec!["dir/a.txt", "dir/b.txt"]);

        let matched = filter_listing("dir/*.txt", ["b.txt", "a.log", "a.txt"]).unwrap();
        assert_eq!(matched, vec!["dir/b.txt", "dir/a.txt"]);
    }

    #[test]
    fn listing_filter_handles_full_path_entries() {
        let matched =
            filter_listing("/srv/conf/*.yml", ["/srv/conf/app.yml", "/srv/conf/app.json"])
                .unwrap();
        assert_eq!(matched, vec!["/srv/conf/app.yml"]);
    }

    #[test]
    fn listing_filter_skips_dot_entries() {
        let matched = filter_listing("dir/*", [".", "..", "x"]).unwrap();
        assert_eq!(matched, vec!["dir/x"]);
    }

    #[test]
    fn listing_filter_rejects_bad_pattern() {
        let err = filter_listing("dir/[a", ["a"]).unwrap_err();
        assert!(matches!(err, Error::BadPattern(_)));
    }
}

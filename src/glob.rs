//! Glob-style pattern matching used by sampling rules to match tag values.
//!
//! Matching is byte-wise, so patterns and subjects need not be valid UTF-8
//! beyond what `&str` already guarantees. The supported syntax is the one
//! the Datadog agent documents for tag matching: `*` matches any run of
//! bytes including the empty one, `?` matches exactly one byte, and every
//! other byte matches itself. There is no escaping.

/// Returns whether `pattern` matches the whole of `subject`.
///
/// The empty pattern matches only the empty subject; a pattern of `*` alone
/// matches everything. Runs of consecutive stars behave as a single star.
///
/// ```
/// use datadog_tracer::glob_match;
///
/// assert!(glob_match("n?-ingress-*", "ny-ingress-backup"));
/// assert!(!glob_match("*stuff", "stuff to think about"));
/// ```
pub fn glob_match(pattern: &str, subject: &str) -> bool {
    let pattern = pattern.as_bytes();
    let subject = subject.as_bytes();
    let mut p = 0;
    let mut s = 0;
    // Bookmarks for backtracking: pattern position after the most recent
    // star, and the subject position that star is currently assumed to
    // cover up to.
    let mut star: Option<usize> = None;
    let mut mark = 0;

    while s < subject.len() {
        if p < pattern.len() && (pattern[p] == b'?' || pattern[p] == subject[s]) {
            p += 1;
            s += 1;
        } else if p < pattern.len() && pattern[p] == b'*' {
            star = Some(p + 1);
            mark = s;
            p += 1;
        } else if let Some(resume) = star {
            // Mismatch after a star: let the star swallow one more byte and
            // retry the remainder of the pattern from just past it.
            mark += 1;
            s = mark;
            p = resume;
        } else {
            return false;
        }
    }

    // Only trailing stars can match the exhausted subject.
    while p < pattern.len() && pattern[p] == b'*' {
        p += 1;
    }
    p == pattern.len()
}

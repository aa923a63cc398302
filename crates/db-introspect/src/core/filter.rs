//! Glob-like name matching for include/exclude filters.
//!
//! Extraction filters bound the cost of a run on very large schemas: a table
//! is matched against the patterns before any per-table detail query is
//! issued. Patterns support `*` (any run of characters) and `?` (any single
//! character) and match case-insensitively, since the same filter must work
//! against engines that fold identifiers either way.

/// Match `name` against a glob-like `pattern`.
pub fn matches_pattern(pattern: &str, name: &str) -> bool {
    let pat: Vec<char> = pattern.to_lowercase().chars().collect();
    let txt: Vec<char> = name.to_lowercase().chars().collect();

    // Iterative wildcard match with single-star backtracking.
    let (mut p, mut t) = (0usize, 0usize);
    let (mut star, mut mark) = (None::<usize>, 0usize);

    while t < txt.len() {
        if p < pat.len() && (pat[p] == '?' || pat[p] == txt[t]) {
            p += 1;
            t += 1;
        } else if p < pat.len() && pat[p] == '*' {
            star = Some(p);
            mark = t;
            p += 1;
        } else if let Some(s) = star {
            p = s + 1;
            mark += 1;
            t = mark;
        } else {
            return false;
        }
    }
    while p < pat.len() && pat[p] == '*' {
        p += 1;
    }
    p == pat.len()
}

/// Include/exclude filter over a list of glob patterns.
///
/// An empty include list accepts everything; exclusion always wins over
/// inclusion.
#[derive(Debug, Clone, Default)]
pub struct NameFilter {
    include: Vec<String>,
    exclude: Vec<String>,
}

impl NameFilter {
    pub fn new(include: Vec<String>, exclude: Vec<String>) -> Self {
        Self { include, exclude }
    }

    pub fn accepts(&self, name: &str) -> bool {
        if self.exclude.iter().any(|p| matches_pattern(p, name)) {
            return false;
        }
        self.include.is_empty() || self.include.iter().any(|p| matches_pattern(p, name))
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }
}

//! External knowledge seam.
//!
//! When the agent knows nothing about a query it can consult a
//! `SearchProvider` before falling back to synthesis. The core ships no
//! network implementation; callers plug in their own.

/// One hit from an external knowledge source.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub title: String,
    pub content: String,
    pub url: Option<String>,
    /// In [0, 1].
    pub relevance: f32,
}

/// External lookup consulted before fallback synthesis.
pub trait SearchProvider {
    /// Best hits for `query`, most relevant first. Empty means no answer.
    fn search(&self, query: &str) -> Vec<SearchResult>;
}

#[cfg(test)]
pub(crate) struct FixedProvider(pub Vec<SearchResult>);

#[cfg(test)]
impl SearchProvider for FixedProvider {
    fn search(&self, _query: &str) -> Vec<SearchResult> {
        self.0.clone()
    }
}

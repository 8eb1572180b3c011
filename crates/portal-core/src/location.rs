//! ============================================================================
//! Page Location - The current page URL and history-replace semantics
//! ============================================================================
//! Models `window.location` + `history.replaceState`: the URL can be rewritten
//! in place without a reload, and the number of rewrites is tracked.
//! ============================================================================

use anyhow::{anyhow, Result};
use tracing::debug;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLocation {
    url: Url,
    replace_count: u32,
}

impl PageLocation {
    pub fn parse(href: &str) -> Result<Self> {
        let url = Url::parse(href).map_err(|e| anyhow!("Invalid page URL '{}': {}", href, e))?;
        Ok(Self { url, replace_count: 0 })
    }

    /// Relative path such as `/account?payment=callback`, resolved on `base`
    pub fn parse_on(base: &str, path: &str) -> Result<Self> {
        let base = Url::parse(base).map_err(|e| anyhow!("Invalid base URL '{}': {}", base, e))?;
        let url = base
            .join(path)
            .map_err(|e| anyhow!("Invalid page path '{}': {}", path, e))?;
        Ok(Self { url, replace_count: 0 })
    }

    pub fn href(&self) -> &str {
        self.url.as_str()
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }

    pub fn query_param(&self, name: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }

    /// Remove every occurrence of `name` from the query, replacing the
    /// history entry in place. Returns false when nothing was removed.
    pub fn strip_query_param(&mut self, name: &str) -> bool {
        let kept: Vec<(String, String)> = self
            .url
            .query_pairs()
            .filter(|(k, _)| k != name)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        let before = self.url.query_pairs().count();
        if kept.len() == before {
            return false;
        }

        if kept.is_empty() {
            self.url.set_query(None);
        } else {
            self.url.query_pairs_mut().clear().extend_pairs(kept);
        }
        self.replace_count += 1;
        debug!("History replaced: {}", self.url);
        true
    }

    /// How many times the URL was rewritten without navigation
    pub fn replace_count(&self) -> u32 {
        self.replace_count
    }
}

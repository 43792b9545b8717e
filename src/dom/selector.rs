//! CSS selectors for config-authored markers
//!
//! Parsing and matching go through `scraper`, so a selector accepted here is
//! one the browser's `querySelector` accepts too, combinators included. A bad
//! selector in the config fails at load time instead of silently matching
//! nothing.

use crate::error::{Error, Result};
use scraper::ElementRef;
use std::fmt;

#[derive(Debug, Clone)]
pub struct Selector {
    source: String,
    compiled: scraper::Selector,
}

impl Selector {
    pub fn parse(source: &str) -> Result<Self> {
        let source = source.trim();
        let fail = |reason: String| Error::Selector {
            selector: source.to_string(),
            reason,
        };

        if source.is_empty() {
            return Err(fail("empty selector".to_string()));
        }
        let compiled = scraper::Selector::parse(source).map_err(|e| fail(e.to_string()))?;

        Ok(Self {
            source: source.to_string(),
            compiled,
        })
    }

    /// The selector text, suitable for native `querySelector`/`closest`
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Test an element in its tree, so combinators see its ancestors
    pub fn matches(&self, element: &ElementRef<'_>) -> bool {
        self.compiled.matches(element)
    }
}

impl PartialEq for Selector {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for Selector {}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

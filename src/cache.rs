//! Thread-local compilation cache for transform regular expressions.
//!
//! The same patch list is usually applied to many resources, so regexp and
//! match transforms see the same handful of patterns over and over.
//! Cache is capped at 256 entries; when full it is cleared and refilled on demand.

use regex::Regex;
use std::cell::RefCell;
use std::collections::HashMap;

const MAX_CACHE_ENTRIES: usize = 256;

thread_local! {
    static REGEX_CACHE: RefCell<HashMap<String, Regex>> = RefCell::new(HashMap::new());
}

/// Get a compiled regex from cache, or compile and cache it.
///
/// Compilation failures are not cached.
pub fn get_or_compile_regex(pattern: &str) -> Result<Regex, regex::Error> {
    REGEX_CACHE.with(|cache| {
        let mut cache = cache.borrow_mut();

        if let Some(re) = cache.get(pattern) {
            return Ok(re.clone());
        }

        if cache.len() >= MAX_CACHE_ENTRIES {
            cache.clear();
        }

        let compiled = Regex::new(pattern)?;
        cache.insert(pattern.to_string(), compiled.clone());
        Ok(compiled)
    })
}

/// Clear the regex cache (mainly for testing).
pub fn clear_cache() {
    REGEX_CACHE.with(|cache| {
        cache.borrow_mut().clear();
    });
}

pub fn cache_size() -> usize {
    REGEX_CACHE.with(|cache| cache.borrow().len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caches_compiled_patterns() {
        clear_cache();
        let first = get_or_compile_regex(r"^db-(\d+)$").unwrap();
        let second = get_or_compile_regex(r"^db-(\d+)$").unwrap();
        assert_eq!(first.as_str(), second.as_str());
        assert_eq!(cache_size(), 1);
    }

    #[test]
    fn invalid_patterns_are_not_cached() {
        clear_cache();
        assert!(get_or_compile_regex("(unclosed").is_err());
        assert_eq!(cache_size(), 0);
    }
}

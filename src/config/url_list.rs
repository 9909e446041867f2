//! URL-list input files
//!
//! Accepts the shapes sitemap exporters commonly produce: a flat array of
//! strings, an array of objects exposing the URL under one of a few keys, or
//! nested containers of either. Everything is flattened in document order and
//! de-duplicated keeping the first occurrence.

use crate::UrlListError;
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;

/// Object keys that may hold a URL string
const URL_KEYS: &[&str] = &["url", "href", "loc", "link"];

/// Object keys that may hold a nested array of entries
const CONTAINER_KEYS: &[&str] = &["urls", "links", "items", "pages"];

/// Loads seed URLs from a JSON file
///
/// # Returns
///
/// * `Ok(Vec<String>)` - URLs in first-seen order, without duplicates
/// * `Err(UrlListError)` - The file is missing, unreadable or not JSON
pub fn load_url_list(path: &Path) -> Result<Vec<String>, UrlListError> {
    if !path.exists() {
        return Err(UrlListError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&content)?;

    Ok(collect_urls(&value))
}

/// Flattens a JSON value into a de-duplicated list of URL strings
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use spa_crawler::config::collect_urls;
///
/// let value = json!({"pages": [{"url": "https://a.test/1"}, "https://a.test/2"]});
/// assert_eq!(collect_urls(&value), vec!["https://a.test/1", "https://a.test/2"]);
/// ```
pub fn collect_urls(value: &Value) -> Vec<String> {
    let mut urls = Vec::new();
    collect_into(value, &mut urls);

    let mut seen = HashSet::new();
    urls.retain(|url| seen.insert(url.clone()));
    urls
}

fn collect_into(value: &Value, urls: &mut Vec<String>) {
    match value {
        Value::String(s) => urls.push(s.clone()),
        Value::Array(items) => {
            for item in items {
                collect_into(item, urls);
            }
        }
        Value::Object(map) => {
            for key in URL_KEYS {
                if let Some(Value::String(s)) = map.get(*key) {
                    urls.push(s.clone());
                }
            }
            for key in CONTAINER_KEYS {
                if let Some(nested @ Value::Array(_)) = map.get(*key) {
                    collect_into(nested, urls);
                }
            }
        }
        _ => {}
    }
}

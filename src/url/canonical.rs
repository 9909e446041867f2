use serde::Serialize;
use std::fmt;
use url::form_urlencoded;
use url::Url;

/// A normalized URL string used as the identity key for deduplication
///
/// Values of this type are only produced by [`canonicalize`], so two
/// `CanonicalUrl`s compare equal exactly when they denote the same page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CanonicalUrl(String);

impl CanonicalUrl {
    /// Returns the canonical form as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the value and returns the inner string
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CanonicalUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Canonicalizes a URL into a stable, comparable key
///
/// # Canonicalization Steps
///
/// 1. Parse the URL; reject if empty, malformed, hostless or not HTTP(S)
/// 2. Lowercase the scheme and host
/// 3. Drop the port when it is the scheme default (80 / 443)
/// 4. Empty path becomes `/`
/// 5. Drop any userinfo
/// 6. Parse the query into key-value pairs (blank values kept), sort them
///    lexicographically and re-encode; an empty query is removed
/// 7. Discard the fragment
///
/// The function is idempotent: canonicalizing a canonical value returns it unchanged.
///
/// # Returns
///
/// * `Some(CanonicalUrl)` - The canonical form
/// * `None` - The input cannot denote a crawlable page
///
/// # Examples
///
/// ```
/// use spa_crawler::url::canonicalize;
///
/// let a = canonicalize("https://Example.com:443/a?b=1&a=2#top").unwrap();
/// let b = canonicalize("https://example.com/a?a=2&b=1").unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.as_str(), "https://example.com/a?a=2&b=1");
/// ```
pub fn canonicalize(raw: &str) -> Option<CanonicalUrl> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    // Steps 1-4: the url crate lowercases scheme/host, elides default ports
    // and gives special schemes a "/" path.
    let mut url = Url::parse(raw).ok()?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    url.host_str()?;

    // Step 5
    if url.set_username("").is_err() || url.set_password(None).is_err() {
        return None;
    }

    // Step 6
    if url.query().is_some() {
        let query = sorted_query(&url);
        if query.is_empty() {
            url.set_query(None);
        } else {
            url.set_query(Some(&query));
        }
    }

    // Step 7
    url.set_fragment(None);

    Some(CanonicalUrl(url.into()))
}

/// Re-encodes the query string with its pairs sorted by key, then value
fn sorted_query(url: &Url) -> String {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    pairs.sort();

    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

use super::CanonicalUrl;
use url::Url;

/// The (scheme, host, port) tuple that scopes a crawl
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Origin {
    pub scheme: String,
    pub host: String,
    pub port: u16,
}

impl Origin {
    /// Extracts the origin of a URL
    ///
    /// Scheme and host are lowercased. A missing port falls back to 80; since
    /// the URL parser already elides default ports, `https://x:443` and
    /// `https://x` share an origin.
    ///
    /// # Returns
    ///
    /// * `Some(Origin)` - The URL parsed and has a host
    /// * `None` - The URL is malformed or hostless
    ///
    /// # Examples
    ///
    /// ```
    /// use spa_crawler::url::Origin;
    ///
    /// let origin = Origin::of("http://EXAMPLE.com/path").unwrap();
    /// assert_eq!(origin.host, "example.com");
    /// assert_eq!(origin.port, 80);
    /// ```
    pub fn of(url: &str) -> Option<Self> {
        let parsed = Url::parse(url).ok()?;
        let host = parsed.host_str()?;
        if host.is_empty() {
            return None;
        }

        Some(Self {
            scheme: parsed.scheme().to_lowercase(),
            host: host.to_lowercase(),
            port: parsed.port().unwrap_or(80),
        })
    }
}

/// Returns true when both URLs share scheme, host and effective port
///
/// Fails closed: an unparseable or hostless URL on either side is never
/// considered same-origin.
///
/// # Examples
///
/// ```
/// use spa_crawler::url::same_origin;
///
/// assert!(same_origin("http://x.com", "http://x.com:80/y"));
/// assert!(!same_origin("http://x.com", "https://x.com"));
/// assert!(!same_origin("http://x.com", "not a url"));
/// ```
pub fn same_origin(a: &str, b: &str) -> bool {
    match (Origin::of(a), Origin::of(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Decides whether a discovered URL is in scope for the crawl
///
/// The base origin is fixed when the crawl starts (first seed URL) and never
/// changes afterwards.
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    base: Option<Origin>,
    same_origin_only: bool,
}

impl OriginPolicy {
    /// Creates a policy anchored at `base_url`
    pub fn new(base_url: Option<&CanonicalUrl>, same_origin_only: bool) -> Self {
        Self {
            base: base_url.and_then(|u| Origin::of(u.as_str())),
            same_origin_only,
        }
    }

    /// Returns true if `url` may be enqueued
    pub fn allows(&self, url: &CanonicalUrl) -> bool {
        if !self.same_origin_only {
            return true;
        }

        match &self.base {
            Some(base) => Origin::of(url.as_str()).is_some_and(|origin| &origin == base),
            None => true,
        }
    }
}

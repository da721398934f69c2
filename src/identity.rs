//! Request identity: the (URL, method) pair used as the cache/dedup key.

use reqwest::Method;
use url::Url;

/// Identity of a logical request for caching and deduplication purposes.
///
/// Two calls with the same absolute URL and HTTP method collapse to the same
/// identity regardless of headers, body, or timeout. The identity is computed
/// before any per-call timeout is read, so one caller abandoning its wait can
/// never affect others sharing the identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestIdentity {
    url: Url,
    method: Method,
}

impl RequestIdentity {
    pub fn new(url: Url, method: Method) -> Self {
        Self { url, method }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// String key under which this identity is stored in the cache namespace
    /// and the pending-request map.
    pub fn key(&self) -> String {
        format!("{} {}", self.method, self.url)
    }
}

impl std::fmt::Display for RequestIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_combines_method_and_url() {
        let url = Url::parse("https://api.example.com/feed?page=2").unwrap();
        let identity = RequestIdentity::new(url, Method::GET);
        assert_eq!(identity.key(), "GET https://api.example.com/feed?page=2");
    }

    #[test]
    fn same_url_different_method_is_a_different_identity() {
        let url = Url::parse("https://api.example.com/posts/1").unwrap();
        let get = RequestIdentity::new(url.clone(), Method::GET);
        let delete = RequestIdentity::new(url, Method::DELETE);
        assert_ne!(get.key(), delete.key());
    }
}

//! Outgoing HTTP for every external collaborator.
//!
//! Production adapters (content service, retrieval service, object storage,
//! push) talk to the network only through [`HttpClient`], so each of them can
//! be exercised against [`MockClient`] in tests.

mod client;
mod rate_limiter;

pub use client::{
    HttpClient, HttpClientBuilder, MockClient, MockResponse, RecordedRequest, ReqwestClient,
};
pub use rate_limiter::RateLimiter;

/// Host of a URL, lowercased, without a leading `www.`.
pub fn host_of(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    Some(host.trim_start_matches("www.").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_of() {
        assert_eq!(
            host_of("https://www.TikTok.com/@chef/video/1").as_deref(),
            Some("tiktok.com")
        );
        assert_eq!(host_of("not a url"), None);
    }
}

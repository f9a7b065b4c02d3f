//! Redirect following.
//!
//! Only 301, 302 and 307 with a non-empty `Location` are followed. The
//! method is preserved; the executor re-applies the caller's original query
//! and headers to the new target before signing it again.

use crate::http::HttpHeaders;
use url::Url;

/// Statuses the executor follows.
pub const REDIRECT_STATUSES: [u16; 3] = [301, 302, 307];

/// Default cap on redirect hops within one logical call.
pub const DEFAULT_MAX_REDIRECTS: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectDecision {
    Follow(Url),
    DoNotFollow,
}

pub fn is_redirect_status(status: u16) -> bool {
    REDIRECT_STATUSES.contains(&status)
}

/// Decide whether to follow a response. Relative `Location` values resolve
/// against `current`; an unparseable one is an error.
pub fn decide(
    status: u16,
    headers: &HttpHeaders,
    current: &Url,
) -> Result<RedirectDecision, url::ParseError> {
    if !is_redirect_status(status) {
        return Ok(RedirectDecision::DoNotFollow);
    }
    match headers.get("Location").map(str::trim).filter(|l| !l.is_empty()) {
        Some(location) => current.join(location).map(RedirectDecision::Follow),
        None => Ok(RedirectDecision::DoNotFollow),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location(value: &str) -> HttpHeaders {
        let mut h = HttpHeaders::new();
        h.add("Location", value);
        h
    }

    fn current() -> Url {
        Url::parse("https://api.example.com/v1/res?limit=5").unwrap()
    }

    #[test]
    fn follows_absolute_location_exactly() {
        let d = decide(302, &location("https://api.example.com/v2/res"), &current()).unwrap();
        assert_eq!(
            d,
            RedirectDecision::Follow(Url::parse("https://api.example.com/v2/res").unwrap())
        );
    }

    #[test]
    fn resolves_relative_location() {
        let d = decide(307, &location("/v2/res"), &current()).unwrap();
        assert_eq!(
            d,
            RedirectDecision::Follow(Url::parse("https://api.example.com/v2/res").unwrap())
        );
    }

    #[test]
    fn other_statuses_are_not_followed() {
        for status in [200, 303, 304, 308, 404, 500] {
            let d = decide(status, &location("https://elsewhere.example.com/"), &current()).unwrap();
            assert_eq!(d, RedirectDecision::DoNotFollow, "status {}", status);
        }
    }

    #[test]
    fn missing_or_blank_location_is_not_followed() {
        assert_eq!(decide(301, &HttpHeaders::new(), &current()).unwrap(), RedirectDecision::DoNotFollow);
        assert_eq!(decide(301, &location("  "), &current()).unwrap(), RedirectDecision::DoNotFollow);
    }

    #[test]
    fn unparseable_location_is_an_error() {
        assert!(decide(302, &location("http://[::1"), &current()).is_err());
    }
}

//! Site URL helpers.

use regex::Regex;
use std::sync::OnceLock;

fn scheme_pattern() -> &'static Regex {
    static SCHEME: OnceLock<Regex> = OnceLock::new();
    SCHEME.get_or_init(|| Regex::new(r"(?is)^https?://(.+)$").expect("valid scheme regex"))
}

/// Strip trailing slashes and a leading `http://` / `https://`.
///
/// `https://example.com/` becomes `example.com`. Input without a scheme only
/// loses its trailing slashes, so the function is idempotent.
pub fn url_to_domain(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    scheme_pattern().replace(trimmed, "$1").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_scheme_and_trailing_slash() {
        assert_eq!(url_to_domain("http://example.com/"), "example.com");
        assert_eq!(url_to_domain("https://example.com"), "example.com");
        assert_eq!(url_to_domain("https://example.com///"), "example.com");
    }

    #[test]
    fn scheme_match_is_case_insensitive() {
        assert_eq!(url_to_domain("HTTPS://Example.com/"), "Example.com");
    }

    #[test]
    fn keeps_path_segments() {
        assert_eq!(
            url_to_domain("https://example.com/blog/"),
            "example.com/blog"
        );
    }

    #[test]
    fn input_without_scheme_is_unchanged() {
        assert_eq!(url_to_domain("example.com"), "example.com");
        assert_eq!(url_to_domain("ftp://example.com"), "ftp://example.com");
        assert_eq!(url_to_domain(""), "");
    }

    #[test]
    fn bare_scheme_is_not_stripped_to_nothing() {
        assert_eq!(url_to_domain("http://"), "http:");
    }

    #[test]
    fn normalizing_twice_is_a_no_op() {
        for url in [
            "http://example.com/",
            "https://a.b.c:8080/",
            "local.test",
            "https://x.test/sub/",
        ] {
            let once = url_to_domain(url);
            assert_eq!(url_to_domain(&once), once, "not idempotent for {}", url);
        }
    }

    #[test]
    fn every_http_url_loses_scheme_and_slash() {
        for host in ["example.com", "dev.site.test", "127.0.0.1:8080", "a-b.c"] {
            for scheme in ["http://", "https://"] {
                for tail in ["", "/"] {
                    let out = url_to_domain(&format!("{}{}{}", scheme, host, tail));
                    assert!(!out.starts_with("http"));
                    assert!(!out.ends_with('/'));
                    assert_eq!(out, host);
                }
            }
        }
    }
}

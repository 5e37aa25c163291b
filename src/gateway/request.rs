//! Inbound request decoding.

use url::form_urlencoded;

use crate::dispatch::DispatchRequest;

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Decode a dispatch request from the raw query string and optional form body.
///
/// Body pairs come before query pairs, so with first-value-wins semantics a
/// form field overrides the same key in the URL.
pub fn parse_request(query: Option<&str>, form_body: Option<&[u8]>) -> DispatchRequest {
    let body_pairs = form_body
        .into_iter()
        .flat_map(form_urlencoded::parse);
    let query_pairs = query
        .into_iter()
        .flat_map(|query| form_urlencoded::parse(query.as_bytes()));

    DispatchRequest::from_pairs(body_pairs.chain(query_pairs))
}

/// Whether a `Content-Type` header value names a urlencoded form.
pub fn is_form(content_type: Option<&str>) -> bool {
    content_type
        .and_then(|value| value.split(';').next())
        .map(|mime| mime.trim().eq_ignore_ascii_case(FORM_CONTENT_TYPE))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_only() {
        let request = parse_request(
            Some("plugin=deploy.py&loader=python&env=prod&text=deploy%20prod"),
            None,
        );
        assert_eq!(request.plugin(), "deploy.py");
        assert_eq!(request.loader(), "python");
        assert_eq!(request.parameters()["env"], "prod");
        assert_eq!(request.raw_text(), Some("deploy prod"));
    }

    #[test]
    fn test_form_body_plus_query() {
        let request = parse_request(
            Some("loader=go&plugin=from-query"),
            Some(b"plugin=from-body&user_name=alice&response_url=https%3A%2F%2Fhooks.example%2FT1"),
        );
        assert_eq!(request.plugin(), "from-body");
        assert_eq!(request.loader(), "go");
        assert_eq!(request.requesting_user(), Some("alice"));
        assert_eq!(request.response_callback(), Some("https://hooks.example/T1"));
    }

    #[test]
    fn test_plus_decodes_to_space() {
        let request = parse_request(Some("plugin=a&loader=b&text=hello+world"), None);
        assert_eq!(request.raw_text(), Some("hello world"));
    }

    #[test]
    fn test_empty_input() {
        let request = parse_request(None, None);
        assert_eq!(request.plugin(), "");
        assert!(request.parameters().is_empty());
    }

    #[test]
    fn test_is_form() {
        assert!(is_form(Some("application/x-www-form-urlencoded")));
        assert!(is_form(Some("application/x-www-form-urlencoded; charset=utf-8")));
        assert!(!is_form(Some("application/json")));
        assert!(!is_form(None));
    }
}

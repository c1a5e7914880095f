//! Response classification.
//!
//! Cheap structural checks (status, HTML sniff) run before JSON decoding,
//! and nothing reaches a parser unless all of them pass.

use serde_json::Value;

use crate::scraper::error::{ErrorKind, ScraperError};
use crate::scraper::transport::Strategy;

/// How much of the body is sniffed for an HTML tag.
const HTML_SNIFF_CHARS: usize = 300;

pub fn validate(
    status: u16,
    body: &str,
    endpoint: &str,
    strategy: Strategy,
) -> Result<Value, ScraperError> {
    let fail = |kind: ErrorKind, message: String| -> Result<Value, ScraperError> {
        Err(ScraperError::new(kind, message).with_endpoint(endpoint))
    };

    match status {
        403 => {
            let message = match strategy {
                Strategy::Baseline => "Blocked (403) — browser-profile client required",
                Strategy::BrowserProfile => "Blocked (403) by upstream despite browser profile",
            };
            return fail(ErrorKind::Blocked, message.to_string());
        }
        429 => {
            return fail(
                ErrorKind::RateLimited,
                "Rate limited (429) — too many requests".to_string(),
            )
        }
        404 => return fail(ErrorKind::NotFound, "Endpoint not found (404)".to_string()),
        200 => {}
        other => return fail(ErrorKind::HttpStatus(other), format!("HTTP {other}")),
    }

    if looks_like_html(body) {
        return fail(
            ErrorKind::Challenge,
            "Got HTML page — likely anti-bot challenge".to_string(),
        );
    }

    let document: Value = serde_json::from_str(body).map_err(|e| {
        ScraperError::new(ErrorKind::Decode, "Invalid JSON")
            .with_endpoint(endpoint)
            .with_cause(e)
    })?;

    if let Some(code) = business_code(&document) {
        let message = document
            .get("message")
            .or_else(|| document.get("msg"))
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .unwrap_or("API error");
        return fail(ErrorKind::Business, format!("bizCode={code}: {message}"));
    }

    Ok(document)
}

fn looks_like_html(body: &str) -> bool {
    if body.trim_start().starts_with("<!") {
        return true;
    }
    let head: String = body.chars().take(HTML_SNIFF_CHARS).collect();
    head.to_lowercase().contains("<html")
}

/// The failing business code, rendered for the error message. `bizCode`
/// wins over `code`; absent, null, empty, false and zero all mean success.
fn business_code(document: &Value) -> Option<String> {
    let raw = document.get("bizCode").or_else(|| document.get("code"))?;
    match raw {
        Value::Null | Value::Bool(false) => None,
        Value::Number(n) => (n.as_f64() != Some(0.0)).then(|| n.to_string()),
        Value::String(s) => {
            let code = s.trim();
            let is_zero = code.parse::<f64>().is_ok_and(|n| n == 0.0);
            (!code.is_empty() && !is_zero).then(|| code.to_string())
        }
        Value::Array(items) if items.is_empty() => None,
        Value::Object(fields) if fields.is_empty() => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://example.test/api";

    fn kind_of(result: Result<Value, ScraperError>) -> ErrorKind {
        result.expect_err("should fail").kind()
    }

    #[test]
    fn test_status_checks() {
        assert_eq!(kind_of(validate(403, "{}", URL, Strategy::Baseline)), ErrorKind::Blocked);
        assert_eq!(kind_of(validate(429, "{}", URL, Strategy::Baseline)), ErrorKind::RateLimited);
        assert_eq!(kind_of(validate(404, "{}", URL, Strategy::Baseline)), ErrorKind::NotFound);
        assert_eq!(
            kind_of(validate(502, "{}", URL, Strategy::Baseline)),
            ErrorKind::HttpStatus(502)
        );
    }

    #[test]
    fn test_blocked_message_depends_on_strategy() {
        let baseline = validate(403, "", URL, Strategy::Baseline).unwrap_err();
        assert!(baseline.message().contains("browser-profile client required"));
        assert_eq!(baseline.endpoint(), Some(URL));

        let browser = validate(403, "", URL, Strategy::BrowserProfile).unwrap_err();
        assert!(browser.message().starts_with("Blocked (403)"));
        assert!(!browser.message().contains("required"));
    }

    #[test]
    fn test_status_checked_before_html() {
        let html = "<!DOCTYPE html><html></html>";
        assert_eq!(kind_of(validate(429, html, URL, Strategy::Baseline)), ErrorKind::RateLimited);
    }

    #[test]
    fn test_challenge_page_detected() {
        let doctype = "  <!DOCTYPE html><title>Just a moment...</title>";
        assert_eq!(kind_of(validate(200, doctype, URL, Strategy::Baseline)), ErrorKind::Challenge);

        let tag = "\n<HTML><body>checking your browser</body></HTML>";
        assert_eq!(kind_of(validate(200, tag, URL, Strategy::Baseline)), ErrorKind::Challenge);
    }

    #[test]
    fn test_invalid_json_keeps_cause() {
        use std::error::Error as _;
        let err = validate(200, "{not json", URL, Strategy::Baseline).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
        assert!(err.source().is_some());
    }

    #[test]
    fn test_business_error() {
        let body = r#"{"bizCode": 4004, "message": "Service busy"}"#;
        let err = validate(200, body, URL, Strategy::Baseline).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Business);
        assert_eq!(err.message(), "bizCode=4004: Service busy");

        let fallback = r#"{"code": "7", "data": null}"#;
        let err = validate(200, fallback, URL, Strategy::Baseline).unwrap_err();
        assert_eq!(err.message(), "bizCode=7: API error");
    }

    #[test]
    fn test_non_numeric_business_code_rejected() {
        let body = r#"{"bizCode": "ERR_BLOCKED", "message": "Access denied"}"#;
        let err = validate(200, body, URL, Strategy::Baseline).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Business);
        assert_eq!(err.message(), "bizCode=ERR_BLOCKED: Access denied");
        assert_eq!(err.endpoint(), Some(URL));

        let flagged = r#"{"code": true}"#;
        assert_eq!(kind_of(validate(200, flagged, URL, Strategy::Baseline)), ErrorKind::Business);
    }

    #[test]
    fn test_zero_like_codes_pass() {
        for body in [
            r#"{"bizCode": 0}"#,
            r#"{"bizCode": "0"}"#,
            r#"{"bizCode": 0.0}"#,
            r#"{"bizCode": null, "data": []}"#,
            r#"{"code": ""}"#,
            r#"{"code": false}"#,
        ] {
            assert!(validate(200, body, URL, Strategy::Baseline).is_ok(), "body {body}");
        }
    }

    #[test]
    fn test_biz_code_wins_over_code() {
        let body = r#"{"bizCode": 0, "code": 500}"#;
        assert!(validate(200, body, URL, Strategy::Baseline).is_ok());
    }

    #[test]
    fn test_success_documents() {
        let ok = validate(200, r#"{"bizCode": 0, "data": []}"#, URL, Strategy::Baseline).unwrap();
        assert!(ok["data"].is_array());

        let no_code = validate(200, r#"{"events": []}"#, URL, Strategy::BrowserProfile).unwrap();
        assert!(no_code["events"].is_array());

        let bare_list = validate(200, "[]", URL, Strategy::Baseline).unwrap();
        assert!(bare_list.is_array());
    }
}

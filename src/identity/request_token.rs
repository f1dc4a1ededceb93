use axum::http::{header, HeaderMap};

/// Pull the bearer token out of a request.
///
/// A non-empty `access_token` query parameter wins over the `Authorization`
/// header. The `Bearer` scheme prefix is matched case-insensitively. Returns an
/// empty string when neither source carries a token.
pub fn extract_token(access_token: Option<&str>, headers: &HeaderMap) -> String {
    if let Some(q) = access_token.map(str::trim).filter(|s| !s.is_empty()) {
        return q.to_string();
    }
    let Some(raw) = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) else {
        return String::new();
    };
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("bearer") {
        return String::new();
    }
    match raw.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim().to_string(),
        _ => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn auth_header(v: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(header::AUTHORIZATION, HeaderValue::from_str(v).unwrap());
        h
    }

    #[test]
    fn query_parameter_takes_precedence() {
        assert_eq!(extract_token(Some("from-query"), &auth_header("Bearer from-header")), "from-query");
    }

    #[test]
    fn blank_query_falls_back_to_header() {
        assert_eq!(extract_token(Some("  "), &auth_header("Bearer abc")), "abc");
        assert_eq!(extract_token(None, &auth_header("bearer   abc ")), "abc");
    }

    #[test]
    fn header_without_scheme_is_used_verbatim() {
        assert_eq!(extract_token(None, &auth_header("abc.def.ghi")), "abc.def.ghi");
    }

    #[test]
    fn nothing_presented_yields_empty() {
        assert_eq!(extract_token(None, &HeaderMap::new()), "");
        assert_eq!(extract_token(None, &auth_header("Bearer ")), "");
    }
}

//! Safe "next destination" paths and the canonical submission-flow routes.
//!
//! `sanitize_next_path` is the sole gate before a user-influenced
//! "return to" value is embedded in a redirect URL or stored state; it
//! collapses anything external, protocol-relative, or unparseable to `/`.

use url::Url;

pub const SUBMIT_FINE_PATH: &str = "/dashboard/submit-fine";
pub const SUBMIT_FINE_RESUME_PATH: &str = "/dashboard/submit-fine?resume_submission=1";
pub const PROFILE_REQUIRED_REDIRECT_PATH: &str =
    "/dashboard/settings/profile?required=1&origin=submit-fine&resume_submission=1";
pub const PROFILE_REQUIRED_REDIRECT_FALLBACK_PATH: &str =
    "/dashboard/settings/profile?required=1&origin=submit-fine&next=/dashboard/submit-fine";

/// Query parameter that triggers the resume sequence on the submission page.
pub const RESUME_SUBMISSION_PARAM: &str = "resume_submission";

const APP_LOCAL_ORIGIN: &str = "https://contesto.local";
const DEFAULT_NEXT_PATH: &str = "/";

fn parse_against_local_origin(candidate: &str) -> Option<Url> {
    let base = Url::parse(APP_LOCAL_ORIGIN).ok()?;
    let parsed = base.join(candidate).ok()?;
    // join() can still escape the origin (backslash tricks, embedded
    // scheme); anything that did is rejected.
    if parsed.origin() != base.origin() {
        return None;
    }
    Some(parsed)
}

/// Normalize an arbitrary "next destination" candidate into a safe
/// same-origin relative path. Absent, malformed, absolute-external and
/// protocol-relative candidates all map to `/`.
pub fn sanitize_next_path(candidate: Option<&str>) -> String {
    let Some(candidate) = candidate else {
        return DEFAULT_NEXT_PATH.to_string();
    };

    let trimmed = candidate.trim();
    if trimmed.is_empty() || !trimmed.starts_with('/') || trimmed.starts_with("//") {
        return DEFAULT_NEXT_PATH.to_string();
    }

    let Some(parsed) = parse_against_local_origin(trimmed) else {
        return DEFAULT_NEXT_PATH.to_string();
    };

    let mut safe = parsed.path().to_string();
    if let Some(query) = parsed.query() {
        safe.push('?');
        safe.push_str(query);
    }
    if let Some(fragment) = parsed.fragment() {
        safe.push('#');
        safe.push_str(fragment);
    }
    safe
}

/// Login path carrying the sanitized destination as a `next` parameter.
pub fn build_login_path_with_next(next_path: &str) -> String {
    let safe_path = sanitize_next_path(Some(next_path));
    format!("/login?next={}", urlencoding::encode(&safe_path))
}

/// True only for the exact canonical resume-submission path: the
/// submission page with `resume_submission=1` as the entire query.
pub fn is_submit_fine_resume_path(next_path: &str) -> bool {
    let Some(parsed) = parse_against_local_origin(next_path) else {
        return false;
    };
    parsed.path() == SUBMIT_FINE_PATH && parsed.query() == Some("resume_submission=1")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_rejects_external_candidates() {
        assert_eq!(sanitize_next_path(Some("http://evil.com/x")), "/");
        assert_eq!(sanitize_next_path(Some("https://evil.com/x")), "/");
        assert_eq!(sanitize_next_path(Some("//evil.com")), "/");
        assert_eq!(sanitize_next_path(Some("/\\evil.com")), "/");
        assert_eq!(sanitize_next_path(None), "/");
        assert_eq!(sanitize_next_path(Some("")), "/");
        assert_eq!(sanitize_next_path(Some("javascript:alert(1)")), "/");
    }

    #[test]
    fn test_sanitize_preserves_same_origin_paths() {
        assert_eq!(
            sanitize_next_path(Some("/dashboard?x=1#y")),
            "/dashboard?x=1#y"
        );
        assert_eq!(sanitize_next_path(Some("  /dashboard  ")), "/dashboard");
        assert_eq!(
            sanitize_next_path(Some(SUBMIT_FINE_RESUME_PATH)),
            SUBMIT_FINE_RESUME_PATH
        );
    }

    #[test]
    fn test_build_login_path_encodes_next() {
        assert_eq!(
            build_login_path_with_next(SUBMIT_FINE_RESUME_PATH),
            "/login?next=%2Fdashboard%2Fsubmit-fine%3Fresume_submission%3D1"
        );
        assert_eq!(
            build_login_path_with_next("http://evil.com"),
            "/login?next=%2F"
        );
    }

    #[test]
    fn test_resume_path_matcher_is_exact() {
        assert!(is_submit_fine_resume_path(SUBMIT_FINE_RESUME_PATH));
        assert!(!is_submit_fine_resume_path(SUBMIT_FINE_PATH));
        assert!(!is_submit_fine_resume_path(
            "/dashboard/submit-fine?resume_submission=1&extra=1"
        ));
        assert!(!is_submit_fine_resume_path(
            "/dashboard/submit-fine?resume_submission=0"
        ));
        assert!(!is_submit_fine_resume_path("/dashboard"));
    }
}

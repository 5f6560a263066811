//! Small URL helpers shared by the index and the downloader

use url::Url;

/// Join a base URL and a relative path by appending path segments.
///
/// Unlike RFC 3986 relative resolution, the base path is kept:
/// `join("http://x/charts", "foo.tgz")` is `http://x/charts/foo.tgz`.
/// When the base does not parse as a URL, falls back to plain
/// slash-separated concatenation.
pub fn join(base: &str, path: &str) -> String {
    let Ok(mut url) = Url::parse(base) else {
        return concat(base, path);
    };
    {
        let Ok(mut segments) = url.path_segments_mut() else {
            return concat(base, path);
        };
        segments.pop_if_empty();
        segments.extend(path.split('/').filter(|s| !s.is_empty()));
    }
    url.to_string()
}

fn concat(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Compare two URLs for equality, normalizing trailing slashes.
///
/// Strings that do not parse as URLs fall back to exact comparison.
pub fn equal(a: &str, b: &str) -> bool {
    match (Url::parse(a), Url::parse(b)) {
        (Ok(ua), Ok(ub)) => {
            ua.scheme() == ub.scheme()
                && ua.authority() == ub.authority()
                && ua.path().trim_end_matches('/') == ub.path().trim_end_matches('/')
                && ua.query() == ub.query()
        }
        _ => a == b,
    }
}

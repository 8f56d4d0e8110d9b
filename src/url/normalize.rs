use url::Url;

/// Query parameters that only carry tracking data
const TRACKING_PARAMS: &[&str] = &[
    "fbclid", "gclid", "mc_eid", "yclid", "_ga", "ref_src",
];

/// Canonicalizes a discovered URL before it is checked against the seen
/// filter
///
/// # Canonicalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Reject anything but http/https and URLs without a host
/// 3. Host lowercasing and dot-segment removal (done by the parser)
/// 4. Remove the fragment
/// 5. Remove tracking query parameters, sort the rest by key
/// 6. Remove an empty query string
///
/// The path, scheme and `www.` prefix are left alone: they can point at
/// different resources and the result is fetched as-is.
///
/// # Examples
///
/// ```
/// use sumi_walk::url::canonicalize;
///
/// let url = canonicalize("https://Example.COM/a/../b?utm_source=x#top").unwrap();
/// assert_eq!(url, "https://example.com/b");
/// ```
pub fn canonicalize(raw: &str) -> Option<String> {
    let mut url = Url::parse(raw.trim()).ok()?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    url.host_str()?;

    url.set_fragment(None);

    if url.query().is_some() {
        let params = filter_and_sort_query_params(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(params);
        }
    }

    Some(url.into())
}

/// Filters out tracking parameters and sorts remaining query parameters
fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    params.sort_by(|a, b| a.0.cmp(&b.0));
    params
}

fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}

use indexmap::IndexMap;

/// Ordered query parameters, appended in insertion order.
pub type Params = IndexMap<String, String>;

/// Append query parameters to a URL.
///
/// The first pair is introduced with `?`, or `&` when the URL already carries
/// a query. Pairs are written as `key=value` back to back with no separator
/// between them, so `{"p": "1", "r": "2"}` becomes `?p=1r=2`. Endpoints in use
/// take a single parameter; keep this in mind before passing more than one.
pub fn add_url(base_url: &str, params: Option<&Params>) -> String {
    let mut url = base_url.to_string();
    if let Some(params) = params {
        url.push(if base_url.contains('?') { '&' } else { '?' });
        for (key, value) in params {
            url.push_str(key);
            url.push('=');
            url.push_str(value);
        }
    }
    url
}

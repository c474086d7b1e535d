//! Cache Key Generator Module
//!
//! Pure functions building deterministic cache keys from semantic
//! identifiers. Parameters are sorted by name before concatenation so
//! semantically identical requests always produce the same key
//! regardless of construction order. Absent scoping identifiers render
//! as a sentinel token (`root` for folder scope, `default` otherwise).

// == Cache Key Generator ==
/// Builds canonical string keys for the cache store.
pub struct CacheKeyGenerator;

impl CacheKeyGenerator {
    // == Files ==
    /// Key for a folder listing, e.g. `files:root` or `files:123?a=1&b=2`.
    pub fn files(folder_id: Option<i64>, params: &[(&str, &str)]) -> String {
        let base = match folder_id {
            Some(id) => format!("files:{id}"),
            None => "files:root".to_string(),
        };
        match param_string(params) {
            Some(query) => format!("{base}?{query}"),
            None => base,
        }
    }

    // == Folder Details ==
    /// Key for a single folder's metadata, e.g. `folder-details:123`.
    pub fn folder_details(folder_id: i64) -> String {
        format!("folder-details:{folder_id}")
    }

    // == Breadcrumbs ==
    /// Key for a folder's breadcrumb trail, e.g. `breadcrumbs:root`.
    pub fn breadcrumbs(folder_id: Option<i64>) -> String {
        match folder_id {
            Some(id) => format!("breadcrumbs:{id}"),
            None => "breadcrumbs:root".to_string(),
        }
    }

    // == Auth Status ==
    /// Key for the authentication status snapshot.
    pub fn auth_status() -> String {
        "auth:status".to_string()
    }

    // == Custom ==
    /// Key for an arbitrary request type, e.g. `search:default?q=report`.
    pub fn custom(kind: &str, id: Option<&str>, params: &[(&str, &str)]) -> String {
        let mut key = format!("{}:{}", kind, id.unwrap_or("default"));
        if let Some(query) = param_string(params) {
            key.push('?');
            key.push_str(&query);
        }
        key
    }
}

/// Joins parameters as `k=v&...` in lexicographic key order.
/// Returns `None` for an empty bag.
fn param_string(params: &[(&str, &str)]) -> Option<String> {
    if params.is_empty() {
        return None;
    }
    let mut sorted: Vec<(&str, &str)> = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    Some(
        sorted
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&"),
    )
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_files_root() {
        assert_eq!(CacheKeyGenerator::files(None, &[]), "files:root");
    }

    #[test]
    fn test_files_with_id() {
        assert_eq!(CacheKeyGenerator::files(Some(42), &[]), "files:42");
    }

    #[test]
    fn test_files_params_sorted() {
        let key = CacheKeyGenerator::files(Some(123), &[("b", "2"), ("a", "1")]);
        assert_eq!(key, "files:123?a=1&b=2");
    }

    #[test]
    fn test_files_params_order_independent() {
        let forward = CacheKeyGenerator::files(Some(7), &[("sort", "name"), ("page", "2")]);
        let reversed = CacheKeyGenerator::files(Some(7), &[("page", "2"), ("sort", "name")]);
        assert_eq!(forward, reversed);
    }

    #[test]
    fn test_folder_details() {
        assert_eq!(CacheKeyGenerator::folder_details(5), "folder-details:5");
    }

    #[test]
    fn test_breadcrumbs() {
        assert_eq!(CacheKeyGenerator::breadcrumbs(None), "breadcrumbs:root");
        assert_eq!(CacheKeyGenerator::breadcrumbs(Some(9)), "breadcrumbs:9");
    }

    #[test]
    fn test_auth_status() {
        assert_eq!(CacheKeyGenerator::auth_status(), "auth:status");
    }

    #[test]
    fn test_custom_default_id() {
        assert_eq!(CacheKeyGenerator::custom("search", None, &[]), "search:default");
    }

    #[test]
    fn test_custom_with_params() {
        let key = CacheKeyGenerator::custom("search", Some("recent"), &[("q", "report"), ("limit", "10")]);
        assert_eq!(key, "search:recent?limit=10&q=report");
    }
}

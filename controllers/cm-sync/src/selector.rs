//! Label selector matching.

use std::collections::BTreeMap;

/// Tests a ConfigMap's labels against a job's selector.
///
/// A ConfigMap without any labels never matches, regardless of the selector.
/// Otherwise every selector entry must be present with an equal value; an
/// empty selector therefore accepts any labeled ConfigMap.
pub fn matches(selector: &BTreeMap<String, String>, labels: &BTreeMap<String, String>) -> bool {
    if labels.is_empty() {
        // immediately reject if there are no labels at all
        return false;
    }

    selector
        .iter()
        .all(|(key, expected)| labels.get(key) == Some(expected))
}

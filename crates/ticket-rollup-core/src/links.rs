use std::collections::BTreeSet;

/// Predicate used for an empty key set. Issue keys are `PROJECT-NUMBER`, so the
/// bare word never equals a real key.
const NO_MATCH_PREDICATE: &str = "key = \"NONE\"";

/// Query link listing `keys` (deduplicated, sorted) newest key first.
#[must_use]
pub fn issue_query_link<'a, I>(base_url: &str, keys: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let keys = keys.into_iter().collect::<BTreeSet<_>>();
    if keys.is_empty() {
        return format!("{base_url}{NO_MATCH_PREDICATE}");
    }

    let quoted = keys.iter().map(|key| format!("'{key}'")).collect::<Vec<_>>().join(", ");
    format!("{base_url}key in ({quoted}) ORDER BY key DESC")
}

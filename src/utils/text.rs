/// Canonical lookup key for a genre label: lowercase, with every run of
/// non-alphanumeric characters collapsed to a single `_`.
/// `"Science Fiction"` and `"science-fiction"` both become `science_fiction`.
pub fn normalize_key(label: &str) -> String {
    let mut key = String::with_capacity(label.len());
    let mut pending_sep = false;
    for c in label.chars() {
        if c.is_alphanumeric() {
            if pending_sep && !key.is_empty() {
                key.push('_');
            }
            pending_sep = false;
            key.extend(c.to_lowercase());
        } else {
            pending_sep = true;
        }
    }
    key
}

/// Names of the `{placeholder}` tokens in `pattern`, in order of first
/// appearance, without duplicates.
pub fn placeholders(pattern: &str) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::new();
    let mut rest = pattern;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        match after.find(|c| c == '}' || c == '{') {
            Some(close) if after.as_bytes()[close] == b'}' => {
                let name = &after[..close];
                if is_placeholder_name(name) && !names.contains(&name) {
                    names.push(name);
                }
                rest = &after[close + 1..];
            }
            Some(close) => rest = &after[close..],
            None => break,
        }
    }
    names
}

fn is_placeholder_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Replaces every `{name}` token with the value `resolve` returns for it.
/// Tokens `resolve` has no value for are left as written.
pub fn fill_placeholders<F>(pattern: &str, mut resolve: F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    let mut out = pattern.to_string();
    for name in placeholders(pattern) {
        if let Some(value) = resolve(name) {
            out = out.replace(&format!("{{{}}}", name), &value);
        }
    }
    out
}

/// Lowercased whitespace-delimited terms of a free-text query.
pub fn query_terms(query: &str) -> Vec<String> {
    query.split_whitespace().map(str::to_lowercase).collect()
}

/// Clean tag anchor texts: trim, drop one leading `#`. Order and count are kept.
pub fn extract_tags<S: AsRef<str>>(raw_tags: &[S]) -> Vec<String> {
    raw_tags
        .iter()
        .map(|tag| {
            let tag = tag.as_ref().trim();
            tag.strip_prefix('#').unwrap_or(tag).to_string()
        })
        .collect()
}

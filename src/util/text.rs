/// Normalize text for keyword comparison: lowercase and collapse every whitespace run
/// into a single space, trimming both ends.
pub fn normalize_for_match(text: &str) -> String {
    let mut normalized = String::with_capacity(text.len());
    let mut space_pending = false;

    for ch in text.trim().chars() {
        if ch.is_whitespace() {
            space_pending = true;
            continue;
        }
        if space_pending && !normalized.is_empty() {
            normalized.push(' ');
        }
        space_pending = false;
        for lower in ch.to_lowercase() {
            normalized.push(lower);
        }
    }

    normalized
}

/// Join non-empty, trimmed pieces with single spaces.
pub fn join_trimmed<'a, I>(pieces: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    pieces
        .into_iter()
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

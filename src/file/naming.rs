const INVALID_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Replace characters that are invalid in file names on common platforms.
pub fn sanitize_filename(name: &str) -> String {
    let mut result: String = name
        .chars()
        .map(|c| {
            if INVALID_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    // Remove trailing spaces and dots
    result = result.trim_end_matches(|c| c == ' ' || c == '.').to_string();

    if result.is_empty() {
        result = "_".to_string();
    }

    result
}

/// Append `suffix` to `name` unless it is already present.
pub fn with_suffix(name: &str, suffix: &str) -> String {
    if name.ends_with(suffix) {
        name.to_string()
    } else {
        format!("{}{}", name, suffix)
    }
}

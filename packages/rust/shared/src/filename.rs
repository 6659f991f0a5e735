//! Filesystem-safe name sanitization for space keys, page titles, and
//! attachment names.

/// Characters that are invalid in filenames on at least one supported platform.
const INVALID_CHARS: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Maximum sanitized name length, in characters.
const MAX_LEN: usize = 200;

/// Replace invalid filename characters with `_`, cap the length, and trim
/// surrounding whitespace. Idempotent.
pub fn sanitize_filename(name: &str) -> String {
    let mut cleaned: String = name
        .chars()
        .map(|c| if INVALID_CHARS.contains(&c) { '_' } else { c })
        .collect();

    if cleaned.chars().count() > MAX_LEN {
        cleaned = cleaned.chars().take(MAX_LEN).collect();
    }

    cleaned.trim().to_string()
}

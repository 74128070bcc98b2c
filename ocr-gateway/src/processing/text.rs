/// Clean raw OCR output: trim every line, drop blank lines, join with `\n`.
///
/// Handles both `\n` and `\r\n` line endings. Applying it twice gives the
/// same result as applying it once.
pub fn normalize_text(raw: &str) -> String {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

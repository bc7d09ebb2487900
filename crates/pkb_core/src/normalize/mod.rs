/// Canonical whitespace for extracted document text.
///
/// Line endings become `\n`, any run of three or more newlines collapses to a blank line, and the
/// result is trimmed.
pub fn normalize_text(s: &str) -> String {
    let unified = s.replace("\r\n", "\n").replace('\r', "\n");

    let mut out = String::with_capacity(unified.len());
    let mut newlines = 0usize;
    for ch in unified.chars() {
        if ch == '\n' {
            newlines += 1;
            continue;
        }
        if newlines > 0 {
            let keep = newlines.min(2);
            for _ in 0..keep {
                out.push('\n');
            }
            newlines = 0;
        }
        out.push(ch);
    }
    // Trailing newlines are dropped by the trim below.
    out.trim().to_string()
}

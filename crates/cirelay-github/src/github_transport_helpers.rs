use reqwest::Url;

pub(crate) const ERROR_BODY_MAX_CHARS: usize = 800;
pub(crate) const SAMPLE_LINE_MAX_CHARS: usize = 200;
pub(crate) const SAMPLE_LINE_COUNT: usize = 3;

pub fn truncate_for_error(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated = text.chars().take(max_chars).collect::<String>();
    truncated.push_str("...");
    truncated
}

/// Percent-encodes everything outside the RFC 3986 unreserved set, so the value stays one path segment.
pub fn percent_encode_path_segment(value: &str) -> String {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let mut encoded = String::with_capacity(value.len());
    for byte in value.as_bytes() {
        let is_unreserved = matches!(
            byte,
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~'
        );
        if is_unreserved {
            encoded.push(*byte as char);
        } else {
            encoded.push('%');
            encoded.push(HEX[(byte >> 4) as usize] as char);
            encoded.push(HEX[(byte & 0x0F) as usize] as char);
        }
    }
    encoded
}

/// First few lines of a log payload, shortened for diagnostics output.
pub(crate) fn sample_lines<'a, I>(lines: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    lines
        .into_iter()
        .take(SAMPLE_LINE_COUNT)
        .map(|line| truncate_for_error(line, SAMPLE_LINE_MAX_CHARS))
        .collect()
}

/// The final URL when the transport followed at least one redirect.
pub(crate) fn redirect_target(requested: &Url, final_url: &Url) -> Option<String> {
    (requested != final_url).then(|| final_url.to_string())
}

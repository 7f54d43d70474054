use encoding_rs::Encoding;

const CHARSET_SNIFF_BYTES: usize = 8192;

/// Decodes page bytes: an explicit label wins, then a `<meta>` charset in the
/// first bytes, then UTF-8 (lossy).
pub(crate) fn decode_page(body: &[u8], charset_override: Option<&str>) -> String {
    let label = charset_override
        .map(ToOwned::to_owned)
        .or_else(|| parse_charset_from_html_prefix(body));
    if let Some(label) = label {
        if let Some(encoding) = Encoding::for_label(label.trim().as_bytes()) {
            let (decoded, _, _) = encoding.decode(body);
            return decoded.into_owned();
        }
        tracing::warn!(label = %label, "unknown charset label, falling back to UTF-8");
    }

    String::from_utf8_lossy(body).into_owned()
}

pub(crate) fn parse_charset_from_html_prefix(body: &[u8]) -> Option<String> {
    let prefix_len = body.len().min(CHARSET_SNIFF_BYTES);
    let prefix = String::from_utf8_lossy(&body[..prefix_len]);
    let lower = prefix.to_ascii_lowercase();
    let mut search_start = 0_usize;

    while let Some(relative) = lower[search_start..].find("charset=") {
        let charset_start = search_start + relative + "charset=".len();
        if let Some(label) = parse_charset_label(&prefix[charset_start..]) {
            return Some(label);
        }
        search_start = charset_start;
    }

    None
}

fn parse_charset_label(input: &str) -> Option<String> {
    let trimmed = input.trim_start();
    let first = trimmed.chars().next()?;

    let label = if first == '"' || first == '\'' {
        let rest = &trimmed[first.len_utf8()..];
        let end = rest.find(first)?;
        rest[..end].trim()
    } else {
        let end = trimmed
            .find(|ch: char| ch.is_whitespace() || matches!(ch, '"' | '\'' | ';' | '>' | '/'))
            .unwrap_or(trimmed.len());
        trimmed[..end].trim()
    };

    (!label.is_empty()).then(|| label.to_owned())
}

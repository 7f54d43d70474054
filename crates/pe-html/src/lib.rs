//! HTML tokenization, tree building and serialization.

use pe_dom::Document;
use pe_dom::NodeId;
use pe_dom::NodeKind;
use tracing::debug;

/// Parses raw HTML into a DOM document.
#[derive(Debug, Default)]
pub struct HtmlParser;

impl HtmlParser {
    pub fn parse(&self, input: &str) -> Document {
        let tokens = tokenize(input);
        let mut document = build_tree(tokens);
        document.title = find_title(&document).unwrap_or_default();
        document
    }
}

/// Serializes a document back into HTML text.
#[derive(Debug, Default)]
pub struct HtmlSerializer;

impl HtmlSerializer {
    pub fn serialize(&self, document: &Document) -> String {
        let mut out = String::new();
        for child in document.children(document.root()) {
            write_node(document, *child, &mut out);
        }
        out
    }

    /// Serializes a single node including its own tags.
    pub fn outer_html(&self, document: &Document, id: NodeId) -> String {
        let mut out = String::new();
        write_node(document, id, &mut out);
        out
    }
}

#[derive(Debug)]
enum Token {
    Doctype(String),
    Start {
        name: String,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    },
    End {
        name: String,
    },
    Text(String),
    RawText(String),
}

fn tokenize(source: &str) -> Vec<Token> {
    let mut out = Vec::new();
    let bytes = source.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if starts_with(bytes, i, b"<!--") {
            i = skip_comment(bytes, i);
            continue;
        }

        if bytes[i] == b'<' {
            if starts_with(bytes, i, b"</") {
                if let Some((end_tag, next)) = parse_end_tag(bytes, i) {
                    out.push(end_tag);
                    i = next;
                    continue;
                }
            } else if starts_with(bytes, i, b"<!") {
                let next = skip_decl(bytes, i);
                let body = String::from_utf8_lossy(&bytes[i + 2..next.saturating_sub(1).max(i + 2)]);
                if body.trim_start().to_ascii_lowercase().starts_with("doctype") {
                    out.push(Token::Doctype(body.trim().to_owned()));
                }
                i = next;
                continue;
            } else if let Some((start_tag, next)) = parse_start_tag(bytes, i) {
                let mut raw_text_tag: Option<String> = None;
                if let Token::Start {
                    name, self_closing, ..
                } = &start_tag
                {
                    if !*self_closing && is_raw_text_tag(name) {
                        raw_text_tag = Some(name.clone());
                    }
                }

                out.push(start_tag);
                i = next;

                if let Some(tag_name) = raw_text_tag {
                    let (raw_text, closing_end) = parse_raw_text_until_end_tag(bytes, i, &tag_name);
                    if !raw_text.is_empty() {
                        if tag_name == "textarea" || tag_name == "title" {
                            out.push(Token::Text(raw_text));
                        } else {
                            out.push(Token::RawText(raw_text));
                        }
                    }

                    if let Some(closing_end) = closing_end {
                        out.push(Token::End { name: tag_name });
                        i = closing_end;
                    } else {
                        i = bytes.len();
                    }
                }

                continue;
            }
        }

        let (text, next) = parse_text(bytes, i);
        if !text.is_empty() {
            out.push(Token::Text(text));
        }
        i = next.max(i + 1);
    }

    out
}

fn build_tree(tokens: Vec<Token>) -> Document {
    let mut document = Document::empty();
    let mut stack: Vec<NodeId> = vec![document.root()];
    // `pre`/`textarea` whose first text child still owes the leading-newline strip.
    let mut leading_newline_owner: Option<NodeId> = None;

    for token in tokens {
        let current = stack.last().copied().unwrap_or(document.root());
        let strip_newline = leading_newline_owner.take() == Some(current);
        match token {
            Token::Doctype(_) => {}
            Token::Text(text) => {
                let mut decoded = decode_entities(&text);
                if strip_newline {
                    decoded = strip_leading_newline(&decoded).to_owned();
                }
                if !decoded.is_empty() {
                    let node = document.create_text(&decoded);
                    attach(&mut document, current, node);
                }
            }
            Token::RawText(text) => {
                let node = document.create_text(&text);
                attach(&mut document, current, node);
            }
            Token::Start {
                name,
                attrs,
                self_closing,
            } => {
                let element = document.create_element(&name);
                for (attr_name, value) in &attrs {
                    if document.has_attribute(element, attr_name) {
                        continue;
                    }
                    if let Err(error) = document.set_attribute(element, attr_name, value) {
                        debug!(%error, attr_name = %attr_name, "attribute dropped");
                    }
                }
                attach(&mut document, current, element);
                if !self_closing && !is_void(&name) {
                    stack.push(element);
                    if matches!(name.as_str(), "pre" | "textarea" | "listing") {
                        leading_newline_owner = Some(element);
                    }
                }
            }
            Token::End { name } => {
                let Some(position) = stack
                    .iter()
                    .rposition(|node| document.tag_name(*node) == Some(name.as_str()))
                else {
                    continue;
                };
                if position > 0 {
                    stack.truncate(position);
                }
            }
        }
    }

    document
}

fn attach(document: &mut Document, parent: NodeId, child: NodeId) {
    if let Err(error) = document.append_child(parent, child) {
        debug!(%error, parent, child, "node left detached");
    }
}

/// Drops the single line break a `pre` or `textarea` start tag swallows.
fn strip_leading_newline(text: &str) -> &str {
    text.strip_prefix("\r\n")
        .or_else(|| text.strip_prefix('\n'))
        .or_else(|| text.strip_prefix('\r'))
        .unwrap_or(text)
}

fn find_title(document: &Document) -> Option<String> {
    let title = document.query_selector("title").ok().flatten()?;
    let collapsed = collapse_whitespace(&document.text_content(title));
    (!collapsed.is_empty()).then_some(collapsed)
}

fn write_node(document: &Document, id: NodeId, out: &mut String) {
    match document.kind(id) {
        Some(NodeKind::Document) => {
            for child in document.children(id) {
                write_node(document, *child, out);
            }
        }
        Some(NodeKind::Text(text)) => {
            let raw_parent = document
                .parent_element(id)
                .and_then(|parent| document.tag_name(parent))
                .is_some_and(|tag| matches!(tag, "script" | "style"));
            if raw_parent {
                out.push_str(text);
            } else {
                escape_text(text, out);
            }
        }
        Some(NodeKind::Element(data)) => {
            if data.tag == "html" && document.parent(id) == Some(document.root()) {
                out.push_str("<!DOCTYPE html>");
            }
            out.push('<');
            out.push_str(&data.tag);
            for (name, value) in &data.attrs {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                escape_attribute(value, out);
                out.push('"');
            }
            out.push('>');
            if is_void(&data.tag) {
                return;
            }
            if data.tag == "textarea" {
                let value = document.value(id);
                if value.starts_with('\n') {
                    out.push('\n');
                }
                escape_text(&value, out);
            } else {
                if data.tag == "pre"
                    && document
                        .children(id)
                        .first()
                        .and_then(|child| match document.kind(*child) {
                            Some(NodeKind::Text(text)) => Some(text.starts_with('\n')),
                            _ => None,
                        })
                        .unwrap_or(false)
                {
                    out.push('\n');
                }
                for child in document.children(id) {
                    write_node(document, *child, out);
                }
            }
            out.push_str("</");
            out.push_str(&data.tag);
            out.push('>');
        }
        None => {}
    }
}

fn escape_text(input: &str, out: &mut String) {
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
}

fn escape_attribute(input: &str, out: &mut String) {
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
}

fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_entities(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut cursor = 0_usize;

    while let Some(rel_amp) = input[cursor..].find('&') {
        let amp = cursor + rel_amp;
        out.push_str(&input[cursor..amp]);

        let rest = &input[(amp + 1)..];
        let Some(rel_semi) = rest.find(';') else {
            out.push('&');
            cursor = amp + 1;
            continue;
        };

        let semi = amp + 1 + rel_semi;
        let entity = &input[(amp + 1)..semi];
        if let Some(decoded) = decode_entity(entity) {
            out.push(decoded);
            cursor = semi + 1;
        } else {
            out.push('&');
            cursor = amp + 1;
        }
    }

    out.push_str(&input[cursor..]);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "nbsp" => Some('\u{a0}'),
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "aacute" => Some('á'),
        "eacute" => Some('é'),
        "iacute" => Some('í'),
        "oacute" => Some('ó'),
        "uacute" => Some('ú'),
        "ntilde" => Some('ñ'),
        "Ntilde" => Some('Ñ'),
        "iquest" => Some('¿'),
        "iexcl" => Some('¡'),
        _ => {
            if let Some(hex) = entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
            {
                let value = u32::from_str_radix(hex, 16).ok()?;
                char::from_u32(value)
            } else if let Some(dec) = entity.strip_prefix('#') {
                let value = dec.parse::<u32>().ok()?;
                char::from_u32(value)
            } else {
                None
            }
        }
    }
}

fn starts_with(bytes: &[u8], i: usize, pat: &[u8]) -> bool {
    let end = i.saturating_add(pat.len());
    end <= bytes.len() && &bytes[i..end] == pat
}

fn skip_comment(bytes: &[u8], start: usize) -> usize {
    let mut i = start.saturating_add(4);
    while i + 2 < bytes.len() {
        if bytes[i] == b'-' && bytes[i + 1] == b'-' && bytes[i + 2] == b'>' {
            return i + 3;
        }
        i += 1;
    }
    bytes.len()
}

fn skip_decl(bytes: &[u8], start: usize) -> usize {
    let mut i = start + 2;
    while i < bytes.len() {
        if bytes[i] == b'>' {
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}

fn parse_text(bytes: &[u8], start: usize) -> (String, usize) {
    let mut i = start + 1;
    while i < bytes.len() && bytes[i] != b'<' {
        i += 1;
    }
    (String::from_utf8_lossy(&bytes[start..i]).to_string(), i)
}

fn parse_raw_text_until_end_tag(
    bytes: &[u8],
    start: usize,
    tag_name: &str,
) -> (String, Option<usize>) {
    let tag_bytes = tag_name.as_bytes();
    let mut i = start;

    while i < bytes.len() {
        if bytes[i] != b'<' || i + 2 + tag_bytes.len() > bytes.len() || bytes[i + 1] != b'/' {
            i = i.saturating_add(1);
            continue;
        }

        let name_start = i + 2;
        let name_end = name_start + tag_bytes.len();
        if !bytes[name_start..name_end].eq_ignore_ascii_case(tag_bytes) {
            i = i.saturating_add(1);
            continue;
        }

        let mut close = name_end;
        while close < bytes.len() && bytes[close].is_ascii_whitespace() {
            close = close.saturating_add(1);
        }

        if close < bytes.len() && bytes[close] == b'>' {
            let text = String::from_utf8_lossy(&bytes[start..i]).to_string();
            return (text, Some(close + 1));
        }

        i = i.saturating_add(1);
    }

    (String::from_utf8_lossy(&bytes[start..]).to_string(), None)
}

fn parse_end_tag(bytes: &[u8], start: usize) -> Option<(Token, usize)> {
    let mut i = start + 2;
    skip_spaces(bytes, &mut i);
    let begin = i;
    while i < bytes.len() && is_name_char(bytes[i]) {
        i += 1;
    }
    if i == begin {
        return None;
    }

    let name = String::from_utf8_lossy(&bytes[begin..i]).to_ascii_lowercase();
    while i < bytes.len() && bytes[i] != b'>' {
        i += 1;
    }
    if i >= bytes.len() {
        return None;
    }

    Some((Token::End { name }, i + 1))
}

fn parse_start_tag(bytes: &[u8], start: usize) -> Option<(Token, usize)> {
    let mut i = start + 1;
    if !bytes.get(i).is_some_and(u8::is_ascii_alphabetic) {
        return None;
    }
    let begin = i;
    while i < bytes.len() && is_name_char(bytes[i]) {
        i += 1;
    }

    let name = String::from_utf8_lossy(&bytes[begin..i]).to_ascii_lowercase();
    let mut attrs = Vec::new();
    let mut self_closing = false;

    loop {
        skip_spaces(bytes, &mut i);
        if i >= bytes.len() {
            return None;
        }

        if bytes[i] == b'>' {
            i += 1;
            break;
        }

        if bytes[i] == b'/' {
            self_closing = true;
            i += 1;
            skip_spaces(bytes, &mut i);
            if i < bytes.len() && bytes[i] == b'>' {
                i += 1;
                break;
            }
            continue;
        }

        let name_start = i;
        while i < bytes.len() && is_attr_name_char(bytes[i]) {
            i += 1;
        }
        if i == name_start {
            i += 1;
            continue;
        }

        let attr_name = String::from_utf8_lossy(&bytes[name_start..i]).to_ascii_lowercase();
        skip_spaces(bytes, &mut i);

        let mut value = String::new();
        if i < bytes.len() && bytes[i] == b'=' {
            i += 1;
            skip_spaces(bytes, &mut i);
            if i < bytes.len() && (bytes[i] == b'"' || bytes[i] == b'\'') {
                let quote = bytes[i];
                i += 1;
                let value_start = i;
                while i < bytes.len() && bytes[i] != quote {
                    i += 1;
                }
                value = String::from_utf8_lossy(&bytes[value_start..i]).to_string();
                if i < bytes.len() && bytes[i] == quote {
                    i += 1;
                }
            } else {
                let value_start = i;
                while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
                    i += 1;
                }
                value = String::from_utf8_lossy(&bytes[value_start..i]).to_string();
            }
        }

        attrs.push((attr_name, decode_entities(&value)));
    }

    Some((
        Token::Start {
            name,
            attrs,
            self_closing,
        },
        i,
    ))
}

fn skip_spaces(bytes: &[u8], i: &mut usize) {
    while *i < bytes.len() && bytes[*i].is_ascii_whitespace() {
        *i += 1;
    }
}

fn is_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b':')
}

fn is_attr_name_char(b: u8) -> bool {
    !b.is_ascii_whitespace() && !matches!(b, b'=' | b'>' | b'/' | b'"' | b'\'' | b'<')
}

fn is_raw_text_tag(tag: &str) -> bool {
    matches!(tag, "script" | "style" | "textarea" | "title")
}

fn is_void(tag: &str) -> bool {
    matches!(
        tag,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

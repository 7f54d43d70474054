//! CSS selector parsing and matching against the arena tree.

use crate::Document;
use crate::NodeId;
use pe_core::EnhancerError;
use pe_core::EnhancerResult;

/// Comma-separated list of complex selectors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList {
    selectors: Vec<Selector>,
}

/// Segments stored right-to-left: `segments[0]` is the subject.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Selector {
    segments: Vec<SelectorSegment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SelectorSegment {
    compound: CompoundSelector,
    combinator_to_next: Option<SelectorCombinator>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SelectorCombinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct CompoundSelector {
    tag: Option<String>,
    ids: Vec<String>,
    classes: Vec<String>,
    attributes: Vec<AttributeSelector>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttributeSelector {
    name: String,
    condition: Option<(AttributeOperator, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttributeOperator {
    Equals,
    Prefix,
    Suffix,
    Substring,
    Includes,
    DashMatch,
}

impl SelectorList {
    pub fn parse(input: &str) -> EnhancerResult<Self> {
        let mut cursor = Cursor {
            input,
            bytes: input.as_bytes(),
            idx: 0,
        };
        let mut selectors = Vec::new();

        loop {
            cursor.skip_spaces();
            selectors.push(cursor.parse_selector()?);
            cursor.skip_spaces();
            match cursor.peek() {
                None => break,
                Some(b',') => cursor.idx += 1,
                Some(_) => return Err(cursor.error("unexpected character")),
            }
        }

        Ok(Self { selectors })
    }

    pub fn matches(&self, document: &Document, id: NodeId) -> bool {
        if document.element(id).is_none() {
            return false;
        }
        self.selectors
            .iter()
            .any(|selector| matches_from(document, &selector.segments, 0, id))
    }
}

fn matches_from(
    document: &Document,
    segments: &[SelectorSegment],
    index: usize,
    id: NodeId,
) -> bool {
    let Some(segment) = segments.get(index) else {
        return false;
    };
    if !matches_compound(document, &segment.compound, id) {
        return false;
    }

    match segment.combinator_to_next {
        None => true,
        Some(SelectorCombinator::Child) => document
            .parent_element(id)
            .is_some_and(|parent| matches_from(document, segments, index + 1, parent)),
        Some(SelectorCombinator::Descendant) => {
            let mut ancestor = document.parent_element(id);
            while let Some(current) = ancestor {
                if matches_from(document, segments, index + 1, current) {
                    return true;
                }
                ancestor = document.parent_element(current);
            }
            false
        }
    }
}

fn matches_compound(document: &Document, compound: &CompoundSelector, id: NodeId) -> bool {
    let Some(element) = document.element(id) else {
        return false;
    };

    if let Some(tag) = &compound.tag {
        if element.tag != *tag {
            return false;
        }
    }

    if !compound
        .ids
        .iter()
        .all(|expected| element.attr("id") == Some(expected.as_str()))
    {
        return false;
    }

    if !compound
        .classes
        .iter()
        .all(|class_name| element.has_class(class_name))
    {
        return false;
    }

    compound.attributes.iter().all(|attribute| {
        let Some(actual) = element.attr(&attribute.name) else {
            return false;
        };
        let Some((operator, expected)) = &attribute.condition else {
            return true;
        };
        match operator {
            AttributeOperator::Equals => actual == expected,
            AttributeOperator::Prefix => !expected.is_empty() && actual.starts_with(expected),
            AttributeOperator::Suffix => !expected.is_empty() && actual.ends_with(expected),
            AttributeOperator::Substring => !expected.is_empty() && actual.contains(expected),
            AttributeOperator::Includes => {
                !expected.is_empty()
                    && !expected.contains(|ch: char| ch.is_ascii_whitespace())
                    && actual
                        .split_ascii_whitespace()
                        .any(|word| word == expected)
            }
            AttributeOperator::DashMatch => {
                actual == expected
                    || actual
                        .strip_prefix(expected.as_str())
                        .is_some_and(|rest| rest.starts_with('-'))
            }
        }
    })
}

struct Cursor<'a> {
    input: &'a str,
    bytes: &'a [u8],
    idx: usize,
}

impl Cursor<'_> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.idx).copied()
    }

    fn skip_spaces(&mut self) -> bool {
        let start = self.idx;
        while self.peek().is_some_and(|byte| byte.is_ascii_whitespace()) {
            self.idx += 1;
        }
        self.idx > start
    }

    fn error(&self, reason: &str) -> EnhancerError {
        EnhancerError::new(
            "dom.invalid_selector",
            format!("`{}` at offset {}: {reason}", self.input, self.idx),
        )
    }

    fn parse_selector(&mut self) -> EnhancerResult<Selector> {
        let mut compounds = vec![self.parse_compound()?];
        let mut combinators = Vec::new();

        loop {
            let had_space = self.skip_spaces();
            match self.peek() {
                None | Some(b',') => break,
                Some(b'>') => {
                    self.idx += 1;
                    self.skip_spaces();
                    combinators.push(SelectorCombinator::Child);
                }
                Some(b'+' | b'~') => {
                    return Err(self.error("sibling combinators are not supported"));
                }
                Some(_) if had_space => combinators.push(SelectorCombinator::Descendant),
                Some(_) => return Err(self.error("unexpected character")),
            }
            compounds.push(self.parse_compound()?);
        }

        let mut segments = Vec::with_capacity(compounds.len());
        for (index, compound) in compounds.into_iter().enumerate().rev() {
            let combinator_to_next = index
                .checked_sub(1)
                .and_then(|previous| combinators.get(previous).copied());
            segments.push(SelectorSegment {
                compound,
                combinator_to_next,
            });
        }

        Ok(Selector { segments })
    }

    fn parse_compound(&mut self) -> EnhancerResult<CompoundSelector> {
        let mut compound = CompoundSelector::default();
        let mut parsed_any = false;

        if self.peek() == Some(b'*') {
            self.idx += 1;
            parsed_any = true;
        } else if self.peek().is_some_and(is_ident_start) {
            compound.tag = Some(self.parse_ident()?.to_ascii_lowercase());
            parsed_any = true;
        }

        loop {
            match self.peek() {
                Some(b'#') => {
                    self.idx += 1;
                    compound.ids.push(self.parse_ident()?);
                }
                Some(b'.') => {
                    self.idx += 1;
                    compound.classes.push(self.parse_ident()?);
                }
                Some(b'[') => {
                    self.idx += 1;
                    compound.attributes.push(self.parse_attribute()?);
                }
                Some(b':') => return Err(self.error("pseudo-classes are not supported")),
                _ => break,
            }
            parsed_any = true;
        }

        if parsed_any {
            Ok(compound)
        } else {
            Err(self.error("expected a selector"))
        }
    }

    fn parse_ident(&mut self) -> EnhancerResult<String> {
        let start = self.idx;
        if self.peek() == Some(b'-') {
            self.idx += 1;
        }
        if !self.peek().is_some_and(is_ident_start) {
            self.idx = start;
            return Err(self.error("expected an identifier"));
        }
        while self.peek().is_some_and(is_ident_char) {
            self.idx += 1;
        }
        Ok(self.input[start..self.idx].to_owned())
    }

    fn parse_attribute(&mut self) -> EnhancerResult<AttributeSelector> {
        self.skip_spaces();
        let name = self.parse_ident()?.to_ascii_lowercase();
        self.skip_spaces();

        let operator = match self.peek() {
            Some(b']') => {
                self.idx += 1;
                return Ok(AttributeSelector {
                    name,
                    condition: None,
                });
            }
            Some(b'=') => {
                self.idx += 1;
                AttributeOperator::Equals
            }
            Some(marker) if self.bytes.get(self.idx + 1) == Some(&b'=') => {
                let operator = match marker {
                    b'^' => AttributeOperator::Prefix,
                    b'$' => AttributeOperator::Suffix,
                    b'*' => AttributeOperator::Substring,
                    b'~' => AttributeOperator::Includes,
                    b'|' => AttributeOperator::DashMatch,
                    _ => return Err(self.error("unknown attribute operator")),
                };
                self.idx += 2;
                operator
            }
            _ => return Err(self.error("malformed attribute selector")),
        };

        self.skip_spaces();
        let value = match self.peek() {
            Some(quote @ (b'"' | b'\'')) => self.parse_string(quote)?,
            _ => self.parse_ident()?,
        };
        self.skip_spaces();
        if self.peek() != Some(b']') {
            return Err(self.error("unterminated attribute selector"));
        }
        self.idx += 1;

        Ok(AttributeSelector {
            name,
            condition: Some((operator, value)),
        })
    }

    fn parse_string(&mut self, quote: u8) -> EnhancerResult<String> {
        self.idx += 1;
        let mut out = String::new();
        let mut chunk_start = self.idx;

        while let Some(byte) = self.peek() {
            if byte == quote {
                out.push_str(&self.input[chunk_start..self.idx]);
                self.idx += 1;
                return Ok(out);
            }
            if byte == b'\\' {
                out.push_str(&self.input[chunk_start..self.idx]);
                self.idx += 1;
                let Some(escaped) = self.input[self.idx..].chars().next() else {
                    break;
                };
                out.push(escaped);
                self.idx += escaped.len_utf8();
                chunk_start = self.idx;
                continue;
            }
            self.idx += 1;
        }

        Err(self.error("unterminated string"))
    }
}

fn is_ident_start(byte: u8) -> bool {
    byte.is_ascii_alphabetic() || byte == b'_' || byte >= 0x80
}

fn is_ident_char(byte: u8) -> bool {
    is_ident_start(byte) || byte.is_ascii_digit() || byte == b'-'
}

//! Annotated YAML parser
//!
//! Parses the block-style YAML used by template sources while keeping what a
//! plain YAML loader throws away: the 1-based line of every node and the
//! `#@` comments that annotate it.
//!
//! - `#@name args` on its own line annotates the next node. Placed before
//!   `---` it annotates the document.
//! - `key: #@ expr` attaches a value expression to the entry.
//! - `#@ code` lines and ordinary comments are skipped.
//!
//! Scalar and flow-collection text is resolved by `serde_yaml`, so quoting,
//! booleans, numbers and nulls follow YAML 1.2 core schema rules.

use crate::error::{Error, Result};
use crate::meta::{Annotation, Meta, Position};
use crate::node::{Document, DocumentSet, Entry, Item, Mapping, Node, Sequence};
use render_fs::Source;

/// Parse every document of a loaded source.
pub fn parse_source(source: &Source) -> Result<DocumentSet> {
    parse_documents(source.origin(), source.content())
}

/// Parse a YAML stream into documents, attributing positions to `origin`.
pub fn parse_documents(origin: &str, text: &str) -> Result<DocumentSet> {
    let lines = text
        .lines()
        .enumerate()
        .map(|(i, l)| Line {
            number: i + 1,
            text: l.trim_end_matches('\r').to_string(),
        })
        .collect();

    let parser = Parser {
        origin,
        lines,
        pos: 0,
        pending: Vec::new(),
    };
    let documents = parser.parse()?;
    tracing::trace!(origin, documents = documents.len(), "Parsed template source");

    Ok(DocumentSet {
        origin: origin.to_string(),
        documents,
    })
}

#[derive(Debug, Clone)]
struct Line {
    number: usize,
    text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Chomp {
    Clip,
    Strip,
    Keep,
}

struct Parser<'a> {
    origin: &'a str,
    lines: Vec<Line>,
    pos: usize,
    /// Annotations read but not yet attached to a node
    pending: Vec<Annotation>,
}

impl Parser<'_> {
    fn parse(mut self) -> Result<Vec<Document>> {
        let mut documents = Vec::new();

        loop {
            self.skip_trivia();
            let Some(line) = self.current() else {
                break;
            };

            if is_doc_start(&line.text) {
                self.pos += 1;
                let (value, expression) = split_comment(line.text[3..].trim());
                let meta = Meta {
                    position: Some(self.position(line.number)),
                    annotations: std::mem::take(&mut self.pending),
                    expression,
                };
                let root = if value.is_empty() {
                    self.parse_body()?
                } else {
                    self.scalar(value, line.number)?
                };
                documents.push(Document { meta, root });
            } else {
                // Stream without a leading `---`
                let meta = Meta::at(self.position(line.number));
                let root = self.parse_body()?;
                documents.push(Document { meta, root });
            }
        }

        if !self.pending.is_empty() {
            tracing::trace!(
                origin = self.origin,
                count = self.pending.len(),
                "Dropping trailing annotations with no node"
            );
        }

        Ok(documents)
    }

    fn parse_body(&mut self) -> Result<Node> {
        self.skip_trivia();
        let Some(line) = self.current() else {
            return Ok(Node::NULL);
        };
        if is_doc_start(&line.text) {
            return Ok(Node::NULL);
        }

        let indent = self.indent(&line)?;
        let root = self.parse_block(indent)?;

        self.skip_trivia();
        match self.current() {
            Some(next) if !is_doc_start(&next.text) => Err(Error::parse(
                self.position(next.number),
                "unexpected content after end of document body",
            )),
            _ => Ok(root),
        }
    }

    /// Parse the collection (or lone scalar) whose first line is at `indent`.
    fn parse_block(&mut self, indent: usize) -> Result<Node> {
        let Some(line) = self.current() else {
            return Ok(Node::NULL);
        };
        let content = &line.text[indent..];

        if is_seq_item(content) {
            self.parse_sequence(indent)
        } else if split_key(content).is_some() {
            self.parse_mapping(indent)
        } else {
            self.pos += 1;
            let (value, _) = split_comment(content);
            self.parse_value(value, indent, line.number, false)
        }
    }

    fn parse_mapping(&mut self, indent: usize) -> Result<Node> {
        let mut mapping = Mapping::new();

        loop {
            self.skip_trivia();
            let Some(line) = self.current() else {
                break;
            };
            if is_doc_start(&line.text) {
                break;
            }

            let line_indent = self.indent(&line)?;
            if line_indent < indent {
                break;
            }
            if line_indent > indent {
                return Err(Error::parse(
                    self.position(line.number),
                    "unexpected indentation",
                ));
            }

            let content = &line.text[line_indent..];
            if is_seq_item(content) {
                break;
            }
            let Some((key, rest)) = split_key(content) else {
                return Err(Error::parse(
                    self.position(line.number),
                    format!("expected a map item, found '{content}'"),
                ));
            };
            self.pos += 1;

            let position = self.position(line.number);
            if mapping.contains_key(&key) {
                return Err(Error::DuplicateKey { key, position });
            }

            let (value_text, expression) = split_comment(rest);
            let meta = Meta {
                position: Some(position),
                annotations: std::mem::take(&mut self.pending),
                expression,
            };
            let value = self.parse_value(value_text, line_indent, line.number, true)?;
            mapping.insert_entry(Entry { key, value, meta });
        }

        Ok(Node::Mapping(mapping))
    }

    fn parse_sequence(&mut self, indent: usize) -> Result<Node> {
        let mut sequence = Sequence::new();

        loop {
            self.skip_trivia();
            let Some(line) = self.current() else {
                break;
            };
            if is_doc_start(&line.text) {
                break;
            }

            let line_indent = self.indent(&line)?;
            if line_indent < indent {
                break;
            }
            if line_indent > indent {
                return Err(Error::parse(
                    self.position(line.number),
                    "unexpected indentation",
                ));
            }

            let content = &line.text[line_indent..];
            if !is_seq_item(content) {
                break;
            }

            let after_dash = &content[1..];
            let rest = after_dash.trim_start();
            let column = line_indent + 1 + (after_dash.len() - rest.len());
            let mut meta = Meta {
                position: Some(self.position(line.number)),
                annotations: std::mem::take(&mut self.pending),
                expression: None,
            };

            let value = if !rest.is_empty() && (is_seq_item(rest) || split_key(rest).is_some()) {
                // Compact `- key: value` / `- - x`: re-read the line with the
                // dash blanked out so the nested collection starts at `column`.
                self.lines[self.pos].text = format!("{}{}", " ".repeat(column), rest);
                self.parse_block(column)?
            } else {
                self.pos += 1;
                let (value_text, expression) = split_comment(rest);
                meta.expression = expression;
                self.parse_value(value_text, line_indent, line.number, false)?
            };

            sequence.items.push(Item { value, meta });
        }

        Ok(Node::Sequence(sequence))
    }

    /// Parse the value that follows `key:` or `-` on line `number`.
    fn parse_value(
        &mut self,
        text: &str,
        parent_indent: usize,
        number: usize,
        allow_same_indent_sequence: bool,
    ) -> Result<Node> {
        if !text.is_empty() {
            return match block_scalar_header(text) {
                Some((literal, chomp)) => Ok(self.block_scalar(literal, chomp, parent_indent)),
                None => self.scalar(text, number),
            };
        }

        self.skip_trivia();
        let Some(next) = self.current() else {
            return Ok(Node::NULL);
        };
        if is_doc_start(&next.text) {
            return Ok(Node::NULL);
        }

        let next_indent = self.indent(&next)?;
        if next_indent > parent_indent {
            self.parse_block(next_indent)
        } else if next_indent == parent_indent
            && allow_same_indent_sequence
            && is_seq_item(&next.text[next_indent..])
        {
            self.parse_sequence(next_indent)
        } else {
            Ok(Node::NULL)
        }
    }

    fn block_scalar(&mut self, literal: bool, chomp: Chomp, parent_indent: usize) -> Node {
        let mut raw: Vec<String> = Vec::new();
        let mut block_indent: Option<usize> = None;

        while let Some(line) = self.lines.get(self.pos) {
            if line.text.trim().is_empty() {
                raw.push(String::new());
                self.pos += 1;
                continue;
            }
            let line_indent = leading_spaces(&line.text);
            if line_indent <= parent_indent {
                break;
            }
            let indent = *block_indent.get_or_insert(line_indent);
            if line_indent < indent {
                break;
            }
            raw.push(line.text[indent..].to_string());
            self.pos += 1;
        }

        let content_end = raw.iter().rposition(|l| !l.is_empty()).map_or(0, |i| i + 1);
        let trailing_blank = raw.len() - content_end;
        let body = &raw[..content_end];

        let mut text = if literal { body.join("\n") } else { fold(body) };
        match chomp {
            Chomp::Strip => {}
            Chomp::Clip => {
                if content_end > 0 {
                    text.push('\n');
                }
            }
            Chomp::Keep => {
                text.push('\n');
                text.push_str(&"\n".repeat(trailing_blank));
            }
        }
        Node::string(text)
    }

    fn scalar(&self, text: &str, number: usize) -> Result<Node> {
        serde_yaml::from_str::<serde_yaml::Value>(text)
            .map(Node::from)
            .map_err(|e| Error::parse(self.position(number), e.to_string()))
    }

    /// Skip blank lines and comments, collecting `#@name` annotations.
    fn skip_trivia(&mut self) {
        while let Some(line) = self.lines.get(self.pos) {
            let trimmed = line.text.trim();
            if trimmed.is_empty() || trimmed == "..." {
                self.pos += 1;
                continue;
            }
            let Some(comment) = trimmed.strip_prefix('#') else {
                break;
            };
            if let Some(body) = comment.strip_prefix('@') {
                if body.is_empty() || body.starts_with(char::is_whitespace) {
                    tracing::trace!(line = line.number, "Skipping code annotation");
                } else {
                    let annotation = Annotation::parse(body, self.position(line.number));
                    self.pending.push(annotation);
                }
            }
            self.pos += 1;
        }
    }

    fn current(&self) -> Option<Line> {
        self.lines.get(self.pos).cloned()
    }

    fn indent(&self, line: &Line) -> Result<usize> {
        let spaces = leading_spaces(&line.text);
        if line.text[spaces..].starts_with('\t') {
            return Err(Error::parse(
                self.position(line.number),
                "tabs are not allowed for indentation",
            ));
        }
        Ok(spaces)
    }

    fn position(&self, line: usize) -> Position {
        Position::new(self.origin, line)
    }
}

fn leading_spaces(text: &str) -> usize {
    text.len() - text.trim_start_matches(' ').len()
}

fn is_doc_start(text: &str) -> bool {
    text == "---" || text.starts_with("--- ") || text.starts_with("---\t")
}

fn is_seq_item(content: &str) -> bool {
    content == "-" || content.starts_with("- ")
}

/// Split `key: rest` into the decoded key and the text after the colon.
fn split_key(content: &str) -> Option<(String, &str)> {
    if content.starts_with('{') || content.starts_with('[') {
        return None;
    }

    if let Some(quote) = content.chars().next().filter(|c| *c == '"' || *c == '\'') {
        let close = find_closing_quote(content, quote)?;
        let after = content[close + 1..].trim_start();
        let rest = after.strip_prefix(':')?;
        if !(rest.is_empty() || rest.starts_with(' ')) {
            return None;
        }
        let raw = &content[..=close];
        let key = serde_yaml::from_str::<String>(raw)
            .unwrap_or_else(|_| raw[1..raw.len() - 1].to_string());
        return Some((key, rest.trim_start()));
    }

    let mut prev_whitespace = true;
    for (i, ch) in content.char_indices() {
        if ch == '#' && prev_whitespace {
            return None;
        }
        if ch == ':' {
            let rest = &content[i + 1..];
            if rest.is_empty() || rest.starts_with(' ') || rest.starts_with('\t') {
                let key = content[..i].trim_end();
                if key.is_empty() {
                    return None;
                }
                return Some((key.to_string(), rest.trim_start()));
            }
        }
        prev_whitespace = ch.is_whitespace();
    }
    None
}

fn find_closing_quote(content: &str, quote: char) -> Option<usize> {
    let mut escaped = false;
    let mut iter = content.char_indices().skip(1).peekable();
    while let Some((i, ch)) = iter.next() {
        if quote == '"' {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                return Some(i);
            }
        } else if ch == '\'' {
            // '' is an escaped quote inside single-quoted scalars
            if matches!(iter.peek(), Some((_, '\''))) {
                iter.next();
            } else {
                return Some(i);
            }
        }
    }
    None
}

/// Separate a value from its trailing comment. A `#@ expr` comment is
/// returned as the value expression.
fn split_comment(text: &str) -> (&str, Option<String>) {
    let quoted = text.starts_with('"') || text.starts_with('\'');
    let mut in_single = false;
    let mut in_double = false;
    let mut escaped = false;
    let mut depth = 0usize;
    let mut prev_whitespace = true;

    for (i, ch) in text.char_indices() {
        let track_quotes = quoted || depth > 0;
        match ch {
            _ if escaped => escaped = false,
            '\\' if in_double => escaped = true,
            '"' if track_quotes && !in_single => in_double = !in_double,
            '\'' if track_quotes && !in_double => in_single = !in_single,
            '[' | '{' if !in_single && !in_double && (i == 0 || depth > 0) => depth += 1,
            ']' | '}' if !in_single && !in_double && depth > 0 => depth -= 1,
            '#' if !in_single && !in_double && prev_whitespace => {
                let expression = text[i + 1..]
                    .strip_prefix('@')
                    .filter(|e| e.starts_with(char::is_whitespace))
                    .map(|e| e.trim().to_string())
                    .filter(|e| !e.is_empty());
                return (text[..i].trim_end(), expression);
            }
            _ => {}
        }
        prev_whitespace = ch.is_whitespace();
    }

    (text.trim_end(), None)
}

/// Recognise `|`, `|-`, `|+`, `>` (optionally with an indentation digit).
fn block_scalar_header(text: &str) -> Option<(bool, Chomp)> {
    let mut chars = text.chars();
    let literal = match chars.next()? {
        '|' => true,
        '>' => false,
        _ => return None,
    };
    let mut chomp = Chomp::Clip;
    for ch in chars {
        match ch {
            '-' => chomp = Chomp::Strip,
            '+' => chomp = Chomp::Keep,
            '1'..='9' => {}
            _ => return None,
        }
    }
    Some((literal, chomp))
}

fn fold(lines: &[String]) -> String {
    let mut out = String::new();
    let mut prev_blank = true;
    for line in lines {
        if line.is_empty() {
            out.push('\n');
            prev_blank = true;
            continue;
        }
        if !prev_blank {
            out.push(' ');
        }
        out.push_str(line);
        prev_blank = false;
    }
    out
}

//! Value expressions
//!
//! The text after `#@ ` on a template line is a small expression:
//!
//! ```text
//! expr      := literal | call | reference
//! call      := name "(" [expr ("," expr)*] ")"
//! reference := "values" "." path      data values
//!            | name ["." path]        computed field
//! literal   := "..." | '...' | number | true | false | null
//! ```

use crate::error::{Error, Result};
use render_values::path::{PathSegment, parse_path};
use render_values::{Node, Scalar};
use std::fmt;

/// Built-in functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    /// `feature_gates(table, overrides)`
    FeatureGates,
    /// `optional(expr)`: drop the node when the value is null or missing.
    Optional,
    /// `join(list, separator)`
    Join,
    /// `yaml(expr)`: serialize to YAML text.
    Yaml,
    /// `default(expr, fallback)`
    Default,
    /// `ip_stack(cidr...)`
    IpStack,
}

impl Function {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "feature_gates" => Self::FeatureGates,
            "optional" => Self::Optional,
            "join" => Self::Join,
            "yaml" => Self::Yaml,
            "default" => Self::Default,
            "ip_stack" => Self::IpStack,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::FeatureGates => "feature_gates",
            Self::Optional => "optional",
            Self::Join => "join",
            Self::Yaml => "yaml",
            Self::Default => "default",
            Self::IpStack => "ip_stack",
        }
    }

    /// Accepted argument counts, inclusive.
    fn arity(self) -> (usize, usize) {
        match self {
            Self::FeatureGates | Self::Join | Self::Default => (2, 2),
            Self::Optional | Self::Yaml => (1, 1),
            Self::IpStack => (1, usize::MAX),
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Node),
    /// `values.<path>`
    Value(Vec<PathSegment>),
    /// `<name>.<path>`
    Computed { name: String, path: Vec<PathSegment> },
    Call { function: Function, args: Vec<Expr> },
}

impl Expr {
    /// Parse an expression.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidExpression`] with `position` when the text does not
    /// parse or calls an unknown function.
    ///
    /// # Example
    ///
    /// ```
    /// use render_core::expr::{Expr, Function};
    ///
    /// let expr = Expr::parse("join(values.tls.suites, \",\")", "values.yaml:3").unwrap();
    /// assert!(matches!(expr, Expr::Call { function: Function::Join, .. }));
    /// ```
    pub fn parse(text: &str, position: &str) -> Result<Self> {
        let tokens = tokenize(text).map_err(|reason| invalid(text, position, reason))?;
        let mut parser = ExprParser {
            tokens: &tokens,
            pos: 0,
        };
        let expr = parser
            .expr()
            .map_err(|reason| invalid(text, position, reason))?;
        if parser.pos != tokens.len() {
            return Err(invalid(text, position, "unexpected trailing input".into()));
        }
        Ok(expr)
    }
}

fn invalid(text: &str, position: &str, reason: String) -> Error {
    Error::InvalidExpression {
        expression: text.to_string(),
        position: position.to_string(),
        reason,
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Str(String),
    Open,
    Close,
    Comma,
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '[' | ']' | '+')
}

fn tokenize(text: &str) -> std::result::Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::Open);
            }
            ')' => {
                chars.next();
                tokens.push(Token::Close);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '"' | '\'' => {
                chars.next();
                let mut literal = String::new();
                loop {
                    match chars.next() {
                        Some(ch) if ch == c => break,
                        Some('\\') if c == '"' => match chars.next() {
                            Some('n') => literal.push('\n'),
                            Some('t') => literal.push('\t'),
                            Some(other) => literal.push(other),
                            None => return Err("unterminated string".into()),
                        },
                        Some(ch) => literal.push(ch),
                        None => return Err("unterminated string".into()),
                    }
                }
                tokens.push(Token::Str(literal));
            }
            c if is_word_char(c) => {
                let mut word = String::new();
                while let Some(&ch) = chars.peek() {
                    if !is_word_char(ch) {
                        break;
                    }
                    word.push(ch);
                    chars.next();
                }
                tokens.push(Token::Word(word));
            }
            other => return Err(format!("unexpected character '{other}'")),
        }
    }
    Ok(tokens)
}

struct ExprParser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl ExprParser<'_> {
    fn next(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn expr(&mut self) -> std::result::Result<Expr, String> {
        match self.next().cloned() {
            Some(Token::Str(s)) => Ok(Expr::Literal(Node::string(s))),
            Some(Token::Word(word)) => {
                if self.peek() == Some(&Token::Open) {
                    self.pos += 1;
                    return self.call(&word);
                }
                Ok(word_expr(&word))
            }
            Some(other) => Err(format!("unexpected {other:?}")),
            None => Err("empty expression".into()),
        }
    }

    fn call(&mut self, name: &str) -> std::result::Result<Expr, String> {
        let function = Function::from_name(name).ok_or_else(|| format!("unknown function '{name}'"))?;
        let mut args = Vec::new();

        if self.peek() == Some(&Token::Close) {
            self.pos += 1;
        } else {
            loop {
                args.push(self.expr()?);
                match self.next() {
                    Some(Token::Comma) => continue,
                    Some(Token::Close) => break,
                    _ => return Err(format!("expected ',' or ')' in call to {name}")),
                }
            }
        }

        let (min, max) = function.arity();
        if args.len() < min || args.len() > max {
            return Err(format!("{name} takes {min} argument(s), got {}", args.len()));
        }
        Ok(Expr::Call { function, args })
    }
}

fn word_expr(word: &str) -> Expr {
    match word {
        "true" | "True" => return Expr::Literal(Node::bool(true)),
        "false" | "False" => return Expr::Literal(Node::bool(false)),
        "null" | "None" => return Expr::Literal(Node::NULL),
        _ => {}
    }
    if let Ok(i) = word.parse::<i64>() {
        return Expr::Literal(Node::Scalar(Scalar::Int(i)));
    }
    if word.starts_with(|c: char| c.is_ascii_digit() || c == '-' || c == '+') {
        if let Ok(f) = word.parse::<f64>() {
            return Expr::Literal(Node::Scalar(Scalar::Float(f)));
        }
    }

    match word.split_once('.') {
        Some(("values", rest)) => Expr::Value(parse_path(rest)),
        Some((name, rest)) => Expr::Computed {
            name: name.to_string(),
            path: parse_path(rest),
        },
        None if word == "values" => Expr::Value(Vec::new()),
        None => Expr::Computed {
            name: word.to_string(),
            path: Vec::new(),
        },
    }
}

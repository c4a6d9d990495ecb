//! Structural selectors.
//!
//! A small subset of CSS selector syntax, enough to express discovery
//! patterns and the structural contracts widgets rely on:
//!
//! - type and universal selectors: `div`, `*`
//! - `#id`, `.class`
//! - attributes: `[name]`, `[name=value]`, `[name="value"]`, `[name^="prefix"]`
//! - negation: `:not(...)`
//! - combinators: descendant (whitespace) and child (`>`)
//! - selector lists: `a, button`
//!
//! ```
//! use trellis_runtime::dom::Selector;
//!
//! let sel: Selector = ".dropdown-menu:not([data-dropdown-menu-initialized])".parse().unwrap();
//! assert_eq!(sel.as_str(), ".dropdown-menu:not([data-dropdown-menu-initialized])");
//! ```

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use super::{Document, NodeId};

/// Errors produced while parsing a selector.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectorError {
    /// The selector (or one list entry) is empty.
    #[error("empty selector in '{0}'")]
    Empty(String),

    /// An unexpected character was found.
    #[error("unexpected '{found}' at offset {offset} in '{source_text}'")]
    Unexpected {
        source_text: String,
        offset: usize,
        found: char,
    },

    /// The input ended in the middle of a construct.
    #[error("unexpected end of selector '{0}'")]
    UnexpectedEnd(String),

    /// A pseudo-class other than `:not` was used.
    #[error("unsupported pseudo-class ':{pseudo}' in '{source_text}'")]
    UnsupportedPseudo { source_text: String, pseudo: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals(String),
    Prefix(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrMatch {
    name: String,
    op: AttrOp,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrMatch>,
    negations: Vec<Selector>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    compounds: Vec<Compound>,
    /// `combinators[i]` joins `compounds[i]` and `compounds[i + 1]`.
    combinators: Vec<Combinator>,
}

/// A parsed selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    list: Vec<Complex>,
}

impl Selector {
    /// Parses a selector.
    ///
    /// # Errors
    ///
    /// Returns a [`SelectorError`] describing the first syntax problem.
    pub fn parse(source: &str) -> Result<Self, SelectorError> {
        let mut parser = Parser {
            source,
            chars: source.char_indices().collect(),
            pos: 0,
        };
        let list = parser.parse_list(false)?;
        Ok(Self {
            source: source.trim().to_string(),
            list,
        })
    }

    /// A selector that matches no element.
    #[must_use]
    pub fn never() -> Self {
        Self {
            source: String::new(),
            list: Vec::new(),
        }
    }

    /// The selector text as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Returns a selector matching what `self` matches minus elements that
    /// carry `attribute`.
    ///
    /// Used to build discovery selectors that skip initialized roots.
    #[must_use]
    pub fn without_attr(&self, attribute: &str) -> Self {
        let negation = Self {
            source: format!("[{attribute}]"),
            list: vec![Complex {
                compounds: vec![Compound {
                    attrs: vec![AttrMatch {
                        name: attribute.to_string(),
                        op: AttrOp::Exists,
                    }],
                    ..Compound::default()
                }],
                combinators: Vec::new(),
            }],
        };
        let list: Vec<Complex> = self
            .list
            .iter()
            .cloned()
            .map(|mut complex| {
                if let Some(last) = complex.compounds.last_mut() {
                    last.negations.push(negation.clone());
                }
                complex
            })
            .collect();
        let source = list
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        Self { source, list }
    }

    /// Returns true if the element matches any entry of the list.
    #[must_use]
    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        doc.is_element(node)
            && self.list.iter().any(|complex| {
                complex
                    .compounds
                    .len()
                    .checked_sub(1)
                    .is_some_and(|last| complex.matches_at(doc, node, last))
            })
    }
}

impl Complex {
    fn matches_at(&self, doc: &Document, node: NodeId, idx: usize) -> bool {
        if !self.compounds[idx].matches(doc, node) {
            return false;
        }
        if idx == 0 {
            return true;
        }
        match self.combinators[idx - 1] {
            Combinator::Child => doc
                .parent(node)
                .is_some_and(|p| doc.is_element(p) && self.matches_at(doc, p, idx - 1)),
            Combinator::Descendant => {
                let mut current = doc.parent(node);
                while let Some(p) = current {
                    if doc.is_element(p) && self.matches_at(doc, p, idx - 1) {
                        return true;
                    }
                    current = doc.parent(p);
                }
                false
            }
        }
    }
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag.is_none()
            && self.id.is_none()
            && self.classes.is_empty()
            && self.attrs.is_empty()
            && self.negations.is_empty()
    }

    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        if let Some(tag) = &self.tag {
            if tag != "*" && doc.tag(node) != Some(tag.as_str()) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if doc.attr(node, "id") != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.iter().all(|c| doc.has_class(node, c)) {
            return false;
        }
        let attrs_ok = self.attrs.iter().all(|a| match (&a.op, doc.attr(node, &a.name)) {
            (_, None) => false,
            (AttrOp::Exists, Some(_)) => true,
            (AttrOp::Equals(expected), Some(v)) => v == expected,
            (AttrOp::Prefix(prefix), Some(v)) => v.starts_with(prefix.as_str()),
        });
        attrs_ok && !self.negations.iter().any(|n| n.matches(doc, node))
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for AttrMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.op {
            AttrOp::Exists => write!(f, "[{}]", self.name),
            AttrOp::Equals(value) => write!(f, "[{}=\"{value}\"]", self.name),
            AttrOp::Prefix(value) => write!(f, "[{}^=\"{value}\"]", self.name),
        }
    }
}

impl fmt::Display for Compound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bare = self.id.is_none()
            && self.classes.is_empty()
            && self.attrs.is_empty()
            && self.negations.is_empty();
        match &self.tag {
            Some(tag) => f.write_str(tag)?,
            None if bare => f.write_str("*")?,
            None => {}
        }
        if let Some(id) = &self.id {
            write!(f, "#{id}")?;
        }
        for class in &self.classes {
            write!(f, ".{class}")?;
        }
        for attr in &self.attrs {
            write!(f, "{attr}")?;
        }
        for negation in &self.negations {
            write!(f, ":not({negation})")?;
        }
        Ok(())
    }
}

impl fmt::Display for Complex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, compound) in self.compounds.iter().enumerate() {
            if i > 0 {
                match self.combinators.get(i - 1) {
                    Some(Combinator::Child) => f.write_str(" > ")?,
                    _ => f.write_str(" ")?,
                }
            }
            write!(f, "{compound}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

struct Parser<'a> {
    source: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|&(_, c)| c)
    }

    fn offset(&self) -> usize {
        self.chars
            .get(self.pos)
            .map_or(self.source.len(), |&(offset, _)| offset)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn unexpected(&self) -> SelectorError {
        match self.peek() {
            Some(found) => SelectorError::Unexpected {
                source_text: self.source.to_string(),
                offset: self.offset(),
                found,
            },
            None => SelectorError::UnexpectedEnd(self.source.to_string()),
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), SelectorError> {
        if self.peek() == Some(expected) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    /// Parses a comma-separated list; stops at `)` when `nested`.
    fn parse_list(&mut self, nested: bool) -> Result<Vec<Complex>, SelectorError> {
        let mut list = Vec::new();
        loop {
            self.skip_ws();
            list.push(self.parse_complex()?);
            self.skip_ws();
            match self.peek() {
                Some(',') => {
                    self.pos += 1;
                }
                Some(')') if nested => return Ok(list),
                None if !nested => return Ok(list),
                _ => return Err(self.unexpected()),
            }
        }
    }

    fn parse_complex(&mut self) -> Result<Complex, SelectorError> {
        let mut compounds = vec![self.parse_compound()?];
        let mut combinators = Vec::new();
        loop {
            let had_ws = self.skip_ws();
            let combinator = match self.peek() {
                Some('>') => {
                    self.pos += 1;
                    self.skip_ws();
                    Combinator::Child
                }
                Some(',' | ')') | None => break,
                Some(_) if had_ws => Combinator::Descendant,
                Some(_) => return Err(self.unexpected()),
            };
            combinators.push(combinator);
            compounds.push(self.parse_compound()?);
        }
        Ok(Complex {
            compounds,
            combinators,
        })
    }

    fn parse_ident(&mut self) -> Result<String, SelectorError> {
        let mut ident = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                ident.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }
        if ident.is_empty() {
            Err(self.unexpected())
        } else {
            Ok(ident)
        }
    }

    fn parse_compound(&mut self) -> Result<Compound, SelectorError> {
        let mut compound = Compound::default();
        match self.peek() {
            Some('*') => {
                self.pos += 1;
                compound.tag = Some("*".to_string());
            }
            Some(c) if c.is_alphabetic() => {
                compound.tag = Some(self.parse_ident()?.to_ascii_lowercase());
            }
            _ => {}
        }
        loop {
            match self.peek() {
                Some('#') => {
                    self.pos += 1;
                    compound.id = Some(self.parse_ident()?);
                }
                Some('.') => {
                    self.pos += 1;
                    compound.classes.push(self.parse_ident()?);
                }
                Some('[') => {
                    self.pos += 1;
                    compound.attrs.push(self.parse_attr()?);
                }
                Some(':') => {
                    self.pos += 1;
                    let pseudo = self.parse_ident()?;
                    if pseudo != "not" {
                        return Err(SelectorError::UnsupportedPseudo {
                            source_text: self.source.to_string(),
                            pseudo,
                        });
                    }
                    self.expect('(')?;
                    let list = self.parse_list(true)?;
                    self.expect(')')?;
                    compound.negations.push(Selector {
                        source: String::new(),
                        list,
                    });
                }
                _ => break,
            }
        }
        if compound.is_empty() {
            return match self.peek() {
                None | Some(',' | ')') => Err(SelectorError::Empty(self.source.to_string())),
                Some(_) => Err(self.unexpected()),
            };
        }
        Ok(compound)
    }

    fn parse_attr(&mut self) -> Result<AttrMatch, SelectorError> {
        self.skip_ws();
        let name = self.parse_ident()?;
        self.skip_ws();
        let op = match self.peek() {
            Some(']') => {
                self.pos += 1;
                return Ok(AttrMatch {
                    name,
                    op: AttrOp::Exists,
                });
            }
            Some('=') => {
                self.pos += 1;
                false
            }
            Some('^') => {
                self.pos += 1;
                self.expect('=')?;
                true
            }
            _ => return Err(self.unexpected()),
        };
        self.skip_ws();
        let value = self.parse_value()?;
        self.skip_ws();
        self.expect(']')?;
        Ok(AttrMatch {
            name,
            op: if op {
                AttrOp::Prefix(value)
            } else {
                AttrOp::Equals(value)
            },
        })
    }

    fn parse_value(&mut self) -> Result<String, SelectorError> {
        match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                let mut value = String::new();
                loop {
                    match self.bump() {
                        Some(c) if c == quote => return Ok(value),
                        Some(c) => value.push(c),
                        None => return Err(SelectorError::UnexpectedEnd(self.source.to_string())),
                    }
                }
            }
            _ => self.parse_ident(),
        }
    }
}

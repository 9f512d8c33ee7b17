//! S-expression tree used to read and rewrite KiCad documents.
//!
//! Documents are parsed once into a [`Sexpr`] tree, edited structurally and
//! written back with [`format_sexpr`]. Atoms keep their exact source text so
//! numbers and identifiers survive a round trip unchanged. The [`scan`]
//! module works on raw text instead and is used where slicing one block out of
//! a large file is cheaper than parsing all of it.

use std::fmt;

pub mod scan;

/// An S-expression value
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Sexpr {
    /// Unquoted atom, kept verbatim (`yes`, `1.27`, `kicad_sch`)
    Symbol(String),
    /// Quoted atom, stored unescaped
    String(String),
    /// Parenthesized list
    List(Vec<Sexpr>),
}

impl Sexpr {
    pub fn symbol(s: impl Into<String>) -> Self {
        Sexpr::Symbol(s.into())
    }

    pub fn string(s: impl Into<String>) -> Self {
        Sexpr::String(s.into())
    }

    /// Alias for [`Sexpr::symbol`]
    pub fn atom(s: impl Into<String>) -> Self {
        Sexpr::Symbol(s.into())
    }

    /// Unquoted numeric atom in KiCad's millimetre notation, see [`format_number`]
    pub fn number(value: f64) -> Self {
        Sexpr::Symbol(format_number(value))
    }

    pub fn list(items: Vec<Sexpr>) -> Self {
        Sexpr::List(items)
    }

    /// Build `(tag items...)`
    pub fn node(tag: &str, items: impl IntoIterator<Item = Sexpr>) -> Self {
        let mut list = vec![Sexpr::symbol(tag)];
        list.extend(items);
        Sexpr::List(list)
    }

    pub fn is_atom(&self) -> bool {
        self.as_atom().is_some()
    }

    pub fn is_list(&self) -> bool {
        self.as_list().is_some()
    }

    /// Text of a symbol or string atom
    pub fn as_atom(&self) -> Option<&str> {
        match self {
            Sexpr::Symbol(s) | Sexpr::String(s) => Some(s),
            Sexpr::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Sexpr]> {
        match self {
            Sexpr::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut Vec<Sexpr>> {
        match self {
            Sexpr::List(items) => Some(items),
            _ => None,
        }
    }

    /// The leading unquoted symbol of a list, e.g. `wire` for `(wire ...)`
    pub fn head(&self) -> Option<&str> {
        match self.as_list()?.first()? {
            Sexpr::Symbol(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_tagged(&self, tag: &str) -> bool {
        self.head() == Some(tag)
    }

    /// List items, or an empty slice for atoms
    pub fn items(&self) -> &[Sexpr] {
        self.as_list().unwrap_or(&[])
    }

    /// Atom text at position `index` within a list
    pub fn atom_at(&self, index: usize) -> Option<&str> {
        self.items().get(index)?.as_atom()
    }

    /// Atom at position `index` parsed as a float
    pub fn f64_at(&self, index: usize) -> Option<f64> {
        self.atom_at(index)?.parse().ok()
    }

    /// Direct list children whose head is `tag`
    pub fn children<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Sexpr> + 'a {
        self.items().iter().filter(move |item| item.is_tagged(tag))
    }

    /// First direct list child whose head is `tag`
    pub fn child(&self, tag: &str) -> Option<&Sexpr> {
        self.items().iter().find(|item| item.is_tagged(tag))
    }

    pub fn child_mut(&mut self, tag: &str) -> Option<&mut Sexpr> {
        self.as_list_mut()?
            .iter_mut()
            .find(|item| item.is_tagged(tag))
    }

    /// The `(property "<key>" "<value>" ...)` child with the given key
    pub fn property(&self, key: &str) -> Option<&Sexpr> {
        self.children("property")
            .find(|prop| prop.atom_at(1) == Some(key))
    }

    /// Every list in this subtree (including `self`) whose head is `tag`, in
    /// document order
    pub fn find_all<'a>(&'a self, tag: &str) -> Vec<&'a Sexpr> {
        let mut found = Vec::new();
        collect_tagged(self, tag, &mut found);
        found
    }
}

fn collect_tagged<'a>(sexpr: &'a Sexpr, tag: &str, found: &mut Vec<&'a Sexpr>) {
    if let Sexpr::List(items) = sexpr {
        if sexpr.is_tagged(tag) {
            found.push(sexpr);
        }
        for item in items {
            collect_tagged(item, tag, found);
        }
    }
}

/// Parser for S-expressions
pub struct Parser<'a> {
    input: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    pos: usize,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Self {
        Parser {
            input,
            chars: input.char_indices().peekable(),
            pos: 0,
        }
    }

    /// Parse the next expression
    pub fn parse(&mut self) -> Result<Sexpr, ParseError> {
        self.skip_trivia();
        match self.peek() {
            None => Err(ParseError::UnexpectedEof(self.pos)),
            Some('(') => self.parse_list(),
            Some(')') => Err(ParseError::UnexpectedClose(self.pos)),
            Some('"') => self.parse_string(),
            Some(_) => self.parse_symbol(),
        }
    }

    /// Parse every top-level expression in the input
    pub fn parse_all(&mut self) -> Result<Vec<Sexpr>, ParseError> {
        let mut exprs = Vec::new();
        loop {
            self.skip_trivia();
            if self.peek().is_none() {
                return Ok(exprs);
            }
            exprs.push(self.parse()?);
        }
    }

    fn parse_list(&mut self) -> Result<Sexpr, ParseError> {
        let open = self.pos;
        self.bump();
        let mut items = Vec::new();

        loop {
            self.skip_trivia();
            match self.peek() {
                None => return Err(ParseError::UnclosedList(open)),
                Some(')') => {
                    self.bump();
                    break;
                }
                Some(_) => items.push(self.parse()?),
            }

            if items.len() % 1000 == 0 {
                log::trace!("Parsed {} items in list at byte {open}", items.len());
            }
        }

        Ok(Sexpr::List(items))
    }

    fn parse_symbol(&mut self) -> Result<Sexpr, ParseError> {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() || ch == '(' || ch == ')' || ch == '"' {
                break;
            }
            self.bump();
        }
        Ok(Sexpr::Symbol(self.input[start..self.pos].to_string()))
    }

    fn parse_string(&mut self) -> Result<Sexpr, ParseError> {
        let open = self.pos;
        self.bump();
        let mut text = String::new();

        loop {
            match self.bump() {
                None => return Err(ParseError::UnterminatedString(open)),
                Some('"') => return Ok(Sexpr::String(text)),
                Some('\\') => match self.bump() {
                    None => return Err(ParseError::UnterminatedString(open)),
                    Some('n') => text.push('\n'),
                    Some('r') => text.push('\r'),
                    Some('t') => text.push('\t'),
                    Some(other) => text.push(other),
                },
                Some(ch) => text.push(ch),
            }
        }
    }

    /// Whitespace and `;` line comments
    fn skip_trivia(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.bump();
            } else if ch == ';' {
                while let Some(ch) = self.bump() {
                    if ch == '\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, ch)| *ch)
    }

    fn bump(&mut self) -> Option<char> {
        let (at, ch) = self.chars.next()?;
        self.pos = at + ch.len_utf8();
        Some(ch)
    }
}

/// Parse the first expression of `input`
pub fn parse(input: &str) -> Result<Sexpr, ParseError> {
    log::trace!("Parsing S-expression from {} bytes of input", input.len());
    Parser::new(input).parse()
}

/// Parse every expression of `input`
pub fn parse_all(input: &str) -> Result<Vec<Sexpr>, ParseError> {
    log::trace!(
        "Parsing multiple S-expressions from {} bytes of input",
        input.len()
    );
    Parser::new(input).parse_all()
}

/// Errors that can occur during parsing. Offsets are byte positions.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("unexpected end of input at byte {0}")]
    UnexpectedEof(usize),
    #[error("unexpected ')' at byte {0}")]
    UnexpectedClose(usize),
    #[error("list opened at byte {0} is never closed")]
    UnclosedList(usize),
    #[error("string starting at byte {0} is not terminated")]
    UnterminatedString(usize),
}

/// Format an S-expression the way KiCad writes its files.
///
/// Leading atoms stay on the opening line, every nested list goes on its own
/// line indented by one tab per level, and the closing parenthesis of a list
/// with nested lists sits on its own line. `depth` is the nesting level of
/// `sexpr` and only affects the indentation of continuation lines.
pub fn format_sexpr(sexpr: &Sexpr, depth: usize) -> String {
    let mut out = String::new();
    write_sexpr(&mut out, sexpr, depth);
    out
}

fn write_sexpr(out: &mut String, sexpr: &Sexpr, depth: usize) {
    match sexpr {
        Sexpr::Symbol(s) => out.push_str(s),
        Sexpr::String(s) => {
            out.push('"');
            out.push_str(&escape_string(s));
            out.push('"');
        }
        Sexpr::List(items) => {
            out.push('(');
            let split = items.iter().position(Sexpr::is_list).unwrap_or(items.len());

            for (i, item) in items[..split].iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                write_sexpr(out, item, depth);
            }

            if split == items.len() {
                out.push(')');
                return;
            }

            for item in &items[split..] {
                out.push('\n');
                push_indent(out, depth + 1);
                write_sexpr(out, item, depth + 1);
            }
            out.push('\n');
            push_indent(out, depth);
            out.push(')');
        }
    }
}

fn push_indent(out: &mut String, depth: usize) {
    out.extend(std::iter::repeat('\t').take(depth));
}

fn escape_string(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Millimetre value with at most four decimals and no trailing zeros.
/// Negative zero prints as `0`.
pub fn format_number(value: f64) -> String {
    let rounded = (value * 10_000.0).round() / 10_000.0;
    if rounded == 0.0 {
        return "0".to_string();
    }
    let mut text = format!("{rounded:.4}");
    while text.ends_with('0') {
        text.pop();
    }
    if text.ends_with('.') {
        text.pop();
    }
    text
}

impl fmt::Display for Sexpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_sexpr(self, 0))
    }
}

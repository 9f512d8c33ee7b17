//! Delimiter-aware scanning over raw S-expression text.
//!
//! These helpers locate blocks by byte offset without building a tree. Quoted
//! strings (with `\` escapes) and `;` line comments are skipped so parentheses
//! inside them never affect depth.

use std::ops::Range;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScanError {
    #[error("expected '(' at byte {0}")]
    NotAnOpener(usize),
    #[error("block starting at byte {0} is not closed")]
    Unbalanced(usize),
    #[error("document has no top-level (uuid ...) identifier")]
    MissingRootIdentifier,
}

/// Iterator over the byte positions of structural `(` and `)`.
struct Delimiters<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Delimiters<'a> {
    fn new(text: &'a str, from: usize) -> Self {
        Delimiters {
            bytes: text.as_bytes(),
            pos: from,
        }
    }

    fn skip_string(&mut self) {
        while let Some(&b) = self.bytes.get(self.pos) {
            match b {
                b'\\' => self.pos += 2,
                b'"' => {
                    self.pos += 1;
                    return;
                }
                _ => self.pos += 1,
            }
        }
    }

    fn skip_comment(&mut self) {
        while let Some(&b) = self.bytes.get(self.pos) {
            self.pos += 1;
            if b == b'\n' {
                return;
            }
        }
    }

    /// `;` only opens a comment at the start of a token
    fn at_token_start(&self, i: usize) -> bool {
        i == 0 || matches!(self.bytes[i - 1], b'(' | b')') || self.bytes[i - 1].is_ascii_whitespace()
    }
}

impl Iterator for Delimiters<'_> {
    type Item = (usize, u8);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(&b) = self.bytes.get(self.pos) {
            let i = self.pos;
            self.pos += 1;
            match b {
                b'(' | b')' => return Some((i, b)),
                b'"' => self.skip_string(),
                b';' if self.at_token_start(i) => self.skip_comment(),
                _ => {}
            }
        }
        None
    }
}

/// Span of the block opening at `start`, ending one past its matching `)`.
pub fn block_span(text: &str, start: usize) -> Result<Range<usize>, ScanError> {
    if text.as_bytes().get(start) != Some(&b'(') {
        return Err(ScanError::NotAnOpener(start));
    }

    let mut depth = 0usize;
    for (i, b) in Delimiters::new(text, start) {
        if b == b'(' {
            depth += 1;
        } else {
            depth -= 1;
            if depth == 0 {
                return Ok(start..i + 1);
            }
        }
    }
    Err(ScanError::Unbalanced(start))
}

/// Spans of the direct list children of the block opening at `start`.
pub fn child_spans(text: &str, start: usize) -> Result<Vec<Range<usize>>, ScanError> {
    let outer = block_span(text, start)?;
    let mut spans = Vec::new();
    let mut depth = 0usize;
    let mut child_start = start;

    for (i, b) in Delimiters::new(&text[..outer.end], start) {
        if b == b'(' {
            depth += 1;
            if depth == 2 {
                child_start = i;
            }
        } else {
            if depth == 2 {
                spans.push(child_start..i + 1);
            }
            depth -= 1;
        }
    }
    Ok(spans)
}

/// Span of the direct child `(head "name" ...)` of the block at `start`.
pub fn find_child_block(
    text: &str,
    start: usize,
    head: &str,
    name: &str,
) -> Result<Option<Range<usize>>, ScanError> {
    for span in child_spans(text, start)? {
        let atoms = leading_atoms(text, span.start, 2);
        if atoms.len() == 2 && atoms[0] == head && atoms[1] == name {
            return Ok(Some(span));
        }
    }
    Ok(None)
}

/// Offset of the first structural `(` in the text.
pub fn root_start(text: &str) -> Option<usize> {
    match Delimiters::new(text, 0).next() {
        Some((i, b'(')) => Some(i),
        _ => None,
    }
}

/// Value of the `(uuid X)` list that is a direct child of the root list.
pub fn locate_root_identifier(text: &str) -> Result<String, ScanError> {
    let root = root_start(text).ok_or(ScanError::MissingRootIdentifier)?;
    for span in child_spans(text, root)? {
        let mut atoms = leading_atoms(text, span.start, 2);
        if atoms.len() == 2 && atoms[0] == "uuid" {
            return Ok(atoms.swap_remove(1));
        }
    }
    Err(ScanError::MissingRootIdentifier)
}

/// Depth never drops below zero and ends at zero.
pub fn is_balanced(text: &str) -> bool {
    let mut depth = 0i64;
    for (_, b) in Delimiters::new(text, 0) {
        depth += if b == b'(' { 1 } else { -1 };
        if depth < 0 {
            return false;
        }
    }
    depth == 0
}

/// Up to `limit` atoms directly following the `(` at `open`, stopping at the
/// first nested list or close. Quoted atoms are unescaped.
fn leading_atoms(text: &str, open: usize, limit: usize) -> Vec<String> {
    let bytes = text.as_bytes();
    let mut atoms = Vec::new();
    let mut pos = open + 1;

    while atoms.len() < limit {
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        match bytes.get(pos) {
            None | Some(b'(') | Some(b')') => break,
            Some(b'"') => {
                let mut value = Vec::new();
                pos += 1;
                while let Some(&b) = bytes.get(pos) {
                    match b {
                        b'\\' => {
                            if let Some(&next) = bytes.get(pos + 1) {
                                value.push(next);
                            }
                            pos += 2;
                        }
                        b'"' => {
                            pos += 1;
                            break;
                        }
                        _ => {
                            value.push(b);
                            pos += 1;
                        }
                    }
                }
                atoms.push(String::from_utf8_lossy(&value).into_owned());
            }
            Some(_) => {
                let begin = pos;
                while pos < bytes.len()
                    && !bytes[pos].is_ascii_whitespace()
                    && !matches!(bytes[pos], b'(' | b')' | b'"')
                {
                    pos += 1;
                }
                atoms.push(text[begin..pos].to_string());
            }
        }
    }
    atoms
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMATIC: &str = r#"(kicad_sch
	(version 20250114)
	(generator "eeschema")
	(uuid "5b1c8a0e-0000-4000-8000-000000000001")
	(lib_symbols
		(symbol "Device:R"
			(property "Value" "R (1%)")
		)
	)
	(sheet_instances
		(path "/" (page "1"))
	)
)
"#;

    #[test]
    fn test_block_span_whole_document() {
        let span = block_span(SCHEMATIC, 0).unwrap();
        assert_eq!(&SCHEMATIC[span.end - 1..span.end], ")");
        assert_eq!(SCHEMATIC[span.end..].trim(), "");
    }

    #[test]
    fn test_block_span_ignores_string_parens() {
        let text = r#"(a "(((" (b ")") c)"#;
        assert_eq!(block_span(text, 0).unwrap(), 0..text.len());
    }

    #[test]
    fn test_block_span_errors() {
        assert_eq!(block_span("abc", 0), Err(ScanError::NotAnOpener(0)));
        assert_eq!(block_span("(a (b)", 0), Err(ScanError::Unbalanced(0)));
    }

    #[test]
    fn test_child_spans() {
        let text = "(root (a 1) x (b (c 2)) \"(d)\")";
        let spans = child_spans(text, 0).unwrap();
        let children: Vec<_> = spans.iter().map(|s| &text[s.clone()]).collect();
        assert_eq!(children, vec!["(a 1)", "(b (c 2))"]);
    }

    #[test]
    fn test_find_child_block() {
        let lib = r#"(kicad_symbol_lib (symbol "C" (pin)) (symbol "R" (pin)) (symbol "R_Small"))"#;
        let span = find_child_block(lib, 0, "symbol", "R").unwrap().unwrap();
        assert_eq!(&lib[span], r#"(symbol "R" (pin))"#);
        assert!(find_child_block(lib, 0, "symbol", "L").unwrap().is_none());
    }

    #[test]
    fn test_locate_root_identifier() {
        assert_eq!(
            locate_root_identifier(SCHEMATIC).unwrap(),
            "5b1c8a0e-0000-4000-8000-000000000001"
        );
        assert_eq!(locate_root_identifier("(kicad_sch (uuid abc))").unwrap(), "abc");
    }

    #[test]
    fn test_nested_uuid_is_not_root_identifier() {
        let text = "(kicad_sch (symbol (uuid \"nested\")))";
        assert_eq!(
            locate_root_identifier(text),
            Err(ScanError::MissingRootIdentifier)
        );
        assert_eq!(
            locate_root_identifier("   "),
            Err(ScanError::MissingRootIdentifier)
        );
    }

    #[test]
    fn test_is_balanced() {
        assert!(is_balanced(SCHEMATIC));
        assert!(is_balanced("(a \")\" ; )\n)"));
        assert!(!is_balanced("(a))("));
        assert!(!is_balanced("(a"));
    }
}

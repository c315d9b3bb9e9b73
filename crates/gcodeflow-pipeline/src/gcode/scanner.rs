//! Structured G-code line scanner
//!
//! Every stage that needs to look inside a command uses this scanner instead
//! of its own regular expression, so words, comments and numeric literals are
//! recognized the same way everywhere.
//!
//! A line is split into tokens that cover it completely, each carrying its
//! byte span:
//! - words: a letter immediately followed by a numeric literal (`G1`, `x-.5`, `F1200.`)
//! - comments: `( ... )` (closed by the first `)` or the end of line) and `; ...`
//! - whitespace runs
//! - anything else (`%`, checksums, stray text)

use std::ops::Range;

/// A letter/number word such as `G01` or `X-12.5`
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    /// Upper-cased address letter
    pub letter: char,
    /// Parsed numeric value
    pub value: f64,
    /// Span of the whole word, letter included
    pub span: Range<usize>,
    /// Span of the numeric literal only
    pub value_span: Range<usize>,
}

impl Word {
    /// True when this word is `letter` with exactly the numeric code `code`
    ///
    /// Matching is on the parsed value, so `M03` matches `M3` while `M30`
    /// does not.
    pub fn is_code(&self, letter: char, code: f64) -> bool {
        self.letter == letter.to_ascii_uppercase() && self.value == code
    }
}

/// Token classification
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Word(Word),
    Comment,
    Whitespace,
    Other,
}

/// A classified slice of the line
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Range<usize>,
}

/// A scanned line; tokens cover the whole text in order
#[derive(Debug, Clone)]
pub struct ScannedLine<'a> {
    text: &'a str,
    tokens: Vec<Token>,
}

impl<'a> ScannedLine<'a> {
    /// Scan a single line of G-code
    pub fn scan(text: &'a str) -> Self {
        let tokens = tokenize(text);
        Self { text, tokens }
    }

    /// The scanned text
    pub fn text(&self) -> &'a str {
        self.text
    }

    /// All tokens in line order
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Text covered by a token or span
    pub fn slice(&self, span: &Range<usize>) -> &'a str {
        &self.text[span.clone()]
    }

    /// Words in line order, comments excluded
    pub fn words(&self) -> impl Iterator<Item = &Word> + '_ {
        self.tokens.iter().filter_map(|t| match &t.kind {
            TokenKind::Word(w) => Some(w),
            _ => None,
        })
    }

    /// First word with the given letter
    pub fn word(&self, letter: char) -> Option<&Word> {
        let letter = letter.to_ascii_uppercase();
        self.words().find(|w| w.letter == letter)
    }

    /// Numeric value of the first word with the given letter
    pub fn value(&self, letter: char) -> Option<f64> {
        self.word(letter).map(|w| w.value)
    }

    /// True when any word is exactly `letter` + `code`
    pub fn has_code(&self, letter: char, code: f64) -> bool {
        self.words().any(|w| w.is_code(letter, code))
    }

    /// True when the line contains at least one comment
    pub fn has_comment(&self) -> bool {
        self.tokens.iter().any(|t| t.kind == TokenKind::Comment)
    }

    /// True when the line has nothing but whitespace and comments
    pub fn is_blank(&self) -> bool {
        self.tokens
            .iter()
            .all(|t| matches!(t.kind, TokenKind::Whitespace | TokenKind::Comment))
    }

    /// Rebuild the line, keeping only tokens accepted by `keep`
    pub fn rebuild<F>(&self, mut keep: F) -> String
    where
        F: FnMut(&Token) -> bool,
    {
        let mut out = String::with_capacity(self.text.len());
        for token in &self.tokens {
            if keep(token) {
                out.push_str(self.slice(&token.span));
            }
        }
        out
    }

    /// Rebuild the line, letting `rewrite` replace the text of individual words
    ///
    /// Everything the closure does not touch is copied byte for byte.
    pub fn rewrite_words<F>(&self, mut rewrite: F) -> String
    where
        F: FnMut(&Word, &str) -> Option<String>,
    {
        let mut out = String::with_capacity(self.text.len());
        for token in &self.tokens {
            let original = self.slice(&token.span);
            match &token.kind {
                TokenKind::Word(word) => match rewrite(word, original) {
                    Some(replacement) => out.push_str(&replacement),
                    None => out.push_str(original),
                },
                _ => out.push_str(original),
            }
        }
        out
    }
}

fn tokenize(text: &str) -> Vec<Token> {
    let bytes = text.as_bytes();
    let mut tokens: Vec<Token> = Vec::new();
    let mut pos = 0;

    while pos < text.len() {
        let start = pos;
        let c = match text[pos..].chars().next() {
            Some(c) => c,
            None => break,
        };

        let kind = if c == '(' {
            pos = match text[pos..].find(')') {
                Some(offset) => pos + offset + 1,
                None => text.len(),
            };
            TokenKind::Comment
        } else if c == ';' {
            pos = text.len();
            TokenKind::Comment
        } else if c.is_whitespace() {
            pos += c.len_utf8();
            while let Some(next) = text[pos..].chars().next() {
                if !next.is_whitespace() {
                    break;
                }
                pos += next.len_utf8();
            }
            TokenKind::Whitespace
        } else if c.is_ascii_alphabetic() {
            match number_end(bytes, pos + 1) {
                Some(end) => {
                    let literal = &text[pos + 1..end];
                    match literal.parse::<f64>() {
                        Ok(value) => {
                            let word = Word {
                                letter: c.to_ascii_uppercase(),
                                value,
                                span: start..end,
                                value_span: pos + 1..end,
                            };
                            pos = end;
                            TokenKind::Word(word)
                        }
                        Err(_) => {
                            pos += 1;
                            TokenKind::Other
                        }
                    }
                }
                None => {
                    pos += 1;
                    TokenKind::Other
                }
            }
        } else {
            pos += c.len_utf8();
            TokenKind::Other
        };

        // Merge runs of unclassified text into a single token
        if kind == TokenKind::Other {
            if let Some(last) = tokens.last_mut() {
                if last.kind == TokenKind::Other && last.span.end == start {
                    last.span.end = pos;
                    continue;
                }
            }
        }

        tokens.push(Token {
            kind,
            span: start..pos,
        });
    }

    tokens
}

/// End of a numeric literal starting at `pos`: `[+-]? digits [. digits]` with
/// at least one digit
fn number_end(bytes: &[u8], mut pos: usize) -> Option<usize> {
    if pos < bytes.len() && (bytes[pos] == b'+' || bytes[pos] == b'-') {
        pos += 1;
    }
    let mut digits = 0;
    while pos < bytes.len() && bytes[pos].is_ascii_digit() {
        pos += 1;
        digits += 1;
    }
    if pos < bytes.len() && bytes[pos] == b'.' {
        pos += 1;
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            pos += 1;
            digits += 1;
        }
    }
    if digits > 0 {
        Some(pos)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn letters(line: &str) -> Vec<(char, f64)> {
        ScannedLine::scan(line)
            .words()
            .map(|w| (w.letter, w.value))
            .collect()
    }

    #[test]
    fn test_simple_words() {
        assert_eq!(
            letters("G01 X10.5 y-2 F.5"),
            vec![('G', 1.0), ('X', 10.5), ('Y', -2.0), ('F', 0.5)]
        );
    }

    #[test]
    fn test_packed_words() {
        assert_eq!(
            letters("G1X10Y20"),
            vec![('G', 1.0), ('X', 10.0), ('Y', 20.0)]
        );
    }

    #[test]
    fn test_comments_are_not_words() {
        let line = ScannedLine::scan("G0 X0 (move M3 here) ; and M30");
        assert_eq!(line.words().count(), 2);
        assert!(!line.has_code('M', 3.0));
        assert!(line.has_comment());
    }

    #[test]
    fn test_unclosed_paren_runs_to_end() {
        let line = ScannedLine::scan("G0 (open comment M3");
        assert_eq!(line.words().count(), 1);
        assert_eq!(line.tokens().last().unwrap().kind, TokenKind::Comment);
    }

    #[test]
    fn test_code_matching_is_anchored() {
        let line = ScannedLine::scan("M30");
        assert!(!line.has_code('M', 3.0));
        assert!(line.has_code('m', 30.0));
        assert!(ScannedLine::scan("m03").has_code('M', 3.0));
    }

    #[test]
    fn test_plain_text_is_other() {
        let line = ScannedLine::scan("anything else");
        assert_eq!(line.words().count(), 0);
        assert!(!line.is_blank());
    }

    #[test]
    fn test_tokens_cover_line() {
        let text = "N10 G1 X1 (c) %  ;tail";
        let line = ScannedLine::scan(text);
        assert_eq!(line.rebuild(|_| true), text);
    }

    #[test]
    fn test_rewrite_words() {
        let line = ScannedLine::scan("G1 X1.23456 (X9.99999)");
        let out = line.rewrite_words(|w, _| (w.letter == 'X').then(|| "X1.2".to_string()));
        assert_eq!(out, "G1 X1.2 (X9.99999)");
    }

    #[test]
    fn test_blank_detection() {
        assert!(ScannedLine::scan("   (only a comment)  ").is_blank());
        assert!(ScannedLine::scan("").is_blank());
        assert!(!ScannedLine::scan("G0").is_blank());
    }

    #[test]
    fn test_non_ascii_text() {
        let line = ScannedLine::scan("G1 X1 (größe) µ");
        assert_eq!(line.words().count(), 2);
        assert_eq!(line.rebuild(|_| true), "G1 X1 (größe) µ");
    }
}

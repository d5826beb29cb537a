//! C source tokenizer.
//!
//! Produces a lazy sequence of lexical tokens over a byte buffer: identifier
//! and number runs, single-character punctuation, string literals, line and
//! block comments, and preprocessor directive heads. Both the include scanner
//! and the test-runner generator consume it; neither needs a real C lexer,
//! only enough structure to find `#include` lines and test macros without
//! being fooled by comments or string literals.
//!
//! The tokenizer is total: any byte sequence yields a finite token stream.
//! Malformed constructs (an unterminated string or block comment) consume to
//! the end of the input and come back as one final token.

/// One-byte punctuation recognized as standalone tokens.
///
/// `*` is included so declarator noise like `char **argv` splits into
/// individual tokens instead of gluing onto the following identifier.
const PUNCTUATION: &[u8] = b"()[]{},;*";

/// A token: a subslice of the input buffer.
///
/// The kind is inferable from the leading bytes, so no tag is stored; the
/// predicate methods below classify on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    text: &'a [u8],
}

impl<'a> Token<'a> {
    /// The raw bytes of the token.
    pub fn text(&self) -> &'a [u8] {
        self.text
    }

    /// True for `//...` and `/*...*/` tokens.
    pub fn is_comment(&self) -> bool {
        self.text.starts_with(b"//") || self.text.starts_with(b"/*")
    }

    /// True for string-literal tokens.
    pub fn is_string(&self) -> bool {
        self.text.first() == Some(&b'"')
    }

    /// True for single-character punctuation tokens.
    pub fn is_punctuation(&self) -> bool {
        self.text.len() == 1 && PUNCTUATION.contains(&self.text[0])
    }

    /// True when the token is exactly the given punctuation byte.
    pub fn is_punct(&self, byte: u8) -> bool {
        self.text.len() == 1 && self.text[0] == byte
    }

    /// For a directive-head token (`#define`, `# include`), the alphabetic
    /// word after the `#`. `None` for every other token.
    pub fn directive_word(&self) -> Option<&'a [u8]> {
        if self.text.first() != Some(&b'#') {
            return None;
        }
        let word_start = self.text[1..]
            .iter()
            .position(|b| !b.is_ascii_whitespace())
            .map(|i| i + 1)
            .unwrap_or(self.text.len());
        Some(&self.text[word_start..])
    }

    /// True when the token could serve as a macro argument: not punctuation,
    /// not a comment, string, or directive head.
    pub fn is_word(&self) -> bool {
        !self.is_punctuation() && !self.is_comment() && !self.is_string() && self.text.first() != Some(&b'#')
    }
}

/// A single-pass tokenizer over a byte buffer.
///
/// Not restartable; reconstruct to scan again.
pub struct Tokenizer<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Tokenizer { buf, pos: 0 }
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        self.buf.get(self.pos + offset).copied()
    }

    /// Consume and return the rest of the current line, excluding the
    /// newline. The cursor is left just past the newline.
    pub fn rest_of_line(&mut self) -> &'a [u8] {
        let start = self.pos;
        while let Some(b) = self.peek(0) {
            if b == b'\n' {
                let text = &self.buf[start..self.pos];
                self.pos += 1;
                return text;
            }
            self.pos += 1;
        }
        &self.buf[start..]
    }

    /// Consume and return the rest of the current preprocessor expression:
    /// like [`rest_of_line`](Self::rest_of_line), but a `\` immediately
    /// before the newline continues onto the following line.
    pub fn rest_of_directive(&mut self) -> &'a [u8] {
        let start = self.pos;
        while let Some(b) = self.peek(0) {
            if b == b'\n' {
                if self.pos > start && self.buf[self.pos - 1] == b'\\' {
                    self.pos += 1;
                    continue;
                }
                let text = &self.buf[start..self.pos];
                self.pos += 1;
                return text;
            }
            self.pos += 1;
        }
        &self.buf[start..]
    }

    fn string_literal(&mut self) -> &'a [u8] {
        let start = self.pos;
        self.pos += 1;
        while let Some(b) = self.peek(0) {
            match b {
                b'\\' => {
                    // Escape prefix: consume the next byte regardless of value.
                    self.pos = (self.pos + 2).min(self.buf.len());
                }
                b'"' => {
                    self.pos += 1;
                    break;
                }
                _ => self.pos += 1,
            }
        }
        &self.buf[start..self.pos]
    }

    fn line_comment(&mut self) -> &'a [u8] {
        let start = self.pos;
        while let Some(b) = self.peek(0) {
            if b == b'\n' {
                break;
            }
            self.pos += 1;
        }
        &self.buf[start..self.pos]
    }

    fn block_comment(&mut self) -> &'a [u8] {
        let start = self.pos;
        self.pos += 2;
        while self.pos < self.buf.len() {
            if self.buf[self.pos] == b'*' && self.peek(1) == Some(b'/') {
                self.pos += 2;
                break;
            }
            self.pos += 1;
        }
        &self.buf[start..self.pos.min(self.buf.len())]
    }

    /// A directive head is `#`, optional whitespace, and the immediately
    /// adjacent alphabetic word: `#define` and `# include` each come back
    /// as one token.
    fn directive_head(&mut self) -> &'a [u8] {
        let start = self.pos;
        self.pos += 1;
        while self.peek(0).is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
        while self.peek(0).is_some_and(|b| b.is_ascii_alphabetic()) {
            self.pos += 1;
        }
        &self.buf[start..self.pos]
    }

    fn word_run(&mut self) -> &'a [u8] {
        let start = self.pos;
        self.pos += 1;
        while let Some(b) = self.peek(0) {
            if b.is_ascii_whitespace()
                || PUNCTUATION.contains(&b)
                || b == b'"'
                || b == b'#'
                || b == b'/'
            {
                break;
            }
            self.pos += 1;
        }
        &self.buf[start..self.pos]
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        while self.peek(0).is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
        let b = self.peek(0)?;

        let text = match b {
            _ if PUNCTUATION.contains(&b) => {
                let text = &self.buf[self.pos..self.pos + 1];
                self.pos += 1;
                text
            }
            b'"' => self.string_literal(),
            b'/' if self.peek(1) == Some(b'/') => self.line_comment(),
            b'/' if self.peek(1) == Some(b'*') => self.block_comment(),
            b'#' => self.directive_head(),
            _ => self.word_run(),
        };
        Some(Token { text })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<&[u8]> {
        Tokenizer::new(input.as_bytes()).map(|t| t.text()).collect()
    }

    #[test]
    fn test_tokenizes_hello_world() {
        let input = r#"int main(int argc, char **argv) { printf("Hello World!\n"); return 0; }"#;
        let expected: Vec<&[u8]> = vec![
            b"int",
            b"main",
            b"(",
            b"int",
            b"argc",
            b",",
            b"char",
            b"*",
            b"*",
            b"argv",
            b")",
            b"{",
            b"printf",
            b"(",
            br#""Hello World!\n""#,
            b")",
            b";",
            b"return",
            b"0",
            b";",
            b"}",
        ];
        assert_eq!(tokens(input), expected);
    }

    #[test]
    fn test_adjacent_string_literals() {
        let input = r#""test1\n""test2\n\\""test3\n""#;
        let expected: Vec<&[u8]> = vec![br#""test1\n""#, br#""test2\n\\""#, br#""test3\n""#];
        assert_eq!(tokens(input), expected);
    }

    #[test]
    fn test_line_comment_splits_tokens() {
        let expected: Vec<&[u8]> = vec![b"int", b"//comment", b"float"];
        assert_eq!(tokens("int//comment\nfloat"), expected);
    }

    #[test]
    fn test_block_comment_spans_newlines() {
        let expected: Vec<&[u8]> = vec![b"int", b"/*a\nb*/", b"float"];
        assert_eq!(tokens("int/*a\nb*/float"), expected);
    }

    #[test]
    fn test_directive_head_absorbs_whitespace() {
        let expected: Vec<&[u8]> = vec![b"# include", b"<x.h>"];
        assert_eq!(tokens("# include <x.h>"), expected);
    }

    #[test]
    fn test_directive_word() {
        let mut tok = Tokenizer::new(b"#  define FOO 1");
        let head = tok.next().unwrap();
        assert_eq!(head.directive_word(), Some(&b"define"[..]));

        let word = Tokenizer::new(b"name").next().unwrap();
        assert_eq!(word.directive_word(), None);
    }

    #[test]
    fn test_concatenation_reproduces_input_modulo_whitespace() {
        let input = "int main ( void ) { return x , y ; }";
        let squashed: String = input.split_whitespace().collect();
        let rejoined: String = tokens(input)
            .iter()
            .map(|t| std::str::from_utf8(t).unwrap())
            .collect();
        assert_eq!(rejoined, squashed);
    }

    #[test]
    fn test_unterminated_string_consumes_to_end() {
        let expected: Vec<&[u8]> = vec![b"x", br#""abc"#];
        assert_eq!(tokens(r#"x "abc"#), expected);
    }

    #[test]
    fn test_unterminated_block_comment_consumes_to_end() {
        let expected: Vec<&[u8]> = vec![b"x", b"/* open"];
        assert_eq!(tokens("x /* open"), expected);
    }

    #[test]
    fn test_rest_of_line_stops_before_newline() {
        let mut tok = Tokenizer::new(b"#include \"a.h\"\nint x;");
        assert_eq!(tok.next().unwrap().text(), b"#include");
        assert_eq!(tok.rest_of_line(), b" \"a.h\"");
        assert_eq!(tok.next().unwrap().text(), b"int");
    }

    #[test]
    fn test_rest_of_directive_honors_continuation() {
        let mut tok = Tokenizer::new(b"#define PAIR \\\n    1, 2\nint x;");
        assert_eq!(tok.next().unwrap().text(), b"#define");
        assert_eq!(tok.rest_of_directive(), b" PAIR \\\n    1, 2");
        assert_eq!(tok.next().unwrap().text(), b"int");
    }
}

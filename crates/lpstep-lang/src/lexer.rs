use std::str::Chars;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Keywords
    Min,
    Max,

    // Literals
    Ident,
    Number,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Le,
    Ge,
    Eq,
    Colon,
    Comma,
    Semicolon,

    // Delimiters
    LParen,
    RParen,

    // Special
    Newline,
    Comment,
    Eof,
    Error,
}

impl TokenKind {
    pub fn is_relation(self) -> bool {
        matches!(self, TokenKind::Le | TokenKind::Ge | TokenKind::Eq)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub text: String,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span, text: impl Into<String>) -> Self {
        Self {
            kind,
            span,
            text: text.into(),
        }
    }
}

pub struct Lexer<'a> {
    source: &'a str,
    chars: Chars<'a>,
    pos: usize,
    current: Option<char>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut chars = source.chars();
        let current = chars.next();
        Self {
            source,
            chars,
            pos: 0,
            current,
        }
    }

    pub fn tokenize(source: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.current;
        self.current = self.chars.next();
        if let Some(c) = c {
            self.pos += c.len_utf8();
        }
        c
    }

    fn peek(&self) -> Option<char> {
        self.current
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.clone().next()
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c == ' ' || c == '\t' || c == '\r' {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// `// ...` or `# ...` up to the end of the line.
    fn skip_line_comment(&mut self) -> Token {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.advance();
        }
        Token::new(
            TokenKind::Comment,
            Span::new(start, self.pos),
            &self.source[start..self.pos],
        )
    }

    fn read_number(&mut self) -> Token {
        let start = self.pos;

        // Integer part
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.advance();
            } else {
                break;
            }
        }

        // Decimal part, also accepts `.5`
        if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    self.advance();
                } else {
                    break;
                }
            }
        }

        Token::new(
            TokenKind::Number,
            Span::new(start, self.pos),
            &self.source[start..self.pos],
        )
    }

    fn read_ident(&mut self) -> Token {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }
        let text = &self.source[start..self.pos];
        let kind = match text.to_ascii_lowercase().as_str() {
            "max" | "maximize" | "maximise" => TokenKind::Max,
            "min" | "minimize" | "minimise" => TokenKind::Min,
            _ => TokenKind::Ident,
        };
        Token::new(kind, Span::new(start, self.pos), text)
    }

    /// Single-char token, or the two-char form when `second` follows.
    fn operator(&mut self, second: char, single: TokenKind, double: TokenKind) -> Token {
        let start = self.pos;
        self.advance();
        let kind = if self.peek() == Some(second) {
            self.advance();
            double
        } else {
            single
        };
        Token::new(kind, Span::new(start, self.pos), &self.source[start..self.pos])
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let start = self.pos;

        let Some(c) = self.peek() else {
            return Token::new(TokenKind::Eof, Span::new(start, start), "");
        };

        let single = |kind: TokenKind, lexer: &mut Self| {
            lexer.advance();
            Token::new(kind, Span::new(start, lexer.pos), &lexer.source[start..lexer.pos])
        };

        match c {
            '\n' => single(TokenKind::Newline, self),
            '#' => self.skip_line_comment(),
            '/' if self.peek_next() == Some('/') => self.skip_line_comment(),
            '/' => single(TokenKind::Slash, self),
            '+' => single(TokenKind::Plus, self),
            '-' => single(TokenKind::Minus, self),
            '*' | '·' => single(TokenKind::Star, self),
            ':' => single(TokenKind::Colon, self),
            ',' => single(TokenKind::Comma, self),
            ';' => single(TokenKind::Semicolon, self),
            '(' => single(TokenKind::LParen, self),
            ')' => single(TokenKind::RParen, self),
            '≤' => single(TokenKind::Le, self),
            '≥' => single(TokenKind::Ge, self),
            // `<` and `>` read as their non-strict forms
            '<' => self.operator('=', TokenKind::Le, TokenKind::Le),
            '>' => self.operator('=', TokenKind::Ge, TokenKind::Ge),
            '=' => match self.peek_next() {
                Some('<') => self.operator('<', TokenKind::Eq, TokenKind::Le),
                Some('>') => self.operator('>', TokenKind::Eq, TokenKind::Ge),
                _ => self.operator('=', TokenKind::Eq, TokenKind::Eq),
            },
            c if c.is_ascii_digit() => self.read_number(),
            '.' if self.peek_next().is_some_and(|c| c.is_ascii_digit()) => self.read_number(),
            c if c.is_alphabetic() || c == '_' => self.read_ident(),
            _ => single(TokenKind::Error, self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::tokenize(source).iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            kinds("max min Maximize minimise maxi"),
            vec![
                TokenKind::Max,
                TokenKind::Min,
                TokenKind::Max,
                TokenKind::Min,
                TokenKind::Ident,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        let tokens = Lexer::tokenize("100 8.5 .25 0.005");
        let texts: Vec<_> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["100", "8.5", ".25", "0.005", ""]);
    }

    #[test]
    fn test_minus_is_never_part_of_a_number() {
        assert_eq!(
            kinds("x-2"),
            vec![TokenKind::Ident, TokenKind::Minus, TokenKind::Number, TokenKind::Eof]
        );
    }

    #[test]
    fn test_coefficient_then_variable() {
        let tokens = Lexer::tokenize("3x1");
        assert_eq!(tokens[0].kind, TokenKind::Number);
        assert_eq!(tokens[0].text, "3");
        assert_eq!(tokens[1].kind, TokenKind::Ident);
        assert_eq!(tokens[1].text, "x1");
    }

    #[test]
    fn test_relations() {
        assert_eq!(
            kinds("<= >= = ≤ ≥ < > == =< =>"),
            vec![
                TokenKind::Le,
                TokenKind::Ge,
                TokenKind::Eq,
                TokenKind::Le,
                TokenKind::Ge,
                TokenKind::Le,
                TokenKind::Ge,
                TokenKind::Eq,
                TokenKind::Le,
                TokenKind::Ge,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_unicode_spans_are_byte_offsets() {
        let tokens = Lexer::tokenize("x ≤ 4");
        assert_eq!(tokens[1].span, Span::new(2, 5));
        assert_eq!(tokens[2].span, Span::new(6, 7));
    }

    #[test]
    fn test_comments() {
        assert_eq!(
            kinds("x // comment\n# another\ny"),
            vec![
                TokenKind::Ident,
                TokenKind::Comment,
                TokenKind::Newline,
                TokenKind::Comment,
                TokenKind::Newline,
                TokenKind::Ident,
                TokenKind::Eof,
            ]
        );
    }
}

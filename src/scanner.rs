use std::iter::Peekable;
use std::str::CharIndices;

use snafu::Snafu;

use crate::token::{Token, TokenType};

/// Marker that keeps a line comment in the token stream.
const EXPECT_MARKER: &str = "expect:";

#[derive(Debug)]
pub struct Scanner<'src> {
    source: &'src str,
    chars: Peekable<CharIndices<'src>>,
    line: usize,
    start: usize,
    current: usize,
}

/// Result of a scan: the tokens (always ending with `Eof`) plus every
/// diagnostic reported along the way.
#[derive(Debug, Default)]
pub struct Scanned {
    pub tokens: Vec<Token>,
    pub errors: Vec<ScanError>,
}

impl<'src> Scanner<'src> {
    pub fn scan_tokens(source: &'src str) -> Scanned {
        let mut scanned = Scanned::default();

        let mut scanner = Scanner {
            source,
            chars: source.char_indices().peekable(),
            line: 1,
            start: 0,
            current: 0,
        };

        loop {
            scanner.start = scanner.current;
            match scanner.advance() {
                Some(c) => match scanner.scan_token(c) {
                    Ok(Some(t)) => scanned.tokens.push(t),
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!("{e}");
                        scanned.errors.push(e);
                    }
                },
                None => break,
            }
        }

        scanned.tokens.push(Token::new_eof(scanner.line));
        scanned
    }

    fn scan_token(&mut self, c: char) -> Result<Option<Token>, ScanError> {
        match c {
            // Single-char token
            '(' | ')' | '{' | '}' | '[' | ']' | ',' | '.' | ';' | ':' | '*' | '%' | '?' => {
                let token_type = match c {
                    '(' => TokenType::LeftParen,
                    ')' => TokenType::RightParen,
                    '{' => TokenType::LeftBrace,
                    '}' => TokenType::RightBrace,
                    '[' => TokenType::LeftSquare,
                    ']' => TokenType::RightSquare,
                    ',' => TokenType::Comma,
                    '.' => TokenType::Dot,
                    ';' => TokenType::Semicolon,
                    ':' => TokenType::Colon,
                    '*' => TokenType::Star,
                    '%' => TokenType::Percent,
                    '?' => TokenType::Question,
                    _ => unreachable!(),
                };
                Ok(Some(self.make_token(token_type)))
            }

            // Double-char token
            '!' => Ok(Some(self.lookahead_token(
                '=',
                TokenType::BangEqual,
                TokenType::Bang,
            ))),
            '=' => Ok(Some(self.lookahead_token(
                '=',
                TokenType::EqualEqual,
                TokenType::Equal,
            ))),
            '>' => Ok(Some(self.lookahead_token(
                '=',
                TokenType::GreaterEqual,
                TokenType::Greater,
            ))),
            '<' => Ok(Some(self.lookahead_token(
                '=',
                TokenType::LessEqual,
                TokenType::Less,
            ))),
            '+' => Ok(Some(self.lookahead_token(
                '+',
                TokenType::PlusPlus,
                TokenType::Plus,
            ))),
            '-' => Ok(Some(self.lookahead_token(
                '-',
                TokenType::MinusMinus,
                TokenType::Minus,
            ))),
            '&' | '|' => {
                if self.peek() == Some(c) {
                    self.advance();
                    let token_type = if c == '&' {
                        TokenType::And
                    } else {
                        TokenType::Or
                    };
                    Ok(Some(self.make_token(token_type)))
                } else {
                    UnexpectedCharSnafu {
                        found: c,
                        line: self.line,
                    }
                    .fail()
                }
            }
            '/' => {
                if self.peek() == Some('/') {
                    while self.peek().is_some_and(|c| c != '\n') {
                        self.advance();
                    }
                    let text = self.current_lexeme();
                    if text.contains(EXPECT_MARKER) {
                        Ok(Some(self.make_token(TokenType::LineComment)))
                    } else {
                        Ok(None)
                    }
                } else if self.peek() == Some('*') {
                    self.advance();
                    self.scan_comment_block()?;
                    Ok(None)
                } else {
                    Ok(Some(self.make_token(TokenType::Slash)))
                }
            }

            // Whitespace
            ' ' | '\r' | '\t' => Ok(None),
            '\n' => {
                self.line += 1;
                Ok(None)
            }

            // State transitions
            '"' | '\'' => Ok(Some(self.scan_string(c)?)),
            '0'..='9' => Ok(Some(self.scan_number())),
            c if is_identifier_start(c) => Ok(Some(self.scan_identifier())),

            _ => UnexpectedCharSnafu {
                found: c,
                line: self.line,
            }
            .fail(),
        }
    }

    fn scan_comment_block(&mut self) -> Result<(), ScanError> {
        let start_line = self.line;
        while let Some(c) = self.advance() {
            if c == '*' && self.peek() == Some('/') {
                self.advance();
                return Ok(());
            }

            if c == '\n' {
                self.line += 1;
            }
        }
        UnterminatedCommentBlockSnafu { line: start_line }.fail()
    }

    fn scan_string(&mut self, quote: char) -> Result<Token, ScanError> {
        let start_line = self.line;
        while let Some(c) = self.advance() {
            match c {
                c if c == quote => {
                    let lexeme = self.current_lexeme();
                    let body = &lexeme[quote.len_utf8()..lexeme.len() - quote.len_utf8()];
                    return Ok(Token::new(TokenType::String, body, start_line));
                }
                '\n' => self.line += 1,
                _ => {}
            }
        }
        UnterminatedStringSnafu { line: start_line }.fail()
    }

    fn scan_number(&mut self) -> Token {
        self.consume_digits();

        // Only a digit after '.' makes this a float
        let mut token_type = TokenType::Integer;
        if self.peek() == Some('.') {
            let mut ahead_iter = self.chars.clone();
            ahead_iter.next();

            if ahead_iter.next().is_some_and(|(_, c)| c.is_ascii_digit()) {
                self.advance();
                self.consume_digits();
                token_type = TokenType::Float;
            }
        }

        self.make_token(token_type)
    }

    fn scan_identifier(&mut self) -> Token {
        while self
            .peek()
            .is_some_and(|c| is_identifier_start(c) || c.is_ascii_digit())
        {
            self.advance();
        }

        let token_type = check_keyword(self.current_lexeme());
        self.make_token(token_type)
    }

    // helper function
    fn advance(&mut self) -> Option<char> {
        let (idx, c) = self.chars.next()?;
        self.current = idx + c.len_utf8();
        Some(c)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn consume_digits(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
    }

    fn lookahead_token(
        &mut self,
        expected: char,
        match_type: TokenType,
        default_type: TokenType,
    ) -> Token {
        let token_type = if self.peek().is_some_and(|c| c == expected) {
            self.advance();
            match_type
        } else {
            default_type
        };
        self.make_token(token_type)
    }

    fn make_token(&self, token_type: TokenType) -> Token {
        Token::new(token_type, self.current_lexeme(), self.line)
    }

    fn current_lexeme(&self) -> &'src str {
        &self.source[self.start..self.current]
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || matches!(c, '_' | '$' | '#' | '\\' | '\u{4e00}'..='\u{9fa5}')
}

fn check_keyword(lexeme: &str) -> TokenType {
    match lexeme {
        "and" => TokenType::And,
        "class" => TokenType::Class,
        "do" => TokenType::Do,
        "else" => TokenType::Else,
        "false" => TokenType::False,
        "for" => TokenType::For,
        "fun" | "function" => TokenType::Function,
        "if" => TokenType::If,
        "null" => TokenType::Null,
        "or" => TokenType::Or,
        "print" => TokenType::Print,
        "return" => TokenType::Return,
        "super" => TokenType::Super,
        "this" => TokenType::This,
        "true" => TokenType::True,
        "var" => TokenType::Var,
        "while" => TokenType::While,
        _ => TokenType::Identifier,
    }
}

#[derive(Debug, Snafu, PartialEq)]
pub enum ScanError {
    #[snafu(display("line {line}: unexpected character '{found}'"))]
    UnexpectedChar { found: char, line: usize },

    #[snafu(display("line {line}: unterminated string"))]
    UnterminatedString { line: usize },

    #[snafu(display("line {line}: unterminated comment block"))]
    UnterminatedCommentBlock { line: usize },
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn types(source: &str) -> Vec<TokenType> {
        Scanner::scan_tokens(source)
            .tokens
            .into_iter()
            .map(|t| t.token_type)
            .collect()
    }

    #[test]
    fn test_integer_literal() {
        for n in ["0", "7", "42", "9223372036854775807"] {
            let scanned = Scanner::scan_tokens(n);
            assert_eq!(
                scanned.tokens,
                vec![Token::new(TokenType::Integer, n, 1), Token::new_eof(1)]
            );
        }
    }

    #[test]
    fn test_float_needs_fraction_digits() {
        assert_eq!(types("1.5"), vec![TokenType::Float, TokenType::Eof]);
        assert_eq!(types("1"), vec![TokenType::Integer, TokenType::Eof]);
        assert_eq!(
            types("1."),
            vec![TokenType::Integer, TokenType::Dot, TokenType::Eof]
        );
    }

    #[test]
    fn test_two_char_operators() {
        assert_eq!(
            types("== != <= >= && || ++ -- = ! < > + -"),
            vec![
                TokenType::EqualEqual,
                TokenType::BangEqual,
                TokenType::LessEqual,
                TokenType::GreaterEqual,
                TokenType::And,
                TokenType::Or,
                TokenType::PlusPlus,
                TokenType::MinusMinus,
                TokenType::Equal,
                TokenType::Bang,
                TokenType::Less,
                TokenType::Greater,
                TokenType::Plus,
                TokenType::Minus,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            types("and or fun function do null"),
            vec![
                TokenType::And,
                TokenType::Or,
                TokenType::Function,
                TokenType::Function,
                TokenType::Do,
                TokenType::Null,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn test_identifier_characters() {
        let scanned = Scanner::scan_tokens("$a_b #c \\d 变量 x1");
        let lexemes: Vec<_> = scanned.tokens.iter().map(|t| t.lexeme.as_str()).collect();
        assert_eq!(lexemes, vec!["$a_b", "#c", "\\d", "变量", "x1", ""]);
        assert!(scanned.errors.is_empty());
    }

    #[test]
    fn test_string_either_quote() {
        let scanned = Scanner::scan_tokens("\"a'b\" 'c\"d'");
        assert_eq!(
            scanned.tokens,
            vec![
                Token::new(TokenType::String, "a'b", 1),
                Token::new(TokenType::String, "c\"d", 1),
                Token::new_eof(1),
            ]
        );
    }

    #[test]
    fn test_unterminated_string_is_reported() {
        let scanned = Scanner::scan_tokens("print \"oops");
        assert_eq!(scanned.errors, vec![ScanError::UnterminatedString { line: 1 }]);
        assert_eq!(
            scanned.tokens.iter().map(|t| t.token_type).collect::<Vec<_>>(),
            vec![TokenType::Print, TokenType::Eof]
        );
    }

    #[test]
    fn test_unexpected_char_continues() {
        let scanned = Scanner::scan_tokens("1 @ 2");
        assert_eq!(
            scanned.errors,
            vec![ScanError::UnexpectedChar { found: '@', line: 1 }]
        );
        assert_eq!(scanned.tokens.len(), 3);
    }

    #[test]
    fn test_comments() {
        let scanned = Scanner::scan_tokens("1 // plain\n/* block\n */ 2 // expect: 2");
        assert_eq!(
            scanned.tokens,
            vec![
                Token::new(TokenType::Integer, "1", 1),
                Token::new(TokenType::Integer, "2", 3),
                Token::new(TokenType::LineComment, "// expect: 2", 3),
                Token::new_eof(3),
            ]
        );
    }

    #[test]
    fn test_unterminated_comment_block() {
        let scanned = Scanner::scan_tokens("/* never closed");
        assert_eq!(
            scanned.errors,
            vec![ScanError::UnterminatedCommentBlock { line: 1 }]
        );
    }
}

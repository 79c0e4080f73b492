use std::str::FromStr;

use bigdecimal::BigDecimal;

use super::error::{QueryParseError, QueryResult};
use super::token::{Token, TokenKind, TokenValue};

pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    tokens: Vec<Token>,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
            tokens: Vec::new(),
        }
    }

    pub fn tokenize(mut self) -> QueryResult<Vec<Token>> {
        loop {
            self.skip_whitespace();
            if self.at_end() {
                self.tokens.push(Token::new(TokenKind::Eof, "", self.pos));
                break;
            }
            self.scan_token()?;
        }
        tracing::trace!(count = self.tokens.len(), "tokenized query");
        Ok(self.tokens)
    }

    fn scan_token(&mut self) -> QueryResult<()> {
        let start = self.pos;
        let c = self.current_char();

        match c {
            '(' => self.single(TokenKind::LeftParen),
            ')' => self.single(TokenKind::RightParen),
            ',' => self.single(TokenKind::Comma),
            '.' => self.single(TokenKind::Dot),
            '=' => self.single(TokenKind::Equal),
            '!' => {
                if self.peek_char(1) == Some('=') {
                    self.double(TokenKind::NotEqual);
                } else {
                    return Err(QueryParseError::at(
                        "Unexpected character '!', did you mean '!='?",
                        start,
                    ));
                }
            }
            '<' => {
                if self.peek_char(1) == Some('=') {
                    self.double(TokenKind::LessEqual);
                } else {
                    self.single(TokenKind::Less);
                }
            }
            '>' => {
                if self.peek_char(1) == Some('=') {
                    self.double(TokenKind::GreaterEqual);
                } else {
                    self.single(TokenKind::Greater);
                }
            }
            '"' => self.scan_string()?,
            '-' if self.peek_char(1).is_some_and(|n| n.is_ascii_digit()) => self.scan_number()?,
            c if c.is_ascii_digit() => self.scan_number()?,
            c if c.is_alphabetic() || c == '_' => self.scan_word()?,
            other => {
                return Err(QueryParseError::at(
                    format!("Unexpected character '{}'", other),
                    start,
                ));
            }
        }

        Ok(())
    }

    fn scan_string(&mut self) -> QueryResult<()> {
        let start = self.pos;
        self.pos += 1;
        let mut text = String::new();

        loop {
            if self.at_end() {
                return Err(self.unterminated(start));
            }
            match self.current_char() {
                '"' => {
                    self.pos += 1;
                    break;
                }
                '\\' => {
                    self.pos += 1;
                    if self.at_end() {
                        return Err(self.unterminated(start));
                    }
                    text.push(self.current_char());
                    self.pos += 1;
                }
                c => {
                    text.push(c);
                    self.pos += 1;
                }
            }
        }

        let token = Token::new(TokenKind::String, self.slice(start), start)
            .with_value(TokenValue::Text(text));
        self.tokens.push(token);
        Ok(())
    }

    fn scan_number(&mut self) -> QueryResult<()> {
        let start = self.pos;
        if self.current_char() == '-' {
            self.pos += 1;
        }
        self.skip_digits();
        if self.current_char() == '.' && self.peek_char(1).is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
            self.skip_digits();
        }

        let lexeme = self.slice(start);
        let number = BigDecimal::from_str(&lexeme).map_err(|e| {
            QueryParseError::at(format!("Invalid number '{}'", lexeme), start).with_cause(e)
        })?;

        let token =
            Token::new(TokenKind::Number, lexeme, start).with_value(TokenValue::Number(number));
        self.tokens.push(token);
        Ok(())
    }

    fn scan_word(&mut self) -> QueryResult<()> {
        let start = self.pos;
        let word = self.read_word();

        let kind = match word.to_ascii_uppercase().as_str() {
            "AND" => TokenKind::And,
            "OR" => TokenKind::Or,
            "NOT" => TokenKind::Not,
            "NULL" => TokenKind::Null,
            "CONTAINS" => TokenKind::Contains,
            "STARTSWITH" => TokenKind::StartsWith,
            "ENDSWITH" => TokenKind::EndsWith,
            "IN" => TokenKind::In,
            "IS" => return self.scan_is(start),
            "TRUE" | "FALSE" => {
                let value = word.eq_ignore_ascii_case("true");
                let token = Token::new(TokenKind::Boolean, word, start)
                    .with_value(TokenValue::Bool(value));
                self.tokens.push(token);
                return Ok(());
            }
            _ => {
                let token = Token::new(TokenKind::Identifier, word.clone(), start)
                    .with_value(TokenValue::Text(word));
                self.tokens.push(token);
                return Ok(());
            }
        };

        self.tokens.push(Token::new(kind, word, start));
        Ok(())
    }

    /// `IS` only ever appears as `IS NULL` or `IS NOT NULL`.
    fn scan_is(&mut self, start: usize) -> QueryResult<()> {
        self.skip_whitespace();
        let word_start = self.pos;
        let word = self.read_word();

        if word.eq_ignore_ascii_case("null") {
            let token = Token::new(TokenKind::IsNull, self.slice(start), start);
            self.tokens.push(token);
            return Ok(());
        }

        if word.eq_ignore_ascii_case("not") {
            self.skip_whitespace();
            let null_start = self.pos;
            let next = self.read_word();
            if !next.eq_ignore_ascii_case("null") {
                return Err(QueryParseError::at(
                    format!(
                        "Expected 'null' after 'is not' but found {}",
                        self.describe_word(&next, null_start)
                    ),
                    null_start,
                ));
            }
            let token = Token::new(TokenKind::IsNotNull, self.slice(start), start);
            self.tokens.push(token);
            return Ok(());
        }

        Err(QueryParseError::at(
            format!(
                "Expected 'null' or 'not null' after 'is' but found {}",
                self.describe_word(&word, word_start)
            ),
            word_start,
        ))
    }

    fn describe_word(&self, word: &str, at: usize) -> String {
        if !word.is_empty() {
            return format!("'{}'", word);
        }
        match self.chars.get(at) {
            Some(c) => format!("'{}'", c),
            None => "end of input".to_string(),
        }
    }

    fn read_word(&mut self) -> String {
        let start = self.pos;
        if !self.at_end() {
            let c = self.current_char();
            if !(c.is_alphabetic() || c == '_') {
                return String::new();
            }
        }
        while !self.at_end() {
            let c = self.current_char();
            if c.is_alphanumeric() || c == '_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        self.slice(start)
    }

    fn single(&mut self, kind: TokenKind) {
        let start = self.pos;
        self.pos += 1;
        let token = Token::new(kind, self.slice(start), start);
        self.tokens.push(token);
    }

    fn double(&mut self, kind: TokenKind) {
        let start = self.pos;
        self.pos += 2;
        let token = Token::new(kind, self.slice(start), start);
        self.tokens.push(token);
    }

    fn unterminated(&self, start: usize) -> QueryParseError {
        QueryParseError::at(
            format!("Unterminated string starting at position {}", start),
            start,
        )
    }

    fn skip_digits(&mut self) {
        while !self.at_end() && self.current_char().is_ascii_digit() {
            self.pos += 1;
        }
    }

    fn skip_whitespace(&mut self) {
        while !self.at_end() && self.current_char().is_whitespace() {
            self.pos += 1;
        }
    }

    fn slice(&self, start: usize) -> String {
        self.chars[start..self.pos].iter().collect()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn current_char(&self) -> char {
        self.chars.get(self.pos).copied().unwrap_or('\0')
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }
}

pub fn tokenize(input: &str) -> QueryResult<Vec<Token>> {
    Lexer::new(input).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_simple_comparison() {
        assert_eq!(
            kinds("Age >= 18"),
            vec![TokenKind::Identifier, TokenKind::GreaterEqual, TokenKind::Number, TokenKind::Eof]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("= != < <= > >="),
            vec![
                TokenKind::Equal,
                TokenKind::NotEqual,
                TokenKind::Less,
                TokenKind::LessEqual,
                TokenKind::Greater,
                TokenKind::GreaterEqual,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_keywords_case_insensitive() {
        assert_eq!(
            kinds("a and B Or not c CONTAINS startsWith EndsWith In"),
            vec![
                TokenKind::Identifier,
                TokenKind::And,
                TokenKind::Identifier,
                TokenKind::Or,
                TokenKind::Not,
                TokenKind::Identifier,
                TokenKind::Contains,
                TokenKind::StartsWith,
                TokenKind::EndsWith,
                TokenKind::In,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_identifier_keeps_case() {
        let tokens = tokenize("mentor.FirstName").unwrap();
        assert_eq!(tokens[0].value, Some(TokenValue::Text("mentor".to_string())));
        assert_eq!(tokens[1].kind, TokenKind::Dot);
        assert_eq!(tokens[2].lexeme, "FirstName");
    }

    #[test]
    fn test_string_with_escape() {
        let tokens = tokenize(r#"Name = "say \"hi\" \\ ok""#).unwrap();
        assert_eq!(
            tokens[2].value,
            Some(TokenValue::Text(r#"say "hi" \ ok"#.to_string()))
        );
    }

    #[test]
    fn test_unterminated_string_reports_start() {
        let err = tokenize(r#"Name = "abc"#).unwrap_err();
        assert_eq!(err.position, Some(7));
        assert!(err.message.contains("Unterminated"));
    }

    #[test]
    fn test_negative_and_decimal_numbers() {
        let tokens = tokenize("-12.50").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Number);
        assert_eq!(
            tokens[0].value,
            Some(TokenValue::Number(BigDecimal::from_str("-12.5").unwrap()))
        );
    }

    #[test]
    fn test_lone_minus_is_error() {
        let err = tokenize("Age = - 5").unwrap_err();
        assert_eq!(err.position, Some(6));
    }

    #[test]
    fn test_bang_without_equal() {
        let err = tokenize("Age ! 5").unwrap_err();
        assert_eq!(err.position, Some(4));
        assert!(err.message.contains("!="));
    }

    #[test]
    fn test_is_null_variants() {
        assert_eq!(kinds("x is null"), vec![TokenKind::Identifier, TokenKind::IsNull, TokenKind::Eof]);
        assert_eq!(
            kinds("x IS  NOT\tNULL"),
            vec![TokenKind::Identifier, TokenKind::IsNotNull, TokenKind::Eof]
        );
    }

    #[test]
    fn test_is_followed_by_other_word() {
        let err = tokenize("x is empty").unwrap_err();
        assert_eq!(err.position, Some(5));
        assert!(err.message.contains("'null' or 'not null'"));
    }

    #[test]
    fn test_is_not_without_null() {
        let err = tokenize("x is not 5").unwrap_err();
        assert_eq!(err.position, Some(9));
    }

    #[test]
    fn test_booleans_and_null() {
        let tokens = tokenize("TRUE false null").unwrap();
        assert_eq!(tokens[0].value, Some(TokenValue::Bool(true)));
        assert_eq!(tokens[1].value, Some(TokenValue::Bool(false)));
        assert_eq!(tokens[2].kind, TokenKind::Null);
    }

    #[test]
    fn test_unexpected_character() {
        let err = tokenize("Age # 5").unwrap_err();
        assert_eq!(err.position, Some(4));
    }

    #[test]
    fn test_positions_are_character_indices() {
        let tokens = tokenize("Név = 1").unwrap();
        assert_eq!(tokens[1].position, 4);
    }

    #[test]
    fn test_always_ends_with_eof() {
        let tokens = tokenize("   ").unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Eof);
    }
}

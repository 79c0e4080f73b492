use super::ast::{Comparison, ComparisonOp, Literal, Node, Value};
use super::error::{QueryParseError, QueryResult};
use super::token::{Token, TokenKind, TokenValue};

/// Deepest allowed nesting of `not`, parentheses and chained `and`/`or`.
pub const MAX_DEPTH: usize = 256;

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map(|t| t.kind) != Some(TokenKind::Eof) {
            let position = tokens.last().map_or(0, |t| t.position + t.lexeme.chars().count());
            tokens.push(Token::new(TokenKind::Eof, "", position));
        }
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    pub fn parse(mut self) -> QueryResult<Node> {
        let node = self.parse_or()?;
        if !self.check(TokenKind::Eof) {
            return Err(self.error("Expected end of input"));
        }
        Ok(node)
    }

    fn parse_or(&mut self) -> QueryResult<Node> {
        let mut left = self.parse_and()?;
        let mut chained = 0;
        while self.check(TokenKind::Or) {
            self.enter()?;
            chained += 1;
            self.advance();
            let right = self.parse_and()?;
            left = Node::or(left, right);
        }
        self.depth -= chained;
        Ok(left)
    }

    fn parse_and(&mut self) -> QueryResult<Node> {
        let mut left = self.parse_not()?;
        let mut chained = 0;
        while self.check(TokenKind::And) {
            self.enter()?;
            chained += 1;
            self.advance();
            let right = self.parse_not()?;
            left = Node::and(left, right);
        }
        self.depth -= chained;
        Ok(left)
    }

    fn parse_not(&mut self) -> QueryResult<Node> {
        if self.check(TokenKind::Not) {
            self.enter()?;
            self.advance();
            let operand = self.parse_not()?;
            self.depth -= 1;
            return Ok(Node::negate(operand));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> QueryResult<Node> {
        if self.check(TokenKind::LeftParen) {
            self.enter()?;
            self.advance();
            let node = self.parse_or()?;
            self.expect(TokenKind::RightParen, "')'")?;
            self.depth -= 1;
            return Ok(node);
        }
        self.parse_comparison()
    }

    // Every later pass recurses over the tree, so the limit bounds them too.
    fn enter(&mut self) -> QueryResult<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(QueryParseError::at(
                format!("Expression nested too deeply (limit {})", MAX_DEPTH),
                self.current().position,
            ));
        }
        Ok(())
    }

    fn parse_comparison(&mut self) -> QueryResult<Node> {
        let position = self.current().position;
        let field = self.parse_path()?;

        let op = match self.current().kind {
            TokenKind::IsNull => ComparisonOp::IsNull,
            TokenKind::IsNotNull => ComparisonOp::IsNotNull,
            TokenKind::Equal => ComparisonOp::Equal,
            TokenKind::NotEqual => ComparisonOp::NotEqual,
            TokenKind::Less => ComparisonOp::LessThan,
            TokenKind::LessEqual => ComparisonOp::LessThanOrEqual,
            TokenKind::Greater => ComparisonOp::GreaterThan,
            TokenKind::GreaterEqual => ComparisonOp::GreaterThanOrEqual,
            TokenKind::Contains => ComparisonOp::Contains,
            TokenKind::StartsWith => ComparisonOp::StartsWith,
            TokenKind::EndsWith => ComparisonOp::EndsWith,
            TokenKind::In => ComparisonOp::In,
            _ => {
                return Err(self.error(&format!("Expected operator after field '{}'", field)));
            }
        };
        self.advance();

        let value = match op {
            ComparisonOp::IsNull | ComparisonOp::IsNotNull => None,
            ComparisonOp::In => Some(Value::List(self.parse_list()?)),
            _ => Some(Value::Scalar(self.parse_literal()?)),
        };

        Ok(Node::Comparison(Comparison {
            field,
            op,
            value,
            position,
        }))
    }

    fn parse_path(&mut self) -> QueryResult<String> {
        let mut path = self.expect_identifier("Expected field name")?;
        while self.match_kind(TokenKind::Dot) {
            let segment = self.expect_identifier("Expected field name after '.'")?;
            path.push('.');
            path.push_str(&segment);
        }
        Ok(path)
    }

    fn parse_list(&mut self) -> QueryResult<Vec<Literal>> {
        self.expect(TokenKind::LeftParen, "'(' after 'in'")?;
        if self.check(TokenKind::RightParen) {
            return Err(self.error("'in' requires at least one value"));
        }

        let mut values = vec![self.parse_literal()?];
        while self.match_kind(TokenKind::Comma) {
            values.push(self.parse_literal()?);
        }

        self.expect(TokenKind::RightParen, "')' or ','")?;
        Ok(values)
    }

    fn parse_literal(&mut self) -> QueryResult<Literal> {
        let token = self.current();
        let literal = match (token.kind, &token.value) {
            (TokenKind::String, Some(TokenValue::Text(s))) => Literal::String(s.clone()),
            (TokenKind::Number, Some(TokenValue::Number(n))) => Literal::Number(n.clone()),
            (TokenKind::Boolean, Some(TokenValue::Bool(b))) => Literal::Bool(*b),
            (TokenKind::Null, _) => Literal::Null,
            _ => return Err(self.error("Expected value (string, number, true, false or null)")),
        };
        self.advance();
        Ok(literal)
    }

    fn expect_identifier(&mut self, message: &str) -> QueryResult<String> {
        let token = self.current();
        match (token.kind, &token.value) {
            (TokenKind::Identifier, Some(TokenValue::Text(name))) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            (TokenKind::Identifier, _) => {
                let name = token.lexeme.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.error(message)),
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> QueryResult<()> {
        if self.match_kind(kind) {
            Ok(())
        } else {
            Err(self.error(&format!("Expected {}", what)))
        }
    }

    fn current(&self) -> &Token {
        // new() guarantees a trailing Eof, and Eof is never consumed.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    fn advance(&mut self) {
        if !self.check(TokenKind::Eof) {
            self.pos += 1;
        }
    }

    fn match_kind(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error(&self, message: &str) -> QueryParseError {
        let token = self.current();
        QueryParseError::at(
            format!("{} but found {}", message, token.describe()),
            token.position,
        )
    }
}

pub fn parse(tokens: Vec<Token>) -> QueryResult<Node> {
    Parser::new(tokens).parse()
}

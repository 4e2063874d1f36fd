// GROQ query parser
// Author: Gabriel Demetrios Lafis

use crate::data::{PathSegment, Value};
use crate::lexer::{tokenize, Token, TokenStream};
use crate::processing::Direction;

use super::{GroqExpr, GroqOp, GroqSyntaxError, ProjectionField, Query, Segment};

/// Parse a query; an empty query selects everything
pub fn parse_query(source: &str) -> Result<Query, GroqSyntaxError> {
    let tokens = tokenize(source, false).map_err(|e| GroqSyntaxError {
        position: e.position,
        message: e.message,
    })?;
    let mut parser = QueryParser {
        stream: TokenStream::new(tokens, source.len()),
    };

    if parser.stream.is_at_end() {
        return Ok(Query { segments: Vec::new() });
    }
    if !parser.stream.eat_symbol("*") {
        return Err(parser.error(format!(
            "query must start with '*' but found {}",
            parser.stream.describe_current()
        )));
    }

    let mut segments = Vec::new();
    while !parser.stream.is_at_end() {
        segments.push(parser.segment()?);
    }

    Ok(Query { segments })
}

struct QueryParser {
    stream: TokenStream,
}

impl QueryParser {
    fn error<S: Into<String>>(&self, message: S) -> GroqSyntaxError {
        GroqSyntaxError {
            position: self.stream.position(),
            message: message.into(),
        }
    }

    fn expect_symbol(&mut self, symbol: &str) -> Result<(), GroqSyntaxError> {
        if self.stream.eat_symbol(symbol) {
            Ok(())
        } else {
            Err(self.error(format!(
                "expected '{}' but found {}",
                symbol,
                self.stream.describe_current()
            )))
        }
    }

    fn segment(&mut self) -> Result<Segment, GroqSyntaxError> {
        if self.stream.eat_symbol("[") {
            if let Some(segment) = self.index_or_slice()? {
                return Ok(segment);
            }
            let filter = self.or_expr()?;
            self.expect_symbol("]")?;
            return Ok(Segment::Filter(filter));
        }

        if self.stream.eat_symbol("{") {
            return Ok(Segment::Projection(self.projection()?));
        }

        if self.stream.eat_symbol("|") {
            if !self.stream.eat_keyword("order") {
                return Err(self.error(format!(
                    "expected 'order' after '|' but found {}",
                    self.stream.describe_current()
                )));
            }
            return Ok(Segment::Order(self.order_keys()?));
        }

        Err(self.error(format!("unexpected {}", self.stream.describe_current())))
    }

    /// Integer token, optionally negative, at `offset` tokens ahead
    fn integer_at(&self, offset: usize) -> Option<(i64, usize)> {
        match (self.stream.peek_at(offset), self.stream.peek_at(offset + 1)) {
            (Some(Token::Number(n)), _) if n.fract() == 0.0 => Some((*n as i64, 1)),
            (Some(Token::Symbol("-")), Some(Token::Number(n))) if n.fract() == 0.0 => {
                Some((-(*n as i64), 2))
            }
            _ => None,
        }
    }

    fn index_or_slice(&mut self) -> Result<Option<Segment>, GroqSyntaxError> {
        let (start, width) = match self.integer_at(0) {
            Some(found) => found,
            None => return Ok(None),
        };

        let inclusive = match self.stream.peek_at(width) {
            Some(Token::Symbol("]")) => {
                self.skip(width + 1);
                return Ok(Some(Segment::Index(start)));
            }
            Some(Token::Symbol("..")) => true,
            Some(Token::Symbol("...")) => false,
            _ => return Ok(None),
        };

        let (end, end_width) = match self.integer_at(width + 1) {
            Some(found) => found,
            None => {
                self.skip(width + 1);
                return Err(self.error("expected an integer after range operator"));
            }
        };
        self.skip(width + 1 + end_width);
        self.expect_symbol("]")?;

        Ok(Some(Segment::Slice { start, end, inclusive }))
    }

    fn skip(&mut self, count: usize) {
        for _ in 0..count {
            self.stream.next();
        }
    }

    fn projection(&mut self) -> Result<Vec<ProjectionField>, GroqSyntaxError> {
        let mut fields = Vec::new();

        while !self.stream.eat_symbol("}") {
            if self.stream.eat_symbol("...") {
                fields.push(ProjectionField::Spread);
            } else if let Some(Token::Quoted(name)) | Some(Token::SingleQuoted(name)) = self.stream.peek().cloned() {
                self.stream.next();
                self.expect_symbol(":")?;
                let value = self.or_expr()?;
                fields.push(ProjectionField::Field { name, value });
            } else {
                let path = self.path()?;
                let name = match path.last() {
                    Some(PathSegment::Key(key)) => key.clone(),
                    _ => return Err(self.error("projection field needs a name")),
                };
                fields.push(ProjectionField::Field {
                    name,
                    value: GroqExpr::Path(path),
                });
            }

            if !self.stream.eat_symbol(",") {
                self.expect_symbol("}")?;
                break;
            }
        }

        Ok(fields)
    }

    fn order_keys(&mut self) -> Result<Vec<(Vec<PathSegment>, Direction)>, GroqSyntaxError> {
        self.expect_symbol("(")?;
        let mut keys = Vec::new();
        loop {
            let path = self.path()?;
            let direction = if self.stream.eat_keyword("desc") {
                Direction::Descending
            } else {
                self.stream.eat_keyword("asc");
                Direction::Ascending
            };
            keys.push((path, direction));
            if self.stream.eat_symbol(")") {
                return Ok(keys);
            }
            self.expect_symbol(",")?;
        }
    }

    /// Attribute path such as `address.city` or `tags[0]`
    fn path(&mut self) -> Result<Vec<PathSegment>, GroqSyntaxError> {
        let mut segments = Vec::new();
        match self.stream.next() {
            Some(Token::Ident(name)) => segments.push(PathSegment::Key(name)),
            Some(Token::Symbol("@")) => {}
            _ => return Err(self.error("expected an attribute name")),
        }

        loop {
            if self.stream.is_symbol(".") {
                self.stream.next();
                match self.stream.next() {
                    Some(Token::Ident(name)) => segments.push(PathSegment::Key(name)),
                    _ => return Err(self.error("expected an attribute name after '.'")),
                }
            } else if self.stream.is_symbol("[")
                && matches!(self.stream.peek_at(1), Some(Token::Number(_)))
                && matches!(self.stream.peek_at(2), Some(Token::Symbol("]")))
            {
                self.stream.next();
                if let Some(Token::Number(n)) = self.stream.next() {
                    segments.push(PathSegment::Index(n as usize));
                }
                self.stream.next();
            } else {
                return Ok(segments);
            }
        }
    }

    fn or_expr(&mut self) -> Result<GroqExpr, GroqSyntaxError> {
        let mut left = self.and_expr()?;
        while self.stream.eat_symbol("||") {
            let right = self.and_expr()?;
            left = GroqExpr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<GroqExpr, GroqSyntaxError> {
        let mut left = self.unary_expr()?;
        while self.stream.eat_symbol("&&") {
            let right = self.unary_expr()?;
            left = GroqExpr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn unary_expr(&mut self) -> Result<GroqExpr, GroqSyntaxError> {
        if self.stream.eat_symbol("!") {
            return Ok(GroqExpr::Not(Box::new(self.unary_expr()?)));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<GroqExpr, GroqSyntaxError> {
        let left = self.primary()?;

        let op = match self.stream.peek() {
            Some(Token::Symbol(symbol)) => match *symbol {
                "==" => Some(GroqOp::Eq),
                "!=" => Some(GroqOp::Ne),
                ">" => Some(GroqOp::Gt),
                ">=" => Some(GroqOp::Ge),
                "<" => Some(GroqOp::Lt),
                "<=" => Some(GroqOp::Le),
                _ => None,
            },
            _ => None,
        };

        if let Some(op) = op {
            self.stream.next();
            let right = self.primary()?;
            return Ok(GroqExpr::Compare(op, Box::new(left), Box::new(right)));
        }

        if self.stream.eat_keyword("in") {
            let right = self.primary()?;
            return Ok(GroqExpr::In(Box::new(left), Box::new(right)));
        }

        Ok(left)
    }

    fn primary(&mut self) -> Result<GroqExpr, GroqSyntaxError> {
        let position = self.stream.position();

        match self.stream.peek().cloned() {
            Some(Token::Number(n)) => {
                self.stream.next();
                Ok(GroqExpr::Literal(Value::Number(n)))
            }
            Some(Token::Symbol("-")) if matches!(self.stream.peek_at(1), Some(Token::Number(_))) => {
                self.stream.next();
                match self.stream.next() {
                    Some(Token::Number(n)) => Ok(GroqExpr::Literal(Value::Number(-n))),
                    _ => Err(self.error("expected a number")),
                }
            }
            Some(Token::Quoted(text)) | Some(Token::SingleQuoted(text)) => {
                self.stream.next();
                Ok(GroqExpr::Literal(Value::String(text)))
            }
            Some(Token::Symbol("(")) => {
                self.stream.next();
                let inner = self.or_expr()?;
                self.expect_symbol(")")?;
                Ok(inner)
            }
            Some(Token::Symbol("[")) => {
                self.stream.next();
                let mut items = Vec::new();
                if !self.stream.eat_symbol("]") {
                    loop {
                        items.push(self.primary()?);
                        if self.stream.eat_symbol("]") {
                            break;
                        }
                        self.expect_symbol(",")?;
                    }
                }
                Ok(GroqExpr::Array(items))
            }
            Some(Token::Ident(name)) if name == "defined" && matches!(self.stream.peek_at(1), Some(Token::Symbol("("))) => {
                self.stream.next();
                self.stream.next();
                let inner = self.primary()?;
                self.expect_symbol(")")?;
                Ok(GroqExpr::Defined(Box::new(inner)))
            }
            Some(Token::Ident(name)) => match name.as_str() {
                "true" | "false" => {
                    self.stream.next();
                    Ok(GroqExpr::Literal(Value::Bool(name == "true")))
                }
                "null" => {
                    self.stream.next();
                    Ok(GroqExpr::Literal(Value::Null))
                }
                _ => Ok(GroqExpr::Path(self.path()?)),
            },
            Some(Token::Symbol("@")) => Ok(GroqExpr::Path(self.path()?)),
            Some(other) => Err(GroqSyntaxError {
                position,
                message: format!("unexpected {}", other.describe()),
            }),
            None => Err(GroqSyntaxError {
                position,
                message: "unexpected end of query".to_string(),
            }),
        }
    }
}

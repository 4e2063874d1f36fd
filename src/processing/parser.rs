// Parser turning pipeline text into stages
// Author: Gabriel Demetrios Lafis

use crate::data::{CsvOptions, Value};
use crate::lexer::{tokenize, Token, TokenStream};

use super::jsonata::Expression;
use super::{
    Aggregate, AggregateFunction, Assignment, CompareOp, Direction, Expr, Function, PipelineError,
    PipelineStage, Predicate, SortKey,
};

/// Parse pipeline text with default CSV options
pub fn parse_pipeline(source: &str) -> Result<Vec<PipelineStage>, PipelineError> {
    parse_pipeline_with(source, &CsvOptions::default())
}

/// Parse pipeline text; `parse-csv` stages start from `csv_defaults`
pub fn parse_pipeline_with(
    source: &str,
    csv_defaults: &CsvOptions,
) -> Result<Vec<PipelineStage>, PipelineError> {
    let tokens = tokenize(source, true).map_err(|e| PipelineError::Syntax {
        position: e.position,
        message: e.message,
    })?;

    let mut parser = StageParser {
        stream: TokenStream::new(tokens, source.len()),
        csv_defaults,
    };
    let mut stages = Vec::new();

    while !parser.stream.is_at_end() {
        stages.push(parser.stage()?);

        if !parser.stream.is_at_end() && !parser.stream.eat_symbol("|") {
            return Err(parser.error(format!(
                "expected '|' between stages but found {}",
                parser.stream.describe_current()
            )));
        }
    }

    log::debug!("parsed pipeline with {} stages", stages.len());
    Ok(stages)
}

struct StageParser<'a> {
    stream: TokenStream,
    csv_defaults: &'a CsvOptions,
}

impl StageParser<'_> {
    fn error<S: Into<String>>(&self, message: S) -> PipelineError {
        PipelineError::Syntax {
            position: self.stream.position(),
            message: message.into(),
        }
    }

    fn expect_symbol(&mut self, symbol: &str) -> Result<(), PipelineError> {
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

    fn stage(&mut self) -> Result<PipelineStage, PipelineError> {
        let position = self.stream.position();
        let verb = match self.stream.next() {
            Some(Token::Ident(verb)) => verb,
            Some(other) => {
                return Err(PipelineError::Syntax {
                    position,
                    message: format!("expected a verb but found {}", other.describe()),
                })
            }
            None => return Err(self.error("expected a verb")),
        };

        let stage = match verb.to_lowercase().as_str() {
            "parse-json" => PipelineStage::ParseJson,
            "parse-csv" => PipelineStage::ParseCsv(self.csv_options()?),
            "parse-xml" => PipelineStage::ParseXml { html: false },
            "parse-html" => PipelineStage::ParseXml { html: true },
            "parse-yaml" => PipelineStage::ParseYaml,
            "scope" => PipelineStage::Scope(self.field()?),
            "project" => PipelineStage::Project(self.assignments()?),
            "project-away" => PipelineStage::ProjectAway(self.fields()?),
            "extend" => PipelineStage::Extend(self.assignments()?),
            "summarize" => self.summarize()?,
            "mv-expand" => PipelineStage::MvExpand(self.field()?),
            "order" | "sort" => {
                if !self.stream.eat_keyword("by") {
                    return Err(self.error(format!("expected 'by' after '{}'", verb)));
                }
                PipelineStage::OrderBy(self.sort_keys()?)
            }
            "limit" | "take" => PipelineStage::Limit(self.count()?),
            "where" => PipelineStage::Where(self.or_predicate()?),
            "count" => PipelineStage::Count,
            "jsonata" => PipelineStage::JsonataExpr(self.jsonata()?),
            _ => return Err(PipelineError::UnknownVerb { verb, position }),
        };

        Ok(stage)
    }

    fn csv_options(&mut self) -> Result<CsvOptions, PipelineError> {
        let mut options = self.csv_defaults.clone();

        loop {
            // Accept `--delimiter=x` as well as `delimiter=x`
            while self.stream.is_symbol("-") && matches!(self.stream.peek_at(1), Some(Token::Symbol("-") | Token::Ident(_))) {
                self.stream.next();
            }

            let key = match self.stream.peek() {
                Some(Token::Ident(key)) => key.to_lowercase(),
                _ => break,
            };
            let position = self.stream.position();
            self.stream.next();

            let value = if self.stream.eat_symbol("=") {
                let position = self.stream.position();
                match self.stream.next() {
                    Some(Token::Quoted(text)) | Some(Token::SingleQuoted(text)) => Value::String(text),
                    Some(Token::Ident(word)) if word == "true" || word == "false" => Value::Bool(word == "true"),
                    Some(Token::Number(n)) => Value::Number(n),
                    _ => {
                        return Err(PipelineError::Syntax {
                            position,
                            message: format!("invalid value for CSV option '{}'", key),
                        })
                    }
                }
            } else {
                Value::Bool(true)
            };

            let single_char = |value: &Value| -> Result<char, PipelineError> {
                let text = value.to_text();
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(c),
                    _ => Err(PipelineError::Syntax {
                        position,
                        message: format!("CSV option '{}' needs a single character", key),
                    }),
                }
            };

            match key.as_str() {
                "delimiter" => options.delimiter = single_char(&value)?,
                "quote" => options.quote = single_char(&value)?,
                "comment" => options.comment = Some(single_char(&value)?),
                "headers" | "columns" => {
                    options.headers = value
                        .to_text()
                        .split(',')
                        .map(|h| h.trim().to_string())
                        .collect();
                }
                "has_header" => options.has_header = value.is_truthy(),
                "skip_empty_lines" => options.skip_empty_lines = value.is_truthy(),
                "skip_lines_with_error" => options.skip_lines_with_error = value.is_truthy(),
                "relax_column_count" => options.relax_column_count = value.is_truthy(),
                _ => {
                    return Err(PipelineError::Syntax {
                        position,
                        message: format!("unknown CSV option '{}'", key),
                    })
                }
            }
        }

        Ok(options)
    }

    /// Field path: double-quoted, backticked or a bare dotted path
    fn field(&mut self) -> Result<String, PipelineError> {
        match self.stream.peek() {
            Some(Token::Quoted(_)) | Some(Token::Backtick(_)) => match self.stream.next() {
                Some(Token::Quoted(text)) | Some(Token::Backtick(text)) => Ok(text),
                _ => Err(self.error("expected a field")),
            },
            Some(Token::Ident(_)) => self.bare_path(),
            _ => Err(self.error(format!(
                "expected a field but found {}",
                self.stream.describe_current()
            ))),
        }
    }

    fn bare_path(&mut self) -> Result<String, PipelineError> {
        let mut path = match self.stream.next() {
            Some(Token::Ident(name)) => name,
            _ => return Err(self.error("expected a field")),
        };

        loop {
            if self.stream.is_symbol(".") {
                self.stream.next();
                match self.stream.next() {
                    Some(Token::Ident(name)) => {
                        path.push('.');
                        path.push_str(&name);
                    }
                    _ => return Err(self.error("expected a name after '.'")),
                }
            } else if self.stream.is_symbol("[") && matches!(self.stream.peek_at(1), Some(Token::Number(_))) {
                self.stream.next();
                if let Some(Token::Number(n)) = self.stream.next() {
                    path.push_str(&format!("[{}]", n as usize));
                }
                self.expect_symbol("]")?;
            } else {
                return Ok(path);
            }
        }
    }

    fn fields(&mut self) -> Result<Vec<String>, PipelineError> {
        let mut fields = vec![self.field()?];
        while self.stream.eat_symbol(",") {
            fields.push(self.field()?);
        }
        Ok(fields)
    }

    fn count(&mut self) -> Result<usize, PipelineError> {
        match self.stream.peek() {
            Some(Token::Number(n)) if *n >= 0.0 && n.fract() == 0.0 => {
                let n = *n as usize;
                self.stream.next();
                Ok(n)
            }
            _ => Err(self.error(format!(
                "expected a non-negative integer but found {}",
                self.stream.describe_current()
            ))),
        }
    }

    fn is_alias(&self) -> bool {
        matches!(
            self.stream.peek(),
            Some(Token::Quoted(_)) | Some(Token::Ident(_)) | Some(Token::Backtick(_))
        ) && matches!(self.stream.peek_at(1), Some(Token::Symbol("=")))
    }

    fn alias(&mut self) -> Result<Option<String>, PipelineError> {
        if !self.is_alias() {
            return Ok(None);
        }
        let name = match self.stream.next() {
            Some(Token::Quoted(name)) | Some(Token::Ident(name)) | Some(Token::Backtick(name)) => name,
            _ => return Err(self.error("expected an alias")),
        };
        self.stream.next();
        Ok(Some(name))
    }

    fn assignments(&mut self) -> Result<Vec<Assignment>, PipelineError> {
        let mut assignments = Vec::new();
        loop {
            let alias = self.alias()?;
            let expr = self.expr()?;
            assignments.push(match alias {
                Some(name) => Assignment::new(&name, expr),
                None => Assignment::unnamed(expr),
            });
            if !self.stream.eat_symbol(",") {
                return Ok(assignments);
            }
        }
    }

    fn expr(&mut self) -> Result<Expr, PipelineError> {
        let position = self.stream.position();

        match self.stream.peek().cloned() {
            Some(Token::Quoted(path)) | Some(Token::Backtick(path)) => {
                self.stream.next();
                Ok(Expr::field(&path))
            }
            Some(Token::SingleQuoted(text)) => {
                self.stream.next();
                Ok(Expr::Literal(Value::String(text)))
            }
            Some(Token::Number(n)) => {
                self.stream.next();
                Ok(Expr::Literal(Value::Number(n)))
            }
            Some(Token::Symbol("-")) if matches!(self.stream.peek_at(1), Some(Token::Number(_))) => {
                self.stream.next();
                match self.stream.next() {
                    Some(Token::Number(n)) => Ok(Expr::Literal(Value::Number(-n))),
                    _ => Err(self.error("expected a number")),
                }
            }
            Some(Token::Ident(name)) if matches!(self.stream.peek_at(1), Some(Token::Symbol("("))) => {
                self.stream.next();
                self.stream.next();
                let function = Function::from_name(&name)
                    .ok_or(PipelineError::UnknownFunction { name: name.clone(), position })?;
                let args = self.arguments()?;
                if !function.accepts(args.len()) {
                    return Err(PipelineError::Syntax {
                        position,
                        message: format!(
                            "function '{}' does not take {} argument(s)",
                            function.name(),
                            args.len()
                        ),
                    });
                }
                Ok(Expr::Call { function, args })
            }
            Some(Token::Ident(name)) => match name.as_str() {
                "true" | "false" => {
                    self.stream.next();
                    Ok(Expr::Literal(Value::Bool(name == "true")))
                }
                "null" => {
                    self.stream.next();
                    Ok(Expr::Literal(Value::Null))
                }
                _ => Ok(Expr::field(&self.bare_path()?)),
            },
            _ => Err(self.error(format!(
                "expected an expression but found {}",
                self.stream.describe_current()
            ))),
        }
    }

    /// Arguments after an opening parenthesis, through the closing one
    fn arguments(&mut self) -> Result<Vec<Expr>, PipelineError> {
        let mut args = Vec::new();
        if self.stream.eat_symbol(")") {
            return Ok(args);
        }
        loop {
            args.push(self.expr()?);
            if self.stream.eat_symbol(")") {
                return Ok(args);
            }
            self.expect_symbol(",")?;
        }
    }

    fn summarize(&mut self) -> Result<PipelineStage, PipelineError> {
        let mut aggregates = Vec::new();

        loop {
            let alias = self.alias()?;
            let position = self.stream.position();
            let name = match self.stream.next() {
                Some(Token::Ident(name)) => name,
                _ => {
                    return Err(PipelineError::Syntax {
                        position,
                        message: "expected an aggregation".to_string(),
                    })
                }
            };
            let function = AggregateFunction::from_name(&name)
                .ok_or(PipelineError::UnknownFunction { name: name.clone(), position })?;

            self.expect_symbol("(")?;
            let mut args = self.arguments()?;
            let argument = match args.len() {
                0 if function.allows_no_argument() => None,
                1 => args.pop(),
                n => {
                    return Err(PipelineError::Syntax {
                        position,
                        message: format!("aggregation '{}' does not take {} argument(s)", function.name(), n),
                    })
                }
            };

            let name = alias.unwrap_or_else(|| function.name().to_string());
            aggregates.push(Aggregate::new(&name, function, argument));

            if !self.stream.eat_symbol(",") {
                break;
            }
        }

        let by = if self.stream.eat_keyword("by") {
            self.fields()?
        } else {
            Vec::new()
        };

        Ok(PipelineStage::Summarize { aggregates, by })
    }

    fn sort_keys(&mut self) -> Result<Vec<SortKey>, PipelineError> {
        let mut keys = Vec::new();
        loop {
            let field = self.field()?;
            let direction = if self.stream.eat_keyword("desc") {
                Direction::Descending
            } else {
                self.stream.eat_keyword("asc");
                Direction::Ascending
            };
            keys.push(SortKey::new(&field, direction));
            if !self.stream.eat_symbol(",") {
                return Ok(keys);
            }
        }
    }

    fn jsonata(&mut self) -> Result<Expression, PipelineError> {
        let position = self.stream.position();
        match self.stream.next() {
            Some(Token::SingleQuoted(text)) | Some(Token::Quoted(text)) => {
                Expression::parse(&text).map_err(|e| PipelineError::Syntax {
                    position: position + 1 + e.position,
                    message: e.message,
                })
            }
            _ => Err(PipelineError::Syntax {
                position,
                message: "jsonata expects a quoted expression".to_string(),
            }),
        }
    }

    fn or_predicate(&mut self) -> Result<Predicate, PipelineError> {
        let mut left = self.and_predicate()?;
        while self.stream.eat_keyword("or") || self.stream.eat_symbol("||") {
            let right = self.and_predicate()?;
            left = Predicate::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and_predicate(&mut self) -> Result<Predicate, PipelineError> {
        let mut left = self.unary_predicate()?;
        while self.stream.eat_keyword("and") || self.stream.eat_symbol("&&") {
            let right = self.unary_predicate()?;
            left = Predicate::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn unary_predicate(&mut self) -> Result<Predicate, PipelineError> {
        if self.stream.eat_keyword("not") || self.stream.eat_symbol("!") {
            return Ok(Predicate::Not(Box::new(self.unary_predicate()?)));
        }
        if self.stream.eat_symbol("(") {
            let inner = self.or_predicate()?;
            self.expect_symbol(")")?;
            return Ok(inner);
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Predicate, PipelineError> {
        let left = self.expr()?;

        // `!in`, `!contains` and friends
        let negated = self.stream.is_symbol("!")
            && matches!(self.stream.peek_at(1), Some(Token::Ident(_)));
        if negated {
            self.stream.next();
        }

        let keyword = match self.stream.peek() {
            Some(Token::Ident(word)) => Some(word.to_lowercase()),
            _ => None,
        };

        if keyword.as_deref() == Some("in") {
            self.stream.next();
            self.expect_symbol("(")?;
            let list = self.arguments()?;
            return Ok(Predicate::In { expr: left, list, negated });
        }

        let predicate = match keyword.as_deref().and_then(CompareOp::from_keyword) {
            Some(op) => {
                self.stream.next();
                let right = self.expr()?;
                Predicate::Compare { left, op, right }
            }
            None if negated => {
                return Err(self.error("expected 'in', 'contains', 'startswith' or 'endswith' after '!'"))
            }
            None => {
                let op = match self.stream.peek() {
                    Some(Token::Symbol(symbol)) => CompareOp::from_symbol(symbol),
                    _ => None,
                };
                match op {
                    Some(op) => {
                        self.stream.next();
                        let right = self.expr()?;
                        Predicate::Compare { left, op, right }
                    }
                    None => Predicate::Truthy(left),
                }
            }
        };

        Ok(if negated {
            Predicate::Not(Box::new(predicate))
        } else {
            predicate
        })
    }
}

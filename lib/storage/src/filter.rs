//! Filter expressions over document fields.
//!
//! Grammar (keywords are case-insensitive):
//!
//! ```text
//! expr      := or
//! or        := and ( OR and )*
//! and       := unary ( AND unary )*
//! unary     := NOT unary | '(' expr ')' | predicate
//! predicate := ident op literal
//!            | ident [NOT] IN '(' literal ( ',' literal )* ')'
//!            | ident [NOT] LIKE string
//!            | ident IS [NOT] NULL
//! op        := = | == | != | <> | < | <= | > | >=
//! literal   := number | 'string' | "string" | true | false
//! ```

use std::cmp::Ordering;
use std::fmt;

use docvec_core::{CollectionSchema, Doc, Error, Result, Value};

pub trait Filter {
    fn matches(&self, doc: &Doc) -> bool;
}

/// What an identifier refers to, resolved once against the schema.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Field(String),
    Pk,
    DocId,
    Score,
    /// Not a field or metadata attribute; never matches.
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    Str(String),
    Bool(bool),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Number(n) => write!(f, "{}", n),
            Literal::Str(s) => write!(f, "'{}'", s),
            Literal::Bool(b) => write!(f, "{}", b),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    fn accepts(self, ord: Ordering) -> bool {
        match self {
            CompareOp::Eq => ord == Ordering::Equal,
            CompareOp::Ne => ord != Ordering::Equal,
            CompareOp::Lt => ord == Ordering::Less,
            CompareOp::Le => ord != Ordering::Greater,
            CompareOp::Gt => ord == Ordering::Greater,
            CompareOp::Ge => ord != Ordering::Less,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterCondition {
    Compare {
        target: Target,
        op: CompareOp,
        value: Literal,
    },
    In {
        target: Target,
        values: Vec<Literal>,
        negated: bool,
    },
    Like {
        target: Target,
        pattern: String,
        negated: bool,
    },
    IsNull {
        target: Target,
        negated: bool,
    },
    And(Vec<FilterCondition>),
    Or(Vec<FilterCondition>),
    Not(Box<FilterCondition>),
}

/// A parsed filter bound to a schema. The empty expression matches every
/// document.
#[derive(Debug, Clone)]
pub struct ExprFilter {
    condition: Option<FilterCondition>,
}

impl ExprFilter {
    pub fn parse(expr: &str, schema: &CollectionSchema) -> Result<Self> {
        if expr.trim().is_empty() {
            return Ok(Self { condition: None });
        }
        let tokens = tokenize(expr)?;
        let mut parser = Parser {
            tokens,
            pos: 0,
            schema,
        };
        let condition = parser.parse_or()?;
        if let Some(tok) = parser.peek() {
            return Err(Error::InvalidArgument(format!(
                "unexpected {} in filter `{}`",
                tok, expr
            )));
        }
        Ok(Self {
            condition: Some(condition),
        })
    }

    pub fn match_all() -> Self {
        Self { condition: None }
    }

    pub fn condition(&self) -> Option<&FilterCondition> {
        self.condition.as_ref()
    }
}

impl Filter for ExprFilter {
    fn matches(&self, doc: &Doc) -> bool {
        self.condition
            .as_ref()
            .map_or(true, |c| matches_condition(c, doc))
    }
}

enum Resolved<'a> {
    Value(&'a Value),
    Owned(Value),
    Null,
    Unknown,
}

fn resolve<'a>(target: &Target, doc: &'a Doc) -> Resolved<'a> {
    match target {
        Target::Field(name) => match doc.get(name) {
            None | Some(Value::Null) => Resolved::Null,
            Some(v) => Resolved::Value(v),
        },
        Target::Pk => Resolved::Owned(Value::String(doc.pk().to_string())),
        Target::DocId => Resolved::Owned(Value::Int64(doc.doc_id())),
        Target::Score => Resolved::Owned(Value::Float(doc.score())),
        Target::Unknown(_) => Resolved::Unknown,
    }
}

fn with_value<F: Fn(&Value) -> bool>(target: &Target, doc: &Doc, f: F) -> bool {
    match resolve(target, doc) {
        Resolved::Value(v) => f(v),
        Resolved::Owned(v) => f(&v),
        Resolved::Null | Resolved::Unknown => false,
    }
}

fn matches_condition(condition: &FilterCondition, doc: &Doc) -> bool {
    match condition {
        FilterCondition::Compare { target, op, value } => {
            with_value(target, doc, |v| any_element(v, |e| compare(e, value).is_some_and(|o| op.accepts(o))))
        }
        FilterCondition::In {
            target,
            values,
            negated,
        } => with_value(target, doc, |v| {
            let hit = any_element(v, |e| values.iter().any(|lit| compare(e, lit) == Some(Ordering::Equal)));
            hit != *negated
        }),
        FilterCondition::Like {
            target,
            pattern,
            negated,
        } => with_value(target, doc, |v| {
            let hit = any_element(v, |e| e.as_str().is_some_and(|s| like(s, pattern)));
            hit != *negated
        }),
        FilterCondition::IsNull { target, negated } => match resolve(target, doc) {
            Resolved::Unknown => false,
            Resolved::Null => !negated,
            Resolved::Value(_) | Resolved::Owned(_) => *negated,
        },
        FilterCondition::And(conditions) => conditions.iter().all(|c| matches_condition(c, doc)),
        FilterCondition::Or(conditions) => conditions.iter().any(|c| matches_condition(c, doc)),
        FilterCondition::Not(inner) => !matches_condition(inner, doc),
    }
}

/// Applies `f` to a scalar, or to each element of an array value.
fn any_element<F: Fn(&Value) -> bool>(value: &Value, f: F) -> bool {
    match value {
        Value::ArrayString(items) => items.iter().any(|s| f(&Value::String(s.clone()))),
        Value::ArrayBool(items) => items.iter().any(|b| f(&Value::Bool(*b))),
        Value::ArrayInt32(items) => items.iter().any(|x| f(&Value::Int32(*x))),
        Value::ArrayInt64(items) => items.iter().any(|x| f(&Value::Int64(*x))),
        Value::ArrayUint32(items) => items.iter().any(|x| f(&Value::Uint32(*x))),
        Value::ArrayUint64(items) => items.iter().any(|x| f(&Value::Uint64(*x))),
        Value::ArrayFloat(items) => items.iter().any(|x| f(&Value::Float(*x))),
        Value::ArrayDouble(items) => items.iter().any(|x| f(&Value::Double(*x))),
        Value::ArrayBinary(items) => items.iter().any(|b| f(&Value::Binary(b.clone()))),
        scalar => f(scalar),
    }
}

fn compare(value: &Value, literal: &Literal) -> Option<Ordering> {
    match literal {
        Literal::Number(n) => value.as_f64().and_then(|v| v.partial_cmp(n)),
        Literal::Str(s) => value.as_str().map(|v| v.cmp(s.as_str())),
        Literal::Bool(b) => value.as_bool().map(|v| v.cmp(b)),
    }
}

/// SQL `LIKE` with `%` (any run) and `_` (one character).
pub fn like(text: &str, pattern: &str) -> bool {
    let t: Vec<char> = text.chars().collect();
    let p: Vec<char> = pattern.chars().collect();
    let (mut ti, mut pi) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;
    while ti < t.len() {
        if pi < p.len() && p[pi] == '%' {
            backtrack = Some((pi, ti));
            pi += 1;
        } else if pi < p.len() && (p[pi] == '_' || p[pi] == t[ti]) {
            ti += 1;
            pi += 1;
        } else if let Some((star, matched)) = backtrack {
            pi = star + 1;
            ti = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|&c| c == '%')
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Number(f64),
    Op(CompareOp),
    LParen,
    RParen,
    Comma,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(s) => write!(f, "`{}`", s),
            Token::Str(s) => write!(f, "string '{}'", s),
            Token::Number(n) => write!(f, "number {}", n),
            Token::Op(op) => write!(f, "operator {:?}", op),
            Token::LParen => f.write_str("`(`"),
            Token::RParen => f.write_str("`)`"),
            Token::Comma => f.write_str("`,`"),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    let err = |msg: String| Error::InvalidArgument(format!("{} in filter `{}`", msg, input));

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '\'' | '"' => {
                let quote = c;
                let mut s = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        None => return Err(err("unterminated string".into())),
                        Some(&ch) if ch == quote => {
                            // A doubled quote is an escaped quote.
                            if chars.get(i + 1) == Some(&quote) {
                                s.push(quote);
                                i += 2;
                            } else {
                                i += 1;
                                break;
                            }
                        }
                        Some(&ch) => {
                            s.push(ch);
                            i += 1;
                        }
                    }
                }
                tokens.push(Token::Str(s));
            }
            '=' => {
                i += if chars.get(i + 1) == Some(&'=') { 2 } else { 1 };
                tokens.push(Token::Op(CompareOp::Eq));
            }
            '!' => {
                if chars.get(i + 1) != Some(&'=') {
                    return Err(err("expected `!=`".into()));
                }
                i += 2;
                tokens.push(Token::Op(CompareOp::Ne));
            }
            '<' => match chars.get(i + 1) {
                Some('=') => {
                    i += 2;
                    tokens.push(Token::Op(CompareOp::Le));
                }
                Some('>') => {
                    i += 2;
                    tokens.push(Token::Op(CompareOp::Ne));
                }
                _ => {
                    i += 1;
                    tokens.push(Token::Op(CompareOp::Lt));
                }
            },
            '>' => {
                if chars.get(i + 1) == Some(&'=') {
                    i += 2;
                    tokens.push(Token::Op(CompareOp::Ge));
                } else {
                    i += 1;
                    tokens.push(Token::Op(CompareOp::Gt));
                }
            }
            c if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => {
                let start = i;
                i += 1;
                while i < chars.len()
                    && (chars[i].is_ascii_digit()
                        || matches!(chars[i], '.' | 'e' | 'E')
                        || (matches!(chars[i], '-' | '+') && matches!(chars[i - 1], 'e' | 'E')))
                {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let n = text
                    .parse::<f64>()
                    .map_err(|_| err(format!("invalid number `{}`", text)))?;
                tokens.push(Token::Number(n));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || matches!(chars[i], '_' | '.')) {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => return Err(err(format!("unexpected character `{}`", other))),
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    schema: &'a CollectionSchema,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(s)) if s.eq_ignore_ascii_case(keyword))
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.peek_keyword(keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<()> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("`{}`", keyword)))
        }
    }

    fn expect(&mut self, token: Token) -> Result<()> {
        if self.peek() == Some(&token) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected(&token.to_string()))
        }
    }

    fn unexpected(&self, wanted: &str) -> Error {
        match self.peek() {
            Some(tok) => Error::InvalidArgument(format!("expected {} but found {}", wanted, tok)),
            None => Error::InvalidArgument(format!("expected {} but the filter ended", wanted)),
        }
    }

    fn parse_or(&mut self) -> Result<FilterCondition> {
        let mut terms = vec![self.parse_and()?];
        while self.eat_keyword("or") {
            terms.push(self.parse_and()?);
        }
        Ok(if terms.len() == 1 {
            terms.remove(0)
        } else {
            FilterCondition::Or(terms)
        })
    }

    fn parse_and(&mut self) -> Result<FilterCondition> {
        let mut terms = vec![self.parse_unary()?];
        while self.eat_keyword("and") {
            terms.push(self.parse_unary()?);
        }
        Ok(if terms.len() == 1 {
            terms.remove(0)
        } else {
            FilterCondition::And(terms)
        })
    }

    fn parse_unary(&mut self) -> Result<FilterCondition> {
        if self.eat_keyword("not") {
            return Ok(FilterCondition::Not(Box::new(self.parse_unary()?)));
        }
        if self.peek() == Some(&Token::LParen) {
            self.pos += 1;
            let inner = self.parse_or()?;
            self.expect(Token::RParen)?;
            return Ok(inner);
        }
        self.parse_predicate()
    }

    fn parse_predicate(&mut self) -> Result<FilterCondition> {
        let target = match self.next() {
            Some(Token::Ident(name)) if !is_keyword(&name) => self.resolve(&name),
            _ => {
                self.pos -= 1;
                return Err(self.unexpected("a field name"));
            }
        };

        if let Some(Token::Op(op)) = self.peek().cloned() {
            self.pos += 1;
            let value = self.parse_literal()?;
            return Ok(FilterCondition::Compare { target, op, value });
        }

        if self.eat_keyword("is") {
            let negated = self.eat_keyword("not");
            self.expect_keyword("null")?;
            return Ok(FilterCondition::IsNull { target, negated });
        }

        let negated = self.eat_keyword("not");
        if self.eat_keyword("in") {
            self.expect(Token::LParen)?;
            let mut values = vec![self.parse_literal()?];
            while self.peek() == Some(&Token::Comma) {
                self.pos += 1;
                values.push(self.parse_literal()?);
            }
            self.expect(Token::RParen)?;
            return Ok(FilterCondition::In {
                target,
                values,
                negated,
            });
        }
        if self.eat_keyword("like") {
            return match self.next() {
                Some(Token::Str(pattern)) => Ok(FilterCondition::Like {
                    target,
                    pattern,
                    negated,
                }),
                _ => {
                    self.pos -= 1;
                    Err(self.unexpected("a LIKE pattern string"))
                }
            };
        }
        Err(self.unexpected("a comparison, IN, LIKE or IS"))
    }

    fn parse_literal(&mut self) -> Result<Literal> {
        match self.next() {
            Some(Token::Number(n)) => Ok(Literal::Number(n)),
            Some(Token::Str(s)) => Ok(Literal::Str(s)),
            Some(Token::Ident(s)) if s.eq_ignore_ascii_case("true") => Ok(Literal::Bool(true)),
            Some(Token::Ident(s)) if s.eq_ignore_ascii_case("false") => Ok(Literal::Bool(false)),
            _ => {
                self.pos -= 1;
                Err(self.unexpected("a literal"))
            }
        }
    }

    fn resolve(&self, name: &str) -> Target {
        if self.schema.has_field(name) {
            return Target::Field(name.to_string());
        }
        match name {
            "pk" => Target::Pk,
            "doc_id" => Target::DocId,
            "score" => Target::Score,
            other => Target::Unknown(other.to_string()),
        }
    }
}

fn is_keyword(s: &str) -> bool {
    ["and", "or", "not", "in", "like", "is", "null"]
        .iter()
        .any(|k| s.eq_ignore_ascii_case(k))
}

#[cfg(test)]
mod tests {
    use super::*;
    use docvec_core::{DataType, FieldSchema};

    fn schema() -> CollectionSchema {
        CollectionSchema::create(
            "products",
            vec![
                FieldSchema::new("title", DataType::String),
                FieldSchema::new("price", DataType::Double),
                FieldSchema::new("stock", DataType::Int32).with_nullable(true),
                FieldSchema::new("active", DataType::Bool),
                FieldSchema::new("tags", DataType::ArrayString).with_nullable(true),
            ],
        )
        .unwrap()
    }

    fn doc() -> Doc {
        let mut d = Doc::with_pk("p1");
        d.set_value("title", "Running Shoe");
        d.set_value("price", 59.5);
        d.set_null("stock");
        d.set_value("active", true);
        d.set_value("tags", vec!["sport", "outdoor"]);
        d.set_doc_id(4);
        d
    }

    fn eval(expr: &str) -> bool {
        ExprFilter::parse(expr, &schema()).unwrap().matches(&doc())
    }

    #[test]
    fn test_comparisons() {
        assert!(eval("price > 50"));
        assert!(eval("price >= 59.5 and price <= 59.5"));
        assert!(!eval("price < 10"));
        assert!(eval("price != 1"));
        assert!(eval("price <> 1"));
        assert!(eval("title = 'Running Shoe'"));
        assert!(eval("title == \"Running Shoe\""));
        assert!(eval("active = true"));
    }

    #[test]
    fn test_boolean_connectives() {
        assert!(eval("price < 10 OR active = true"));
        assert!(!eval("price < 10 AND active = true"));
        assert!(eval("NOT (price < 10)"));
        assert!(eval("(price > 1 or price < 0) and not active = false"));
    }

    #[test]
    fn test_in_and_like() {
        assert!(eval("title IN ('Boot', 'Running Shoe')"));
        assert!(eval("price not in (1, 2, 3)"));
        assert!(eval("title LIKE 'Run%'"));
        assert!(eval("title like '%Sho_'"));
        assert!(!eval("title NOT LIKE '%Shoe'"));
        assert!(eval("tags = 'sport'"));
        assert!(eval("tags in ('outdoor')"));
    }

    #[test]
    fn test_null_checks() {
        assert!(eval("stock IS NULL"));
        assert!(!eval("stock IS NOT NULL"));
        assert!(!eval("stock > 0"));
        assert!(eval("price is not null"));
    }

    #[test]
    fn test_metadata_attributes() {
        assert!(eval("pk = 'p1'"));
        assert!(eval("doc_id = 4"));
        assert!(!eval("score < 0"));
    }

    #[test]
    fn test_unknown_identifier_matches_nothing() {
        assert!(!eval("colour = 'red'"));
        assert!(!eval("colour IS NULL"));
    }

    #[test]
    fn test_empty_filter_matches_all() {
        assert!(eval(""));
        assert!(eval("   "));
    }

    #[test]
    fn test_parse_errors() {
        for bad in ["price >", "(price > 1", "price 5", "title = 'open", "and", "price in ()", "x # 1"] {
            let err = ExprFilter::parse(bad, &schema()).unwrap_err();
            assert!(matches!(err, Error::InvalidArgument(_)), "{bad}");
        }
    }

    #[test]
    fn test_like_matcher() {
        assert!(like("abc", "a%"));
        assert!(like("abc", "%c"));
        assert!(like("abc", "a_c"));
        assert!(like("", "%"));
        assert!(!like("abc", "a_"));
        assert!(like("aXbXc", "a%b%c"));
    }

    #[test]
    fn test_negative_numbers() {
        let f = ExprFilter::parse("price > -1.5e1", &schema()).unwrap();
        assert!(f.matches(&doc()));
    }
}

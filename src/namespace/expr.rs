//! A small Pratt-style expression language for directive payloads.
//!
//! Directive bodies (`/*# if ... */`, `/*= ... */`, `/*$ ... */`, `/*@ ... */`)
//! are opaque strings handed to this sub-engine; it never sees SQL tokens.

use super::value::Value;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum ExprError {
    UnexpectedEnd,
    UnexpectedToken(String),
    UnknownPath(String),
    NotCallable(String),
    UnknownFunction(String),
    WrongArgCount { function: String, expected: usize, got: usize },
    TypeError { op: &'static str, lhs: &'static str, rhs: &'static str },
    NotAList(&'static str),
    NotIndexable(&'static str),
}

impl fmt::Display for ExprError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprError::UnexpectedEnd => write!(f, "unexpected end of expression"),
            ExprError::UnexpectedToken(t) => write!(f, "unexpected token '{t}'"),
            ExprError::UnknownPath(p) => write!(f, "unknown name '{p}'"),
            ExprError::NotCallable(p) => write!(f, "'{p}' is not callable"),
            ExprError::UnknownFunction(name) => write!(f, "unknown function '{name}'"),
            ExprError::WrongArgCount { function, expected, got } => {
                write!(f, "'{function}' expects {expected} argument(s), got {got}")
            }
            ExprError::TypeError { op, lhs, rhs } => {
                write!(f, "operator '{op}' is not defined for {lhs} and {rhs}")
            }
            ExprError::NotAList(ty) => write!(f, "expected a list, found {ty}"),
            ExprError::NotIndexable(ty) => write!(f, "cannot index into {ty}"),
        }
    }
}

impl std::error::Error for ExprError {}

// ---------------------------------------------------------------------
// Mini-lexer
// ---------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    True,
    False,
    Null,
    Dot,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Op(&'static str),
}

fn lex(input: &str) -> Result<Vec<Tok>, ExprError> {
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;
    let mut out = Vec::new();
    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '.' => {
                out.push(Tok::Dot);
                i += 1;
            }
            ',' => {
                out.push(Tok::Comma);
                i += 1;
            }
            '(' => {
                out.push(Tok::LParen);
                i += 1;
            }
            ')' => {
                out.push(Tok::RParen);
                i += 1;
            }
            '[' => {
                out.push(Tok::LBracket);
                i += 1;
            }
            ']' => {
                out.push(Tok::RBracket);
                i += 1;
            }
            '\'' | '"' => {
                let quote = c;
                i += 1;
                let start = i;
                while i < chars.len() && chars[i] != quote {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                if i < chars.len() {
                    i += 1;
                }
                out.push(Tok::Str(text));
            }
            '0'..='9' => {
                let start = i;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                let mut is_float = false;
                if i < chars.len() && chars[i] == '.' && i + 1 < chars.len() && chars[i + 1].is_ascii_digit() {
                    is_float = true;
                    i += 1;
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                }
                let text: String = chars[start..i].iter().collect();
                if is_float {
                    out.push(Tok::Float(text.parse().unwrap_or(0.0)));
                } else {
                    out.push(Tok::Int(text.parse().unwrap_or(0)));
                }
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                match text.as_str() {
                    "true" => out.push(Tok::True),
                    "false" => out.push(Tok::False),
                    "null" => out.push(Tok::Null),
                    _ => out.push(Tok::Ident(text)),
                }
            }
            '|' if chars.get(i + 1) == Some(&'|') => {
                out.push(Tok::Op("||"));
                i += 2;
            }
            '&' if chars.get(i + 1) == Some(&'&') => {
                out.push(Tok::Op("&&"));
                i += 2;
            }
            '=' if chars.get(i + 1) == Some(&'=') => {
                out.push(Tok::Op("=="));
                i += 2;
            }
            '!' if chars.get(i + 1) == Some(&'=') => {
                out.push(Tok::Op("!="));
                i += 2;
            }
            '!' => {
                out.push(Tok::Op("!"));
                i += 1;
            }
            '<' if chars.get(i + 1) == Some(&'=') => {
                out.push(Tok::Op("<="));
                i += 2;
            }
            '<' => {
                out.push(Tok::Op("<"));
                i += 1;
            }
            '>' if chars.get(i + 1) == Some(&'=') => {
                out.push(Tok::Op(">="));
                i += 2;
            }
            '>' => {
                out.push(Tok::Op(">"));
                i += 1;
            }
            '+' => {
                out.push(Tok::Op("+"));
                i += 1;
            }
            '-' => {
                out.push(Tok::Op("-"));
                i += 1;
            }
            '*' => {
                out.push(Tok::Op("*"));
                i += 1;
            }
            '/' => {
                out.push(Tok::Op("/"));
                i += 1;
            }
            '%' => {
                out.push(Tok::Op("%"));
                i += 1;
            }
            _ => return Err(ExprError::UnexpectedToken(c.to_string())),
        }
    }
    Ok(out)
}

// ---------------------------------------------------------------------
// AST
// ---------------------------------------------------------------------

/// A compiled expression, ready for repeated evaluation against different
/// namespace bindings.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Null,
    Path(Vec<String>),
    Index(Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
    Not(Box<Expr>),
    Neg(Box<Expr>),
    BinOp(&'static str, Box<Expr>, Box<Expr>),
}

struct Parser {
    tokens: Vec<Tok>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Tok> {
        let t = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    fn expect_op(&mut self, op: &'static str) -> bool {
        if self.peek() == Some(&Tok::Op(op)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, ExprError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.parse_and()?;
        while self.expect_op("||") {
            let rhs = self.parse_and()?;
            lhs = Expr::BinOp("||", Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.parse_not()?;
        while self.expect_op("&&") {
            let rhs = self.parse_not()?;
            lhs = Expr::BinOp("&&", Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Expr, ExprError> {
        if self.expect_op("!") {
            let inner = self.parse_not()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_cmp()
    }

    fn parse_cmp(&mut self) -> Result<Expr, ExprError> {
        let lhs = self.parse_add()?;
        for op in ["==", "!=", "<=", ">=", "<", ">"] {
            if self.expect_op(op) {
                let rhs = self.parse_add()?;
                return Ok(Expr::BinOp(op, Box::new(lhs), Box::new(rhs)));
            }
        }
        Ok(lhs)
    }

    fn parse_add(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.parse_mul()?;
        loop {
            if self.expect_op("+") {
                let rhs = self.parse_mul()?;
                lhs = Expr::BinOp("+", Box::new(lhs), Box::new(rhs));
            } else if self.expect_op("-") {
                let rhs = self.parse_mul()?;
                lhs = Expr::BinOp("-", Box::new(lhs), Box::new(rhs));
            } else {
                break;
            }
        }
        Ok(lhs)
    }

    fn parse_mul(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.parse_unary()?;
        loop {
            if self.expect_op("*") {
                let rhs = self.parse_unary()?;
                lhs = Expr::BinOp("*", Box::new(lhs), Box::new(rhs));
            } else if self.expect_op("/") {
                let rhs = self.parse_unary()?;
                lhs = Expr::BinOp("/", Box::new(lhs), Box::new(rhs));
            } else if self.expect_op("%") {
                let rhs = self.parse_unary()?;
                lhs = Expr::BinOp("%", Box::new(lhs), Box::new(rhs));
            } else {
                break;
            }
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, ExprError> {
        if self.expect_op("-") {
            let inner = self.parse_unary()?;
            return Ok(Expr::Neg(Box::new(inner)));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, ExprError> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek() {
                Some(Tok::Dot) => {
                    self.pos += 1;
                    match self.next() {
                        Some(Tok::Ident(name)) => {
                            expr = match expr {
                                Expr::Path(mut segments) => {
                                    segments.push(name);
                                    Expr::Path(segments)
                                }
                                other => Expr::Path(vec![render_path_root(&other), name]),
                            };
                        }
                        _ => return Err(ExprError::UnexpectedEnd),
                    }
                }
                Some(Tok::LBracket) => {
                    self.pos += 1;
                    let index = self.parse_expr()?;
                    if self.peek() != Some(&Tok::RBracket) {
                        return Err(ExprError::UnexpectedEnd);
                    }
                    self.pos += 1;
                    expr = Expr::Index(Box::new(expr), Box::new(index));
                }
                Some(Tok::LParen) => {
                    self.pos += 1;
                    let mut args = Vec::new();
                    if self.peek() != Some(&Tok::RParen) {
                        loop {
                            args.push(self.parse_expr()?);
                            if self.peek() == Some(&Tok::Comma) {
                                self.pos += 1;
                                continue;
                            }
                            break;
                        }
                    }
                    if self.peek() != Some(&Tok::RParen) {
                        return Err(ExprError::UnexpectedEnd);
                    }
                    self.pos += 1;
                    let name = match expr {
                        Expr::Path(segments) if segments.len() == 1 => segments[0].clone(),
                        _ => return Err(ExprError::NotCallable("<expr>".into())),
                    };
                    expr = Expr::Call(name, args);
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, ExprError> {
        match self.next() {
            Some(Tok::Int(n)) => Ok(Expr::Int(n)),
            Some(Tok::Float(f)) => Ok(Expr::Float(f)),
            Some(Tok::Str(s)) => Ok(Expr::Str(s)),
            Some(Tok::True) => Ok(Expr::Bool(true)),
            Some(Tok::False) => Ok(Expr::Bool(false)),
            Some(Tok::Null) => Ok(Expr::Null),
            Some(Tok::Ident(name)) => Ok(Expr::Path(vec![name])),
            Some(Tok::LParen) => {
                let inner = self.parse_expr()?;
                if self.peek() != Some(&Tok::RParen) {
                    return Err(ExprError::UnexpectedEnd);
                }
                self.pos += 1;
                Ok(inner)
            }
            Some(other) => Err(ExprError::UnexpectedToken(format!("{other:?}"))),
            None => Err(ExprError::UnexpectedEnd),
        }
    }
}

fn render_path_root(expr: &Expr) -> String {
    match expr {
        Expr::Path(segments) => segments.join("."),
        _ => "<expr>".to_string(),
    }
}

/// Parses a directive payload into a compiled [`Expr`].
pub fn parse(input: &str) -> Result<Expr, ExprError> {
    let tokens = lex(input)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_expr()?;
    if parser.pos != parser.tokens.len() {
        return Err(ExprError::UnexpectedToken(format!("{:?}", parser.tokens[parser.pos])));
    }
    Ok(expr)
}

// ---------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------

/// Anything that can resolve a dotted path to a [`Value`] — implemented by
/// the parameter namespace and the environment-constant namespace.
pub trait Bindings {
    fn resolve(&self, path: &[String]) -> Option<Value>;
}

pub fn eval(expr: &Expr, bindings: &dyn Bindings) -> Result<Value, ExprError> {
    match expr {
        Expr::Int(n) => Ok(Value::Int(*n)),
        Expr::Float(f) => Ok(Value::Float(*f)),
        Expr::Str(s) => Ok(Value::Str(s.clone())),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Null => Ok(Value::Null),
        Expr::Path(segments) => bindings
            .resolve(segments)
            .ok_or_else(|| ExprError::UnknownPath(segments.join("."))),
        Expr::Index(base, index) => {
            let base_val = eval(base, bindings)?;
            let index_val = eval(index, bindings)?;
            match (&base_val, &index_val) {
                (Value::List(_), Value::Int(i)) => {
                    Ok(base_val.index(*i).cloned().unwrap_or(Value::Null))
                }
                (Value::Map(_), Value::Str(key)) => {
                    Ok(base_val.get_field(key).cloned().unwrap_or(Value::Null))
                }
                _ => Err(ExprError::NotIndexable(base_val.type_name())),
            }
        }
        Expr::Call(name, args) => eval_call(name, args, bindings),
        Expr::Not(inner) => Ok(Value::Bool(!eval(inner, bindings)?.is_truthy())),
        Expr::Neg(inner) => match eval(inner, bindings)? {
            Value::Int(n) => Ok(Value::Int(-n)),
            Value::Float(f) => Ok(Value::Float(-f)),
            other => Err(ExprError::TypeError { op: "-", lhs: other.type_name(), rhs: "" }),
        },
        Expr::BinOp(op, lhs, rhs) => eval_binop(op, lhs, rhs, bindings),
    }
}

fn eval_call(name: &str, args: &[Expr], bindings: &dyn Bindings) -> Result<Value, ExprError> {
    match name {
        "size" => {
            if args.len() != 1 {
                return Err(ExprError::WrongArgCount { function: "size".into(), expected: 1, got: args.len() });
            }
            match eval(&args[0], bindings)? {
                Value::List(items) => Ok(Value::Int(items.len() as i64)),
                Value::Map(entries) => Ok(Value::Int(entries.len() as i64)),
                Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
                other => Err(ExprError::NotAList(other.type_name())),
            }
        }
        other => Err(ExprError::UnknownFunction(other.to_string())),
    }
}

fn eval_binop(op: &'static str, lhs: &Expr, rhs: &Expr, bindings: &dyn Bindings) -> Result<Value, ExprError> {
    if op == "||" {
        return Ok(Value::Bool(eval(lhs, bindings)?.is_truthy() || eval(rhs, bindings)?.is_truthy()));
    }
    if op == "&&" {
        return Ok(Value::Bool(eval(lhs, bindings)?.is_truthy() && eval(rhs, bindings)?.is_truthy()));
    }
    let l = eval(lhs, bindings)?;
    let r = eval(rhs, bindings)?;
    match op {
        "==" => Ok(Value::Bool(values_equal(&l, &r))),
        "!=" => Ok(Value::Bool(!values_equal(&l, &r))),
        "<" | "<=" | ">" | ">=" => compare(op, &l, &r),
        "+" | "-" | "*" | "/" | "%" => arithmetic(op, &l, &r),
        _ => unreachable!("unhandled operator {op}"),
    }
}

fn values_equal(l: &Value, r: &Value) -> bool {
    match (l, r) {
        (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => (*a as f64) == *b,
        _ => l == r,
    }
}

fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Int(n) => Some(*n as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    }
}

fn compare(op: &'static str, l: &Value, r: &Value) -> Result<Value, ExprError> {
    let ordering = match (l, r) {
        (Value::Str(a), Value::Str(b)) => a.partial_cmp(b),
        _ => match (as_f64(l), as_f64(r)) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => return Err(ExprError::TypeError { op, lhs: l.type_name(), rhs: r.type_name() }),
        },
    };
    let Some(ordering) = ordering else {
        return Err(ExprError::TypeError { op, lhs: l.type_name(), rhs: r.type_name() });
    };
    let result = match op {
        "<" => ordering.is_lt(),
        "<=" => ordering.is_le(),
        ">" => ordering.is_gt(),
        ">=" => ordering.is_ge(),
        _ => unreachable!(),
    };
    Ok(Value::Bool(result))
}

fn arithmetic(op: &'static str, l: &Value, r: &Value) -> Result<Value, ExprError> {
    if op == "+" {
        if let (Value::Str(a), Value::Str(b)) = (l, r) {
            return Ok(Value::Str(format!("{a}{b}")));
        }
    }
    match (l, r) {
        (Value::Int(a), Value::Int(b)) => Ok(match op {
            "+" => Value::Int(a + b),
            "-" => Value::Int(a - b),
            "*" => Value::Int(a * b),
            "/" => {
                if *b == 0 {
                    return Err(ExprError::TypeError { op, lhs: "int", rhs: "zero" });
                }
                Value::Int(a / b)
            }
            "%" => {
                if *b == 0 {
                    return Err(ExprError::TypeError { op, lhs: "int", rhs: "zero" });
                }
                Value::Int(a % b)
            }
            _ => unreachable!(),
        }),
        _ => match (as_f64(l), as_f64(r)) {
            (Some(a), Some(b)) => Ok(match op {
                "+" => Value::Float(a + b),
                "-" => Value::Float(a - b),
                "*" => Value::Float(a * b),
                "/" => Value::Float(a / b),
                "%" => Value::Float(a % b),
                _ => unreachable!(),
            }),
            _ => Err(ExprError::TypeError { op, lhs: l.type_name(), rhs: r.type_name() }),
        },
    }
}

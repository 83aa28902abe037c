//! Boolean expressions over the value being tested
//!
//! Expressions such as `v > p && v - f < 100` replace the literal comparison.
//! `v` is the value just read; on next scans `f`/`first` and `p`/`prev` are
//! the values recorded on the result. Integers evaluate in 128-bit
//! arithmetic and anything involving a float evaluates in f64. A nonzero
//! result is a match.

use crate::core::types::InputError;

/// A number flowing through the evaluator
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i128),
    Float(f64),
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            Number::Int(v) => v as f64,
            Number::Float(v) => v,
        }
    }

    fn truthy(self) -> bool {
        match self {
            Number::Int(v) => v != 0,
            Number::Float(v) => v != 0.0,
        }
    }

    fn from_bool(b: bool) -> Self {
        Number::Int(b as i128)
    }
}

/// Decides whether a read value matches, given its recorded history.
///
/// `first` and `previous` are `None` on a first scan.
pub trait ValueEvaluator: Send + Sync {
    fn evaluate(&self, value: Number, first: Option<Number>, previous: Option<Number>) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Var {
    Value,
    First,
    Previous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Num(Number),
    Var(Var),
    Unary(UnOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(Number),
    Ident(String),
    Op(&'static str),
    LParen,
    RParen,
}

/// A compiled expression
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    root: Expr,
    uses_history: bool,
}

impl Expression {
    /// Parses `text`.
    ///
    /// With `allow_history` false, referencing `first` or `prev` is an error
    /// since a first scan has no recorded values. `hex_literals` makes bare
    /// integer literals parse as hexadecimal.
    pub fn compile(text: &str, allow_history: bool, hex_literals: bool) -> Result<Self, InputError> {
        let tokens = tokenize(text, hex_literals)?;
        if tokens.is_empty() {
            return Err(InputError::Empty { field: "Expression" });
        }

        let mut parser = Parser { tokens, pos: 0 };
        let root = parser.parse_or()?;
        if parser.pos != parser.tokens.len() {
            return Err(InputError::InvalidExpression(format!(
                "unexpected {:?} after end of expression",
                parser.tokens[parser.pos]
            )));
        }

        let uses_history = references_history(&root);
        if uses_history && !allow_history {
            return Err(InputError::InvalidExpression(
                "first and prev are only available on next scans".to_string(),
            ));
        }

        Ok(Expression { root, uses_history })
    }

    /// True when the expression reads `first` or `prev`
    pub fn uses_history(&self) -> bool {
        self.uses_history
    }
}

impl ValueEvaluator for Expression {
    fn evaluate(&self, value: Number, first: Option<Number>, previous: Option<Number>) -> bool {
        let vars = Vars {
            value,
            first,
            previous,
        };
        eval(&self.root, &vars).map(Number::truthy).unwrap_or(false)
    }
}

struct Vars {
    value: Number,
    first: Option<Number>,
    previous: Option<Number>,
}

fn references_history(expr: &Expr) -> bool {
    match expr {
        Expr::Num(_) => false,
        Expr::Var(var) => *var != Var::Value,
        Expr::Unary(_, inner) => references_history(inner),
        Expr::Binary(_, lhs, rhs) => references_history(lhs) || references_history(rhs),
    }
}

/// `None` means the expression has no value here (division by zero, overflow
/// or a missing history variable), which never matches.
fn eval(expr: &Expr, vars: &Vars) -> Option<Number> {
    match expr {
        Expr::Num(n) => Some(*n),
        Expr::Var(Var::Value) => Some(vars.value),
        Expr::Var(Var::First) => vars.first,
        Expr::Var(Var::Previous) => vars.previous,
        Expr::Unary(UnOp::Neg, inner) => match eval(inner, vars)? {
            Number::Int(v) => v.checked_neg().map(Number::Int),
            Number::Float(v) => Some(Number::Float(-v)),
        },
        Expr::Unary(UnOp::Not, inner) => Some(Number::from_bool(!eval(inner, vars)?.truthy())),
        Expr::Binary(BinOp::And, lhs, rhs) => {
            if !eval(lhs, vars)?.truthy() {
                return Some(Number::Int(0));
            }
            Some(Number::from_bool(eval(rhs, vars)?.truthy()))
        }
        Expr::Binary(BinOp::Or, lhs, rhs) => {
            if eval(lhs, vars)?.truthy() {
                return Some(Number::Int(1));
            }
            Some(Number::from_bool(eval(rhs, vars)?.truthy()))
        }
        Expr::Binary(op, lhs, rhs) => apply(*op, eval(lhs, vars)?, eval(rhs, vars)?),
    }
}

fn apply(op: BinOp, lhs: Number, rhs: Number) -> Option<Number> {
    match (lhs, rhs) {
        (Number::Int(a), Number::Int(b)) => match op {
            BinOp::Add => a.checked_add(b).map(Number::Int),
            BinOp::Sub => a.checked_sub(b).map(Number::Int),
            BinOp::Mul => a.checked_mul(b).map(Number::Int),
            BinOp::Div => a.checked_div(b).map(Number::Int),
            BinOp::Rem => a.checked_rem(b).map(Number::Int),
            BinOp::Eq => Some(Number::from_bool(a == b)),
            BinOp::Ne => Some(Number::from_bool(a != b)),
            BinOp::Lt => Some(Number::from_bool(a < b)),
            BinOp::Le => Some(Number::from_bool(a <= b)),
            BinOp::Gt => Some(Number::from_bool(a > b)),
            BinOp::Ge => Some(Number::from_bool(a >= b)),
            BinOp::And | BinOp::Or => None,
        },
        _ => {
            let (a, b) = (lhs.as_f64(), rhs.as_f64());
            match op {
                BinOp::Add => Some(Number::Float(a + b)),
                BinOp::Sub => Some(Number::Float(a - b)),
                BinOp::Mul => Some(Number::Float(a * b)),
                BinOp::Div if b == 0.0 => None,
                BinOp::Div => Some(Number::Float(a / b)),
                BinOp::Rem if b == 0.0 => None,
                BinOp::Rem => Some(Number::Float(a % b)),
                BinOp::Eq => Some(Number::from_bool(a == b)),
                BinOp::Ne => Some(Number::from_bool(a != b)),
                BinOp::Lt => Some(Number::from_bool(a < b)),
                BinOp::Le => Some(Number::from_bool(a <= b)),
                BinOp::Gt => Some(Number::from_bool(a > b)),
                BinOp::Ge => Some(Number::from_bool(a >= b)),
                BinOp::And | BinOp::Or => None,
            }
        }
    }
}

const OPERATORS: [&str; 17] = [
    "&&", "||", "==", "!=", "<=", ">=", "<", ">", "+", "-", "*", "/", "%", "!", "=", "&", "|",
];

fn tokenize(text: &str, hex_literals: bool) -> Result<Vec<Token>, InputError> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i] as char;
        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        if c == '(' || c == ')' {
            tokens.push(if c == '(' { Token::LParen } else { Token::RParen });
            i += 1;
            continue;
        }

        if c.is_ascii_alphanumeric() || c == '.' || c == '_' {
            let start = i;
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'.' || bytes[i] == b'_') {
                i += 1;
            }
            let word = &text[start..i];
            let is_number = c.is_ascii_digit()
                || c == '.'
                || (hex_literals && !is_variable(word) && word.chars().all(|ch| ch.is_ascii_hexdigit()));
            tokens.push(if is_number {
                Token::Num(parse_number(word, hex_literals)?)
            } else {
                Token::Ident(word.to_string())
            });
            continue;
        }

        let op = OPERATORS
            .iter()
            .find(|op| text[i..].starts_with(**op))
            .ok_or_else(|| InputError::InvalidExpression(format!("unexpected character '{}'", c)))?;
        match *op {
            "=" => return Err(InputError::InvalidExpression("use == for equality".to_string())),
            "&" | "|" => {
                return Err(InputError::InvalidExpression(format!(
                    "unsupported operator '{}', use {}{}",
                    op, op, op
                )))
            }
            _ => {}
        }
        tokens.push(Token::Op(op));
        i += op.len();
    }

    Ok(tokens)
}

fn variable(name: &str) -> Option<Var> {
    match name {
        "v" | "value" => Some(Var::Value),
        "f" | "first" => Some(Var::First),
        "p" | "prev" | "previous" => Some(Var::Previous),
        _ => None,
    }
}

fn is_variable(name: &str) -> bool {
    variable(name).is_some()
}

fn parse_number(text: &str, hex_literals: bool) -> Result<Number, InputError> {
    let invalid = || InputError::InvalidExpression(format!("invalid number '{}'", text));

    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return i128::from_str_radix(hex, 16).map(Number::Int).map_err(|_| invalid());
    }

    if hex_literals && !text.contains('.') {
        return i128::from_str_radix(text, 16).map(Number::Int).map_err(|_| invalid());
    }

    if text.contains('.') || text.contains(['e', 'E']) {
        return text.parse::<f64>().map(Number::Float).map_err(|_| invalid());
    }

    text.parse::<i128>().map(Number::Int).map_err(|_| invalid())
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek_op(&self) -> Option<&'static str> {
        match self.tokens.get(self.pos) {
            Some(Token::Op(op)) => Some(*op),
            _ => None,
        }
    }

    fn binary_level(
        &mut self,
        ops: &[(&str, BinOp)],
        next: fn(&mut Parser) -> Result<Expr, InputError>,
    ) -> Result<Expr, InputError> {
        let mut lhs = next(self)?;
        while let Some(op) = self.peek_op() {
            let Some((_, bin)) = ops.iter().find(|(sym, _)| *sym == op) else {
                break;
            };
            self.pos += 1;
            let rhs = next(self)?;
            lhs = Expr::Binary(*bin, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_or(&mut self) -> Result<Expr, InputError> {
        self.binary_level(&[("||", BinOp::Or)], Parser::parse_and)
    }

    fn parse_and(&mut self) -> Result<Expr, InputError> {
        self.binary_level(&[("&&", BinOp::And)], Parser::parse_comparison)
    }

    fn parse_comparison(&mut self) -> Result<Expr, InputError> {
        self.binary_level(
            &[
                ("==", BinOp::Eq),
                ("!=", BinOp::Ne),
                ("<=", BinOp::Le),
                (">=", BinOp::Ge),
                ("<", BinOp::Lt),
                (">", BinOp::Gt),
            ],
            Parser::parse_additive,
        )
    }

    fn parse_additive(&mut self) -> Result<Expr, InputError> {
        self.binary_level(&[("+", BinOp::Add), ("-", BinOp::Sub)], Parser::parse_multiplicative)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, InputError> {
        self.binary_level(
            &[("*", BinOp::Mul), ("/", BinOp::Div), ("%", BinOp::Rem)],
            Parser::parse_unary,
        )
    }

    fn parse_unary(&mut self) -> Result<Expr, InputError> {
        match self.peek_op() {
            Some("-") => {
                self.pos += 1;
                Ok(Expr::Unary(UnOp::Neg, Box::new(self.parse_unary()?)))
            }
            Some("!") => {
                self.pos += 1;
                Ok(Expr::Unary(UnOp::Not, Box::new(self.parse_unary()?)))
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, InputError> {
        let token = self.tokens.get(self.pos).cloned().ok_or_else(|| {
            InputError::InvalidExpression("expression ends unexpectedly".to_string())
        })?;
        self.pos += 1;

        match token {
            Token::Num(n) => Ok(Expr::Num(n)),
            Token::Ident(name) => variable(&name).map(Expr::Var).ok_or_else(|| {
                InputError::InvalidExpression(format!("unknown variable '{}'", name))
            }),
            Token::LParen => {
                let inner = self.parse_or()?;
                match self.tokens.get(self.pos) {
                    Some(Token::RParen) => {
                        self.pos += 1;
                        Ok(inner)
                    }
                    _ => Err(InputError::InvalidExpression("missing ')'".to_string())),
                }
            }
            other => Err(InputError::InvalidExpression(format!(
                "unexpected {:?}",
                other
            ))),
        }
    }
}

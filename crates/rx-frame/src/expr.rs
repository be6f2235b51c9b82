//! String expressions for ad-hoc cuts and derived columns.
//!
//! Supports arithmetic (+, -, *, /), comparisons (==, !=, <, <=, >, >=),
//! boolean operators (&&, ||, !), and built-in functions (abs, sqrt, log,
//! exp, pow, min, max). Identifiers name scalar columns of a frame. Boolean
//! results are encoded as 1.0 / 0.0 and any value > 0 counts as true.

use std::iter::Peekable;
use std::str::CharIndices;

use crate::error::{FrameError, Result};

#[derive(Debug, Clone)]
enum Expr {
    Number(f64),
    Var(usize),
    Neg(Box<Expr>),
    Not(Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Call(Func, Vec<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone, Copy)]
enum Func {
    Abs,
    Sqrt,
    Log,
    Exp,
    Pow,
    Min,
    Max,
}

impl Func {
    fn lookup(name: &str) -> Option<(Func, usize)> {
        Some(match name {
            "abs" => (Func::Abs, 1),
            "sqrt" => (Func::Sqrt, 1),
            "log" => (Func::Log, 1),
            "exp" => (Func::Exp, 1),
            "pow" => (Func::Pow, 2),
            "min" => (Func::Min, 2),
            "max" => (Func::Max, 2),
            _ => return None,
        })
    }
}

/// A parsed expression.
///
/// Identifiers are collected into `required_columns` in order of first
/// appearance; evaluation looks values up by that position.
#[derive(Debug, Clone)]
pub struct CompiledExpr {
    ast: Expr,
    text: String,
    /// Column names referenced by this expression (ordered by first occurrence).
    pub required_columns: Vec<String>,
}

impl CompiledExpr {
    /// Parse an expression string.
    pub fn compile(input: &str) -> Result<Self> {
        let tokens = tokenize(input)?;
        let mut parser = Parser { tokens: &tokens, pos: 0, columns: Vec::new() };
        let ast = parser.parse_or()?;
        if let Some(tok) = parser.tokens.get(parser.pos) {
            return Err(FrameError::Expression(format!(
                "unexpected token after expression: {tok:?}"
            )));
        }
        Ok(CompiledExpr { ast, text: input.trim().to_string(), required_columns: parser.columns })
    }

    /// Source text, trimmed.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Evaluate with a value per entry of `required_columns`.
    pub fn eval_row(&self, values: &[f64]) -> f64 {
        eval(&self.ast, &|i| values[i])
    }

    /// Evaluate with a lookup from column position to value.
    #[inline]
    pub fn eval_with(&self, lookup: &impl Fn(usize) -> f64) -> f64 {
        eval(&self.ast, lookup)
    }
}

#[inline]
fn truth(b: bool) -> f64 {
    if b { 1.0 } else { 0.0 }
}

fn apply(op: BinOp, lhs: f64, rhs: f64) -> f64 {
    match op {
        BinOp::Add => lhs + rhs,
        BinOp::Sub => lhs - rhs,
        BinOp::Mul => lhs * rhs,
        BinOp::Div => lhs / rhs,
        BinOp::Eq => truth((lhs - rhs).abs() < f64::EPSILON),
        BinOp::Ne => truth((lhs - rhs).abs() >= f64::EPSILON),
        BinOp::Lt => truth(lhs < rhs),
        BinOp::Le => truth(lhs <= rhs),
        BinOp::Gt => truth(lhs > rhs),
        BinOp::Ge => truth(lhs >= rhs),
        BinOp::And => truth(lhs > 0.0 && rhs > 0.0),
        BinOp::Or => truth(lhs > 0.0 || rhs > 0.0),
    }
}

fn eval(e: &Expr, lookup: &impl Fn(usize) -> f64) -> f64 {
    match e {
        Expr::Number(n) => *n,
        Expr::Var(i) => lookup(*i),
        Expr::Neg(a) => -eval(a, lookup),
        Expr::Not(a) => truth(eval(a, lookup) <= 0.0),
        Expr::Binary(BinOp::And, a, b) => truth(eval(a, lookup) > 0.0 && eval(b, lookup) > 0.0),
        Expr::Binary(BinOp::Or, a, b) => truth(eval(a, lookup) > 0.0 || eval(b, lookup) > 0.0),
        Expr::Binary(op, a, b) => apply(*op, eval(a, lookup), eval(b, lookup)),
        Expr::Call(f, args) => {
            let a0 = eval(&args[0], lookup);
            match f {
                Func::Abs => a0.abs(),
                Func::Sqrt => a0.sqrt(),
                Func::Log => a0.ln(),
                Func::Exp => a0.exp(),
                Func::Pow => a0.powf(eval(&args[1], lookup)),
                Func::Min => a0.min(eval(&args[1], lookup)),
                Func::Max => a0.max(eval(&args[1], lookup)),
            }
        }
    }
}

// ── Tokenizer ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Ident(String),
    Op(BinOp),
    Minus,
    Not,
    LParen,
    RParen,
    Comma,
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c.is_ascii_digit() || c == '.' {
            tokens.push(number(input, start, &mut chars)?);
            continue;
        }
        if c.is_ascii_alphabetic() || c == '_' {
            let mut end = start;
            while let Some(&(i, ch)) = chars.peek() {
                if !(ch.is_ascii_alphanumeric() || ch == '_') {
                    break;
                }
                end = i + ch.len_utf8();
                chars.next();
            }
            tokens.push(Token::Ident(input[start..end].to_string()));
            continue;
        }

        chars.next();
        let next = chars.peek().map(|&(_, ch)| ch);
        let (tok, pair) = match (c, next) {
            ('&', Some('&')) => (Token::Op(BinOp::And), true),
            ('|', Some('|')) => (Token::Op(BinOp::Or), true),
            ('=', Some('=')) => (Token::Op(BinOp::Eq), true),
            ('!', Some('=')) => (Token::Op(BinOp::Ne), true),
            ('<', Some('=')) => (Token::Op(BinOp::Le), true),
            ('>', Some('=')) => (Token::Op(BinOp::Ge), true),
            ('<', _) => (Token::Op(BinOp::Lt), false),
            ('>', _) => (Token::Op(BinOp::Gt), false),
            ('!', _) => (Token::Not, false),
            ('+', _) => (Token::Op(BinOp::Add), false),
            ('-', _) => (Token::Minus, false),
            ('*', _) => (Token::Op(BinOp::Mul), false),
            ('/', _) => (Token::Op(BinOp::Div), false),
            ('(', _) => (Token::LParen, false),
            (')', _) => (Token::RParen, false),
            (',', _) => (Token::Comma, false),
            _ => return Err(FrameError::Expression(format!("unexpected character: '{c}'"))),
        };
        if pair {
            chars.next();
        }
        tokens.push(tok);
    }

    Ok(tokens)
}

fn number(input: &str, start: usize, chars: &mut Peekable<CharIndices<'_>>) -> Result<Token> {
    let mut end = start;
    let mut prev = '\0';
    while let Some(&(i, ch)) = chars.peek() {
        let exponent_sign = (ch == '+' || ch == '-') && (prev == 'e' || prev == 'E');
        if !(ch.is_ascii_digit() || ch == '.' || ch == 'e' || ch == 'E' || exponent_sign) {
            break;
        }
        prev = ch;
        end = i + 1;
        chars.next();
    }
    let s = &input[start..end];
    s.parse()
        .map(Token::Num)
        .map_err(|_| FrameError::Expression(format!("invalid number: '{s}'")))
}

// ── Parser (recursive descent) ─────────────────────────────────

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    columns: Vec<String>,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn eat_op(&mut self, ops: &[BinOp]) -> Option<BinOp> {
        let op = match self.peek() {
            Some(Token::Op(op)) if ops.contains(op) => *op,
            Some(Token::Minus) if ops.contains(&BinOp::Sub) => BinOp::Sub,
            _ => return None,
        };
        self.pos += 1;
        Some(op)
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        match self.next() {
            Some(t) if t == expected => Ok(()),
            other => {
                Err(FrameError::Expression(format!("expected {expected:?}, got {other:?}")))
            }
        }
    }

    fn column(&mut self, name: String) -> usize {
        match self.columns.iter().position(|c| *c == name) {
            Some(i) => i,
            None => {
                self.columns.push(name);
                self.columns.len() - 1
            }
        }
    }

    fn parse_or(&mut self) -> Result<Expr> {
        self.left_assoc(&[BinOp::Or], Self::parse_and)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        self.left_assoc(&[BinOp::And], Self::parse_cmp)
    }

    fn parse_cmp(&mut self) -> Result<Expr> {
        let lhs = self.parse_add()?;
        let cmp = [BinOp::Eq, BinOp::Ne, BinOp::Lt, BinOp::Le, BinOp::Gt, BinOp::Ge];
        match self.eat_op(&cmp) {
            Some(op) => Ok(Expr::Binary(op, Box::new(lhs), Box::new(self.parse_add()?))),
            None => Ok(lhs),
        }
    }

    fn parse_add(&mut self) -> Result<Expr> {
        self.left_assoc(&[BinOp::Add, BinOp::Sub], Self::parse_mul)
    }

    fn parse_mul(&mut self) -> Result<Expr> {
        self.left_assoc(&[BinOp::Mul, BinOp::Div], Self::parse_unary)
    }

    fn left_assoc(
        &mut self,
        ops: &[BinOp],
        operand: fn(&mut Self) -> Result<Expr>,
    ) -> Result<Expr> {
        let mut lhs = operand(self)?;
        while let Some(op) = self.eat_op(ops) {
            let rhs = operand(self)?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(Expr::Neg(Box::new(self.parse_unary()?)))
            }
            Some(Token::Not) => {
                self.pos += 1;
                Ok(Expr::Not(Box::new(self.parse_unary()?)))
            }
            _ => self.parse_atom(),
        }
    }

    fn parse_atom(&mut self) -> Result<Expr> {
        match self.next() {
            Some(Token::Num(n)) => Ok(Expr::Number(n)),
            Some(Token::LParen) => {
                let e = self.parse_or()?;
                self.expect(Token::RParen)?;
                Ok(e)
            }
            Some(Token::Ident(name)) if matches!(self.peek(), Some(Token::LParen)) => {
                self.pos += 1;
                let (func, arity) = Func::lookup(&name).ok_or_else(|| {
                    FrameError::Expression(format!("unknown function: '{name}'"))
                })?;
                let mut args = vec![self.parse_or()?];
                while matches!(self.peek(), Some(Token::Comma)) {
                    self.pos += 1;
                    args.push(self.parse_or()?);
                }
                self.expect(Token::RParen)?;
                if args.len() != arity {
                    return Err(FrameError::Expression(format!(
                        "{name}() takes {arity} argument(s), got {}",
                        args.len()
                    )));
                }
                Ok(Expr::Call(func, args))
            }
            Some(Token::Ident(name)) => Ok(Expr::Var(self.column(name))),
            other => Err(FrameError::Expression(format!(
                "expected number, identifier, or '(', got {other:?}"
            ))),
        }
    }
}

//! Build-time condition expressions.
//!
//! Conditional nodes carry an `expr` attribute written in a small,
//! Python-flavoured boolean language:
//!
//! ```text
//! lang == 'fr' and not pp_ifdef('_google_chrome')
//! os in ['win32', 'darwin'] or defs['toolkit'] == 'views'
//! ```
//!
//! Expressions are lexed with `logos`, parsed into a [`Condition`] by a
//! recursive-descent parser, and evaluated against an [`EvalContext`] of
//! variable bindings. Every name an expression mentions must be bound before
//! evaluation starts, even names in branches that short-circuiting would
//! skip, so a typo never silently reads as false.

use indexmap::IndexMap;
use logos::Logos;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised while parsing or evaluating a condition expression.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("unexpected character at offset {offset} in expression '{expr}'")]
    Lex { expr: String, offset: usize },

    #[error("malformed expression '{expr}': {detail}")]
    Syntax { expr: String, detail: String },

    #[error("name '{0}' is not bound in the evaluation context")]
    Unbound(String),

    #[error("'{0}' is not callable")]
    NotCallable(String),

    #[error("{func}() takes {expected} argument(s), got {found}")]
    Arity {
        func: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("type error: {0}")]
    Type(String),

    #[error("key {0} not found")]
    KeyNotFound(String),
}

// ---------------------------------------------------------------------------
// Values and bindings
// ---------------------------------------------------------------------------

/// A runtime value inside an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
}

impl Value {
    /// Python truthiness: zero, empty and false read as false.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Map(map) => !map.is_empty(),
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Map(_) => "dict",
        }
    }

    /// Equality with bools and ints compared numerically.
    fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Int(b)) | (Value::Int(b), Value::Bool(a)) => {
                i64::from(*a) == *b
            }
            _ => self == other,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<&IndexMap<String, String>> for Value {
    fn from(map: &IndexMap<String, String>) -> Self {
        Value::Map(
            map.iter()
                .map(|(k, v)| (k.clone(), Value::Str(v.clone())))
                .collect(),
        )
    }
}

/// Platform name as build files spell it (`sys.platform` style).
pub fn host_platform() -> &'static str {
    match std::env::consts::OS {
        "linux" => "linux2",
        "windows" => "win32",
        "macos" => "darwin",
        other => other,
    }
}

/// Variable bindings an expression is evaluated against.
#[derive(Debug, Clone, Default)]
pub struct EvalContext {
    bindings: IndexMap<String, Value>,
}

impl EvalContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context with the standard `lang`, `defs` and `os` bindings.
    pub fn for_output(language: &str, defines: &IndexMap<String, String>, platform: &str) -> Self {
        Self::new()
            .with("lang", language)
            .with("defs", defines)
            .with("os", platform)
    }

    /// Builder-style [`bind`](Self::bind).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.bind(name, value);
        self
    }

    /// Bind (or rebind) a name.
    pub fn bind(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.bindings.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }
}

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
enum Token {
    #[token("and")]
    And,
    #[token("or")]
    Or,
    #[token("not")]
    Not,
    #[token("in")]
    In,
    #[token("True")]
    True,
    #[token("False")]
    False,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),
    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),
    #[regex(r"'([^'\\]|\\.)*'", |lex| unquote(lex.slice()))]
    #[regex(r#""([^"\\]|\\.)*""#, |lex| unquote(lex.slice()))]
    Str(String),
}

/// Strip the surrounding quotes and resolve backslash escapes.
fn unquote(raw: &str) -> String {
    let inner = &raw[1..raw.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

fn tokenize(src: &str) -> Result<Vec<Token>, EvalError> {
    Token::lexer(src)
        .spanned()
        .map(|(tok, span)| {
            tok.map_err(|()| EvalError::Lex {
                expr: src.to_string(),
                offset: span.start,
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Syntax tree
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompareOp {
    Eq,
    NotEq,
    In,
    NotIn,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Literal(Value),
    Name(String),
    List(Vec<Expr>),
    Not(Box<Expr>),
    /// Two or more operands.
    And(Vec<Expr>),
    /// Two or more operands.
    Or(Vec<Expr>),
    Compare {
        op: CompareOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        func: String,
        args: Vec<Expr>,
    },
    Subscript {
        target: Box<Expr>,
        index: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Builtin {
    PpIfdef,
    PpIf,
}

impl Builtin {
    fn lookup(name: &str) -> Option<Builtin> {
        match name {
            "pp_ifdef" => Some(Builtin::PpIfdef),
            "pp_if" => Some(Builtin::PpIf),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Builtin::PpIfdef => "pp_ifdef",
            Builtin::PpIf => "pp_if",
        }
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Deepest nesting of parentheses, lists, `not` and postfix operators
/// accepted in one expression.
const MAX_NESTING: usize = 100;

struct Parser<'s> {
    src: &'s str,
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl<'s> Parser<'s> {
    fn new(src: &'s str, tokens: Vec<Token>) -> Parser<'s> {
        Parser {
            src,
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    fn descend(&mut self) -> Result<(), EvalError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(self.syntax(format!("nested deeper than {MAX_NESTING} levels")));
        }
        Ok(())
    }

    fn syntax(&self, detail: impl Into<String>) -> EvalError {
        EvalError::Syntax {
            expr: self.src.to_string(),
            detail: detail.into(),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn advance(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<(), EvalError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("expected {expected:?}")))
        }
    }

    fn unexpected(&self, context: &str) -> EvalError {
        match self.peek() {
            Some(tok) => self.syntax(format!("{context}, found {tok:?}")),
            None => self.syntax(format!("{context}, found end of expression")),
        }
    }

    fn parse(mut self) -> Result<Expr, EvalError> {
        if self.tokens.is_empty() {
            return Err(self.syntax("empty expression"));
        }
        let expr = self.parse_or()?;
        if self.pos < self.tokens.len() {
            return Err(self.unexpected("unexpected trailing input"));
        }
        Ok(expr)
    }

    fn parse_or(&mut self) -> Result<Expr, EvalError> {
        let first = self.parse_and()?;
        if self.peek() != Some(&Token::Or) {
            return Ok(first);
        }
        let mut operands = vec![first];
        while self.eat(&Token::Or) {
            operands.push(self.parse_and()?);
        }
        Ok(Expr::Or(operands))
    }

    fn parse_and(&mut self) -> Result<Expr, EvalError> {
        let first = self.parse_not()?;
        if self.peek() != Some(&Token::And) {
            return Ok(first);
        }
        let mut operands = vec![first];
        while self.eat(&Token::And) {
            operands.push(self.parse_not()?);
        }
        Ok(Expr::And(operands))
    }

    fn parse_not(&mut self) -> Result<Expr, EvalError> {
        if self.eat(&Token::Not) {
            self.descend()?;
            let inner = self.parse_not()?;
            self.depth -= 1;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, EvalError> {
        let lhs = self.parse_postfix()?;
        let op = match (self.peek(), self.peek_at(1)) {
            (Some(Token::EqEq), _) => CompareOp::Eq,
            (Some(Token::NotEq), _) => CompareOp::NotEq,
            (Some(Token::In), _) => CompareOp::In,
            (Some(Token::Not), Some(Token::In)) => {
                self.pos += 1;
                CompareOp::NotIn
            }
            _ => return Ok(lhs),
        };
        self.pos += 1;
        let rhs = self.parse_postfix()?;
        Ok(Expr::Compare {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    fn parse_postfix(&mut self) -> Result<Expr, EvalError> {
        // Each postfix operator wraps the tree built so far one level deeper.
        let entry_depth = self.depth;
        let mut expr = self.parse_atom()?;
        loop {
            match self.peek() {
                Some(Token::LBracket) => {
                    self.descend()?;
                    self.pos += 1;
                    let index = self.parse_or()?;
                    self.expect(&Token::RBracket)?;
                    expr = Expr::Subscript {
                        target: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                Some(Token::LParen) => {
                    let Expr::Name(func) = expr else {
                        return Err(self.syntax("only plain names can be called"));
                    };
                    self.descend()?;
                    self.pos += 1;
                    let args = self.parse_sequence(&Token::RParen)?;
                    expr = Expr::Call { func, args };
                }
                _ => {
                    self.depth = entry_depth;
                    return Ok(expr);
                }
            }
        }
    }

    /// Comma-separated expressions up to `close`, trailing comma allowed.
    fn parse_sequence(&mut self, close: &Token) -> Result<Vec<Expr>, EvalError> {
        let mut items = Vec::new();
        while !self.eat(close) {
            items.push(self.parse_or()?);
            if !self.eat(&Token::Comma) {
                self.expect(close)?;
                break;
            }
        }
        Ok(items)
    }

    fn parse_atom(&mut self) -> Result<Expr, EvalError> {
        match self.advance() {
            Some(Token::Int(i)) => Ok(Expr::Literal(Value::Int(i))),
            Some(Token::Str(s)) => Ok(Expr::Literal(Value::Str(s))),
            Some(Token::True) => Ok(Expr::Literal(Value::Bool(true))),
            Some(Token::False) => Ok(Expr::Literal(Value::Bool(false))),
            Some(Token::Ident(name)) => Ok(Expr::Name(name)),
            Some(Token::LParen) => {
                self.descend()?;
                let inner = self.parse_or()?;
                self.expect(&Token::RParen)?;
                self.depth -= 1;
                Ok(inner)
            }
            Some(Token::LBracket) => {
                self.descend()?;
                let items = self.parse_sequence(&Token::RBracket)?;
                self.depth -= 1;
                Ok(Expr::List(items))
            }
            Some(tok) => Err(self.syntax(format!("unexpected {tok:?}"))),
            None => Err(self.syntax("unexpected end of expression")),
        }
    }
}

// ---------------------------------------------------------------------------
// Condition
// ---------------------------------------------------------------------------

/// A parsed condition expression, reusable across evaluation contexts.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    source: String,
    expr: Expr,
}

impl Condition {
    /// Parse `source`. Fails on lexical or syntax errors.
    pub fn parse(source: &str) -> Result<Condition, EvalError> {
        let tokens = tokenize(source)?;
        let expr = Parser::new(source, tokens).parse()?;
        Ok(Condition {
            source: source.to_string(),
            expr,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate against `ctx` and reduce the result to its truthiness.
    pub fn evaluate(&self, ctx: &EvalContext) -> Result<bool, EvalError> {
        check_bound(&self.expr, ctx)?;
        Ok(eval(&self.expr, ctx)?.truthy())
    }
}

/// Parse and evaluate in one step.
pub fn evaluate(source: &str, ctx: &EvalContext) -> Result<bool, EvalError> {
    Condition::parse(source)?.evaluate(ctx)
}

/// Reject any reference to a name the context does not bind.
fn check_bound(expr: &Expr, ctx: &EvalContext) -> Result<(), EvalError> {
    match expr {
        Expr::Literal(_) => Ok(()),
        Expr::Name(name) => {
            if ctx.is_bound(name) {
                Ok(())
            } else {
                Err(EvalError::Unbound(name.clone()))
            }
        }
        Expr::List(items) => items.iter().try_for_each(|e| check_bound(e, ctx)),
        Expr::Not(inner) => check_bound(inner, ctx),
        Expr::And(operands) | Expr::Or(operands) => {
            operands.iter().try_for_each(|e| check_bound(e, ctx))
        }
        Expr::Compare { lhs, rhs, .. } => {
            check_bound(lhs, ctx)?;
            check_bound(rhs, ctx)
        }
        Expr::Subscript { target, index } => {
            check_bound(target, ctx)?;
            check_bound(index, ctx)
        }
        Expr::Call { func, args } => {
            if Builtin::lookup(func).is_some() {
                if !ctx.is_bound("defs") {
                    return Err(EvalError::Unbound("defs".to_string()));
                }
            } else if !ctx.is_bound(func) {
                return Err(EvalError::Unbound(func.clone()));
            }
            args.iter().try_for_each(|e| check_bound(e, ctx))
        }
    }
}

fn eval(expr: &Expr, ctx: &EvalContext) -> Result<Value, EvalError> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),
        Expr::Name(name) => ctx
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::Unbound(name.clone())),
        Expr::List(items) => Ok(Value::List(
            items
                .iter()
                .map(|e| eval(e, ctx))
                .collect::<Result<_, _>>()?,
        )),
        Expr::Not(inner) => Ok(Value::Bool(!eval(inner, ctx)?.truthy())),
        Expr::And(operands) => short_circuit(operands, ctx, false),
        Expr::Or(operands) => short_circuit(operands, ctx, true),
        Expr::Compare { op, lhs, rhs } => {
            let lhs = eval(lhs, ctx)?;
            let rhs = eval(rhs, ctx)?;
            let result = match op {
                CompareOp::Eq => lhs.loose_eq(&rhs),
                CompareOp::NotEq => !lhs.loose_eq(&rhs),
                CompareOp::In => contains(&rhs, &lhs)?,
                CompareOp::NotIn => !contains(&rhs, &lhs)?,
            };
            Ok(Value::Bool(result))
        }
        Expr::Subscript { target, index } => {
            let target = eval(target, ctx)?;
            let index = eval(index, ctx)?;
            subscript(&target, &index)
        }
        Expr::Call { func, args } => {
            let Some(builtin) = Builtin::lookup(func) else {
                return Err(EvalError::NotCallable(func.clone()));
            };
            call_builtin(builtin, args, ctx)
        }
    }
}

/// Value of the first operand whose truthiness equals `stop_on`, else the
/// last operand's value.
fn short_circuit(operands: &[Expr], ctx: &EvalContext, stop_on: bool) -> Result<Value, EvalError> {
    let mut last = Value::Bool(!stop_on);
    for operand in operands {
        last = eval(operand, ctx)?;
        if last.truthy() == stop_on {
            break;
        }
    }
    Ok(last)
}

fn contains(haystack: &Value, needle: &Value) -> Result<bool, EvalError> {
    match (haystack, needle) {
        (Value::Str(h), Value::Str(n)) => Ok(h.contains(n.as_str())),
        (Value::List(items), _) => Ok(items.iter().any(|item| item.loose_eq(needle))),
        (Value::Map(map), Value::Str(key)) => Ok(map.contains_key(key)),
        _ => Err(EvalError::Type(format!(
            "'in' is not supported between {} and {}",
            needle.type_name(),
            haystack.type_name()
        ))),
    }
}

fn subscript(target: &Value, index: &Value) -> Result<Value, EvalError> {
    match (target, index) {
        (Value::Map(map), Value::Str(key)) => map
            .get(key)
            .cloned()
            .ok_or_else(|| EvalError::KeyNotFound(format!("'{key}'"))),
        (Value::List(items), Value::Int(i)) => usize::try_from(*i)
            .ok()
            .and_then(|i| items.get(i))
            .cloned()
            .ok_or_else(|| EvalError::KeyNotFound(i.to_string())),
        _ => Err(EvalError::Type(format!(
            "{} cannot be indexed by {}",
            target.type_name(),
            index.type_name()
        ))),
    }
}

fn call_builtin(builtin: Builtin, args: &[Expr], ctx: &EvalContext) -> Result<Value, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::Arity {
            func: builtin.name(),
            expected: 1,
            found: args.len(),
        });
    }
    let Value::Str(define) = eval(&args[0], ctx)? else {
        return Err(EvalError::Type(format!(
            "{}() expects a define name string",
            builtin.name()
        )));
    };
    let Some(Value::Map(defs)) = ctx.get("defs") else {
        return Err(EvalError::Type("'defs' must be a dict".to_string()));
    };
    let result = match builtin {
        Builtin::PpIfdef => defs.contains_key(&define),
        Builtin::PpIf => defs.get(&define).is_some_and(Value::truthy),
    };
    Ok(Value::Bool(result))
}

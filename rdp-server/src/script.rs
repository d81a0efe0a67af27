// Line-oriented script debuggee
//
// A deliberately small sandbox so the server can be run end to end. One
// statement per line:
//   debugger;
//   var NAME = EXPR;
//   throw EXPR;
//   EXPR;
// Expressions: numbers, "strings", true/false/null/undefined, identifiers,
// `new Name(args)`, unary ! and -, + and -, comparisons, parentheses, and
// `throw EXPR` (always throws).

use anyhow::{Context, Result};
use rdp_control::{
    Debuggee, EvalError, ExceptionInfo, ExecutionContext, ExecutionController, Frame,
    FrameSnapshot, HookOutcome, ScopeRef, SiteKind, SnapshotError, SourceId, SourceLocation,
    Value,
};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
enum Statement {
    Debugger,
    Var(String, String),
    Throw(String),
    Expr(String),
}

#[derive(Debug, Clone)]
struct Line {
    number: u32,
    statement: Statement,
}

/// Parsed script source
#[derive(Debug, Clone)]
pub struct Script {
    source_id: SourceId,
    lines: Vec<Line>,
}

impl Script {
    pub fn parse(source_id: impl Into<SourceId>, text: &str) -> Self {
        let lines = text
            .lines()
            .enumerate()
            .filter_map(|(index, raw)| {
                let statement = parse_statement(raw)?;
                Some(Line {
                    number: index as u32 + 1,
                    statement,
                })
            })
            .collect();

        Self {
            source_id: source_id.into(),
            lines,
        }
    }

    /// Read a script file; its file name becomes the source id
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read script {}", path.display()))?;
        let source_id = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::parse(source_id.as_str(), &text))
    }

    pub fn source_id(&self) -> &SourceId {
        &self.source_id
    }

    pub fn statement_count(&self) -> usize {
        self.lines.len()
    }
}

fn parse_statement(raw: &str) -> Option<Statement> {
    let text = raw.trim();
    if text.is_empty() || text.starts_with("//") {
        return None;
    }
    let text = text.trim_end_matches(';').trim();

    let statement = if text == "debugger" {
        Statement::Debugger
    } else if let Some(rest) = text.strip_prefix("var ") {
        match rest.split_once('=') {
            Some((name, expr)) => Statement::Var(name.trim().to_string(), expr.trim().to_string()),
            None => Statement::Var(rest.trim().to_string(), "undefined".to_string()),
        }
    } else if let Some(rest) = text.strip_prefix("throw ") {
        Statement::Throw(rest.trim().to_string())
    } else {
        Statement::Expr(text.to_string())
    };
    Some(statement)
}

/// How a script run ended
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed,
    Threw(ExceptionInfo),
    Detached,
}

/// Global scope of a running script
#[derive(Debug, Default)]
pub struct Scope {
    vars: HashMap<String, Value>,
}

impl ExecutionContext for Scope {
    fn evaluate(&mut self, expr: &str) -> Result<Value, EvalError> {
        let tokens = tokenize(expr)?;
        let mut parser = Parser {
            tokens: &tokens,
            pos: 0,
            depth: 0,
            scope: &self.vars,
        };
        let value = parser.expression()?;
        match parser.peek() {
            None => Ok(value),
            Some(token) => Err(EvalError::Syntax(format!("unexpected token {:?}", token))),
        }
    }
}

pub struct ScriptDebuggee {
    script: Script,
    line: u32,
    scope: Scope,
}

impl Debuggee for ScriptDebuggee {
    fn current_scope(&mut self) -> &mut dyn ExecutionContext {
        &mut self.scope
    }

    fn snapshot_stack(&mut self) -> Result<FrameSnapshot, SnapshotError> {
        if self.line == 0 {
            return Err(SnapshotError("script is not executing".to_string()));
        }
        Ok(FrameSnapshot::new(vec![Frame {
            depth: 0,
            name: Some("(global)".to_string()),
            location: SourceLocation::new(self.script.source_id.clone(), self.line),
            scope: ScopeRef(1),
        }]))
    }
}

impl ScriptDebuggee {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            line: 0,
            scope: Scope::default(),
        }
    }

    /// Execute every statement, calling the controller's hooks on the way
    pub fn run(&mut self, controller: &ExecutionController) -> RunOutcome {
        let lines = self.script.lines.clone();
        info!("Running {} ({} statements)", self.script.source_id, lines.len());

        for line in lines {
            self.line = line.number;
            let location = SourceLocation::new(self.script.source_id.clone(), line.number);
            let site = match line.statement {
                Statement::Debugger => SiteKind::DebuggerStatement,
                _ => SiteKind::Statement,
            };

            match controller.reached_location(self, &location, site) {
                Ok(HookOutcome::Detached) => return RunOutcome::Detached,
                Ok(outcome) => debug!("Line {}: {:?}", line.number, outcome),
                Err(e) => warn!("Location hook failed at {}: {}", location, e),
            }

            if let Err(err) = self.execute(&line.statement) {
                let exception = exception_info(err);
                info!("Uncaught exception at {}: {}", location, exception.message);
                if let Err(e) = controller.exception_thrown(self, &location, exception.clone()) {
                    warn!("Exception hook failed at {}: {}", location, e);
                }
                return RunOutcome::Threw(exception);
            }
        }

        RunOutcome::Completed
    }

    fn execute(&mut self, statement: &Statement) -> Result<(), EvalError> {
        match statement {
            Statement::Debugger => Ok(()),
            Statement::Var(name, expr) => {
                let value = self.scope.evaluate(expr)?;
                self.scope.vars.insert(name.clone(), value);
                Ok(())
            }
            Statement::Throw(expr) => Err(EvalError::Thrown(self.scope.evaluate(expr)?)),
            Statement::Expr(expr) => self.scope.evaluate(expr).map(|_| ()),
        }
    }
}

fn exception_info(err: EvalError) -> ExceptionInfo {
    let message = err.to_string();
    let value = match err {
        EvalError::Thrown(value) => value,
        EvalError::Syntax(_) => Value::Object("SyntaxError".to_string()),
        EvalError::Reference(_) => Value::Object("ReferenceError".to_string()),
    };
    ExceptionInfo { message, value }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    Op(&'static str),
    LParen,
    RParen,
    Comma,
}

const OPERATORS: &[&str] = &[
    "===", "!==", "==", "!=", "<=", ">=", "<", ">", "+", "-", "!",
];

fn tokenize(expr: &str) -> Result<Vec<Token>, EvalError> {
    let mut tokens = Vec::new();
    let mut rest = expr.trim_start();

    while let Some(c) = rest.chars().next() {
        if c.is_ascii_digit() {
            let end = rest
                .find(|ch: char| !(ch.is_ascii_digit() || ch == '.'))
                .unwrap_or(rest.len());
            let n = rest[..end]
                .parse()
                .map_err(|_| EvalError::Syntax(format!("bad number {}", &rest[..end])))?;
            tokens.push(Token::Number(n));
            rest = &rest[end..];
        } else if c == '"' || c == '\'' {
            let close = rest[1..]
                .find(c)
                .ok_or_else(|| EvalError::Syntax("unterminated string".to_string()))?;
            tokens.push(Token::Str(rest[1..close + 1].to_string()));
            rest = &rest[close + 2..];
        } else if c.is_alphabetic() || c == '_' || c == '$' {
            let end = rest
                .find(|ch: char| !(ch.is_alphanumeric() || ch == '_' || ch == '$'))
                .unwrap_or(rest.len());
            tokens.push(Token::Ident(rest[..end].to_string()));
            rest = &rest[end..];
        } else if c == '(' || c == ')' || c == ',' {
            tokens.push(match c {
                '(' => Token::LParen,
                ')' => Token::RParen,
                _ => Token::Comma,
            });
            rest = &rest[1..];
        } else if let Some(op) = OPERATORS.iter().find(|op| rest.starts_with(**op)) {
            tokens.push(Token::Op(*op));
            rest = &rest[op.len()..];
        } else {
            return Err(EvalError::Syntax(format!("unexpected character '{}'", c)));
        }
        rest = rest.trim_start();
    }

    Ok(tokens)
}

// Nesting limit for `(`, unary operators and `throw`; conditions come from
// the client and must not overflow the debuggee thread's stack.
const MAX_DEPTH: usize = 256;

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
    scope: &'a HashMap<String, Value>,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn eat_op(&mut self, ops: &[&str]) -> Option<&'static str> {
        match self.peek() {
            Some(Token::Op(op)) if ops.contains(op) => {
                self.pos += 1;
                Some(*op)
            }
            _ => None,
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), EvalError> {
        match self.next() {
            Some(token) if *token == expected => Ok(()),
            other => Err(EvalError::Syntax(format!(
                "expected {:?}, found {:?}",
                expected, other
            ))),
        }
    }

    fn descend(&mut self) -> Result<(), EvalError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(EvalError::Syntax("expression nested too deeply".to_string()));
        }
        Ok(())
    }

    fn expression(&mut self) -> Result<Value, EvalError> {
        self.descend()?;
        let result = if matches!(self.peek(), Some(Token::Ident(word)) if word == "throw") {
            self.pos += 1;
            self.expression().and_then(|value| Err(EvalError::Thrown(value)))
        } else {
            self.comparison()
        };
        self.depth -= 1;
        result
    }

    fn comparison(&mut self) -> Result<Value, EvalError> {
        let left = self.additive()?;
        let Some(op) = self.eat_op(&["===", "!==", "==", "!=", "<=", ">=", "<", ">"]) else {
            return Ok(left);
        };
        let right = self.additive()?;

        let result = match op {
            "===" | "==" => left == right,
            "!==" | "!=" => left != right,
            _ => match (&left, &right) {
                (Value::Number(a), Value::Number(b)) => match op {
                    "<" => a < b,
                    ">" => a > b,
                    "<=" => a <= b,
                    _ => a >= b,
                },
                _ => false,
            },
        };
        Ok(Value::Bool(result))
    }

    fn additive(&mut self) -> Result<Value, EvalError> {
        let mut value = self.unary()?;
        while let Some(op) = self.eat_op(&["+", "-"]) {
            let right = self.unary()?;
            value = match (op, value, right) {
                ("+", Value::Number(a), Value::Number(b)) => Value::Number(a + b),
                ("+", Value::String(a), b) => Value::String(format!("{}{}", a, display(&b))),
                ("+", a, Value::String(b)) => Value::String(format!("{}{}", display(&a), b)),
                ("-", Value::Number(a), Value::Number(b)) => Value::Number(a - b),
                _ => Value::Number(f64::NAN),
            };
        }
        Ok(value)
    }

    fn unary(&mut self) -> Result<Value, EvalError> {
        self.descend()?;
        let result = match self.eat_op(&["!", "-"]) {
            Some("!") => self.unary().map(|value| Value::Bool(!value.is_truthy())),
            Some(_) => self.unary().map(|value| match value {
                Value::Number(n) => Value::Number(-n),
                _ => Value::Number(f64::NAN),
            }),
            None => self.primary(),
        };
        self.depth -= 1;
        result
    }

    fn primary(&mut self) -> Result<Value, EvalError> {
        match self.next() {
            Some(Token::Number(n)) => Ok(Value::Number(*n)),
            Some(Token::Str(s)) => Ok(Value::String(s.clone())),
            Some(Token::LParen) => {
                let value = self.expression()?;
                self.expect(Token::RParen)?;
                Ok(value)
            }
            Some(Token::Ident(word)) => match word.as_str() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                "null" => Ok(Value::Null),
                "undefined" => Ok(Value::Undefined),
                "new" => self.construct(),
                name => self
                    .scope
                    .get(name)
                    .cloned()
                    .ok_or_else(|| EvalError::Reference(name.to_string())),
            },
            other => Err(EvalError::Syntax(format!("unexpected {:?}", other))),
        }
    }

    // new Name(args...) yields an object of class Name
    fn construct(&mut self) -> Result<Value, EvalError> {
        let class = match self.next() {
            Some(Token::Ident(class)) => class.clone(),
            other => {
                return Err(EvalError::Syntax(format!(
                    "expected class name, found {:?}",
                    other
                )))
            }
        };
        self.expect(Token::LParen)?;
        if self.peek() != Some(&Token::RParen) {
            self.expression()?;
            while self.peek() == Some(&Token::Comma) {
                self.pos += 1;
                self.expression()?;
            }
        }
        self.expect(Token::RParen)?;
        Ok(Value::Object(class))
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdp_control::{ConditionEvaluator, ConditionOutcome};

    fn eval(scope: &mut Scope, expr: &str) -> Result<Value, EvalError> {
        scope.evaluate(expr)
    }

    #[test]
    fn test_parse_statements() {
        let script = Script::parse("test.js", "debugger;\n\n// note\nvar a = 1;\nthrow a;\na + 1;");

        assert_eq!(script.statement_count(), 4);
        assert_eq!(script.lines[0].number, 1);
        assert_eq!(script.lines[0].statement, Statement::Debugger);
        assert_eq!(script.lines[1].number, 4);
        assert_eq!(
            script.lines[1].statement,
            Statement::Var("a".to_string(), "1".to_string())
        );
        assert_eq!(script.lines[2].statement, Statement::Throw("a".to_string()));
        assert_eq!(script.lines[3].statement, Statement::Expr("a + 1".to_string()));
    }

    #[test]
    fn test_expressions() {
        let mut scope = Scope::default();
        scope.vars.insert("a".to_string(), Value::Number(1.0));

        assert_eq!(eval(&mut scope, "a + 2").unwrap(), Value::Number(3.0));
        assert_eq!(eval(&mut scope, "a == 1").unwrap(), Value::Bool(true));
        assert_eq!(eval(&mut scope, "(a - 3) < 0").unwrap(), Value::Bool(true));
        assert_eq!(eval(&mut scope, "!a").unwrap(), Value::Bool(false));
        assert_eq!(
            eval(&mut scope, "'x' + a").unwrap(),
            Value::String("x1".to_string())
        );
        assert_eq!(
            eval(&mut scope, "new Error(\"bad\")").unwrap(),
            Value::Object("Error".to_string())
        );
    }

    #[test]
    fn test_expression_errors() {
        let mut scope = Scope::default();

        assert_eq!(
            eval(&mut scope, "throw new Error()"),
            Err(EvalError::Thrown(Value::Object("Error".to_string())))
        );
        assert_eq!(
            eval(&mut scope, "missing"),
            Err(EvalError::Reference("missing".to_string()))
        );
        assert!(matches!(eval(&mut scope, "1 +"), Err(EvalError::Syntax(_))));
        assert!(matches!(eval(&mut scope, "1 2"), Err(EvalError::Syntax(_))));
        assert!(matches!(eval(&mut scope, "a = 1"), Err(EvalError::Syntax(_))));
    }

    #[test]
    fn test_snapshot_before_start_fails() {
        let mut debuggee = ScriptDebuggee::new(Script::parse("test.js", "debugger;"));
        assert!(debuggee.snapshot_stack().is_err());
    }

    #[test]
    fn test_load_uses_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.js");
        std::fs::write(&path, "var a = 1;\ndebugger;\n").unwrap();

        let script = Script::load(&path).unwrap();
        assert_eq!(script.source_id().as_str(), "app.js");
        assert_eq!(script.statement_count(), 2);

        assert!(Script::load(&dir.path().join("missing.js")).is_err());
    }

    #[test]
    fn test_deeply_nested_condition_throws() {
        let evaluator = ConditionEvaluator::new();
        let mut scope = Scope::default();

        let bangs = format!("{}1", "!".repeat(200_000));
        let parens = format!("{}1{}", "(".repeat(100_000), ")".repeat(100_000));
        for condition in [bangs, parens] {
            match evaluator.evaluate(Some(&condition), &mut scope) {
                ConditionOutcome::Threw(err) => assert!(err.message.contains("nested too deeply")),
                other => panic!("expected Threw, got {:?}", other),
            }
        }

        // Nesting under the limit still evaluates
        let shallow = format!("{}1{}", "(".repeat(50), ")".repeat(50));
        assert_eq!(eval(&mut scope, &shallow), Ok(Value::Number(1.0)));
        assert_eq!(eval(&mut scope, "!!!1"), Ok(Value::Bool(false)));
    }
}

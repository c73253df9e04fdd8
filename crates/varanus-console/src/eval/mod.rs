//! Expression language evaluated on behalf of the RCLI server.
//!
//! Values are integers or strings. Arithmetic is checked `i64`, `+` also
//! concatenates when either side is a string, and the network is reachable
//! through three functions:
//!
//! - `nodes()` lists node names separated by commas.
//! - `node(name)` resolves a node and yields its name.
//! - `cmd(node, args...)` runs the space-joined arguments on the node and
//!   yields the merged output.
//!
//! The bare name `null` evaluates to no value.

mod parser;

use std::fmt;

use thiserror::Error;
use varanus_rcli::network::{Network, NetworkError};
use varanus_rcli::{EvaluationError, Evaluator};

use self::parser::{BinaryOp, Expr};

/// Failures raised while parsing or evaluating an expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum ExpressionError {
    #[error("empty expression")]
    Empty,
    #[error("unexpected character '{character}' at offset {offset}")]
    UnexpectedCharacter { character: char, offset: usize },
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("integer literal {literal} is too large")]
    IntegerTooLarge { literal: String },
    #[error("unexpected token '{token}'")]
    UnexpectedToken { token: String },
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("name '{name}' is not defined")]
    UndefinedName { name: String },
    #[error("{function}() takes {expected} argument(s) but {given} were given")]
    Arity {
        function: &'static str,
        expected: &'static str,
        given: usize,
    },
    #[error("unsupported operand types for {op}: {lhs} and {rhs}")]
    OperandTypes {
        op: String,
        lhs: &'static str,
        rhs: &'static str,
    },
    #[error("bad operand type for unary -: {operand}")]
    NegateType { operand: &'static str },
    #[error("{function}() expects a string node name, got {given}")]
    NodeNameType {
        function: &'static str,
        given: &'static str,
    },
    #[error("division by zero")]
    DivisionByZero,
    #[error("integer overflow")]
    Overflow,
    #[error("{0}")]
    Network(String),
}

impl From<NetworkError> for ExpressionError {
    fn from(error: NetworkError) -> Self {
        Self::Network(error.to_string())
    }
}

impl From<ExpressionError> for EvaluationError {
    fn from(error: ExpressionError) -> Self {
        Self::new(error.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Value {
    Null,
    Integer(i64),
    Str(String),
}

impl Value {
    const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Integer(_) => "int",
            Self::Str(_) => "str",
        }
    }

    fn into_result(self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Integer(value) => Some(value.to_string()),
            Self::Str(text) => Some(text),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Str(text) => f.write_str(text),
        }
    }
}

/// Evaluator backing the console's expression commands.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct ConsoleEvaluator;

impl Evaluator for ConsoleEvaluator {
    fn evaluate(
        &self,
        expression: &str,
        network: &dyn Network,
    ) -> Result<Option<String>, EvaluationError> {
        let expr = parser::parse(expression)?;
        let value = Interpreter { network }.eval(&expr)?;
        Ok(value.into_result())
    }
}

struct Interpreter<'a> {
    network: &'a dyn Network,
}

impl Interpreter<'_> {
    fn eval(&self, expr: &Expr) -> Result<Value, ExpressionError> {
        match expr {
            Expr::Integer(value) => Ok(Value::Integer(*value)),
            Expr::Str(text) => Ok(Value::Str(text.clone())),
            Expr::Name(name) if name == "null" => Ok(Value::Null),
            Expr::Name(name) => Err(ExpressionError::UndefinedName { name: name.clone() }),
            Expr::Negate(inner) => match self.eval(inner)? {
                Value::Integer(value) => value
                    .checked_neg()
                    .map(Value::Integer)
                    .ok_or(ExpressionError::Overflow),
                other => Err(ExpressionError::NegateType {
                    operand: other.type_name(),
                }),
            },
            Expr::Binary { op, lhs, rhs } => apply(*op, self.eval(lhs)?, self.eval(rhs)?),
            Expr::Call { name, args } => {
                let values = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                self.call(name, values)
            }
        }
    }

    fn call(&self, name: &str, args: Vec<Value>) -> Result<Value, ExpressionError> {
        match name {
            "nodes" => {
                if !args.is_empty() {
                    return Err(ExpressionError::Arity {
                        function: "nodes",
                        expected: "0",
                        given: args.len(),
                    });
                }
                Ok(Value::Str(self.network.node_names().join(",")))
            }
            "node" => match args.as_slice() {
                [node] => {
                    let resolved = self.network.resolve_node(node_name("node", node)?)?;
                    Ok(Value::Str(resolved.name().to_owned()))
                }
                _ => Err(ExpressionError::Arity {
                    function: "node",
                    expected: "1",
                    given: args.len(),
                }),
            },
            "cmd" => match args.split_first() {
                Some((node, command)) if !command.is_empty() => {
                    let resolved = self.network.resolve_node(node_name("cmd", node)?)?;
                    let command_line = command
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(" ");
                    Ok(Value::Str(resolved.run_sync(&command_line)?))
                }
                _ => Err(ExpressionError::Arity {
                    function: "cmd",
                    expected: "at least 2",
                    given: args.len(),
                }),
            },
            other => Err(ExpressionError::UndefinedName {
                name: other.to_owned(),
            }),
        }
    }
}

fn node_name<'v>(function: &'static str, value: &'v Value) -> Result<&'v str, ExpressionError> {
    match value {
        Value::Str(name) => Ok(name.as_str()),
        other => Err(ExpressionError::NodeNameType {
            function,
            given: other.type_name(),
        }),
    }
}

fn apply(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, ExpressionError> {
    match (op, lhs, rhs) {
        (BinaryOp::Add, Value::Str(text), rhs @ (Value::Str(_) | Value::Integer(_))) => {
            Ok(Value::Str(format!("{text}{rhs}")))
        }
        (BinaryOp::Add, lhs @ Value::Integer(_), Value::Str(text)) => {
            Ok(Value::Str(format!("{lhs}{text}")))
        }
        (op, Value::Integer(a), Value::Integer(b)) => {
            let result = match op {
                BinaryOp::Add => a.checked_add(b),
                BinaryOp::Subtract => a.checked_sub(b),
                BinaryOp::Multiply => a.checked_mul(b),
                BinaryOp::Divide | BinaryOp::Remainder if b == 0 => {
                    return Err(ExpressionError::DivisionByZero);
                }
                BinaryOp::Divide => a.checked_div(b),
                BinaryOp::Remainder => a.checked_rem(b),
            };
            result.map(Value::Integer).ok_or(ExpressionError::Overflow)
        }
        (op, lhs, rhs) => Err(ExpressionError::OperandTypes {
            op: op.to_string(),
            lhs: lhs.type_name(),
            rhs: rhs.type_name(),
        }),
    }
}

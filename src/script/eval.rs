use super::syntax::{BinaryOp, Expr, UnaryOp};
use super::{ScriptContext, ScriptError};
use crate::state::Scope;
use crate::types::Passage;
use serde_json::{Number, Value, json};
use std::cmp::Ordering;

// Integral results below this magnitude are stored as integers
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

pub(super) fn evaluate(expr: &Expr, cx: &mut ScriptContext<'_>) -> Result<Value, ScriptError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Name(name) => match name.as_str() {
            "passage" => Ok(cx.passage.map(passage_value).unwrap_or(Value::Null)),
            "story" => Ok(cx.story.to_value()),
            other => Err(ScriptError::runtime(format!("unknown name `{other}`"))),
        },
        Expr::List(items) => items
            .iter()
            .map(|item| evaluate(item, cx))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Expr::Member(object, property) => member(evaluate(object, cx)?, property),
        Expr::Index(object, index) => {
            let object = evaluate(object, cx)?;
            let index = evaluate(index, cx)?;
            if object.is_null() {
                return Err(ScriptError::runtime(format!(
                    "cannot index null with {}",
                    to_display(&index)
                )));
            }
            if let (Value::Array(items), Value::Number(n)) = (&object, &index) {
                let element = n
                    .as_f64()
                    .filter(|f| f.fract() == 0.0 && *f >= 0.0)
                    .and_then(|f| items.get(f as usize));
                return Ok(element.cloned().unwrap_or(Value::Null));
            }
            member(object, &to_display(&index))
        }
        Expr::Call { name, args } => {
            let args = args
                .iter()
                .map(|arg| evaluate(arg, cx))
                .collect::<Result<Vec<_>, _>>()?;
            call(name, args, cx)
        }
        Expr::Unary(UnaryOp::Not, operand) => Ok(Value::Bool(!truthy(&evaluate(operand, cx)?))),
        Expr::Unary(UnaryOp::Negate, operand) => number(-to_number(&evaluate(operand, cx)?)?),
        Expr::Binary(BinaryOp::And, left, right) => {
            let left = evaluate(left, cx)?;
            if truthy(&left) {
                evaluate(right, cx)
            } else {
                Ok(left)
            }
        }
        Expr::Binary(BinaryOp::Or, left, right) => {
            let left = evaluate(left, cx)?;
            if truthy(&left) {
                Ok(left)
            } else {
                evaluate(right, cx)
            }
        }
        Expr::Binary(op, left, right) => {
            let left = evaluate(left, cx)?;
            let right = evaluate(right, cx)?;
            binary(*op, &left, &right)
        }
    }
}

fn member(object: Value, property: &str) -> Result<Value, ScriptError> {
    match object {
        Value::Null => Err(ScriptError::runtime(format!(
            "cannot read `{property}` of null"
        ))),
        Value::Object(mut map) => Ok(map.remove(property).unwrap_or(Value::Null)),
        Value::Array(items) if property == "length" => Ok(Value::from(items.len())),
        Value::String(s) if property == "length" => Ok(Value::from(s.chars().count())),
        _ => Ok(Value::Null),
    }
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, ScriptError> {
    match op {
        BinaryOp::Add if left.is_string() || right.is_string() => Ok(Value::String(format!(
            "{}{}",
            to_display(left),
            to_display(right)
        ))),
        BinaryOp::Add => number(to_number(left)? + to_number(right)?),
        BinaryOp::Sub => number(to_number(left)? - to_number(right)?),
        BinaryOp::Mul => number(to_number(left)? * to_number(right)?),
        BinaryOp::Div => number(to_number(left)? / to_number(right)?),
        BinaryOp::Rem => number(to_number(left)? % to_number(right)?),
        BinaryOp::Eq => Ok(Value::Bool(values_equal(left, right))),
        BinaryOp::NotEq => Ok(Value::Bool(!values_equal(left, right))),
        BinaryOp::Less | BinaryOp::LessEq | BinaryOp::Greater | BinaryOp::GreaterEq => {
            let ordering = match (left, right) {
                (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
                _ => to_number(left)?.partial_cmp(&to_number(right)?),
            };
            Ok(Value::Bool(match (op, ordering) {
                (_, None) => false,
                (BinaryOp::Less, Some(o)) => o == Ordering::Less,
                (BinaryOp::LessEq, Some(o)) => o != Ordering::Greater,
                (BinaryOp::Greater, Some(o)) => o == Ordering::Greater,
                (_, Some(o)) => o != Ordering::Less,
            }))
        }
        // Only reached for already-evaluated operands; `evaluate` short-circuits
        BinaryOp::And => Ok(if truthy(left) { right } else { left }.clone()),
        BinaryOp::Or => Ok(if truthy(left) { left } else { right }.clone()),
    }
}

fn call(name: &str, args: Vec<Value>, cx: &mut ScriptContext<'_>) -> Result<Value, ScriptError> {
    let arity = |min: usize, max: usize| {
        if args.len() < min || args.len() > max {
            Err(ScriptError::runtime(format!(
                "`{name}` expects {min} to {max} arguments, got {}",
                args.len()
            )))
        } else {
            Ok(())
        }
    };

    match name {
        "get" => {
            arity(1, 2)?;
            let path = string_arg(name, &args[0])?;
            let scope = args.get(1).map(scope_arg).transpose()?;
            Ok(cx.state.get(path, scope)?)
        }
        "set" => {
            arity(2, 3)?;
            let key = string_arg(name, &args[0])?;
            let scope = args.get(2).map(scope_arg).transpose()?;
            cx.state
                .set(key, args[1].clone(), scope.unwrap_or(Scope::Global))?;
            Ok(Value::Null)
        }
        "clear" => {
            arity(0, 2)?;
            let key = match args.first() {
                None | Some(Value::Null) => None,
                Some(key) => Some(string_arg(name, key)?),
            };
            let scope = args.get(1).map(scope_arg).transpose()?;
            cx.state.clear(key, scope.unwrap_or(Scope::Global));
            Ok(Value::Null)
        }
        "has" => {
            arity(1, 1)?;
            let path = string_arg(name, &args[0])?;
            Ok(Value::Bool(cx.state.lookup(path).is_some()))
        }
        "log" => {
            let line = args.iter().map(to_display).collect::<Vec<_>>().join(" ");
            log::info!("{line}");
            Ok(Value::Null)
        }
        other => Err(ScriptError::runtime(format!("unknown function `{other}`"))),
    }
}

fn string_arg<'v>(function: &str, value: &'v Value) -> Result<&'v str, ScriptError> {
    value.as_str().ok_or_else(|| {
        ScriptError::runtime(format!("`{function}` expects a string key, got {value}"))
    })
}

fn scope_arg(value: &Value) -> Result<Scope, ScriptError> {
    value
        .as_str()
        .and_then(|name| match name {
            "global" => Some(Scope::Global),
            "temp" => Some(Scope::Temp),
            _ => None,
        })
        .ok_or_else(|| {
            ScriptError::runtime(format!(
                "unknown scope {value}; expected \"global\" or \"temp\""
            ))
        })
}

fn passage_value(passage: &Passage) -> Value {
    json!({
        "id": passage.pid(),
        "name": passage.name(),
        "tags": passage.tags(),
    })
}

/// Store a numeric result, as an integer when it is one
pub(super) fn number(value: f64) -> Result<Value, ScriptError> {
    if !value.is_finite() {
        return Err(ScriptError::runtime(
            "arithmetic produced a non-finite number",
        ));
    }
    if value.fract() == 0.0 && value.abs() < MAX_EXACT_INTEGER {
        return Ok(Value::from(value as i64));
    }
    Number::from_f64(value)
        .map(Value::Number)
        .ok_or_else(|| ScriptError::runtime("arithmetic produced a non-finite number"))
}

fn to_number(value: &Value) -> Result<f64, ScriptError> {
    match value {
        Value::Null => Ok(0.0),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::Number(n) => Ok(n.as_f64().unwrap_or(f64::NAN)),
        Value::String(s) if s.trim().is_empty() => Ok(0.0),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| ScriptError::runtime(format!("cannot use {s:?} as a number"))),
        other => Err(ScriptError::runtime(format!("cannot use {other} as a number"))),
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(key, x)| b.get(key).is_some_and(|y| values_equal(x, y)))
        }
        _ => left == right,
    }
}

/// Script truthiness: `false`, `null`, `0` and `""` are falsy
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Text form used by concatenation, `log` and interpolation
pub fn to_display(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < MAX_EXACT_INTEGER => {
                format!("{}", f as i64)
            }
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

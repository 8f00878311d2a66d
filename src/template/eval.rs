//! Expression evaluator
//!
//! Evaluates parsed expressions against a session. Session writes happen in
//! evaluation order, so `session.n = 1; session.n + 1` yields `2`.

use super::parser::{BinaryOp, Expr, UnaryOp};
use super::ExprError;
use crate::session::{Session, Value};
use std::cmp::Ordering;

/// Evaluate a statement list, returning the value of the last statement
pub fn eval_program(program: &[Expr], session: &mut Session) -> Result<Value, ExprError> {
    let mut last = Value::Null;
    for statement in program {
        last = eval(statement, session)?;
    }
    Ok(last)
}

fn eval(expr: &Expr, session: &mut Session) -> Result<Value, ExprError> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),
        Expr::Session(key) => {
            let key = eval(key, session)?.to_string();
            Ok(session.get(&key))
        }
        Expr::Assign { key, value } => {
            let key = eval(key, session)?.to_string();
            let value = eval(value, session)?;
            session.set(key, value.clone());
            Ok(value)
        }
        Expr::Unary(op, operand) => unary(*op, eval(operand, session)?),
        Expr::Binary(op, left, right) => {
            let left = eval(left, session)?;
            let right = eval(right, session)?;
            binary(*op, left, right)
        }
        Expr::And(left, right) => {
            if !eval(left, session)?.is_truthy() {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(eval(right, session)?.is_truthy()))
        }
        Expr::Or(left, right) => {
            if eval(left, session)?.is_truthy() {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(eval(right, session)?.is_truthy()))
        }
        Expr::Coalesce(left, right) => {
            let left = eval(left, session)?;
            if left.is_null() {
                eval(right, session)
            } else {
                Ok(left)
            }
        }
        Expr::Ternary {
            cond,
            then,
            otherwise,
        } => {
            if eval(cond, session)?.is_truthy() {
                eval(then, session)
            } else {
                eval(otherwise, session)
            }
        }
    }
}

fn unary(op: UnaryOp, operand: Value) -> Result<Value, ExprError> {
    match (op, operand) {
        (UnaryOp::Not, v) => Ok(Value::Bool(!v.is_truthy())),
        (UnaryOp::Neg, Value::Null) => Ok(Value::Null),
        (UnaryOp::Neg, Value::Int(i)) => i.checked_neg().map(Value::Int).ok_or(ExprError::Overflow),
        (UnaryOp::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
        (UnaryOp::Neg, v) => Err(ExprError::TypeMismatch {
            op: "-",
            left: v.type_name(),
            right: "none",
        }),
    }
}

fn binary(op: BinaryOp, left: Value, right: Value) -> Result<Value, ExprError> {
    match op {
        BinaryOp::Eq => Ok(Value::Bool(values_equal(&left, &right))),
        BinaryOp::NotEq => Ok(Value::Bool(!values_equal(&left, &right))),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => compare(op, &left, &right),
        BinaryOp::Add if matches!(left, Value::Str(_)) || matches!(right, Value::Str(_)) => {
            Ok(Value::Str(format!("{left}{right}")))
        }
        _ => arithmetic(op, left, right),
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            left.as_float() == right.as_float()
        }
        _ => left == right,
    }
}

/// Ordering comparisons; any `null` operand makes the comparison false
fn compare(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, ExprError> {
    let ordering = match (left, right) {
        (Value::Null, _) | (_, Value::Null) => return Ok(Value::Bool(false)),
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => left
            .as_float()
            .zip(right.as_float())
            .and_then(|(a, b)| a.partial_cmp(&b)),
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        _ => return Err(mismatch(op, left, right)),
    };
    let Some(ordering) = ordering else {
        // NaN compares false against everything
        return Ok(Value::Bool(false));
    };
    let result = match op {
        BinaryOp::Lt => ordering == Ordering::Less,
        BinaryOp::Le => ordering != Ordering::Greater,
        BinaryOp::Gt => ordering == Ordering::Greater,
        _ => ordering != Ordering::Less,
    };
    Ok(Value::Bool(result))
}

fn arithmetic(op: BinaryOp, left: Value, right: Value) -> Result<Value, ExprError> {
    match (&left, &right) {
        (Value::Null, Value::Null | Value::Int(_) | Value::Float(_))
        | (Value::Int(_) | Value::Float(_), Value::Null) => Ok(Value::Null),
        (Value::Int(a), Value::Int(b)) => int_arithmetic(op, *a, *b),
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            let (Some(a), Some(b)) = (left.as_float(), right.as_float()) else {
                return Err(mismatch(op, &left, &right));
            };
            if matches!(op, BinaryOp::Div | BinaryOp::Rem) && b == 0.0 {
                return Err(ExprError::DivisionByZero);
            }
            Ok(Value::Float(match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => a / b,
                _ => a % b,
            }))
        }
        _ => Err(mismatch(op, &left, &right)),
    }
}

fn int_arithmetic(op: BinaryOp, a: i64, b: i64) -> Result<Value, ExprError> {
    if matches!(op, BinaryOp::Div | BinaryOp::Rem) && b == 0 {
        return Err(ExprError::DivisionByZero);
    }
    let result = match op {
        BinaryOp::Add => a.checked_add(b),
        BinaryOp::Sub => a.checked_sub(b),
        BinaryOp::Mul => a.checked_mul(b),
        BinaryOp::Div => a.checked_div(b),
        _ => a.checked_rem(b),
    };
    result.map(Value::Int).ok_or(ExprError::Overflow)
}

const fn mismatch(op: BinaryOp, left: &Value, right: &Value) -> ExprError {
    ExprError::TypeMismatch {
        op: op.symbol(),
        left: left.type_name(),
        right: right.type_name(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::evaluate;

    fn run(source: &str) -> Result<Value, ExprError> {
        let mut session = Session::new("127.0.0.1");
        evaluate(source, &mut session)
    }

    #[test]
    fn test_integer_arithmetic() {
        assert_eq!(run("1+1"), Ok(Value::Int(2)));
        assert_eq!(run("7 / 2"), Ok(Value::Int(3)));
        assert_eq!(run("7 % 4"), Ok(Value::Int(3)));
        assert_eq!(run("-(2 * 3)"), Ok(Value::Int(-6)));
    }

    #[test]
    fn test_mixed_arithmetic_widens() {
        assert_eq!(run("1 + 0.5"), Ok(Value::Float(1.5)));
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(run("1 / 0"), Err(ExprError::DivisionByZero));
        assert_eq!(run("7 % 0"), Err(ExprError::DivisionByZero));
        assert_eq!(run("1.0 / 0"), Err(ExprError::DivisionByZero));
        assert_eq!(run("1 / 0.0"), Err(ExprError::DivisionByZero));
        assert_eq!(run("1.5 % 0"), Err(ExprError::DivisionByZero));
        assert_eq!(run("1.5 / -0.0"), Err(ExprError::DivisionByZero));
    }

    #[test]
    fn test_overflow() {
        assert_eq!(run("9223372036854775807 + 1"), Err(ExprError::Overflow));
    }

    #[test]
    fn test_concatenation() {
        assert_eq!(run("'n=' + 3"), Ok(Value::from("n=3")));
        assert_eq!(run("'a' + session.missing"), Ok(Value::from("a")));
    }

    #[test]
    fn test_null_propagates_through_arithmetic() {
        assert_eq!(run("session.missing + 1"), Ok(Value::Null));
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(run("2 > 1"), Ok(Value::Bool(true)));
        assert_eq!(run("2 == 2.0"), Ok(Value::Bool(true)));
        assert_eq!(run("'a' < 'b'"), Ok(Value::Bool(true)));
        assert_eq!(run("session.missing < 1"), Ok(Value::Bool(false)));
        assert_eq!(run("session.missing == null"), Ok(Value::Bool(true)));
        assert!(matches!(
            run("'a' < 1"),
            Err(ExprError::TypeMismatch { op: "<", .. })
        ));
    }

    #[test]
    fn test_logic_and_ternary() {
        assert_eq!(run("true && !false"), Ok(Value::Bool(true)));
        assert_eq!(run("session.x ?? 'fallback'"), Ok(Value::from("fallback")));
        assert_eq!(run("1 > 2 ? 'yes' : 'no'"), Ok(Value::from("no")));
    }

    #[test]
    fn test_short_circuit_skips_side_effects() {
        let mut session = Session::new("127.0.0.1");
        evaluate("false && (session.touched = true)", &mut session).unwrap();
        assert!(!session.contains("touched"));
    }

    #[test]
    fn test_assignment_writes_session() {
        let mut session = Session::new("127.0.0.1");
        let value = evaluate("session.count = 4; session.count * 2", &mut session);
        assert_eq!(value, Ok(Value::Int(8)));
        assert_eq!(session.get("count"), Value::Int(4));
    }

    #[test]
    fn test_type_mismatch() {
        assert!(matches!(
            run("true * 2"),
            Err(ExprError::TypeMismatch { op: "*", .. })
        ));
        assert!(run("-'a'").is_err());
    }
}

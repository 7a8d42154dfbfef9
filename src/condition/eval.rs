use serde_json::Value;

use super::ExprError;
use super::context::Context;
use super::parser::{CompareOp, Expr};

/// Result of evaluating a sub-expression. `None` stands for `undefined`.
type Evaluated = Option<Value>;

pub(crate) fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_) | Value::Object(_)) => true,
    }
}

fn to_number(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Null) => 0.0,
        Some(Value::Bool(b)) => f64::from(u8::from(*b)),
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse().unwrap_or(f64::NAN)
            }
        }
        None | Some(Value::Array(_) | Value::Object(_)) => f64::NAN,
    }
}

/// Strict equality. Numbers compare by value so `1` and `1.0` are equal.
pub(crate) fn strict_equals(left: Option<&Value>, right: Option<&Value>) -> bool {
    match (left, right) {
        (None, None) => true,
        (Some(Value::Number(a)), Some(Value::Number(b))) => a.as_f64() == b.as_f64(),
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn compare(op: CompareOp, left: Option<&Value>, right: Option<&Value>) -> bool {
    match op {
        CompareOp::Eq => return strict_equals(left, right),
        CompareOp::Ne => return !strict_equals(left, right),
        _ => {}
    }
    if let (Some(Value::String(a)), Some(Value::String(b))) = (left, right) {
        return match op {
            CompareOp::Lt => a < b,
            CompareOp::Le => a <= b,
            CompareOp::Gt => a > b,
            _ => a >= b,
        };
    }
    let (a, b) = (to_number(left), to_number(right));
    match op {
        CompareOp::Lt => a < b,
        CompareOp::Le => a <= b,
        CompareOp::Gt => a > b,
        _ => a >= b,
    }
}

/// Walk a dotted path. Only the last segment may come back `undefined`; reading a
/// property of `undefined` or `null` is an error.
fn resolve(path: &[String], context: &Context) -> Result<Evaluated, ExprError> {
    let (head, rest) = path.split_first().ok_or(ExprError::UnexpectedEnd)?;
    let mut current = Some(
        context
            .get(head)
            .cloned()
            .ok_or_else(|| ExprError::Unresolved(head.clone()))?,
    );

    for (index, segment) in rest.iter().enumerate() {
        current = match current {
            Some(Value::Object(mut map)) => map.remove(segment),
            None | Some(Value::Null) => {
                return Err(ExprError::NotAnObject(path[..=index].join(".")));
            }
            Some(_) => None,
        };
    }
    Ok(current)
}

/// Evaluate an expression tree. `&&` and `||` short-circuit and yield operand values.
pub(crate) fn eval(expr: &Expr, context: &Context) -> Result<Evaluated, ExprError> {
    match expr {
        Expr::Literal(value) => Ok(Some(value.clone())),
        Expr::Undefined => Ok(None),
        Expr::Path(path) => resolve(path, context),
        Expr::Not(inner) => {
            let value = eval(inner, context)?;
            Ok(Some(Value::Bool(!is_truthy(value.as_ref()))))
        }
        Expr::And(left, right) => {
            let value = eval(left, context)?;
            if is_truthy(value.as_ref()) {
                eval(right, context)
            } else {
                Ok(value)
            }
        }
        Expr::Or(left, right) => {
            let value = eval(left, context)?;
            if is_truthy(value.as_ref()) {
                Ok(value)
            } else {
                eval(right, context)
            }
        }
        Expr::Compare(op, left, right) => {
            let left = eval(left, context)?;
            let right = eval(right, context)?;
            Ok(Some(Value::Bool(compare(*op, left.as_ref(), right.as_ref()))))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::build_context;
    use crate::sections::{AttachState, ConfigTree, DropdownValues};
    use serde_json::json;

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(None));
        assert!(!is_truthy(Some(&json!(""))));
        assert!(!is_truthy(Some(&json!(0))));
        assert!(is_truthy(Some(&json!("0"))));
        assert!(is_truthy(Some(&json!({}))));
    }

    #[test]
    fn test_number_equality_ignores_representation() {
        assert!(strict_equals(Some(&json!(1)), Some(&json!(1.0))));
        assert!(!strict_equals(Some(&json!(1)), Some(&json!("1"))));
        assert!(!strict_equals(None, Some(&Value::Null)));
    }

    #[test]
    fn test_relational_mixed_types() {
        assert!(compare(CompareOp::Lt, Some(&json!("2")), Some(&json!(10))));
        assert!(compare(CompareOp::Gt, Some(&json!("b")), Some(&json!("a"))));
        assert!(!compare(CompareOp::Lt, Some(&json!("abc")), Some(&json!(1))));
    }

    #[test]
    fn test_resolve_through_missing_property() {
        let config = ConfigTree::from_value(json!({"api": {"enabled": true, "port": 80}})).unwrap();
        let context = build_context("api", &config, &AttachState::default(), &DropdownValues::new());
        let path = |p: &str| p.split('.').map(str::to_string).collect::<Vec<_>>();

        assert_eq!(resolve(&path("apiConfig.missing"), &context), Ok(None));
        assert_eq!(resolve(&path("apiConfig.port.x"), &context), Ok(None));
        assert_eq!(
            resolve(&path("apiConfig.missing.deep"), &context),
            Err(ExprError::NotAnObject("apiConfig.missing".to_string()))
        );
        assert_eq!(
            resolve(&path("apiConfig.port.x.y"), &context),
            Err(ExprError::NotAnObject("apiConfig.port.x".to_string()))
        );
    }
}

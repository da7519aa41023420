use serde_json::Value;

/// Arithmetic and string operators usable inside projection and update
/// expressions: a table whose single key is the operator name, applied over
/// its evaluated operand array.
pub(crate) const OPERATORS: [&str; 5] = ["$add", "$sub", "$mul", "$div", "$concat"];

pub(crate) fn is_operator(name: &str) -> bool {
    OPERATORS.contains(&name)
}

/// Apply an operator over already-evaluated operands.
///
/// Arithmetic stays integral until a real operand appears; integer overflow
/// promotes to real. Errors are returned as plain messages for the caller
/// to accumulate.
pub(crate) fn apply_operator(op: &str, operands: &[Value]) -> Result<Value, String> {
    if op == "$concat" {
        let mut out = String::new();
        for operand in operands {
            match operand {
                Value::String(s) => out.push_str(s),
                other => return Err(format!("'$concat' needs string operands, got {other}")),
            }
        }
        return Ok(Value::String(out));
    }

    let (first, rest) = operands
        .split_first()
        .ok_or_else(|| format!("'{op}' needs at least one operand"))?;
    let mut acc = Num::from_value(first).ok_or_else(|| number_error(op, first))?;
    for operand in rest {
        let rhs = Num::from_value(operand).ok_or_else(|| number_error(op, operand))?;
        acc = match op {
            "$add" => acc.combine(rhs, i64::checked_add, |a, b| a + b),
            "$sub" => acc.combine(rhs, i64::checked_sub, |a, b| a - b),
            "$mul" => acc.combine(rhs, i64::checked_mul, |a, b| a * b),
            "$div" => {
                if rhs.is_zero() {
                    return Err(format!("'{op}' divides by zero"));
                }
                acc.combine(rhs, i64::checked_div, |a, b| a / b)
            }
            _ => return Err(format!("unknown operator: {op}")),
        };
    }
    Ok(acc.into_value())
}

fn number_error(op: &str, operand: &Value) -> String {
    format!("'{op}' needs numeric operands, got {operand}")
}

#[derive(Debug, Clone, Copy)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn from_value(value: &Value) -> Option<Num> {
        let n = value.as_number()?;
        if let Some(i) = n.as_i64() {
            Some(Num::Int(i))
        } else {
            n.as_f64().map(Num::Float)
        }
    }

    fn is_zero(self) -> bool {
        match self {
            Num::Int(i) => i == 0,
            Num::Float(f) => f == 0.0,
        }
    }

    fn combine(
        self,
        rhs: Num,
        int_op: impl Fn(i64, i64) -> Option<i64>,
        float_op: impl Fn(f64, f64) -> f64,
    ) -> Num {
        match (self, rhs) {
            (Num::Int(a), Num::Int(b)) => match int_op(a, b) {
                Some(i) => Num::Int(i),
                None => Num::Float(float_op(a as f64, b as f64)),
            },
            (a, b) => Num::Float(float_op(a.as_f64(), b.as_f64())),
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Num::Int(i) => i as f64,
            Num::Float(f) => f,
        }
    }

    fn into_value(self) -> Value {
        match self {
            Num::Int(i) => Value::from(i),
            Num::Float(f) => Value::from(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn add_stays_integral() {
        let result = apply_operator("$add", &[json!(10), json!(1)]).unwrap();
        assert_eq!(result, json!(11));
    }

    #[test]
    fn real_operand_promotes() {
        let result = apply_operator("$add", &[json!(10), json!(0.5)]).unwrap();
        assert_eq!(result, json!(10.5));
    }

    #[test]
    fn sub_mul_div_fold_left() {
        assert_eq!(apply_operator("$sub", &[json!(10), json!(3), json!(2)]).unwrap(), json!(5));
        assert_eq!(apply_operator("$mul", &[json!(2), json!(3), json!(4)]).unwrap(), json!(24));
        assert_eq!(apply_operator("$div", &[json!(12), json!(3)]).unwrap(), json!(4));
    }

    #[test]
    fn divide_by_zero_errors() {
        let err = apply_operator("$div", &[json!(1), json!(0)]).unwrap_err();
        assert!(err.contains("zero"), "{err}");
    }

    #[test]
    fn overflow_promotes_to_real() {
        let result = apply_operator("$add", &[json!(i64::MAX), json!(1)]).unwrap();
        assert!(result.is_f64());
    }

    #[test]
    fn concat_joins_strings() {
        let result = apply_operator("$concat", &[json!("a"), json!("b"), json!("c")]).unwrap();
        assert_eq!(result, json!("abc"));
    }

    #[test]
    fn concat_rejects_non_strings() {
        assert!(apply_operator("$concat", &[json!("a"), json!(1)]).is_err());
    }

    #[test]
    fn non_numeric_operand_errors() {
        let err = apply_operator("$add", &[json!("a")]).unwrap_err();
        assert!(err.contains("numeric"), "{err}");
    }
}

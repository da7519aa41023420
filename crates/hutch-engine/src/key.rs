use std::cmp::Ordering;

use serde_json::Value;

use crate::error::EngineError;

/// A totally ordered projection of one document field.
///
/// Type rank: null < bool (false < true) < number < string < sequence.
/// Integers and reals compare by numeric value — `1` and `1.0` are the same
/// key. Strings compare by byte order, sequences lexicographically by
/// element. Tables are not orderable and are rejected by [`IndexKey::new`].
#[derive(Debug, Clone)]
pub enum IndexKey {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Seq(Vec<IndexKey>),
}

impl IndexKey {
    /// Build a key from a document field value. Missing fields index as null.
    pub fn new(value: &Value) -> Result<IndexKey, EngineError> {
        Ok(match value {
            Value::Null => IndexKey::Null,
            Value::Bool(b) => IndexKey::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    IndexKey::Int(i)
                } else {
                    // u64 beyond i64 range, or a real
                    IndexKey::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            Value::String(s) => IndexKey::Str(s.clone()),
            Value::Array(items) => {
                let elems = items.iter().map(IndexKey::new).collect::<Result<_, _>>()?;
                IndexKey::Seq(elems)
            }
            Value::Object(_) => {
                return Err(EngineError::KeyNotOrderable("a table".into()));
            }
        })
    }

    fn type_rank(&self) -> u8 {
        match self {
            IndexKey::Null => 0,
            IndexKey::Bool(_) => 1,
            IndexKey::Int(_) | IndexKey::Float(_) => 2,
            IndexKey::Str(_) => 3,
            IndexKey::Seq(_) => 4,
        }
    }
}

/// JSON numbers are finite, so partial_cmp never fails on values built
/// through [`IndexKey::new`]; equal is the safe fallback regardless.
fn num_cmp(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

impl Ord for IndexKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (IndexKey::Null, IndexKey::Null) => Ordering::Equal,
            (IndexKey::Bool(a), IndexKey::Bool(b)) => a.cmp(b),
            (IndexKey::Int(a), IndexKey::Int(b)) => a.cmp(b),
            (IndexKey::Int(a), IndexKey::Float(b)) => num_cmp(*a as f64, *b),
            (IndexKey::Float(a), IndexKey::Int(b)) => num_cmp(*a, *b as f64),
            (IndexKey::Float(a), IndexKey::Float(b)) => num_cmp(*a, *b),
            (IndexKey::Str(a), IndexKey::Str(b)) => a.as_bytes().cmp(b.as_bytes()),
            (IndexKey::Seq(a), IndexKey::Seq(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    match x.cmp(y) {
                        Ordering::Equal => continue,
                        other => return other,
                    }
                }
                a.len().cmp(&b.len())
            }
            (a, b) => a.type_rank().cmp(&b.type_rank()),
        }
    }
}

impl PartialOrd for IndexKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for IndexKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for IndexKey {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(value: Value) -> IndexKey {
        IndexKey::new(&value).unwrap()
    }

    #[test]
    fn type_rank_ordering() {
        let keys = [
            key(json!(null)),
            key(json!(false)),
            key(json!(true)),
            key(json!(-3)),
            key(json!(2.5)),
            key(json!(7)),
            key(json!("a")),
            key(json!("b")),
            key(json!([1, 2])),
        ];
        for window in keys.windows(2) {
            assert!(window[0] < window[1], "{:?} < {:?}", window[0], window[1]);
        }
    }

    #[test]
    fn integers_and_reals_compare_by_value() {
        assert_eq!(key(json!(1)), key(json!(1.0)));
        assert!(key(json!(1)) < key(json!(1.5)));
        assert!(key(json!(2.0)) > key(json!(1)));
    }

    #[test]
    fn strings_compare_by_byte_order() {
        assert!(key(json!("abc")) < key(json!("abd")));
        assert!(key(json!("ab")) < key(json!("abc")));
    }

    #[test]
    fn sequences_compare_lexicographically() {
        assert!(key(json!([1, 2])) < key(json!([1, 3])));
        assert!(key(json!([1])) < key(json!([1, 0])));
        assert_eq!(key(json!([1, "a"])), key(json!([1.0, "a"])));
    }

    #[test]
    fn tables_are_not_orderable() {
        assert!(matches!(
            IndexKey::new(&json!({ "a": 1 })),
            Err(EngineError::KeyNotOrderable(_))
        ));
    }

    #[test]
    fn nested_table_in_sequence_is_rejected() {
        assert!(IndexKey::new(&json!([1, { "a": 1 }])).is_err());
    }
}

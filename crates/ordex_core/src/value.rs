//! Dynamic SQL-style value type.
//!
//! Index keys are tuples of [`Value`]s. Values carry their own runtime type
//! and support conversion to a column's declared type plus a total,
//! compare-mode-aware ordering with SQL null placement (nulls sort before
//! every non-null value).

use crate::error::{IndexError, IndexResult};
use crate::types::CompareMode;
use std::cmp::Ordering;
use std::fmt;

/// Runtime type of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// Boolean.
    Bool,
    /// 32-bit signed integer.
    Int,
    /// 64-bit signed integer.
    Long,
    /// 64-bit float.
    Double,
    /// UTF-8 text.
    Text,
    /// Raw byte string.
    Bytes,
}

impl ValueType {
    /// Returns the type's name as used in error messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "BOOLEAN",
            Self::Int => "INT",
            Self::Long => "BIGINT",
            Self::Double => "DOUBLE",
            Self::Text => "VARCHAR",
            Self::Bytes => "VARBINARY",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A dynamic value.
#[derive(Debug, Clone)]
pub enum Value {
    /// SQL NULL.
    Null,
    /// Boolean value.
    Bool(bool),
    /// 32-bit signed integer.
    Int(i32),
    /// 64-bit signed integer.
    Long(i64),
    /// 64-bit float.
    Double(f64),
    /// Text string (UTF-8).
    Text(String),
    /// Byte string.
    Bytes(Vec<u8>),
}

impl Value {
    /// Returns the runtime type, or `None` for NULL.
    #[must_use]
    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            Self::Null => None,
            Self::Bool(_) => Some(ValueType::Bool),
            Self::Int(_) => Some(ValueType::Int),
            Self::Long(_) => Some(ValueType::Long),
            Self::Double(_) => Some(ValueType::Double),
            Self::Text(_) => Some(ValueType::Text),
            Self::Bytes(_) => Some(ValueType::Bytes),
        }
    }

    /// Returns true for [`Value::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Converts this value to the given type.
    ///
    /// NULL converts to NULL for every target type. Numeric narrowing fails
    /// on overflow; text parses to numbers where the content allows it.
    pub fn convert_to(&self, target: ValueType) -> IndexResult<Value> {
        if self.is_null() {
            return Ok(Value::Null);
        }
        if self.value_type() == Some(target) {
            return Ok(self.clone());
        }
        let fail = || IndexError::type_conversion(self.to_string(), target.name());
        match (self, target) {
            (Self::Int(v), ValueType::Long) => Ok(Value::Long(i64::from(*v))),
            (Self::Int(v), ValueType::Double) => Ok(Value::Double(f64::from(*v))),
            (Self::Long(v), ValueType::Int) => {
                i32::try_from(*v).map(Value::Int).map_err(|_| fail())
            }
            (Self::Long(v), ValueType::Double) => Ok(Value::Double(*v as f64)),
            (Self::Double(v), ValueType::Long) => {
                if v.fract() == 0.0 && *v >= i64::MIN as f64 && *v <= i64::MAX as f64 {
                    Ok(Value::Long(*v as i64))
                } else {
                    Err(fail())
                }
            }
            (Self::Double(v), ValueType::Int) => {
                if v.fract() == 0.0 && *v >= f64::from(i32::MIN) && *v <= f64::from(i32::MAX) {
                    Ok(Value::Int(*v as i32))
                } else {
                    Err(fail())
                }
            }
            (Self::Text(s), ValueType::Int) => s.trim().parse().map(Value::Int).map_err(|_| fail()),
            (Self::Text(s), ValueType::Long) => {
                s.trim().parse().map(Value::Long).map_err(|_| fail())
            }
            (Self::Text(s), ValueType::Double) => {
                s.trim().parse().map(Value::Double).map_err(|_| fail())
            }
            (Self::Bool(b), ValueType::Int) => Ok(Value::Int(i32::from(*b))),
            (Self::Int(v), ValueType::Bool) => Ok(Value::Bool(*v != 0)),
            (v, ValueType::Text) => Ok(Value::Text(v.to_string())),
            _ => Err(fail()),
        }
    }

    /// Compares two values under the given compare mode.
    ///
    /// The ordering is total: NULL sorts before every non-null value, values
    /// of the same type compare by content, and values of different types
    /// compare by type rank (unreachable for correctly converted keys, but
    /// keeps the comparator total).
    #[must_use]
    pub fn compare(&self, other: &Value, mode: CompareMode) -> Ordering {
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Null, _) => Ordering::Less,
            (_, Self::Null) => Ordering::Greater,
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Long(a), Self::Long(b)) => a.cmp(b),
            (Self::Int(a), Self::Long(b)) => i64::from(*a).cmp(b),
            (Self::Long(a), Self::Int(b)) => a.cmp(&i64::from(*b)),
            (Self::Double(a), Self::Double(b)) => a.total_cmp(b),
            (Self::Text(a), Self::Text(b)) => match mode {
                CompareMode::Binary => a.cmp(b),
                CompareMode::CaseInsensitive => a
                    .to_lowercase()
                    .cmp(&b.to_lowercase())
                    .then_with(|| a.cmp(b)),
            },
            (Self::Bytes(a), Self::Bytes(b)) => a.cmp(b),
            (a, b) => a.type_rank().cmp(&b.type_rank()),
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Int(_) => 2,
            Self::Long(_) => 3,
            Self::Double(_) => 4,
            Self::Text(_) => 5,
            Self::Bytes(_) => 6,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other, CompareMode::Binary) == Ordering::Equal
    }
}

// total_cmp makes the binary ordering total, so equality is an equivalence.
impl Eq for Value {}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Self::Int(v) => write!(f, "{v}"),
            Self::Long(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Text(s) => write!(f, "'{s}'"),
            Self::Bytes(b) => {
                f.write_str("X'")?;
                for byte in b {
                    write!(f, "{byte:02x}")?;
                }
                f.write_str("'")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_sorts_first() {
        assert_eq!(
            Value::Null.compare(&Value::Long(i64::MIN), CompareMode::Binary),
            Ordering::Less
        );
        assert_eq!(
            Value::Null.compare(&Value::Null, CompareMode::Binary),
            Ordering::Equal
        );
    }

    #[test]
    fn int_widens_to_long() {
        let v = Value::Int(42).convert_to(ValueType::Long).unwrap();
        assert_eq!(v, Value::Long(42));
    }

    #[test]
    fn long_narrowing_overflow_fails() {
        let err = Value::Long(i64::MAX).convert_to(ValueType::Int).unwrap_err();
        assert!(matches!(err, IndexError::TypeConversion { .. }));
    }

    #[test]
    fn double_narrows_to_int_when_integral_and_in_range() {
        assert_eq!(
            Value::Double(3.0).convert_to(ValueType::Int).unwrap(),
            Value::Int(3)
        );
        assert!(Value::Double(3.5).convert_to(ValueType::Int).is_err());
        assert!(Value::Double(1e10).convert_to(ValueType::Int).is_err());
    }

    #[test]
    fn text_parses_to_long() {
        let v = Value::Text(" 17 ".into()).convert_to(ValueType::Long).unwrap();
        assert_eq!(v, Value::Long(17));
        assert!(Value::Text("abc".into()).convert_to(ValueType::Long).is_err());
    }

    #[test]
    fn case_insensitive_text_compare() {
        let a = Value::Text("Alpha".into());
        let b = Value::Text("alpha".into());
        assert_ne!(a.compare(&b, CompareMode::Binary), Ordering::Equal);
        // Case-insensitive mode folds case but stays deterministic
        assert_eq!(
            a.compare(&b, CompareMode::CaseInsensitive),
            "Alpha".cmp("alpha")
        );
    }

    #[test]
    fn double_ordering_is_total() {
        let nan = Value::Double(f64::NAN);
        let one = Value::Double(1.0);
        assert_ne!(nan.compare(&one, CompareMode::Binary), Ordering::Equal);
        assert_eq!(nan.compare(&nan, CompareMode::Binary), Ordering::Equal);
    }

    #[test]
    fn rendering() {
        assert_eq!(Value::Text("a".into()).to_string(), "'a'");
        assert_eq!(Value::Bytes(vec![0xab, 0x01]).to_string(), "X'ab01'");
        assert_eq!(Value::Null.to_string(), "NULL");
    }
}

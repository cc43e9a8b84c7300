//! Scalar values that can appear in an update payload.
//!
//! [`SqlValue`] is bound directly as a `tokio-postgres` parameter. Because one
//! payload may target columns of different types, the conversion is decided
//! per bind from the column type Postgres inferred for the placeholder.

use crate::error::{JoblyError, JoblyResult};
use bytes::BytesMut;
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde::Serialize;
use std::error::Error as StdError;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};

type BoxError = Box<dyn StdError + Sync + Send>;

/// A scalar SQL parameter.
///
/// `Null` is a real value: it is bound as SQL `NULL`, never skipped.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    Text(String),
}

/// A payload value that cannot be bound to its target column.
///
/// Returned from [`SqlValue::to_sql`]; [`JoblyError::from_db_error`] turns it
/// into a bad request, since the value came from the caller's input.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct BindError(String);

impl SqlValue {
    /// Name of the variant, used in bind error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Decimal(_) => "decimal",
            Self::Text(_) => "text",
        }
    }

    fn mismatch(&self, ty: &Type) -> BoxError {
        BindError(format!("cannot bind {} value to a column of type {}", self.kind(), ty)).into()
    }

    fn invalid(&self, ty: &Type) -> BoxError {
        BindError(format!("{self} is not a valid {ty}")).into()
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Decimal(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "'{v}'"),
        }
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match self {
            Self::Null => Ok(IsNull::Yes),
            Self::Bool(v) => match *ty {
                Type::BOOL => v.to_sql(ty, out),
                _ => Err(self.mismatch(ty)),
            },
            Self::Int(v) => match *ty {
                Type::INT2 => i16::try_from(*v)
                    .map_err(|_| self.invalid(ty))?
                    .to_sql(ty, out),
                Type::INT4 => i32::try_from(*v)
                    .map_err(|_| self.invalid(ty))?
                    .to_sql(ty, out),
                Type::INT8 => v.to_sql(ty, out),
                Type::FLOAT4 => (*v as f32).to_sql(ty, out),
                Type::FLOAT8 => (*v as f64).to_sql(ty, out),
                Type::NUMERIC => Decimal::from(*v).to_sql(ty, out),
                _ => Err(self.mismatch(ty)),
            },
            Self::Float(v) => match *ty {
                Type::FLOAT4 => (*v as f32).to_sql(ty, out),
                Type::FLOAT8 => v.to_sql(ty, out),
                Type::NUMERIC => Decimal::from_f64(*v)
                    .ok_or_else(|| self.invalid(ty))?
                    .to_sql(ty, out),
                _ => Err(self.mismatch(ty)),
            },
            Self::Decimal(v) => match *ty {
                Type::NUMERIC => v.to_sql(ty, out),
                Type::FLOAT8 => v
                    .to_f64()
                    .ok_or_else(|| self.invalid(ty))?
                    .to_sql(ty, out),
                _ => Err(self.mismatch(ty)),
            },
            Self::Text(v) => match *ty {
                // Numeric input commonly arrives as a string ("0.001").
                Type::NUMERIC => Decimal::from_str(v)
                    .map_err(|_| self.invalid(ty))?
                    .to_sql(ty, out),
                _ if <String as ToSql>::accepts(ty) => v.to_sql(ty, out),
                _ => Err(self.mismatch(ty)),
            },
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

impl TryFrom<serde_json::Value> for SqlValue {
    type Error = JoblyError;

    fn try_from(value: serde_json::Value) -> JoblyResult<Self> {
        use serde_json::Value;

        match value {
            Value::Null => Ok(Self::Null),
            Value::Bool(b) => Ok(Self::Bool(b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(Self::Int(i)),
                None => n
                    .as_f64()
                    .map(Self::Float)
                    .ok_or_else(|| JoblyError::bad_request(format!("unsupported number {n}"))),
            },
            Value::String(s) => Ok(Self::Text(s)),
            Value::Array(_) | Value::Object(_) => Err(JoblyError::bad_request(
                "expected a scalar value, got an array or object",
            )),
        }
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<Decimal> for SqlValue {
    fn from(v: Decimal) -> Self {
        Self::Decimal(v)
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_scalars_convert() {
        assert_eq!(SqlValue::try_from(json!(null)).unwrap(), SqlValue::Null);
        assert_eq!(SqlValue::try_from(json!(true)).unwrap(), SqlValue::Bool(true));
        assert_eq!(SqlValue::try_from(json!(150_000)).unwrap(), SqlValue::Int(150_000));
        assert_eq!(SqlValue::try_from(json!(0.5)).unwrap(), SqlValue::Float(0.5));
        assert_eq!(
            SqlValue::try_from(json!("0.001")).unwrap(),
            SqlValue::Text("0.001".into())
        );
    }

    #[test]
    fn json_containers_are_rejected() {
        let err = SqlValue::try_from(json!([1, 2])).unwrap_err();
        assert!(err.is_bad_request());
        assert!(SqlValue::try_from(json!({"a": 1})).is_err());
    }

    #[test]
    fn none_becomes_null() {
        assert_eq!(SqlValue::from(None::<i32>), SqlValue::Null);
        assert_eq!(SqlValue::from(Some("x")), SqlValue::Text("x".into()));
    }

    #[test]
    fn int_binds_to_narrower_int_columns() {
        let mut buf = BytesMut::new();
        let is_null = SqlValue::Int(100_000).to_sql(&Type::INT4, &mut buf).unwrap();
        assert!(matches!(is_null, IsNull::No));
        assert_eq!(buf.len(), 4);

        let mut buf = BytesMut::new();
        assert!(SqlValue::Int(i64::MAX).to_sql(&Type::INT4, &mut buf).is_err());
    }

    #[test]
    fn null_binds_to_any_type() {
        let mut buf = BytesMut::new();
        let is_null = SqlValue::Null.to_sql(&Type::NUMERIC, &mut buf).unwrap();
        assert!(matches!(is_null, IsNull::Yes));
        assert!(buf.is_empty());
    }

    #[test]
    fn text_binds_to_numeric_when_parseable() {
        let mut buf = BytesMut::new();
        assert!(SqlValue::from("0.001").to_sql(&Type::NUMERIC, &mut buf).is_ok());

        let mut buf = BytesMut::new();
        assert!(SqlValue::from("lots").to_sql(&Type::NUMERIC, &mut buf).is_err());
    }

    #[test]
    fn kind_mismatch_is_an_error() {
        let mut buf = BytesMut::new();
        let Err(err) = SqlValue::Bool(true).to_sql(&Type::INT4, &mut buf) else {
            panic!("expected a bind error");
        };
        assert!(err.to_string().contains("cannot bind bool value"));
        assert!(err.downcast_ref::<BindError>().is_some());
    }

    #[test]
    fn unparseable_text_is_a_bind_error() {
        let mut buf = BytesMut::new();
        let Err(err) = SqlValue::from("lots").to_sql(&Type::INT4, &mut buf) else {
            panic!("expected a bind error");
        };
        assert!(err.downcast_ref::<BindError>().is_some());

        let Err(err) = SqlValue::from("lots").to_sql(&Type::NUMERIC, &mut buf) else {
            panic!("expected a bind error");
        };
        assert_eq!(err.to_string(), "'lots' is not a valid numeric");
    }

    #[test]
    fn out_of_range_int_is_a_bind_error() {
        let mut buf = BytesMut::new();
        let Err(err) = SqlValue::Int(i64::MAX).to_sql(&Type::INT4, &mut buf) else {
            panic!("expected a bind error");
        };
        assert!(err.downcast_ref::<BindError>().is_some());
    }

    #[test]
    fn serializes_as_plain_json() {
        let values = vec![
            SqlValue::from("Yvonne"),
            SqlValue::Null,
            SqlValue::from(3_i64),
        ];
        assert_eq!(serde_json::to_value(&values).unwrap(), json!(["Yvonne", null, 3]));
    }
}

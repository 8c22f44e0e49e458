//! Convert serde_json::Value to a text bind parameter. Every placeholder is cast in SQL
//! (`$n::double precision`), so one text encoding covers all column types.

use crate::entity::SqlType;
use serde_json::Value;
use sqlx::encode::{Encode, IsNull};
use sqlx::postgres::{PgTypeInfo, Postgres};
use sqlx::Database;

#[derive(Clone, Debug, PartialEq)]
pub enum PgBindValue {
    Null,
    Text(String),
}

impl PgBindValue {
    /// Text form of `v` for a column of type `ty`. Empty strings bind as NULL for non-text
    /// columns; JSONB columns always receive serialized JSON.
    pub fn for_column(ty: SqlType, v: &Value) -> Self {
        match (ty, v) {
            (_, Value::Null) => PgBindValue::Null,
            (SqlType::Jsonb, v) => PgBindValue::Text(v.to_string()),
            (SqlType::Text, Value::String(s)) => PgBindValue::Text(s.clone()),
            (_, Value::String(s)) if s.trim().is_empty() => PgBindValue::Null,
            (_, Value::String(s)) => PgBindValue::Text(s.clone()),
            (_, Value::Bool(b)) => PgBindValue::Text(b.to_string()),
            (_, Value::Number(n)) => PgBindValue::Text(n.to_string()),
            (_, other) => PgBindValue::Text(other.to_string()),
        }
    }

    pub fn text(s: impl Into<String>) -> Self {
        PgBindValue::Text(s.into())
    }
}

impl<'q> Encode<'q, Postgres> for PgBindValue {
    fn encode_by_ref(
        &self,
        buf: &mut <Postgres as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, Box<dyn std::error::Error + Send + Sync>> {
        match self {
            PgBindValue::Null => Ok(IsNull::Yes),
            PgBindValue::Text(s) => <&str as Encode<Postgres>>::encode_by_ref(&s.as_str(), buf),
        }
    }
}

impl sqlx::Type<Postgres> for PgBindValue {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_name("TEXT")
    }
}

//! Dynamic MySQL row decoding.
//!
//! The gateway does not know its templates' result shapes ahead of time,
//! so rows are decoded by column type family into ordered JSON objects
//! keyed by column name. NULL is checked first; binary columns fall back
//! to base64 text.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::{json, Map, Value};
use sqlx::mysql::MySqlRow;
use sqlx::{Column, Row, TypeInfo, ValueRef};

/// Decode one row into a JSON object, preserving column order.
pub fn row_to_json(row: &MySqlRow) -> Result<Map<String, Value>, sqlx::Error> {
    let mut object = Map::with_capacity(row.columns().len());
    for (idx, column) in row.columns().iter().enumerate() {
        let value = column_value(row, idx, column.type_info().name())?;
        object.insert(column.name().to_string(), value);
    }
    Ok(object)
}

fn column_value(row: &MySqlRow, idx: usize, type_name: &str) -> Result<Value, sqlx::Error> {
    if row.try_get_raw(idx)?.is_null() {
        return Ok(Value::Null);
    }

    let value = match type_name {
        "BOOLEAN" => Value::Bool(row.try_get::<bool, _>(idx)?),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
            json!(row.try_get::<i64, _>(idx)?)
        }
        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "BIGINT UNSIGNED" => json!(row.try_get::<u64, _>(idx)?),
        "YEAR" => json!(row.try_get::<u16, _>(idx)?),
        "FLOAT" => json!(row.try_get::<f32, _>(idx)? as f64),
        "DOUBLE" => json!(row.try_get::<f64, _>(idx)?),
        "CHAR" | "VARCHAR" | "TEXT" | "TINYTEXT" | "MEDIUMTEXT" | "LONGTEXT" | "ENUM" => {
            Value::String(row.try_get::<String, _>(idx)?)
        }
        "DATE" => Value::String(row.try_get::<NaiveDate, _>(idx)?.to_string()),
        "TIME" => Value::String(row.try_get::<NaiveTime, _>(idx)?.to_string()),
        "DATETIME" => Value::String(
            row.try_get::<NaiveDateTime, _>(idx)?
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
        ),
        "TIMESTAMP" => Value::String(row.try_get::<DateTime<Utc>, _>(idx)?.to_rfc3339()),
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" => {
            Value::String(BASE64.encode(row.try_get::<Vec<u8>, _>(idx)?))
        }
        // DECIMAL, SET, JSON and anything newer: try text, then bytes
        _ => match row.try_get::<String, _>(idx) {
            Ok(text) => Value::String(text),
            Err(_) => Value::String(BASE64.encode(row.try_get::<Vec<u8>, _>(idx)?)),
        },
    };

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::pool::create_pool;
    use std::time::Duration;

    #[test]
    fn decoded_objects_keep_insertion_order() {
        // Column order must survive serialization, not collapse to
        // alphabetical; this is what row_to_json's ordered Map relies on
        let mut object = Map::new();
        object.insert("name".to_string(), json!("madox"));
        object.insert("id".to_string(), json!(1));

        assert_eq!(
            serde_json::to_string(&Value::Object(object)).unwrap(),
            r#"{"name":"madox","id":1}"#
        );
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn decodes_mixed_column_types() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = create_pool(&url, 2, Duration::from_secs(5))
            .await
            .expect("pool creation failed");

        let row = sqlx::query(
            "SELECT CAST(1 AS SIGNED) AS n, 'hello' AS s, CAST(NULL AS CHAR) AS missing, 1.5 AS f",
        )
        .fetch_one(&pool)
        .await
        .expect("query failed");

        let object = row_to_json(&row).expect("decode failed");
        assert_eq!(object["n"], json!(1));
        assert_eq!(object["s"], json!("hello"));
        assert_eq!(object["missing"], Value::Null);
        assert_eq!(object["f"], json!(1.5));
    }
}

use crate::{DatabaseResult, DbError, Schema};

use super::Database;
use serde_json::{Value, json};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Column, Row, TypeInfo};
use std::fmt::Display;

#[derive(Debug, Clone)]
pub struct PostgresDatabase {
    pool: PgPool,
}

impl PostgresDatabase {
    pub async fn connect(url: impl Display, max_connections: u32) -> Result<Self, DbError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(&url.to_string())
            .await
            .map_err(|e| DbError::Connection(e.to_string()))?;

        tracing::info!(max_connections, "connected to postgres");
        Ok(Self { pool })
    }
}

fn column_value(row: &PgRow, i: usize, type_name: &str) -> Value {
    match type_name {
        "UUID" => row
            .try_get::<uuid::Uuid, _>(i)
            .map(|v| json!(v.to_string()))
            .unwrap_or(Value::Null),

        "TEXT" | "VARCHAR" | "CHAR" | "BPCHAR" | "NAME" => row
            .try_get::<String, _>(i)
            .map(|v| json!(v))
            .unwrap_or(Value::Null),

        "TEXT[]" | "VARCHAR[]" => row
            .try_get::<Vec<String>, _>(i)
            .map(|v| json!(v))
            .unwrap_or(Value::Null),

        "DATE" => row
            .try_get::<chrono::NaiveDate, _>(i)
            .map(|v| json!(v.format("%Y-%m-%d").to_string()))
            .unwrap_or(Value::Null),

        "TIMESTAMP" => row
            .try_get::<chrono::NaiveDateTime, _>(i)
            .map(|dt| json!(dt.format("%Y-%m-%dT%H:%M:%S").to_string()))
            .unwrap_or(Value::Null),

        "TIMESTAMPTZ" => row
            .try_get::<chrono::DateTime<chrono::Utc>, _>(i)
            .map(|dt| json!(dt.to_rfc3339()))
            .unwrap_or(Value::Null),

        "INT2" => row
            .try_get::<i16, _>(i)
            .map(|v| json!(v))
            .unwrap_or(Value::Null),

        "INT4" => row
            .try_get::<i32, _>(i)
            .map(|v| json!(v))
            .unwrap_or(Value::Null),

        "INT8" => row
            .try_get::<i64, _>(i)
            .map(|v| json!(v))
            .unwrap_or(Value::Null),

        "FLOAT4" => row
            .try_get::<f32, _>(i)
            .map(|v| json!(v))
            .unwrap_or(Value::Null),

        "FLOAT8" => row
            .try_get::<f64, _>(i)
            .map(|v| json!(v))
            .unwrap_or(Value::Null),

        // Numbers rather than the decimal's string form, so `4.99` renders unquoted.
        "NUMERIC" => row
            .try_get::<rust_decimal::Decimal, _>(i)
            .ok()
            .and_then(|v| v.to_string().parse::<serde_json::Number>().ok())
            .map_or(Value::Null, Value::Number),

        "JSON" | "JSONB" => row.try_get::<Value, _>(i).unwrap_or(Value::Null),

        "BOOL" => row
            .try_get::<bool, _>(i)
            .map(|v| json!(v))
            .unwrap_or(Value::Null),

        // Enums and domains arrive as their text label.
        _ => row
            .try_get_raw(i)
            .ok()
            .and_then(|raw| raw.as_str().ok().map(|s| json!(s)))
            .unwrap_or(Value::Null),
    }
}

#[async_trait::async_trait]
impl Database for PostgresDatabase {
    async fn get_results(&self, query: &str) -> Result<DatabaseResult, DbError> {
        let rows = sqlx::query(query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DbError::Query(e.to_string()))?;

        let mut results = DatabaseResult::default();

        let Some(first) = rows.first() else {
            return Ok(results);
        };

        for col in first.columns() {
            results
                .headers
                .push((col.name().to_string(), col.type_info().name().to_string()));
        }

        for row in &rows {
            let row_data = row
                .columns()
                .iter()
                .enumerate()
                .map(|(i, col)| column_value(row, i, col.type_info().name()))
                .collect();

            results.rows.push(row_data);
        }

        tracing::debug!(rows = results.rows.len(), "query returned");
        Ok(results)
    }

    async fn get_schema(&self) -> Result<Schema, DbError> {
        let columns = sqlx::query(
            r"SELECT
                c.table_name::text,
                c.column_name::text,
                c.udt_name::text AS pg_type
            FROM information_schema.columns c
            WHERE c.table_schema = 'public'
            ORDER BY c.table_name, c.ordinal_position;",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DbError::Query(format!("Could not get columns: {e}")))?;

        let mut schema = Schema::default();

        for row in columns {
            let table_name: String = row.get(0);
            let column_name: String = row.get(1);
            let column_type: String = row.get(2);

            schema
                .tables
                .entry(table_name)
                .or_default()
                .push((column_name, column_type));
        }

        let fk_rows = sqlx::query(
            r"
                SELECT
                    tc.table_name::text AS referencing_table,
                    kcu.column_name::text AS referencing_column,
                    ccu.table_name::text AS referenced_table,
                    ccu.column_name::text AS referenced_column
                FROM
                    information_schema.table_constraints AS tc
                JOIN information_schema.key_column_usage AS kcu
                    ON tc.constraint_name = kcu.constraint_name
                    AND tc.table_schema = kcu.table_schema
                JOIN information_schema.constraint_column_usage AS ccu
                    ON ccu.constraint_name = tc.constraint_name
                    AND ccu.table_schema = tc.table_schema
                WHERE tc.constraint_type = 'FOREIGN KEY'
                  AND tc.table_schema = 'public';
                ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DbError::Query(format!("Could not get foreign key info: {e}")))?;

        for row in fk_rows {
            let referencing_table: String = row.get("referencing_table");
            let referencing_column: String = row.get("referencing_column");
            let referenced_table: String = row.get("referenced_table");
            let referenced_column: String = row.get("referenced_column");

            schema
                .references
                .entry(format!("{referenced_table}.{referenced_column}"))
                .or_default()
                .push(format!("{referencing_table}.{referencing_column}"));
        }

        Ok(schema)
    }

    fn dialect(&self) -> &str {
        "postgresql"
    }
}

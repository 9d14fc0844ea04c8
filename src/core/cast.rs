use crate::core::schema::{infer_schema, natural_schema};
use crate::domain::model::{DeclaredType, Record};
use crate::domain::table::{Cell, ColumnSchema, DataType, FinalTable};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// 單一儲存格轉型失敗；只在本模組內部使用，最後一律降級為 null
#[derive(Error, Debug, Clone, PartialEq)]
#[error("cannot cast {found} to {target}")]
pub struct CastError {
    found: String,
    target: String,
}

impl CastError {
    fn new(value: &Value, target: &DataType) -> Self {
        let mut found = value.to_string();
        if found.len() > 64 {
            let mut end = 64;
            while !found.is_char_boundary(end) {
                end -= 1;
            }
            found.truncate(end);
            found.push('…');
        }
        Self {
            found,
            target: target.to_string(),
        }
    }
}

/// 轉型計畫：有推導出的結構就逐欄轉型，否則以資料本身的型別原樣輸出
#[derive(Debug, Clone, PartialEq)]
pub enum CastPlan {
    Typed(ColumnSchema),
    Untyped,
}

impl CastPlan {
    /// 推導失敗時記錄原因並退回 Untyped，不中止執行
    pub fn resolve(sample: &Record, type_map: &HashMap<String, DeclaredType>) -> Self {
        match infer_schema(sample, type_map) {
            Ok(schema) => {
                tracing::debug!("🧩 Inferred schema with {} root columns", schema.len());
                CastPlan::Typed(schema)
            }
            Err(e) => {
                tracing::warn!("⚠️ {}; returning records uncast", e);
                CastPlan::Untyped
            }
        }
    }
}

/// 將每筆記錄投影到結構上：缺少的欄位為 null，結構外的欄位被捨棄
pub fn cast(records: &[Record], plan: &CastPlan) -> FinalTable {
    let schema = match plan {
        CastPlan::Typed(schema) => schema.clone(),
        CastPlan::Untyped => natural_schema(records.iter().map(|r| &r.data)),
    };

    let rows = records
        .iter()
        .map(|record| {
            schema
                .fields
                .iter()
                .map(|field| cast_value(record.get(&field.name), &field.data_type))
                .collect()
        })
        .collect();

    FinalTable::new(schema, rows)
}

pub fn cast_value(value: Option<&Value>, data_type: &DataType) -> Cell {
    match value {
        None | Some(Value::Null) => Cell::Null,
        Some(value) => cast_non_null(value, data_type).unwrap_or_else(|e| {
            tracing::trace!("{}; storing null", e);
            Cell::Null
        }),
    }
}

fn cast_non_null(value: &Value, data_type: &DataType) -> Result<Cell, CastError> {
    let fail = || CastError::new(value, data_type);

    match data_type {
        DataType::String => Ok(Cell::String(match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })),
        DataType::Double => match value {
            Value::Number(n) => n.as_f64().map(Cell::Double).ok_or_else(fail),
            Value::String(s) => s.trim().parse::<f64>().map(Cell::Double).map_err(|_| fail()),
            Value::Bool(b) => Ok(Cell::Double(if *b { 1.0 } else { 0.0 })),
            _ => Err(fail()),
        },
        DataType::Long => match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().and_then(truncate_to_i64))
                .map(Cell::Long)
                .ok_or_else(fail),
            Value::String(s) => {
                let trimmed = s.trim();
                trimmed
                    .parse::<i64>()
                    .ok()
                    .or_else(|| trimmed.parse::<f64>().ok().and_then(truncate_to_i64))
                    .map(Cell::Long)
                    .ok_or_else(fail)
            }
            Value::Bool(b) => Ok(Cell::Long(i64::from(*b))),
            _ => Err(fail()),
        },
        DataType::Boolean => match value {
            Value::Bool(b) => Ok(Cell::Boolean(*b)),
            Value::String(s) => parse_bool(s).map(Cell::Boolean).ok_or_else(fail),
            Value::Number(n) => n.as_f64().map(|f| Cell::Boolean(f != 0.0)).ok_or_else(fail),
            _ => Err(fail()),
        },
        DataType::Date => match value {
            Value::String(s) => parse_date(s).map(Cell::Date).ok_or_else(fail),
            _ => Err(fail()),
        },
        DataType::Timestamp => match value {
            Value::String(s) => parse_timestamp(s).map(Cell::Timestamp).ok_or_else(fail),
            Value::Number(n) => n
                .as_i64()
                .and_then(|secs| DateTime::from_timestamp(secs, 0))
                .map(Cell::Timestamp)
                .ok_or_else(fail),
            _ => Err(fail()),
        },
        DataType::Json => Ok(Cell::Json(value.clone())),
        DataType::Array(element) => match value {
            Value::Array(items) => Ok(Cell::Array(
                items.iter().map(|item| cast_value(Some(item), element)).collect(),
            )),
            _ => Err(fail()),
        },
        DataType::Struct(nested) => match value {
            Value::Object(object) => Ok(Cell::Struct(
                nested
                    .fields
                    .iter()
                    .map(|field| cast_value(object.get(&field.name), &field.data_type))
                    .collect(),
            )),
            _ => Err(fail()),
        },
    }
}

fn truncate_to_i64(value: f64) -> Option<i64> {
    if value.is_finite() && value >= i64::MIN as f64 && value < i64::MAX as f64 {
        Some(value.trunc() as i64)
    } else {
        None
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "t" | "true" | "y" | "yes" | "1" => Some(true),
        "f" | "false" | "n" | "no" | "0" => Some(false),
        _ => None,
    }
}

/// `YYYY-MM-DD`，後面可接 `T` 或空白開頭的時間部分
fn parse_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    let head = trimmed.get(..10)?;
    match trimmed[10..].chars().next() {
        None | Some('T') | Some(' ') => NaiveDate::parse_from_str(head, "%Y-%m-%d").ok(),
        Some(_) => None,
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

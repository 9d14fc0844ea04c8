use crate::domain::model::{DeclaredType, Record, PROPERTIES_FIELD};
use crate::domain::table::{ColumnSchema, DataType, Field};
use crate::utils::error::{EtlError, Result};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// HubSpot 宣告型別 → 欄式型別；未知型別一律視為字串
pub fn map_declared_type(declared: &DeclaredType) -> DataType {
    match declared {
        DeclaredType::Number => DataType::Double,
        DeclaredType::Date => DataType::Date,
        DeclaredType::Datetime => DataType::Timestamp,
        DeclaredType::Boolean => DataType::Boolean,
        DeclaredType::String
        | DeclaredType::Enumeration
        | DeclaredType::Json
        | DeclaredType::PhoneNumber
        | DeclaredType::Other(_) => DataType::String,
    }
}

/// 根層欄位依樣本值本身的型別決定；巢狀物件與陣列保留為 JSON
pub fn root_type_of(value: &Value) -> DataType {
    match value {
        Value::Bool(_) => DataType::Boolean,
        Value::Number(n) if n.is_i64() => DataType::Long,
        Value::Number(_) => DataType::Double,
        Value::Object(_) | Value::Array(_) => DataType::Json,
        Value::String(_) | Value::Null => DataType::String,
    }
}

/// 由一筆樣本記錄與屬性目錄推導欄位結構。
///
/// 根層欄位維持樣本的鍵順序；`properties` 成為一個巢狀結構，其欄位同樣依樣本順序，
/// 型別查目錄，查不到時使用字串。
pub fn infer_schema(
    sample: &Record,
    type_map: &HashMap<String, DeclaredType>,
) -> Result<ColumnSchema> {
    let bag = sample.properties().ok_or_else(|| EtlError::SchemaError {
        message: format!(
            "sample record has no '{}' object (root keys: {:?})",
            PROPERTIES_FIELD,
            sample.data.keys().collect::<Vec<_>>()
        ),
    })?;

    let nested = ColumnSchema::new(
        bag.keys()
            .map(|name| {
                let data_type = type_map
                    .get(name)
                    .map(map_declared_type)
                    .unwrap_or(DataType::String);
                Field::new(name.clone(), data_type)
            })
            .collect(),
    );

    let fields = sample
        .data
        .iter()
        .map(|(name, value)| {
            if name == PROPERTIES_FIELD {
                Field::new(name.clone(), DataType::Struct(nested.clone()))
            } else {
                Field::new(name.clone(), root_type_of(value))
            }
        })
        .collect();

    Ok(ColumnSchema::new(fields))
}

/// 不參考目錄、直接從資料推導的結構：鍵的聯集（依首次出現順序），
/// 巢狀物件成為 struct，型別衝突時放寬（long+double → double）或退回 JSON。
pub fn natural_schema<'a, I>(objects: I) -> ColumnSchema
where
    I: IntoIterator<Item = &'a Map<String, Value>>,
{
    let mut builder = SchemaBuilder::default();
    for object in objects {
        builder.observe(object);
    }
    builder.finish()
}

#[derive(Default)]
struct SchemaBuilder {
    fields: Vec<(String, Option<DataType>)>,
    index: HashMap<String, usize>,
}

impl SchemaBuilder {
    fn observe(&mut self, object: &Map<String, Value>) {
        for (name, value) in object {
            let incoming = natural_type(value);
            match self.index.get(name) {
                Some(&i) => merge_slot(&mut self.fields[i].1, incoming),
                None => {
                    self.index.insert(name.clone(), self.fields.len());
                    self.fields.push((name.clone(), incoming));
                }
            }
        }
    }

    fn finish(self) -> ColumnSchema {
        ColumnSchema::new(
            self.fields
                .into_iter()
                .map(|(name, data_type)| Field::new(name, data_type.unwrap_or(DataType::String)))
                .collect(),
        )
    }
}

fn natural_type(value: &Value) -> Option<DataType> {
    match value {
        Value::Null => None,
        Value::Bool(_) => Some(DataType::Boolean),
        Value::Number(n) if n.is_i64() => Some(DataType::Long),
        Value::Number(_) => Some(DataType::Double),
        Value::String(_) => Some(DataType::String),
        Value::Array(items) => {
            let mut element = None;
            for item in items {
                merge_slot(&mut element, natural_type(item));
            }
            Some(DataType::Array(Box::new(element.unwrap_or(DataType::String))))
        }
        Value::Object(object) => Some(DataType::Struct(natural_schema(std::iter::once(object)))),
    }
}

fn merge_slot(slot: &mut Option<DataType>, incoming: Option<DataType>) {
    if let Some(incoming) = incoming {
        *slot = Some(match slot.take() {
            Some(existing) => merge_types(existing, incoming),
            None => incoming,
        });
    }
}

fn merge_types(a: DataType, b: DataType) -> DataType {
    match (a, b) {
        (a, b) if a == b => a,
        (DataType::Long, DataType::Double) | (DataType::Double, DataType::Long) => DataType::Double,
        (DataType::Array(a), DataType::Array(b)) => DataType::Array(Box::new(merge_types(*a, *b))),
        (DataType::Struct(a), DataType::Struct(b)) => DataType::Struct(merge_schemas(a, b)),
        _ => DataType::Json,
    }
}

fn merge_schemas(a: ColumnSchema, b: ColumnSchema) -> ColumnSchema {
    let mut builder = SchemaBuilder::default();
    for field in a.fields.into_iter().chain(b.fields) {
        match builder.index.get(&field.name) {
            Some(&i) => merge_slot(&mut builder.fields[i].1, Some(field.data_type)),
            None => {
                builder.index.insert(field.name.clone(), builder.fields.len());
                builder.fields.push((field.name, Some(field.data_type)));
            }
        }
    }
    builder.finish()
}

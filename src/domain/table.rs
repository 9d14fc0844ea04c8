//! 欄式輸出模型：有序的欄位結構（可巢狀）與對應的型別化儲存格。

use crate::utils::error::{EtlError, Result};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde_json::{json, Map, Value};
use std::fmt;

/// 目標欄式型別系統
#[derive(Debug, Clone, PartialEq)]
pub enum DataType {
    String,
    Double,
    Long,
    Boolean,
    Date,
    Timestamp,
    /// 無法以單一型別表示時保留原始 JSON
    Json,
    Array(Box<DataType>),
    Struct(ColumnSchema),
}

impl DataType {
    pub fn to_json(&self) -> Value {
        match self {
            DataType::Array(element) => json!({"type": "array", "elementType": element.to_json()}),
            DataType::Struct(schema) => json!({"type": "struct", "fields": schema.to_json()}),
            scalar => Value::String(scalar.to_string()),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::String => write!(f, "string"),
            DataType::Double => write!(f, "double"),
            DataType::Long => write!(f, "long"),
            DataType::Boolean => write!(f, "boolean"),
            DataType::Date => write!(f, "date"),
            DataType::Timestamp => write!(f, "timestamp"),
            DataType::Json => write!(f, "json"),
            DataType::Array(element) => write!(f, "array<{}>", element),
            DataType::Struct(schema) => {
                write!(f, "struct<")?;
                for (i, field) in schema.fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}:{}", field.name, field.data_type)?;
                }
                write!(f, ">")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub data_type: DataType,
}

impl Field {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }

    pub fn is_nested(&self) -> bool {
        matches!(self.data_type, DataType::Struct(_))
    }
}

/// 有序欄位清單；順序即輸出欄位順序
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnSchema {
    pub fields: Vec<Field>,
}

impl ColumnSchema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn to_json(&self) -> Value {
        Value::Array(
            self.fields
                .iter()
                .map(|f| json!({"name": f.name, "type": f.data_type.to_json()}))
                .collect(),
        )
    }
}

/// 單一儲存格；Struct 內的值與該欄位 ColumnSchema 的順序一一對應
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    String(String),
    Double(f64),
    Long(i64),
    Boolean(bool),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
    Json(Value),
    Array(Vec<Cell>),
    Struct(Vec<Cell>),
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    pub fn to_json(&self, data_type: &DataType) -> Value {
        match self {
            Cell::Null => Value::Null,
            Cell::String(s) => Value::String(s.clone()),
            Cell::Double(d) => serde_json::Number::from_f64(*d)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Cell::Long(n) => Value::from(*n),
            Cell::Boolean(b) => Value::Bool(*b),
            Cell::Date(d) => Value::String(d.format("%Y-%m-%d").to_string()),
            Cell::Timestamp(ts) => Value::String(ts.to_rfc3339_opts(SecondsFormat::Millis, true)),
            Cell::Json(value) => value.clone(),
            Cell::Array(items) => {
                let element = match data_type {
                    DataType::Array(element) => element.as_ref(),
                    _ => &DataType::Json,
                };
                Value::Array(items.iter().map(|c| c.to_json(element)).collect())
            }
            Cell::Struct(values) => {
                let mut object = Map::new();
                match data_type {
                    DataType::Struct(schema) => {
                        for (field, value) in schema.fields.iter().zip(values) {
                            object.insert(field.name.clone(), value.to_json(&field.data_type));
                        }
                    }
                    _ => {
                        for (i, value) in values.iter().enumerate() {
                            object.insert(format!("_{}", i), value.to_json(&DataType::Json));
                        }
                    }
                }
                Value::Object(object)
            }
        }
    }

    /// CSV 用的文字表示；巢狀值以精簡 JSON 輸出
    pub fn render(&self, data_type: &DataType) -> String {
        match self {
            Cell::Null => String::new(),
            Cell::String(s) => s.clone(),
            Cell::Double(d) => d.to_string(),
            Cell::Long(n) => n.to_string(),
            Cell::Boolean(b) => b.to_string(),
            Cell::Date(_) | Cell::Timestamp(_) => match self.to_json(data_type) {
                Value::String(s) => s,
                other => other.to_string(),
            },
            Cell::Json(Value::String(s)) => s.clone(),
            Cell::Json(_) | Cell::Array(_) | Cell::Struct(_) => {
                self.to_json(data_type).to_string()
            }
        }
    }
}

/// 交付給下游的最終表格；每列的儲存格與 schema.fields 對齊
#[derive(Debug, Clone, PartialEq)]
pub struct FinalTable {
    pub schema: ColumnSchema,
    pub rows: Vec<Vec<Cell>>,
}

impl FinalTable {
    pub fn new(schema: ColumnSchema, rows: Vec<Vec<Cell>>) -> Self {
        Self { schema, rows }
    }

    /// 「空但格式正確」的結果：只有 id 欄、零列
    pub fn empty_sentinel() -> Self {
        Self {
            schema: ColumnSchema::new(vec![Field::new("id", DataType::String)]),
            rows: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.schema.field_names()
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&Cell> {
        let index = self.schema.position(column)?;
        self.rows.get(row)?.get(index)
    }

    pub fn nested_cell(&self, row: usize, column: &str, field: &str) -> Option<&Cell> {
        let DataType::Struct(nested) = &self.schema.field(column)?.data_type else {
            return None;
        };
        let index = nested.position(field)?;
        match self.cell(row, column)? {
            Cell::Struct(values) => values.get(index),
            _ => None,
        }
    }

    /// 新增欄位；同名欄位已存在時就地取代
    pub fn put_column(&mut self, field: Field, cells: Vec<Cell>) {
        match self.schema.position(&field.name) {
            Some(index) => {
                self.schema.fields[index] = field;
                for (row, cell) in self.rows.iter_mut().zip(cells) {
                    row[index] = cell;
                }
            }
            None => {
                self.schema.fields.push(field);
                for (row, cell) in self.rows.iter_mut().zip(cells) {
                    row.push(cell);
                }
            }
        }
    }

    pub fn remove_column(&mut self, name: &str) -> Option<(Field, Vec<Cell>)> {
        let index = self.schema.position(name)?;
        let field = self.schema.fields.remove(index);
        let cells = self.rows.iter_mut().map(|row| row.remove(index)).collect();
        Some((field, cells))
    }

    pub fn to_json_rows(&self) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| {
                let mut object = Map::new();
                for (field, cell) in self.schema.fields.iter().zip(row) {
                    object.insert(field.name.clone(), cell.to_json(&field.data_type));
                }
                Value::Object(object)
            })
            .collect()
    }

    pub fn to_csv(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(self.schema.field_names())?;

        for row in &self.rows {
            writer.write_record(
                self.schema
                    .fields
                    .iter()
                    .zip(row)
                    .map(|(field, cell)| cell.render(&field.data_type)),
            )?;
        }

        let bytes = writer.into_inner().map_err(|e| EtlError::ProcessingError {
            message: format!("Failed to flush CSV output: {}", e),
        })?;
        String::from_utf8(bytes).map_err(|e| EtlError::ProcessingError {
            message: format!("CSV output is not valid UTF-8: {}", e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> FinalTable {
        let props = ColumnSchema::new(vec![
            Field::new("email", DataType::String),
            Field::new("amount", DataType::Double),
        ]);
        FinalTable::new(
            ColumnSchema::new(vec![
                Field::new("id", DataType::String),
                Field::new("properties", DataType::Struct(props)),
            ]),
            vec![vec![
                Cell::String("1".to_string()),
                Cell::Struct(vec![Cell::String("a@b.co".to_string()), Cell::Double(1.5)]),
            ]],
        )
    }

    #[test]
    fn test_empty_sentinel_shape() {
        let table = FinalTable::empty_sentinel();
        assert!(table.is_empty());
        assert_eq!(table.column_names(), vec!["id"]);
        assert_eq!(table.schema.fields[0].data_type, DataType::String);
    }

    #[test]
    fn test_nested_cell_lookup() {
        let table = sample_table();
        assert_eq!(
            table.nested_cell(0, "properties", "amount"),
            Some(&Cell::Double(1.5))
        );
        assert_eq!(table.nested_cell(0, "properties", "missing"), None);
        assert!(table.schema.field("properties").unwrap().is_nested());
    }

    #[test]
    fn test_json_rows_keep_column_order() {
        let rows = sample_table().to_json_rows();
        assert_eq!(
            serde_json::to_string(&rows[0]).unwrap(),
            r#"{"id":"1","properties":{"email":"a@b.co","amount":1.5}}"#
        );
    }

    #[test]
    fn test_csv_encodes_nested_cells_as_json() {
        let csv = sample_table().to_csv().unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "id,properties");
        assert_eq!(lines[1], r#"1,"{""email"":""a@b.co"",""amount"":1.5}""#);
    }

    #[test]
    fn test_put_column_replaces_existing_name() {
        let mut table = sample_table();
        table.put_column(
            Field::new("id", DataType::Long),
            vec![Cell::Long(7)],
        );
        assert_eq!(table.schema.len(), 2);
        assert_eq!(table.cell(0, "id"), Some(&Cell::Long(7)));
    }

    #[test]
    fn test_display_of_nested_type() {
        let data_type = DataType::Array(Box::new(DataType::Struct(ColumnSchema::new(vec![
            Field::new("pipeline_stage_id", DataType::String),
            Field::new("value", DataType::Timestamp),
        ]))));
        assert_eq!(
            data_type.to_string(),
            "array<struct<pipeline_stage_id:string,value:timestamp>>"
        );
    }
}

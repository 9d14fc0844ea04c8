use crate::utils::error::CatalogError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// 動態屬性袋在每筆記錄中的欄位名稱
pub const PROPERTIES_FIELD: &str = "properties";

/// 一筆 HubSpot 物件；根層欄位順序即為 API 回傳順序
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    pub data: Map<String, Value>,
}

impl Record {
    pub fn new(data: Map<String, Value>) -> Self {
        Self { data }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// 取得屬性袋；不存在或不是物件時回傳 None
    pub fn properties(&self) -> Option<&Map<String, Value>> {
        self.data.get(PROPERTIES_FIELD).and_then(Value::as_object)
    }
}

impl From<Map<String, Value>> for Record {
    fn from(data: Map<String, Value>) -> Self {
        Self { data }
    }
}

/// 屬性目錄中宣告的型別
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclaredType {
    String,
    Number,
    Date,
    Datetime,
    Boolean,
    Enumeration,
    Json,
    PhoneNumber,
    Other(String),
}

impl From<&str> for DeclaredType {
    fn from(value: &str) -> Self {
        match value {
            "string" => DeclaredType::String,
            "number" => DeclaredType::Number,
            "date" => DeclaredType::Date,
            "datetime" => DeclaredType::Datetime,
            "boolean" => DeclaredType::Boolean,
            "enumeration" => DeclaredType::Enumeration,
            "json" => DeclaredType::Json,
            "phone_number" => DeclaredType::PhoneNumber,
            other => DeclaredType::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDescriptor {
    pub name: String,
    pub declared_type: DeclaredType,
}

/// 物件類型的完整屬性目錄：原始結果（get_properties 模式輸出）與名稱→型別對照
#[derive(Debug, Clone, Default)]
pub struct PropertyCatalog {
    pub results: Vec<Record>,
    pub descriptors: Vec<PropertyDescriptor>,
    type_map: HashMap<String, DeclaredType>,
}

impl PropertyCatalog {
    pub fn new(results: Vec<Record>, descriptors: Vec<PropertyDescriptor>) -> Self {
        let type_map = descriptors
            .iter()
            .map(|d| (d.name.clone(), d.declared_type.clone()))
            .collect();
        Self {
            results,
            descriptors,
            type_map,
        }
    }

    pub fn type_map(&self) -> &HashMap<String, DeclaredType> {
        &self.type_map
    }

    pub fn declared_type(&self, name: &str) -> Option<&DeclaredType> {
        self.type_map.get(name)
    }

    pub fn property_names(&self) -> Vec<String> {
        self.descriptors.iter().map(|d| d.name.clone()).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StageFieldMember {
    pub suffix_id: String,
    pub field_name: String,
}

/// 同一 base name、以數字結尾的重複欄位（例如 hs_date_entered_<stage id>）
#[derive(Debug, Clone, PartialEq)]
pub struct StageFieldGroup {
    pub base_name: String,
    pub members: Vec<StageFieldMember>,
}

impl StageFieldGroup {
    pub fn column_name(&self) -> String {
        format!("array_{}", self.base_name)
    }
}

/// 擷取階段的結果，依擷取模式各自帶不同資料
#[derive(Debug, Clone)]
pub enum Extraction {
    Properties(std::result::Result<PropertyCatalog, CatalogError>),
    Pipelines(Vec<Record>),
    Owners(Vec<Record>),
    Objects {
        records: Vec<Record>,
        catalog: std::result::Result<PropertyCatalog, CatalogError>,
    },
    /// 預設路徑的失敗已被攔截，只保留原因
    Contained { reason: String },
}

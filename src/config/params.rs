use crate::core::dispatcher::RetrievalMode;
use crate::core::flatten::FlattenMode;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{validate_range, validate_required_field};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_LIMIT: u64 = 50;
/// HubSpot 單頁上限；超出時只警告，照原值送出
pub const MAX_LIMIT: u64 = 100;

/// 清單型參數可以是 JSON 陣列，也可以是單一字串（例如 "email,firstname"）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamList {
    One(String),
    Many(Vec<String>),
}

impl ParamList {
    pub fn values(&self) -> Vec<String> {
        match self {
            ParamList::One(value) => vec![value.clone()],
            ParamList::Many(values) => values.clone(),
        }
    }
}

/// 來源擷取的自訂參數（不透明的 key/value），欄位名稱沿用 HubSpot 連接器慣例
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomParams {
    pub hubspot_object: Option<String>,
    pub limit: Option<u64>,
    pub archived: Option<bool>,
    pub properties: Option<ParamList>,
    pub properties_with_history: Option<ParamList>,
    pub associations: Option<ParamList>,
    pub include_all_properties: Option<bool>,
    pub flatten_properties: Option<bool>,
    pub flatten_properties_stage_fields: Option<bool>,
    pub get_pipelines: Option<bool>,
    pub get_properties: Option<bool>,

    /// 未知參數保留下來，只用於記錄
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CustomParams {
    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| EtlError::ConfigValidationError {
            field: "custom_params".to_string(),
            message: format!("Custom parameters must be a JSON object: {}", e),
        })
    }
}

/// 驗證過、不可變的單次執行配置
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub object_kind: String,
    pub limit: u64,
    pub archived: Option<bool>,
    pub properties: Option<Vec<String>>,
    pub properties_with_history: Option<Vec<String>>,
    pub associations: Option<Vec<String>>,
    pub include_all_properties: bool,
    pub flatten_properties: bool,
    pub flatten_properties_stage_fields: bool,
    pub get_pipelines: bool,
    pub get_properties: bool,
}

impl RunConfig {
    pub fn flatten_mode(&self) -> FlattenMode {
        FlattenMode::from_flags(self.flatten_properties, self.flatten_properties_stage_fields)
    }

    pub fn retrieval_mode(&self) -> RetrievalMode {
        RetrievalMode::select(self)
    }
}

impl TryFrom<&CustomParams> for RunConfig {
    type Error = EtlError;

    fn try_from(params: &CustomParams) -> Result<Self> {
        let object_kind = validate_required_field("hubspot_object", &params.hubspot_object)?;
        if object_kind.trim().is_empty() {
            return Err(EtlError::MissingConfigError {
                field: "hubspot_object".to_string(),
            });
        }

        if !params.extra.is_empty() {
            tracing::debug!(
                "Ignoring unknown custom parameters: {:?}",
                params.extra.keys().collect::<Vec<_>>()
            );
        }

        let run = Self {
            object_kind: object_kind.trim().to_string(),
            limit: params.limit.unwrap_or(DEFAULT_LIMIT),
            archived: params.archived,
            properties: params.properties.as_ref().map(ParamList::values),
            properties_with_history: params.properties_with_history.as_ref().map(ParamList::values),
            associations: params.associations.as_ref().map(ParamList::values),
            include_all_properties: params.include_all_properties.unwrap_or(false),
            flatten_properties: params.flatten_properties.unwrap_or(false),
            flatten_properties_stage_fields: params.flatten_properties_stage_fields.unwrap_or(false),
            get_pipelines: params.get_pipelines.unwrap_or(false),
            get_properties: params.get_properties.unwrap_or(false),
        };

        // limit 只用在物件查詢
        if run.retrieval_mode() == RetrievalMode::Objects {
            if let Err(e) = validate_range("limit", run.limit, 1, MAX_LIMIT) {
                tracing::warn!("⚠️ {}; sending it to HubSpot unchanged", e);
            }
        }

        Ok(run)
    }
}

use crate::config::params::RunConfig;
use crate::core::cast::{cast, CastPlan};
use crate::core::catalog::resolve_catalog;
use crate::core::fetcher::{Endpoint, HubSpotClient, QueryParams};
use crate::core::flatten::{orchestrate, FlattenMode};
use crate::domain::model::{Extraction, PropertyCatalog, Record};
use crate::domain::table::FinalTable;
use crate::utils::error::Result;
use std::collections::HashMap;

pub const OWNERS_OBJECT: &str = "owners";

/// 擷取模式，依優先順序互斥：properties > pipelines > owners > 一般物件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalMode {
    Properties,
    Pipelines,
    Owners,
    Objects,
}

impl RetrievalMode {
    pub fn select(run: &RunConfig) -> Self {
        if run.get_properties {
            RetrievalMode::Properties
        } else if run.get_pipelines {
            RetrievalMode::Pipelines
        } else if run.object_kind == OWNERS_OBJECT {
            RetrievalMode::Owners
        } else {
            RetrievalMode::Objects
        }
    }
}

/// 物件查詢參數；未設定的值不送出
pub fn object_query(run: &RunConfig, properties: Option<&[String]>) -> QueryParams {
    let mut query = QueryParams::new();
    query.push("limit", run.limit.to_string());
    if let Some(properties) = properties {
        query.push_all("properties", properties);
    }
    if let Some(history) = &run.properties_with_history {
        query.push_all("propertiesWithHistory", history);
    }
    if let Some(associations) = &run.associations {
        query.push_all("associations", associations);
    }
    if let Some(archived) = run.archived {
        query.push("archived", archived.to_string());
    }
    query
}

/// include_all_properties 時改用目錄中的全部屬性；目錄不可用則沿用設定值
pub fn requested_properties(
    run: &RunConfig,
    catalog: Option<&PropertyCatalog>,
) -> Option<Vec<String>> {
    if run.include_all_properties {
        match catalog {
            Some(catalog) => return Some(catalog.property_names()),
            None => tracing::warn!("properties don't exist for {}", run.object_kind),
        }
    }
    run.properties.clone()
}

/// 依模式取回資料。只有 pipelines 與 owners 的遠端錯誤會往外傳，
/// 一般物件路徑的失敗在這裡攔截成 [`Extraction::Contained`]。
pub async fn extract(client: &HubSpotClient, run: &RunConfig) -> Result<Extraction> {
    let mode = run.retrieval_mode();
    tracing::info!("🧭 Retrieval mode {:?} for '{}'", mode, run.object_kind);

    match mode {
        RetrievalMode::Properties => Ok(Extraction::Properties(
            resolve_catalog(client, &run.object_kind).await,
        )),
        RetrievalMode::Pipelines => {
            let records = client
                .fetch_all(Endpoint::Pipelines(&run.object_kind), &QueryParams::new())
                .await?;
            Ok(Extraction::Pipelines(records))
        }
        RetrievalMode::Owners => {
            let records = client.fetch_all(Endpoint::Owners, &QueryParams::new()).await?;
            Ok(Extraction::Owners(records))
        }
        RetrievalMode::Objects => Ok(extract_objects(client, run).await),
    }
}

async fn extract_objects(client: &HubSpotClient, run: &RunConfig) -> Extraction {
    let catalog = resolve_catalog(client, &run.object_kind).await;
    if let Err(e) = &catalog {
        tracing::warn!("⚠️ {}; property types fall back to string", e);
    }

    let properties = requested_properties(run, catalog.as_ref().ok());
    let query = object_query(run, properties.as_deref());
    tracing::debug!("Object query parameters: {:?}", query.as_pairs());

    match client
        .fetch_all(Endpoint::Objects(&run.object_kind), &query)
        .await
    {
        Ok(records) => Extraction::Objects { records, catalog },
        Err(e) => {
            tracing::error!("❌ Exception: {}", e);
            tracing::error!("💡 {}", e.recovery_suggestion());
            Extraction::Contained {
                reason: e.to_string(),
            }
        }
    }
}

/// 將擷取結果組成最終表格；任何空結果都回傳只有 id 欄的空表
pub fn assemble(extraction: Extraction, flatten: FlattenMode) -> FinalTable {
    match extraction {
        Extraction::Properties(Ok(catalog)) => natural_table(&catalog.results, "properties"),
        Extraction::Properties(Err(e)) => {
            tracing::error!("❌ Exception: {}", e);
            FinalTable::empty_sentinel()
        }
        Extraction::Pipelines(records) => natural_table(&records, "pipelines"),
        Extraction::Owners(records) => natural_table(&records, "owners"),
        Extraction::Objects { records, catalog } => {
            if records.is_empty() {
                tracing::info!("Empty object results. Returning empty dataframe.");
                return FinalTable::empty_sentinel();
            }

            let fallback = HashMap::new();
            let type_map = catalog
                .as_ref()
                .map(PropertyCatalog::type_map)
                .unwrap_or(&fallback);
            let plan = CastPlan::resolve(&records[0], type_map);
            orchestrate(cast(&records, &plan), flatten)
        }
        Extraction::Contained { reason } => {
            tracing::warn!("Returning empty dataframe ({})", reason);
            FinalTable::empty_sentinel()
        }
    }
}

fn natural_table(records: &[Record], label: &str) -> FinalTable {
    if records.is_empty() {
        tracing::info!("Empty {} results. Returning empty dataframe.", label);
        return FinalTable::empty_sentinel();
    }
    cast(records, &CastPlan::Untyped)
}

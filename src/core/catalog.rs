use crate::core::fetcher::{Endpoint, HubSpotClient, QueryParams};
use crate::domain::model::{DeclaredType, PropertyCatalog, PropertyDescriptor, Record};
use crate::utils::error::CatalogError;

/// 取得物件類型的屬性目錄。失敗不會中止整個執行，而是交給呼叫端降級處理。
pub async fn resolve_catalog(
    client: &HubSpotClient,
    object_kind: &str,
) -> std::result::Result<PropertyCatalog, CatalogError> {
    let results = client
        .fetch_all(Endpoint::Properties(object_kind), &QueryParams::new())
        .await
        .map_err(|e| CatalogError::Unavailable {
            object: object_kind.to_string(),
            reason: e.to_string(),
        })?;

    let catalog = catalog_from_results(results);
    tracing::info!(
        "📚 Resolved {} properties for {}",
        catalog.descriptors.len(),
        object_kind
    );
    Ok(catalog)
}

/// 由屬性端點的原始結果建立目錄；沒有 name 的項目略過，沒有 type 的視為 string
pub fn catalog_from_results(results: Vec<Record>) -> PropertyCatalog {
    let descriptors = results
        .iter()
        .filter_map(|record| {
            let Some(name) = record.get("name").and_then(|v| v.as_str()) else {
                tracing::warn!("Skipping property descriptor without a name: {:?}", record.data);
                return None;
            };
            let declared_type = record
                .get("type")
                .and_then(|v| v.as_str())
                .map(DeclaredType::from)
                .unwrap_or(DeclaredType::String);
            Some(PropertyDescriptor {
                name: name.to_string(),
                declared_type,
            })
        })
        .collect();

    PropertyCatalog::new(results, descriptors)
}

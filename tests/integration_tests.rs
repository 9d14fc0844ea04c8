#![cfg(feature = "cli")]

use anyhow::Result;
use clap::Parser;
use httpmock::prelude::*;
use hubspot_etl::utils::validation::Validate;
use hubspot_etl::{CliConfig, EtlEngine, EtlError, HubSpotPipeline, LocalStorage};
use serde_json::json;
use std::io::Read;
use tempfile::TempDir;

fn cli_config(
    server: &MockServer,
    output_path: &str,
    params: serde_json::Value,
) -> Result<CliConfig> {
    let params = params.to_string();
    let base_url = server.base_url();
    let config = CliConfig::try_parse_from([
        "hubspot-etl",
        "--params",
        params.as_str(),
        "--access-token",
        "pat-e2e",
        "--base-url",
        base_url.as_str(),
        "--output-path",
        output_path,
    ])?;
    Ok(config)
}

fn read_entry(zip_path: &std::path::Path, name: &str) -> Result<String> {
    let file = std::fs::File::open(zip_path)?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut entry = archive.by_name(name)?;
    let mut content = String::new();
    entry.read_to_string(&mut content)?;
    Ok(content)
}

#[tokio::test]
async fn test_end_to_end_contacts_with_stage_fields() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let output_path = temp_dir.path().to_str().unwrap().to_string();

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET)
            .path("/crm/v3/properties/contacts")
            .header("authorization", "Bearer pat-e2e");
        then.status(200).json_body(json!({"results": [
            {"name": "email", "type": "string"},
            {"name": "num_visits", "type": "number"},
            {"name": "hs_v2_date_entered_10", "type": "datetime"},
            {"name": "hs_v2_date_entered_20", "type": "datetime"}
        ]}));
    });
    let second_page = server.mock(|when, then| {
        when.method(GET)
            .path("/crm/v3/objects/contacts")
            .query_param("after", "2");
        then.status(200).json_body(json!({"results": [
            {"id": "2", "properties": {
                "email": "b@example.com",
                "num_visits": "7",
                "hs_v2_date_entered_10": null,
                "hs_v2_date_entered_20": "2024-05-01T00:00:00Z"
            }}
        ]}));
    });
    let first_page = server.mock(|when, then| {
        when.method(GET)
            .path("/crm/v3/objects/contacts")
            .query_param("limit", "1")
            .query_param("properties", "email");
        then.status(200).json_body(json!({
            "results": [
                {"id": "1", "properties": {
                    "email": "a@example.com",
                    "num_visits": "3",
                    "hs_v2_date_entered_10": "2024-04-01T00:00:00Z",
                    "hs_v2_date_entered_20": null
                }}
            ],
            "paging": {"next": {"after": "2"}}
        }));
    });

    let config = cli_config(
        &server,
        &output_path,
        json!({
            "hubspot_object": "contacts",
            "limit": 1,
            "properties": ["email", "num_visits"],
            "flatten_properties_stage_fields": true
        }),
    )?;
    assert!(config.validate().is_ok());

    let storage = LocalStorage::new(output_path.clone());
    let pipeline = HubSpotPipeline::new(storage, config)?;
    let report = EtlEngine::new(pipeline).run().await?;

    first_page.assert();
    second_page.assert();
    assert_eq!(report.output_path, format!("{}/df_temp.zip", output_path));
    assert_eq!(report.rows, 2);
    assert_eq!(report.columns, vec!["id", "properties", "array_hs_v2_date_entered"]);

    let zip_path = temp_dir.path().join("df_temp.zip");
    let rows: serde_json::Value =
        serde_json::from_str(&read_entry(&zip_path, "df_temp.json")?)?;
    assert_eq!(rows[0]["properties"], json!({"email": "a@example.com", "num_visits": 3.0}));
    assert_eq!(
        rows[1]["array_hs_v2_date_entered"][1],
        json!({"pipeline_stage_id": "20", "value": "2024-05-01T00:00:00.000Z"})
    );

    let csv = read_entry(&zip_path, "df_temp.csv")?;
    assert_eq!(csv.lines().next(), Some("id,properties,array_hs_v2_date_entered"));
    assert_eq!(csv.lines().count(), 3);

    let schema: serde_json::Value =
        serde_json::from_str(&read_entry(&zip_path, "df_temp.schema.json")?)?;
    assert!(schema.to_string().contains("array_hs_v2_date_entered"));
    Ok(())
}

#[tokio::test]
async fn test_remote_failure_on_objects_still_hands_off_empty_table() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let output_path = temp_dir.path().to_str().unwrap().to_string();

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/crm/v3/properties/deals");
        then.status(500).body("");
    });
    server.mock(|when, then| {
        when.method(GET).path("/crm/v3/objects/deals");
        then.status(500).body("");
    });

    let config = cli_config(&server, &output_path, json!({"hubspot_object": "deals"}))?;
    let pipeline = HubSpotPipeline::new(LocalStorage::new(output_path.clone()), config)?;
    let report = EtlEngine::new(pipeline).run().await?;

    assert_eq!(report.rows, 0);
    assert_eq!(report.columns, vec!["id"]);
    let csv = read_entry(&temp_dir.path().join("df_temp.zip"), "df_temp.csv")?;
    assert_eq!(csv.trim(), "id");
    Ok(())
}

#[tokio::test]
async fn test_owners_failure_aborts_the_run() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let output_path = temp_dir.path().to_str().unwrap().to_string();

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/crm/v3/owners");
        then.status(403).json_body(json!({"message": "forbidden"}));
    });

    let config = cli_config(&server, &output_path, json!({"hubspot_object": "owners"}))?;
    let pipeline = HubSpotPipeline::new(LocalStorage::new(output_path.clone()), config)?;
    let err = EtlEngine::new(pipeline).run().await.unwrap_err();

    assert!(matches!(err, EtlError::RemoteError { status: 403, .. }));
    assert!(!temp_dir.path().join("df_temp.zip").exists());
    Ok(())
}

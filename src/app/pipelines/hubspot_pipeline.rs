use crate::config::params::RunConfig;
use crate::config::OutputFormat;
use crate::core::dispatcher::{assemble, extract};
use crate::core::fetcher::HubSpotClient;
use crate::core::{ConfigProvider, Extraction, FinalTable, Pipeline, Storage};
use crate::utils::error::Result;
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

/// 交付給下游的表格名稱
pub const HANDOFF_TABLE_NAME: &str = "df_temp";

pub fn handoff_file_name() -> String {
    format!("{}.zip", HANDOFF_TABLE_NAME)
}

/// HubSpot 物件 → 型別化表格 → `df_temp.zip`
pub struct HubSpotPipeline<S: Storage, C: ConfigProvider> {
    pub(crate) storage: S,
    pub(crate) config: C,
    run: RunConfig,
    client: HubSpotClient,
}

impl<S: Storage, C: ConfigProvider> HubSpotPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Result<Self> {
        let run = RunConfig::try_from(config.custom_params())?;
        let client = HubSpotClient::from_config(&config)?;
        Ok(Self {
            storage,
            config,
            run,
            client,
        })
    }

    pub fn run_config(&self) -> &RunConfig {
        &self.run
    }

    /// 將表格與其 schema 打包成 zip
    pub fn package(table: &FinalTable, formats: &[OutputFormat]) -> Result<Vec<u8>> {
        let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

        zip.start_file::<_, ()>(
            format!("{}.schema.json", HANDOFF_TABLE_NAME),
            FileOptions::default(),
        )?;
        zip.write_all(serde_json::to_string_pretty(&table.schema.to_json())?.as_bytes())?;

        for format in formats {
            zip.start_file::<_, ()>(
                format!("{}.{}", HANDOFF_TABLE_NAME, format.extension()),
                FileOptions::default(),
            )?;
            match format {
                OutputFormat::Json => {
                    let rows = serde_json::to_string_pretty(&table.to_json_rows())?;
                    zip.write_all(rows.as_bytes())?;
                }
                OutputFormat::Csv => zip.write_all(table.to_csv()?.as_bytes())?,
            }
        }

        let cursor = zip.finish()?;
        Ok(cursor.into_inner())
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for HubSpotPipeline<S, C> {
    async fn extract(&self) -> Result<Extraction> {
        tracing::debug!("HubSpot base URL: {}", self.config.base_url());
        extract(&self.client, &self.run).await
    }

    async fn transform(&self, extraction: Extraction) -> Result<FinalTable> {
        Ok(assemble(extraction, self.run.flatten_mode()))
    }

    async fn load(&self, table: FinalTable) -> Result<String> {
        let file_name = handoff_file_name();
        let output_path = format!("{}/{}", self.config.output_path(), file_name);

        tracing::debug!(
            "Creating ZIP file with schema and {} table file(s)",
            self.config.output_formats().len()
        );
        let zip_data = Self::package(&table, self.config.output_formats())?;

        tracing::debug!("Writing ZIP file ({} bytes) to storage", zip_data.len());
        self.storage.write_file(&file_name, &zip_data).await?;

        tracing::info!("📦 Handed off table '{}' as {}", HANDOFF_TABLE_NAME, output_path);
        Ok(output_path)
    }
}

use crate::config::params::CustomParams;
use crate::config::OutputFormat;
use crate::domain::model::Extraction;
use crate::domain::table::FinalTable;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// 交付 df_temp.zip 的位置（本機目錄或 S3）
pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// 各種配置來源（CLI、TOML、Lambda）共同提供的連線與輸出設定
pub trait ConfigProvider: Send + Sync {
    fn base_url(&self) -> &str;
    fn access_token(&self) -> &str;
    fn output_path(&self) -> &str;
    fn custom_params(&self) -> &CustomParams;
    fn request_timeout(&self) -> Duration;
    fn max_pages(&self) -> usize;
    fn output_formats(&self) -> &[OutputFormat];
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Extraction>;
    async fn transform(&self, extraction: Extraction) -> Result<FinalTable>;
    async fn load(&self, table: FinalTable) -> Result<String>;
}

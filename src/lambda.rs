use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::Client as S3Client;
use hubspot_etl::config::params::CustomParams;
use hubspot_etl::utils::{logger, validation::Validate};
use hubspot_etl::{EtlEngine, HubSpotPipeline, LambdaConfig, S3Storage};
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct Request {
    #[serde(default)]
    pub params: CustomParams,
    pub s3_bucket: Option<String>,
    pub s3_prefix: Option<String>,
}

#[derive(Serialize)]
pub struct Response {
    pub message: String,
    pub output_path: String,
    pub records_processed: usize,
    pub columns: Vec<String>,
}

fn boxed(e: hubspot_etl::EtlError) -> Error {
    tracing::error!("❌ {} ({:?})", e, e.category());
    tracing::error!("💡 {}", e.recovery_suggestion());
    Box::new(e)
}

async fn function_handler(event: LambdaEvent<Request>) -> Result<Response, Error> {
    tracing::info!("Starting HubSpot ETL Lambda function");

    let payload = event.payload;
    let mut lambda_config = LambdaConfig::from_env(payload.params).map_err(boxed)?;
    if let Some(bucket) = payload.s3_bucket {
        lambda_config.s3_bucket = bucket;
    }
    if let Some(prefix) = payload.s3_prefix {
        lambda_config.s3_prefix = prefix;
    }
    lambda_config.validate().map_err(boxed)?;

    let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let region = Region::new(lambda_config.s3_region.clone());
    let config = aws_sdk_s3::config::Builder::from(&config)
        .region(region)
        .force_path_style(true)
        .build();
    let s3_client = S3Client::from_conf(config);

    // 物件鍵以 s3_prefix 為目錄
    let storage = S3Storage::new(s3_client, lambda_config.s3_bucket.clone())
        .with_prefix(lambda_config.s3_prefix.clone());
    let pipeline = HubSpotPipeline::new(storage, lambda_config).map_err(boxed)?;

    let engine = EtlEngine::new(pipeline);
    let report = engine.run().await.map_err(boxed)?;

    tracing::info!("HubSpot ETL Lambda function completed successfully");
    Ok(Response {
        message: "ETL process completed successfully".to_string(),
        output_path: report.output_path,
        records_processed: report.rows,
        columns: report.columns,
    })
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    logger::init_lambda_logger();

    run(service_fn(function_handler)).await
}

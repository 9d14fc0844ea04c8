use crate::core::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

/// 一次執行的摘要
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub output_path: String,
    pub rows: usize,
    pub columns: Vec<String>,
}

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self) -> Result<RunReport> {
        tracing::info!("🚀 Starting ETL process");

        let extraction = self.pipeline.extract().await?;
        self.monitor.log_stats("Extract");

        let table = self.pipeline.transform(extraction).await?;
        self.monitor.log_stats("Transform");
        tracing::info!(
            "🔧 Final table: {} rows x {} columns",
            table.num_rows(),
            table.schema.len()
        );

        if table.is_empty() {
            tracing::warn!("No data in object results");
        }

        let rows = table.num_rows();
        let columns = table.column_names().iter().map(|c| c.to_string()).collect();

        let output_path = self.pipeline.load(table).await?;
        self.monitor.log_stats("Load");
        self.monitor.log_final_stats();

        tracing::info!("📁 Output saved to: {}", output_path);
        Ok(RunReport {
            output_path,
            rows,
            columns,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Extraction, Record};
    use crate::domain::table::FinalTable;
    use crate::core::dispatcher::assemble;
    use crate::core::flatten::FlattenMode;
    use std::sync::Mutex;

    struct StubPipeline {
        records: Vec<Record>,
        loaded: Mutex<Option<FinalTable>>,
    }

    #[async_trait::async_trait]
    impl Pipeline for StubPipeline {
        async fn extract(&self) -> Result<Extraction> {
            Ok(Extraction::Owners(self.records.clone()))
        }

        async fn transform(&self, extraction: Extraction) -> Result<FinalTable> {
            Ok(assemble(extraction, FlattenMode::None))
        }

        async fn load(&self, table: FinalTable) -> Result<String> {
            *self.loaded.lock().unwrap() = Some(table);
            Ok("memory://df_temp".to_string())
        }
    }

    #[tokio::test]
    async fn test_run_reports_shape_of_loaded_table() {
        let pipeline = StubPipeline {
            records: vec![serde_json::from_value(serde_json::json!({
                "id": "42", "email": "owner@example.com", "archived": false
            }))
            .unwrap()],
            loaded: Mutex::new(None),
        };
        let engine = EtlEngine::new(pipeline);

        let report = engine.run().await.unwrap();

        assert_eq!(report.output_path, "memory://df_temp");
        assert_eq!(report.rows, 1);
        assert_eq!(report.columns, vec!["id", "email", "archived"]);
    }

    #[tokio::test]
    async fn test_empty_result_is_still_loaded() {
        let pipeline = StubPipeline {
            records: Vec::new(),
            loaded: Mutex::new(None),
        };
        let engine = EtlEngine::new(pipeline);

        let report = engine.run().await.unwrap();

        assert_eq!(report.rows, 0);
        assert_eq!(report.columns, vec!["id"]);
        let loaded = engine.pipeline.loaded.lock().unwrap().clone();
        assert_eq!(loaded, Some(FinalTable::empty_sentinel()));
    }
}

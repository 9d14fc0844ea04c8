use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub fn init_cli_logger(verbose: bool) {
    init_cli_logger_with_level(verbose, None);
}

/// `RUST_LOG` 優先；其次 `--verbose`，再來是設定檔的 log_level
pub fn init_cli_logger_with_level(verbose: bool, level: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli_directives(verbose, level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

fn cli_directives(verbose: bool, level: Option<&str>) -> String {
    if verbose {
        return "hubspot_etl=debug,toml_etl=debug,info".to_string();
    }
    let level = level.map(str::to_ascii_lowercase).unwrap_or_else(|| "info".to_string());
    format!("hubspot_etl={0},toml_etl={0}", level)
}

pub fn init_lambda_logger() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hubspot_etl=info,lambda=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .json(),
        )
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_directives() {
        assert_eq!(cli_directives(false, None), "hubspot_etl=info,toml_etl=info");
        assert_eq!(cli_directives(false, Some("WARN")), "hubspot_etl=warn,toml_etl=warn");
        assert_eq!(
            cli_directives(true, Some("error")),
            "hubspot_etl=debug,toml_etl=debug,info"
        );
    }
}

use std::process;

use admission_server::{cli, config::Config, metrics, tracing::setup_tracing, AdmissionServer};
use anyhow::{anyhow, Result};
use tokio::runtime::Runtime;
use tracing::{debug, error, info};

fn main() -> Result<()> {
    let matches = cli::build_cli().get_matches();
    let config = Config::from_args(&matches)?;

    // Starting from rustls 0.22, each application must set its default crypto provider.
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Cannot install the ring crypto provider"))?;

    let rt = Runtime::new()?;
    rt.block_on(async {
        // Setup the tracing system. This MUST be done inside of a tokio Runtime
        // because some collectors rely on it and would panic otherwise.
        if let Err(err) = setup_tracing(&config.log_level, &config.log_fmt, config.log_no_color) {
            eprintln!("{err}");
            process::exit(1);
        }
        debug!("tracing system ready");

        // The variable is kept around so the meter provider lives as long as
        // the server does, exporting metrics
        let _meter_provider = if config.metrics_enabled {
            match metrics::setup_metrics() {
                Ok(provider) => Some(provider),
                Err(err) => fatal_error(format!("cannot setup metrics: {err}")),
            }
        } else {
            None
        };

        let server = match AdmissionServer::new_from_config(config).await {
            Ok(server) => server,
            Err(err) => fatal_error(err.to_string()),
        };

        if let Err(err) = server.run().await {
            fatal_error(format!("server error: {err}"));
        }
        info!("shutdown complete");
    });

    Ok(())
}

fn fatal_error(msg: String) -> ! {
    error!("{}", msg);
    process::exit(1);
}

use crate::report::model::ReportModel;
use crate::workflow::config::ScanConfig;
use anyhow::Context;
use log::info;
use std::sync::Arc;
use tokio::runtime::Builder as TokioBuilder;

#[derive(Clone)]
pub struct Runner {
    config: ScanConfig,
}

impl Runner {
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> anyhow::Result<ReportModel> {
        let config = &self.config;
        let scanner = Arc::new(config.build_scanner());
        let accepts = |name: &str| config.accepts_file(name);

        info!(
            "scanning {} for observations within {} km of ({}, {})",
            config.root.display(),
            config.radius_km,
            config.target.latitude,
            config.target.longitude
        );
        let records = if config.jobs > 1 {
            let runtime = TokioBuilder::new_multi_thread()
                .worker_threads(config.jobs)
                .build()
                .context("creating runtime for concurrent scan")?;
            runtime.block_on(Arc::clone(&scanner).scan_concurrent(
                &config.root,
                accepts,
                config.target,
                config.radius_km,
                config.jobs,
            ))
        } else {
            scanner.scan(&config.root, accepts, config.target, config.radius_km)
        }
        .with_context(|| format!("scanning archive {}", config.root.display()))?;

        ReportModel::build(
            config.target,
            config.radius_km,
            records,
            scanner.metrics(),
            &config.calibration,
        )
        .context("calibrating matched DDMs")
    }
}

//! Strip command implementation
//!
//! Builds the job's caps and stripper, solves, and writes a JSON report.

use std::fs;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::JobConfig;
use crate::job::{build_pricer, build_stripper, strip};
use crate::report::StrippingReport;

/// Run the strip command
pub fn run(job: &JobConfig) -> Result<()> {
    let pricer = build_pricer(job)?;
    let stripper = build_stripper(job, pricer)?;
    let result = strip(job, stripper.as_ref())?;
    let report = StrippingReport::new(job, &result)?;

    info!(
        method = ?report.method,
        chi_square = report.chi_square,
        iterations = report.iterations,
        max_abs_error = report.max_abs_error(),
        "Stripping complete"
    );

    let json = serde_json::to_string_pretty(&report)?;
    match &job.output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("writing report to {}", path.display()))?;
            info!("Report written to: {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

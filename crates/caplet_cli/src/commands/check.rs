//! Check command implementation
//!
//! Validates a job and summarises it without solving.

use anyhow::Result;
use caplet_stripping::MarketDataType;
use tracing::{info, warn};

use crate::config::JobConfig;
use crate::job::{build_pricer, build_stripper};

/// Run the check command
pub fn run(job: &JobConfig) -> Result<()> {
    let pricer = build_pricer(job)?;
    let stripper = build_stripper(job, pricer.clone())?;

    let grid = pricer.expiry_strike_grid();
    info!("Job is valid");
    info!("  Strategy: {}", job.strategy.name());
    info!("  Caps: {}", pricer.num_caps());
    info!(
        "  Caplets: {} ({} expiries x {} strikes)",
        pricer.num_caplets(),
        grid.distinct_expiries().len(),
        grid.distinct_strikes().len()
    );
    info!("  Model parameters: {}", stripper.imp().num_model_parameters());

    // Price quotes must invert to a volatility
    if job.market.data_type == MarketDataType::Price {
        let vols = pricer.implied_vols(&job.market.values)?;
        info!("  Implied cap vols: {:?}", vols);
    }
    if stripper.imp().num_model_parameters() > pricer.num_caps() {
        warn!("More parameters than caps: the fit relies on its penalty");
    }
    Ok(())
}

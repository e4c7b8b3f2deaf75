use std::error::Error;
use std::fs::File;
use std::io::BufReader;

use tracing_subscriber::EnvFilter;

use rampwaveform::configuration::Configuration;

const DEFAULT_CONFIG_PATH: &str = "booster.json";

const PRINT_STEP: usize = 100;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_owned());
    let reader = BufReader::new(File::open(&config_path)?);
    let config = Configuration::from_json(serde_json::from_reader(reader)?)?;

    let dipole = config.dipole_waveform()?;
    let dipole = dipole.borrow();
    if !dipole.check() {
        tracing::warn!(path = %config_path, "stored ramp does not convert cleanly");
    }
    let times = dipole.times();
    let currents = dipole.currents();
    let strengths = dipole.strengths()?;
    for k in (0..times.len()).step_by(PRINT_STEP).chain([times.len() - 1]) {
        println!("{:.6}, {:.4}, {:.6}", times[k], currents[k], strengths[k]);
    }
    Ok(())
}

use clap::Parser;
use std::path::PathBuf;

/// Downtown Tucson
const DEFAULT_LAT: f64 = 32.2226;
const DEFAULT_LNG: f64 = -110.9747;

/// Terminal map for proposing new shade sites
#[derive(Debug, Clone, Parser)]
#[command(name = "shade-map", version, about)]
pub struct Config {
    /// Directory holding the GeoJSON datasets
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,

    /// Directory for saved proposals [default: <local data dir>/shade-map]
    #[arg(long)]
    pub store_dir: Option<PathBuf>,

    /// Initial map center latitude
    #[arg(long, default_value_t = DEFAULT_LAT, allow_negative_numbers = true)]
    pub lat: f64,

    /// Initial map center longitude
    #[arg(long, default_value_t = DEFAULT_LNG, allow_negative_numbers = true)]
    pub lng: f64,

    /// Initial zoom level (2-19)
    #[arg(long, default_value_t = 12.0)]
    pub zoom: f64,

    /// Log file [default: <store dir>/shade-map.log]
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Config {
    pub fn store_dir(&self) -> PathBuf {
        self.store_dir
            .clone()
            .or_else(|| dirs::data_local_dir().map(|d| d.join("shade-map")))
            .unwrap_or_else(|| PathBuf::from(".shade-map"))
    }

    pub fn log_file(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| self.store_dir().join("shade-map.log"))
    }
}

//! Command-line argument definitions for cropwatch
//!
//! Defines the CLI using the clap derive API. Selection flags override the
//! layered configuration; anything left unset keeps the configured value.

use crate::config::MonitorConfig;
use crate::error::{CropwatchError, Result};
use crate::models::{AttributeSelection, GrowthPeriod, Zone};
use clap::{ArgAction, Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// CLI arguments for the zone classification monitor
///
/// Classifies field observations of a farm zone against per-growth-period
/// standard thresholds and manages the standard profiles.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "cropwatch",
    version,
    about = "Classify farm zone observations against growth period standards",
    long_about = "Filters the cached observations of a farm zone to one growth period and year, \
                  averages the measured attributes and classifies every observation as exceeding, \
                  below or matching the standard profile of that period."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file (JSON)
    ///
    /// If not specified, looks for ~/.config/cropwatch/config.json
    #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
    pub config_file: Option<PathBuf>,

    /// Directory with `<zone>.json`, `standard.json` and `standarddefault.json` payloads
    #[arg(long = "data-dir", value_name = "DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Base URL of the upstream REST service
    #[arg(long = "base-url", value_name = "URL", global = true)]
    pub base_url: Option<String>,

    /// Logging verbosity level
    #[arg(
        short = 'v',
        long = "verbose",
        action = ArgAction::Count,
        global = true,
        help = "Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,

    /// Only show errors
    #[arg(short = 'q', long = "quiet", global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output format for results
    #[arg(long = "format", value_enum, default_value = "text", global = true)]
    pub format: OutputFormat,
}

/// Available subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Classify the selected zone, period and year against its standard
    Classify(ClassifyArgs),
    /// Print attribute averages for the selected zone, period and year
    Averages(SelectionArgs),
    /// Inspect or edit the standard profiles
    Standards {
        #[command(subcommand)]
        action: StandardsAction,
    },
}

/// Zone, period, year and attribute selection
#[derive(Debug, Clone, Default, ClapArgs)]
pub struct SelectionArgs {
    /// Zone to read (sb, mac, mks, mpdc, mpl, mpv, mpk)
    #[arg(short = 'z', long = "zone")]
    pub zone: Option<Zone>,

    /// Growth period (Emergence, Tillering, StemElongation, Maturity)
    #[arg(short = 'p', long = "period")]
    pub period: Option<GrowthPeriod>,

    /// Observation year
    #[arg(short = 'y', long = "year")]
    pub year: Option<i32>,

    /// Attributes to compare: comma separated list, `all` or `none`
    #[arg(short = 'a', long = "attributes", value_name = "LIST")]
    pub attributes: Option<AttributeSelection>,
}

/// Arguments for the classify command
#[derive(Debug, Clone, ClapArgs)]
pub struct ClassifyArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Records classified per chunk
    #[arg(long = "chunk-size", value_name = "COUNT")]
    pub chunk_size: Option<usize>,

    /// Pause between chunks in milliseconds
    #[arg(long = "pause-ms", value_name = "MS")]
    pub pause_ms: Option<u64>,

    /// Include every classified record in the output
    #[arg(long = "records")]
    pub records: bool,

    /// Classify against the default profiles instead of the active ones
    #[arg(long = "use-defaults")]
    pub use_defaults: bool,
}

/// Standard profile actions
#[derive(Debug, Clone, Subcommand)]
pub enum StandardsAction {
    /// List the standard profiles
    Show {
        /// List the default profiles instead of the active ones
        #[arg(long = "defaults")]
        defaults: bool,
    },
    /// Change thresholds of the active profile for one period
    Update(UpdateArgs),
    /// Copy every default profile onto the active profiles
    Reset,
}

/// Arguments for `standards update`
#[derive(Debug, Clone, ClapArgs)]
pub struct UpdateArgs {
    /// Growth period whose profile is edited
    #[arg(short = 'p', long = "period")]
    pub period: GrowthPeriod,

    #[arg(long = "ndvi")]
    pub ndvi: Option<f64>,

    #[arg(long = "ndwi")]
    pub ndwi: Option<f64>,

    #[arg(long = "gli")]
    pub gli: Option<f64>,

    #[arg(long = "precipitation")]
    pub precipitation: Option<f64>,

    #[arg(long = "soil-moisture")]
    pub soil_moisture: Option<f64>,
}

impl UpdateArgs {
    /// True if at least one threshold was given
    pub fn has_changes(&self) -> bool {
        [
            self.ndvi,
            self.ndwi,
            self.gli,
            self.precipitation,
            self.soil_moisture,
        ]
        .iter()
        .any(Option::is_some)
    }
}

/// Output format for results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Coloured human readable output
    Text,
    /// Machine readable JSON
    Json,
}

impl Args {
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }

    /// Progress bars only make sense for interactive text output
    pub fn show_progress(&self) -> bool {
        !self.quiet && self.format == OutputFormat::Text
    }

    pub fn validate(&self) -> Result<()> {
        if let Commands::Classify(classify) = &self.command {
            if classify.chunk_size == Some(0) {
                return Err(CropwatchError::configuration("--chunk-size must be at least 1"));
            }
        }
        if let Commands::Standards {
            action: StandardsAction::Update(update),
        } = &self.command
        {
            if !update.has_changes() {
                return Err(CropwatchError::invalid_selection(
                    "standards update needs at least one threshold flag",
                ));
            }
        }
        Ok(())
    }

    /// Apply global and selection flags on top of the loaded configuration
    pub fn apply_to(&self, config: &mut MonitorConfig) {
        if let Some(dir) = &self.data_dir {
            config.data_dir = Some(dir.clone());
        }
        if let Some(url) = &self.base_url {
            config.base_url = Some(url.clone());
        }

        let selection = match &self.command {
            Commands::Classify(classify) => {
                if let Some(size) = classify.chunk_size {
                    config.chunk_size = size;
                }
                if let Some(pause) = classify.pause_ms {
                    config.chunk_pause_ms = pause;
                }
                Some(&classify.selection)
            }
            Commands::Averages(selection) => Some(selection),
            Commands::Standards { .. } => None,
        };

        if let Some(selection) = selection {
            selection.apply_to(config);
        }
    }
}

impl SelectionArgs {
    pub fn apply_to(&self, config: &mut MonitorConfig) {
        if let Some(zone) = self.zone {
            config.zone = zone;
        }
        if let Some(period) = self.period {
            config.period = period;
        }
        if let Some(year) = self.year {
            config.year = year;
        }
        if let Some(attributes) = &self.attributes {
            config.attributes = attributes.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Attribute;

    #[test]
    fn test_classify_args_parsing() {
        let args = Args::try_parse_from([
            "cropwatch",
            "classify",
            "--zone",
            "MPDC",
            "--period",
            "stem elongation",
            "--year",
            "2024",
            "--attributes",
            "ndvi,Soilmoiture",
            "--chunk-size",
            "500",
        ])
        .unwrap();

        let mut config = MonitorConfig::default();
        args.apply_to(&mut config);
        assert_eq!(config.zone, Zone::Mpdc);
        assert_eq!(config.period, GrowthPeriod::StemElongation);
        assert_eq!(config.year, 2024);
        assert_eq!(config.chunk_size, 500);
        assert!(config.attributes.contains(Attribute::SoilMoisture));
        assert!(!config.attributes.contains(Attribute::Gli));
    }

    #[test]
    fn test_unset_flags_keep_config() {
        let args = Args::try_parse_from(["cropwatch", "averages"]).unwrap();
        let mut config = MonitorConfig::default().with_year(2021);
        args.apply_to(&mut config);
        assert_eq!(config.year, 2021);
        assert!(config.attributes.is_all());
    }

    #[test]
    fn test_invalid_zone_is_rejected() {
        assert!(Args::try_parse_from(["cropwatch", "averages", "--zone", "north"]).is_err());
    }

    #[test]
    fn test_log_level() {
        let quiet = Args::try_parse_from(["cropwatch", "-q", "averages"]).unwrap();
        assert_eq!(quiet.get_log_level(), "error");
        assert!(!quiet.show_progress());

        let debug = Args::try_parse_from(["cropwatch", "-vv", "averages"]).unwrap();
        assert_eq!(debug.get_log_level(), "debug");
        assert!(debug.show_progress());
    }

    #[test]
    fn test_update_requires_a_threshold() {
        let args =
            Args::try_parse_from(["cropwatch", "standards", "update", "--period", "Maturity"])
                .unwrap();
        assert!(args.validate().is_err());

        let args = Args::try_parse_from([
            "cropwatch",
            "standards",
            "update",
            "--period",
            "Maturity",
            "--ndvi",
            "0.45",
        ])
        .unwrap();
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_zero_chunk_size_fails_validation() {
        let args = Args::try_parse_from(["cropwatch", "classify", "--chunk-size", "0"]).unwrap();
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_json_format_disables_progress() {
        let args = Args::try_parse_from(["cropwatch", "classify", "--format", "json"]).unwrap();
        assert_eq!(args.format, OutputFormat::Json);
        assert!(!args.show_progress());
    }
}

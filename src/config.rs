use std::fmt;
use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use clap::{Parser, ValueEnum};

use crate::error::ConfigError;

/// All US states (abbreviations)
pub(crate) const US_STATES: [&str; 50] = [
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "FL", "GA",
    "HI", "ID", "IL", "IN", "IA", "KS", "KY", "LA", "ME", "MD",
    "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH", "NJ",
    "NM", "NY", "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC",
    "SD", "TN", "TX", "UT", "VT", "VA", "WA", "WV", "WI", "WY",
];

pub(crate) const DEFAULT_ENDPOINT: &str =
    "https://www.realtor.com/api/v1/rdc_search_srp?client_id=rdc-search-new-communities&schema=vesta";

pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, ValueEnum)]
pub(crate) enum ListingType {
    #[value(name = "sold")]
    Sold,
    #[value(name = "for_sale")]
    ForSale,
    #[value(name = "for_rent")]
    ForRent,
    #[value(name = "pending")]
    Pending,
}

impl ListingType {
    pub(crate) const ALL: [ListingType; 4] = [
        ListingType::Sold,
        ListingType::ForSale,
        ListingType::ForRent,
        ListingType::Pending,
    ];

    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            ListingType::Sold => "sold",
            ListingType::ForSale => "for_sale",
            ListingType::ForRent => "for_rent",
            ListingType::Pending => "pending",
        }
    }
}

impl fmt::Display for ListingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Csv,
    Excel,
    Json,
}

impl OutputFormat {
    pub(crate) fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Excel => "xlsx",
            OutputFormat::Json => "json",
        }
    }
}

/// Fetch real estate data for US states and export one file per state.
#[derive(Debug, Parser)]
#[command(name = "state_exports")]
#[command(about = "Fetch real estate data for US states and export one file per state")]
pub(crate) struct Cli {
    /// State abbreviations to fetch (default: all states)
    #[arg(long, num_args = 1.., default_values_t = US_STATES.map(String::from))]
    pub(crate) states: Vec<String>,

    /// Listing types to fetch (default: all types)
    #[arg(long = "listing_types", value_enum, num_args = 1.., default_values_t = ListingType::ALL)]
    pub(crate) listing_types: Vec<ListingType>,

    /// Start date (YYYY-MM-DD)
    #[arg(long = "start_date", default_value = "2024-01-01")]
    pub(crate) start_date: String,

    /// End date (YYYY-MM-DD), defaults to today
    #[arg(long = "end_date")]
    pub(crate) end_date: Option<String>,

    #[arg(long = "output_dir", default_value = "state_exports")]
    pub(crate) output_dir: PathBuf,

    /// Max properties per state
    #[arg(long = "max_rows", default_value_t = 10_000)]
    pub(crate) max_rows: usize,

    #[arg(long = "output_format", value_enum, default_value_t = OutputFormat::Csv)]
    pub(crate) output_format: OutputFormat,

    /// Number of parallel workers
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..))]
    pub(crate) processes: u16,

    /// Overwrite existing files
    #[arg(long)]
    pub(crate) overwrite: bool,

    /// GraphQL search endpoint
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    pub(crate) endpoint: String,

    /// Skip the per-property detail lookup
    #[arg(long = "no_extra_property_data")]
    pub(crate) no_extra_property_data: bool,

    #[arg(long = "log_file", default_value = "fetch_all_states.log")]
    pub(crate) log_file: PathBuf,
}

/// Immutable run configuration, built once at startup.
#[derive(Debug, Clone)]
pub(crate) struct RunConfig {
    pub(crate) states: Vec<String>,
    pub(crate) listing_types: Vec<ListingType>,
    pub(crate) start_date: NaiveDate,
    pub(crate) end_date: NaiveDate,
    pub(crate) output_dir: PathBuf,
    pub(crate) max_rows: usize,
    pub(crate) output_format: OutputFormat,
    pub(crate) processes: usize,
    pub(crate) overwrite: bool,
    pub(crate) endpoint: String,
    pub(crate) extra_property_data: bool,
    pub(crate) log_file: PathBuf,
}

impl RunConfig {
    pub(crate) fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let start_date = parse_date("start_date", &cli.start_date)?;
        let end_date = match cli.end_date.as_deref() {
            Some(raw) => parse_date("end_date", raw)?,
            None => Local::now().date_naive(),
        };

        if start_date > end_date {
            return Err(ConfigError::DateRange { start: start_date, end: end_date });
        }

        // Duplicates are kept, each one becomes its own task
        let states = cli.states.iter().map(|s| s.trim().to_uppercase()).collect();

        Ok(RunConfig {
            states,
            listing_types: cli.listing_types,
            start_date,
            end_date,
            output_dir: cli.output_dir,
            max_rows: cli.max_rows,
            output_format: cli.output_format,
            processes: usize::from(cli.processes),
            overwrite: cli.overwrite,
            endpoint: cli.endpoint,
            extra_property_data: !cli.no_extra_property_data,
            log_file: cli.log_file,
        })
    }
}

fn parse_date(field: &'static str, raw: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| ConfigError::InvalidDate {
        field,
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["state_exports"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_match_the_batch_script() {
        let config = RunConfig::from_cli(parse(&[])).unwrap();

        assert_eq!(config.states.len(), 50);
        assert_eq!(config.states.first().map(String::as_str), Some("AL"));
        assert_eq!(config.states.last().map(String::as_str), Some("WY"));
        assert_eq!(config.listing_types, ListingType::ALL.to_vec());
        assert_eq!(config.start_date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(config.end_date, Local::now().date_naive());
        assert_eq!(config.output_dir, PathBuf::from("state_exports"));
        assert_eq!(config.max_rows, 10_000);
        assert_eq!(config.output_format, OutputFormat::Csv);
        assert_eq!(config.processes, 1);
        assert!(!config.overwrite);
        assert!(config.extra_property_data);
        assert_eq!(config.log_file, PathBuf::from("fetch_all_states.log"));
    }

    #[test]
    fn parses_underscore_flags() {
        let cli = parse(&[
            "--states", "ca", "TX",
            "--listing_types", "for_sale", "pending",
            "--start_date", "2024-03-01",
            "--end_date", "2024-04-01",
            "--max_rows", "25",
            "--output_format", "excel",
            "--processes", "4",
            "--overwrite",
            "--no_extra_property_data",
        ]);
        let config = RunConfig::from_cli(cli).unwrap();

        assert_eq!(config.states, vec!["CA".to_string(), "TX".to_string()]);
        assert_eq!(config.listing_types, vec![ListingType::ForSale, ListingType::Pending]);
        assert_eq!(config.end_date, NaiveDate::from_ymd_opt(2024, 4, 1).unwrap());
        assert_eq!(config.max_rows, 25);
        assert_eq!(config.output_format, OutputFormat::Excel);
        assert_eq!(config.processes, 4);
        assert!(config.overwrite);
        assert!(!config.extra_property_data);
    }

    #[test]
    fn parses_json_output_format() {
        let config = RunConfig::from_cli(parse(&["--output_format", "json"])).unwrap();
        assert_eq!(config.output_format, OutputFormat::Json);
        assert_eq!(config.output_format.extension(), "json");
    }

    #[test]
    fn rejects_zero_processes() {
        let res = Cli::try_parse_from(["state_exports", "--processes", "0"]);
        assert!(res.is_err());
    }

    #[test]
    fn rejects_bad_dates() {
        let err = RunConfig::from_cli(parse(&["--start_date", "01/02/2024"])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDate { field: "start_date", .. }));

        let err = RunConfig::from_cli(parse(&["--start_date", "2024-05-01", "--end_date", "2024-01-01"]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::DateRange { .. }));
    }

    #[test]
    fn keeps_duplicate_states() {
        let config = RunConfig::from_cli(parse(&["--states", "TX", "tx"])).unwrap();
        assert_eq!(config.states, vec!["TX".to_string(), "TX".to_string()]);
    }
}

use async_trait::async_trait;
use chrono::NaiveDate;
use polars::prelude::*;
use tracing::{error, info};

use crate::config::{ListingType, DATE_FORMAT};
use crate::error::FetchError;

/// Input of one search call
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SearchQuery {
    pub(crate) location: String,
    pub(crate) listing_type: ListingType,
    pub(crate) date_from: NaiveDate,
    pub(crate) date_to: NaiveDate,
    pub(crate) limit: usize,
    pub(crate) extra_property_data: bool,
}

impl SearchQuery {
    pub(crate) fn date_from_param(&self) -> String {
        self.date_from.format(DATE_FORMAT).to_string()
    }

    pub(crate) fn date_to_param(&self) -> String {
        self.date_to.format(DATE_FORMAT).to_string()
    }
}

/// Anything that can answer a property search with a table of listings.
///
/// Calls are blocking from the caller's point of view: a worker awaits the
/// result before moving on to the next listing type.
#[async_trait]
pub(crate) trait PropertySource: Send + Sync {
    async fn search(&self, query: &SearchQuery) -> Result<DataFrame, FetchError>;
}

/// What one listing type produced for a region
#[derive(Debug)]
pub(crate) enum ListingOutcome {
    Data(DataFrame),
    Empty,
    Failed(String),
}

#[derive(Debug, Default)]
pub(crate) struct FetchReport {
    pub(crate) outcomes: Vec<(ListingType, ListingOutcome)>,
}

impl FetchReport {
    pub(crate) fn failures(&self) -> Vec<(ListingType, &str)> {
        self.outcomes
            .iter()
            .filter_map(|(lt, outcome)| match outcome {
                ListingOutcome::Failed(reason) => Some((*lt, reason.as_str())),
                _ => None,
            })
            .collect()
    }

    /// Concatenates every non-empty table in listing type order and keeps at
    /// most `row_cap` rows. `None` when nothing came back.
    pub(crate) fn combine(self, row_cap: usize) -> PolarsResult<Option<DataFrame>> {
        let frames = self
            .outcomes
            .into_iter()
            .filter_map(|(_, outcome)| match outcome {
                ListingOutcome::Data(df) => Some(df),
                _ => None,
            })
            .collect::<Vec<DataFrame>>();

        if frames.is_empty() {
            return Ok(None);
        }

        let combined = concat_diagonal(frames)?;
        Ok(Some(combined.head(Some(row_cap))))
    }
}

/// Runs one search per listing type, isolating failures per type
pub(crate) async fn fetch_region(
    source: &dyn PropertySource,
    region: &str,
    listing_types: &[ListingType],
    date_from: NaiveDate,
    date_to: NaiveDate,
    row_cap: usize,
    extra_property_data: bool,
) -> FetchReport {
    let mut report = FetchReport::default();

    for listing_type in listing_types {
        let query = SearchQuery {
            location: region.to_string(),
            listing_type: *listing_type,
            date_from,
            date_to,
            limit: row_cap,
            extra_property_data,
        };

        let outcome = match source.search(&query).await {
            Ok(df) if df.height() > 0 => ListingOutcome::Data(df),
            Ok(_) => {
                info!("No properties found for {} {}", region, listing_type);
                ListingOutcome::Empty
            }
            Err(e) => {
                error!("Error fetching {} {}: {}", region, listing_type, e);
                ListingOutcome::Failed(e.to_string())
            }
        };
        report.outcomes.push((*listing_type, outcome));
    }

    report
}

/// Row-wise concatenation over the union of columns.
///
/// Columns keep first-seen order; cells a frame lacks are null. A column whose
/// type differs between frames is cast to the common supertype (text for a
/// number/text mix).
pub(crate) fn concat_diagonal(frames: Vec<DataFrame>) -> PolarsResult<DataFrame> {
    if frames.is_empty() {
        return Ok(DataFrame::empty());
    }

    let lazy = frames.into_iter().map(|df| df.lazy()).collect::<Vec<LazyFrame>>();
    let args = UnionArgs {
        to_supertypes: true,
        ..Default::default()
    };
    concat_lf_diagonal(lazy, args)?.collect()
}

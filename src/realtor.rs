use async_trait::async_trait;
use polars::prelude::*;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, USER_AGENT};
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::config::ListingType;
use crate::error::FetchError;
use crate::fetch::{PropertySource, SearchQuery};
use crate::helpers;
use crate::listing_structs::{HomeDetails, HomeSearch, ListingsContainer, PropertyRecord};
use crate::queries::{general_results_query, HOME_FRAGMENT};

const PAGE_SIZE: usize = 200;
// The search API refuses offsets past this point
const MAX_RESULTS: usize = 10_000;

/// realtor.com GraphQL search client
pub(crate) struct RealtorClient {
    client: Client,
    endpoint: String,
}

impl RealtorClient {
    pub(crate) fn new(endpoint: &str) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static("Realtor.com/12.0 CFNetwork/1410.0.3 Darwin/22.6.0"),
        );
        headers.insert(
            "rdc-client-name",
            HeaderValue::from_static("RDC_NATIVE_MOBILE-iPhone-com.move.Realtor"),
        );

        let client = Client::builder()
            .cookie_store(true)
            .default_headers(headers)
            .build()?;

        Ok(RealtorClient {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    /// Fetches the `HomeData` fragment for every record with a property id
    /// and merges it in place. One request per page of records.
    async fn attach_details(&self, records: &mut [PropertyRecord]) -> Result<(), FetchError> {
        let ids = records
            .iter()
            .filter_map(|r| r.property_id.clone())
            .collect::<Vec<String>>();
        if ids.is_empty() {
            return Ok(());
        }

        let payload = json!({ "query": details_query_text(&ids) });
        let mut data = helpers::post_graphql(&self.client, &self.endpoint, &payload).await?;

        let mut merged = 0;
        for record in records.iter_mut() {
            let Some(id) = record.property_id.as_deref() else { continue };
            let Some(raw) = data.get_mut(home_alias(id)).map(Value::take) else { continue };
            if raw.is_null() {
                continue;
            }
            let details: HomeDetails =
                serde_json::from_value(raw).map_err(|e| FetchError::Malformed(e.to_string()))?;
            record.apply_details(details);
            merged += 1;
        }
        debug!("Merged details for {} of {} properties", merged, ids.len());

        Ok(())
    }
}

#[async_trait]
impl PropertySource for RealtorClient {
    async fn search(&self, query: &SearchQuery) -> Result<DataFrame, FetchError> {
        let limit = query.limit.min(MAX_RESULTS);
        let query_text = search_query_text(query);
        let mut container = ListingsContainer::default();
        let mut collected = 0;
        let mut offset = 0;

        while collected < limit {
            let payload = json!({
                "query": query_text,
                "variables": { "location": query.location, "offset": offset },
            });
            let mut data = helpers::post_graphql(&self.client, &self.endpoint, &payload).await?;

            let search: HomeSearch = match data.get_mut("home_search").map(Value::take) {
                Some(Value::Null) | None => {
                    return Err(FetchError::Malformed("response has no home_search".to_string()))
                }
                Some(raw) => serde_json::from_value(raw).map_err(|e| FetchError::Malformed(e.to_string()))?,
            };

            let page_len = search.results.len();
            info!(
                "{} {}: offset {} returned {} of {} listings",
                query.location,
                query.listing_type,
                offset,
                search.count.unwrap_or(page_len),
                search.total.unwrap_or_default()
            );

            let mut records = search
                .results
                .into_iter()
                .take(limit - collected)
                .map(PropertyRecord::from)
                .collect::<Vec<PropertyRecord>>();

            if query.extra_property_data {
                self.attach_details(&mut records).await?;
            }

            collected += records.len();
            container.enqueue(&mut records);
            container.handle_queue()?;

            offset += PAGE_SIZE;
            let exhausted = search.total.map_or(false, |total| offset >= total);
            if page_len < PAGE_SIZE || exhausted || offset >= MAX_RESULTS {
                break;
            }
        }

        Ok(container.into_frame()?)
    }
}

fn home_alias(property_id: &str) -> String {
    let safe = property_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect::<String>();
    format!("home_{}", safe)
}

/// Date field the range filter and sort apply to
fn date_field(listing_type: ListingType) -> &'static str {
    match listing_type {
        ListingType::Sold => "sold_date",
        ListingType::Pending => "pending_date",
        ListingType::ForSale | ListingType::ForRent => "list_date",
    }
}

pub(crate) fn search_query_text(query: &SearchQuery) -> String {
    let status = match query.listing_type {
        ListingType::Pending => "for_sale",
        other => other.as_str(),
    };
    let pending_filter = match query.listing_type {
        ListingType::Pending => "or_filters: {contingent: true, pending: true}",
        _ => "",
    };
    let field = date_field(query.listing_type);

    format!(
        r#"query Home_search(
    $location: String!,
    $offset: Int,
) {{
    home_search(
        query: {{
            search_location: {{location: $location}}
            status: {status}
            {pending_filter}
            {field}: {{min: "{from}", max: "{to}"}}
        }}
        sort: [{{field: {field}, direction: desc}}]
        limit: {PAGE_SIZE}
        offset: $offset
    ) {results}
}}"#,
        from = query.date_from_param(),
        to = query.date_to_param(),
        results = general_results_query(),
    )
}

pub(crate) fn details_query_text(property_ids: &[String]) -> String {
    let aliases = property_ids
        .iter()
        .map(|id| format!("    {}: home(property_id: \"{}\") {{ ...HomeData }}", home_alias(id), id))
        .collect::<Vec<String>>()
        .join("\n");

    format!("query GetHomes {{\n{}\n}}\n{}", aliases, HOME_FRAGMENT)
}

// Search response shapes and their flattening into rows
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::helpers::json_text;

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct HomeSearch {
    pub(crate) count: Option<usize>,
    pub(crate) total: Option<usize>,
    #[serde(default)]
    pub(crate) results: Vec<HomeResult>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct HomeResult {
    pub(crate) property_id: Option<String>,
    pub(crate) listing_id: Option<String>,
    pub(crate) href: Option<String>,
    pub(crate) status: Option<String>,
    pub(crate) list_date: Option<String>,
    pub(crate) pending_date: Option<String>,
    pub(crate) last_sold_price: Option<f64>,
    pub(crate) last_sold_date: Option<String>,
    pub(crate) list_price: Option<f64>,
    pub(crate) list_price_min: Option<f64>,
    pub(crate) list_price_max: Option<f64>,
    pub(crate) price_per_sqft: Option<f64>,
    pub(crate) tags: Option<Vec<String>>,
    pub(crate) description: Option<HomeDescription>,
    pub(crate) source: Option<ListingSource>,
    pub(crate) hoa: Option<Hoa>,
    pub(crate) location: Option<HomeLocation>,
    pub(crate) primary_photo: Option<Photo>,
    pub(crate) photos: Option<Vec<Photo>>,
    pub(crate) advertisers: Option<Vec<Advertiser>>,
    pub(crate) current_estimates: Option<Vec<Estimate>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct HomeDescription {
    #[serde(rename = "type")]
    pub(crate) kind: Option<String>,
    pub(crate) sqft: Option<i64>,
    pub(crate) beds: Option<i64>,
    pub(crate) baths_full: Option<i64>,
    pub(crate) baths_half: Option<i64>,
    pub(crate) lot_sqft: Option<i64>,
    pub(crate) year_built: Option<i64>,
    pub(crate) garage: Option<f64>,
    pub(crate) stories: Option<i64>,
    pub(crate) text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ListingSource {
    pub(crate) id: Option<String>,
    pub(crate) listing_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct Hoa {
    pub(crate) fee: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct HomeLocation {
    pub(crate) address: Option<HomeAddress>,
    pub(crate) county: Option<County>,
    pub(crate) neighborhoods: Option<Vec<Neighborhood>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct HomeAddress {
    pub(crate) line: Option<String>,
    pub(crate) unit: Option<String>,
    pub(crate) city: Option<String>,
    pub(crate) state_code: Option<String>,
    pub(crate) postal_code: Option<String>,
    pub(crate) coordinate: Option<Coordinate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct Coordinate {
    pub(crate) lat: Option<f64>,
    pub(crate) lon: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct County {
    pub(crate) name: Option<String>,
    pub(crate) fips_code: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct Neighborhood {
    pub(crate) name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct Photo {
    pub(crate) href: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct Advertiser {
    #[serde(rename = "type")]
    pub(crate) kind: Option<String>,
    pub(crate) name: Option<String>,
    pub(crate) email: Option<String>,
    pub(crate) office: Option<Office>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct Office {
    pub(crate) name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct Estimate {
    pub(crate) estimate: Option<f64>,
    #[serde(rename = "isBestHomeValue")]
    pub(crate) is_best_home_value: Option<bool>,
}

/// Per-property extras returned by the `HomeData` fragment
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct HomeDetails {
    #[serde(rename = "nearbySchools")]
    pub(crate) nearby_schools: Option<Value>,
    #[serde(rename = "taxHistory")]
    pub(crate) tax_history: Option<Vec<TaxYear>>,
    pub(crate) monthly_fees: Option<Value>,
    pub(crate) one_time_fees: Option<Value>,
    pub(crate) parking: Option<Value>,
    pub(crate) terms: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct TaxYear {
    pub(crate) tax: Option<f64>,
    pub(crate) year: Option<i64>,
    pub(crate) assessment: Option<Assessment>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct Assessment {
    pub(crate) building: Option<f64>,
    pub(crate) land: Option<f64>,
    pub(crate) total: Option<f64>,
}

/// One flattened listing, one row of the fetched frame
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct PropertyRecord {
    pub(crate) property_url: Option<String>,
    pub(crate) property_id: Option<String>,
    pub(crate) listing_id: Option<String>,
    pub(crate) status: Option<String>,
    pub(crate) mls: Option<String>,
    pub(crate) mls_id: Option<String>,
    pub(crate) list_price: Option<f64>,
    pub(crate) list_price_min: Option<f64>,
    pub(crate) list_price_max: Option<f64>,
    pub(crate) list_date: Option<String>,
    pub(crate) pending_date: Option<String>,
    pub(crate) sold_price: Option<f64>,
    pub(crate) last_sold_date: Option<String>,
    pub(crate) price_per_sqft: Option<f64>,
    pub(crate) property_type: Option<String>,
    pub(crate) beds: Option<i64>,
    pub(crate) full_baths: Option<i64>,
    pub(crate) half_baths: Option<i64>,
    pub(crate) sqft: Option<i64>,
    pub(crate) lot_sqft: Option<i64>,
    pub(crate) year_built: Option<i64>,
    pub(crate) stories: Option<i64>,
    pub(crate) garage: Option<f64>,
    pub(crate) description: Option<String>,
    pub(crate) street: Option<String>,
    pub(crate) unit: Option<String>,
    pub(crate) city: Option<String>,
    pub(crate) state: Option<String>,
    pub(crate) zip_code: Option<String>,
    pub(crate) county: Option<String>,
    pub(crate) fips_code: Option<String>,
    pub(crate) latitude: Option<f64>,
    pub(crate) longitude: Option<f64>,
    pub(crate) neighborhoods: Option<String>,
    pub(crate) hoa_fee: Option<f64>,
    pub(crate) primary_photo: Option<String>,
    pub(crate) photos: Option<String>,
    pub(crate) tags: Option<String>,
    pub(crate) agent_name: Option<String>,
    pub(crate) agent_email: Option<String>,
    pub(crate) office_name: Option<String>,
    pub(crate) estimated_value: Option<f64>,
    pub(crate) nearby_schools: Option<String>,
    pub(crate) tax_history: Option<String>,
    pub(crate) tax: Option<f64>,
    pub(crate) monthly_fees: Option<String>,
    pub(crate) one_time_fees: Option<String>,
    pub(crate) parking: Option<String>,
    pub(crate) terms: Option<String>,
}

fn join_non_empty<'a>(items: impl Iterator<Item = Option<&'a str>>) -> Option<String> {
    let joined = items.flatten().collect::<Vec<&str>>().join(", ");
    match joined.is_empty() {
        true => None,
        false => Some(joined),
    }
}

impl From<HomeResult> for PropertyRecord {
    fn from(home: HomeResult) -> Self {
        let description = home.description.unwrap_or_default();
        let source = home.source.unwrap_or_default();
        let location = home.location.unwrap_or_default();
        let address = location.address.unwrap_or_default();
        let coordinate = address.coordinate.clone().unwrap_or_default();
        let county = location.county.unwrap_or_default();

        // Seller side agent first, anyone listed otherwise
        let advertisers = home.advertisers.unwrap_or_default();
        let agent = advertisers
            .iter()
            .find(|a| a.kind.as_deref() == Some("seller"))
            .or_else(|| advertisers.first());

        let estimates = home.current_estimates.unwrap_or_default();
        let estimated_value = estimates
            .iter()
            .find(|e| e.is_best_home_value == Some(true))
            .or_else(|| estimates.first())
            .and_then(|e| e.estimate);

        let photos = home
            .photos
            .as_ref()
            .and_then(|photos| join_non_empty(photos.iter().map(|p| p.href.as_deref())));
        let neighborhoods = location
            .neighborhoods
            .as_ref()
            .and_then(|n| join_non_empty(n.iter().map(|n| n.name.as_deref())));
        let tags = home.tags.as_ref().and_then(|t| join_non_empty(t.iter().map(|t| Some(t.as_str()))));

        PropertyRecord {
            property_url: home.href,
            property_id: home.property_id,
            listing_id: home.listing_id,
            status: home.status,
            mls: source.id,
            mls_id: source.listing_id,
            list_price: home.list_price,
            list_price_min: home.list_price_min,
            list_price_max: home.list_price_max,
            list_date: home.list_date,
            pending_date: home.pending_date,
            sold_price: home.last_sold_price,
            last_sold_date: home.last_sold_date,
            price_per_sqft: home.price_per_sqft,
            property_type: description.kind,
            beds: description.beds,
            full_baths: description.baths_full,
            half_baths: description.baths_half,
            sqft: description.sqft,
            lot_sqft: description.lot_sqft,
            year_built: description.year_built,
            stories: description.stories,
            garage: description.garage,
            description: description.text,
            street: address.line,
            unit: address.unit,
            city: address.city,
            state: address.state_code,
            zip_code: address.postal_code,
            county: county.name,
            fips_code: county.fips_code,
            latitude: coordinate.lat,
            longitude: coordinate.lon,
            neighborhoods,
            hoa_fee: home.hoa.and_then(|h| h.fee),
            primary_photo: home.primary_photo.and_then(|p| p.href),
            photos,
            tags,
            agent_name: agent.and_then(|a| a.name.clone()),
            agent_email: agent.and_then(|a| a.email.clone()),
            office_name: agent.and_then(|a| a.office.as_ref()).and_then(|o| o.name.clone()),
            estimated_value,
            ..Default::default()
        }
    }
}

impl PropertyRecord {
    /// Merges the extra detail lookup into this row
    pub(crate) fn apply_details(&mut self, details: HomeDetails) {
        if let Some(history) = details.tax_history {
            self.tax = history
                .iter()
                .filter(|y| y.year.is_some())
                .max_by_key(|y| y.year)
                .and_then(|y| y.assessment.as_ref())
                .and_then(|a| a.total);
            self.tax_history = serde_json::to_value(&history).ok().and_then(|v| json_text(&v));
        }
        self.nearby_schools = details.nearby_schools.as_ref().and_then(json_text);
        self.monthly_fees = details.monthly_fees.as_ref().and_then(json_text);
        self.one_time_fees = details.one_time_fees.as_ref().and_then(json_text);
        self.parking = details.parking.as_ref().and_then(json_text);
        self.terms = details.terms.as_ref().and_then(json_text);
    }
}

/// Collects flattened rows page by page and turns them into one frame
pub(crate) struct ListingsContainer {
    pub(crate) queue: Vec<PropertyRecord>,
    pub(crate) data: DataFrame,
}

impl Default for ListingsContainer {
    fn default() -> Self {
        Self {
            queue: vec![],
            data: DataFrame::empty(),
        }
    }
}

impl ListingsContainer {
    pub(crate) fn enqueue(&mut self, new_listings: &mut Vec<PropertyRecord>) {
        info!("Adding {} listings to queue", new_listings.len());
        self.queue.append(new_listings);
    }

    pub(crate) fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Adds every queued record to `data` as new rows and empties the queue
    pub(crate) fn handle_queue(&mut self) -> PolarsResult<()> {
        let new_listings_df = records_to_frame(&self.queue)?;

        if self.data.width() == 0 {
            self.data = new_listings_df;
        } else {
            self.data.vstack_mut(&new_listings_df)?;
        }

        self.queue.clear();
        Ok(())
    }

    pub(crate) fn into_frame(mut self) -> PolarsResult<DataFrame> {
        if self.queued() > 0 || self.data.width() == 0 {
            self.handle_queue()?;
        }
        if self.data.height() == 0 {
            warn!("Search returned no listings");
        }
        Ok(self.data)
    }
}

macro_rules! column {
    ($records:expr, $field:ident) => {
        Series::new(
            stringify!($field),
            $records.iter().map(|r| r.$field.clone()).collect::<Vec<_>>(),
        )
    };
}

pub(crate) fn records_to_frame(records: &[PropertyRecord]) -> PolarsResult<DataFrame> {
    let cols = vec![
        column!(records, property_url),
        column!(records, property_id),
        column!(records, listing_id),
        column!(records, status),
        column!(records, mls),
        column!(records, mls_id),
        column!(records, list_price),
        column!(records, list_price_min),
        column!(records, list_price_max),
        column!(records, list_date),
        column!(records, pending_date),
        column!(records, sold_price),
        column!(records, last_sold_date),
        column!(records, price_per_sqft),
        column!(records, property_type),
        column!(records, beds),
        column!(records, full_baths),
        column!(records, half_baths),
        column!(records, sqft),
        column!(records, lot_sqft),
        column!(records, year_built),
        column!(records, stories),
        column!(records, garage),
        column!(records, description),
        column!(records, street),
        column!(records, unit),
        column!(records, city),
        column!(records, state),
        column!(records, zip_code),
        column!(records, county),
        column!(records, fips_code),
        column!(records, latitude),
        column!(records, longitude),
        column!(records, neighborhoods),
        column!(records, hoa_fee),
        column!(records, primary_photo),
        column!(records, photos),
        column!(records, tags),
        column!(records, agent_name),
        column!(records, agent_email),
        column!(records, office_name),
        column!(records, estimated_value),
        column!(records, nearby_schools),
        column!(records, tax_history),
        column!(records, tax),
        column!(records, monthly_fees),
        column!(records, one_time_fees),
        column!(records, parking),
        column!(records, terms),
    ];

    DataFrame::new(cols)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_result() -> HomeResult {
        serde_json::from_value(json!({
            "property_id": "123",
            "listing_id": "987",
            "href": "https://www.realtor.com/realestateandhomes-detail/123",
            "status": "for_sale",
            "list_price": 450000,
            "price_per_sqft": 250,
            "tags": ["garage_2_or_more", "pool"],
            "description": {
                "type": "single_family", "beds": 3, "baths_full": 2, "baths_half": 1,
                "sqft": 1800, "lot_sqft": 6000, "year_built": 1999, "stories": 2,
                "garage": 2, "text": "Bright corner lot"
            },
            "source": { "id": "TXHAR", "listing_id": "H-55" },
            "hoa": { "fee": 120 },
            "location": {
                "address": {
                    "line": "1 Main St", "city": "Austin", "state_code": "TX",
                    "postal_code": "78701", "coordinate": { "lat": 30.1, "lon": -97.7 }
                },
                "county": { "name": "Travis", "fips_code": "48453" },
                "neighborhoods": [{ "name": "Downtown" }, { "name": null }]
            },
            "primary_photo": { "href": "https://img/1.jpg" },
            "photos": [{ "href": "https://img/1.jpg" }, { "href": "https://img/2.jpg" }],
            "advertisers": [
                { "type": "buyer", "name": "Bea Buyer" },
                { "type": "seller", "name": "Sam Seller", "email": "sam@x.io", "office": { "name": "Acme" } }
            ],
            "current_estimates": [
                { "estimate": 440000, "isBestHomeValue": false },
                { "estimate": 460000, "isBestHomeValue": true }
            ],
            "__typename": "SearchHome"
        }))
        .unwrap()
    }

    #[test]
    fn flattens_nested_result() {
        let record = PropertyRecord::from(sample_result());

        assert_eq!(record.property_id.as_deref(), Some("123"));
        assert_eq!(record.mls.as_deref(), Some("TXHAR"));
        assert_eq!(record.mls_id.as_deref(), Some("H-55"));
        assert_eq!(record.list_price, Some(450000.0));
        assert_eq!(record.property_type.as_deref(), Some("single_family"));
        assert_eq!(record.beds, Some(3));
        assert_eq!(record.full_baths, Some(2));
        assert_eq!(record.half_baths, Some(1));
        assert_eq!(record.state.as_deref(), Some("TX"));
        assert_eq!(record.latitude, Some(30.1));
        assert_eq!(record.neighborhoods.as_deref(), Some("Downtown"));
        assert_eq!(record.photos.as_deref(), Some("https://img/1.jpg, https://img/2.jpg"));
        assert_eq!(record.tags.as_deref(), Some("garage_2_or_more, pool"));
        assert_eq!(record.agent_name.as_deref(), Some("Sam Seller"));
        assert_eq!(record.office_name.as_deref(), Some("Acme"));
        assert_eq!(record.estimated_value, Some(460000.0));
        assert_eq!(record.hoa_fee, Some(120.0));
        assert_eq!(record.tax, None);
    }

    #[test]
    fn details_pick_latest_assessment() {
        let mut record = PropertyRecord::from(sample_result());
        let details: HomeDetails = serde_json::from_value(json!({
            "property_id": "123",
            "taxHistory": [
                { "tax": 5000, "year": 2021, "assessment": { "total": 300000 } },
                { "tax": 5200, "year": 2023, "assessment": { "total": 320000 } },
                { "tax": 5100, "year": 2022, "assessment": { "total": 310000 } }
            ],
            "nearbySchools": { "schools": [] },
            "monthly_fees": null
        }))
        .unwrap();

        record.apply_details(details);

        assert_eq!(record.tax, Some(320000.0));
        assert!(record.tax_history.as_deref().unwrap().contains("2023"));
        assert_eq!(record.nearby_schools.as_deref(), Some(r#"{"schools":[]}"#));
        assert_eq!(record.monthly_fees, None);
    }

    #[test]
    fn frame_has_one_row_per_record() {
        let records = vec![PropertyRecord::from(sample_result()), PropertyRecord::default()];
        let df = records_to_frame(&records).unwrap();

        assert_eq!(df.height(), 2);
        assert!(df.get_column_names().contains(&"list_price"));
        assert!(df.get_column_names().contains(&"nearby_schools"));
        assert_eq!(df.column("beds").unwrap().null_count(), 1);
    }

    #[test]
    fn container_stacks_pages() {
        let mut container = ListingsContainer::default();
        container.enqueue(&mut vec![PropertyRecord::from(sample_result())]);
        container.handle_queue().unwrap();
        container.enqueue(&mut vec![PropertyRecord::default(), PropertyRecord::default()]);
        assert_eq!(container.queued(), 2);

        let df = container.into_frame().unwrap();
        assert_eq!(df.height(), 3);
    }

    #[test]
    fn empty_container_keeps_schema() {
        let df = ListingsContainer::default().into_frame().unwrap();
        assert_eq!(df.height(), 0);
        assert!(df.width() > 0);
    }
}

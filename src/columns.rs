/// Canonical field name -> export label, in export order.
pub(crate) const COLUMN_MAP: [(&str, &str); 35] = [
    // Price
    ("list_price", "Listing Price"),
    // Images
    ("photos", "Images"),
    ("virtual_tour_url", "Virtual Tour"),
    // Property details
    ("beds", "Bedrooms"),
    ("full_baths", "Full Baths"),
    ("half_baths", "Half Baths"),
    ("sqft", "Square Footage"),
    ("year_built", "Year Built"),
    ("lot_sqft", "Lot Size"),
    ("stories", "Stories"),
    // Pricing metrics
    ("price_per_sqft", "Price per Sqft"),
    ("estimated_value", "Estimated Market Value"),
    ("price_history", "Price History"),
    // Financial & fees
    ("hoa_fee", "Monthly HOA Fee"),
    ("monthly_cost", "Monthly Cost Calculator"),
    ("estimated_monthly_payment", "Estimated Monthly Payments"),
    // Description & highlights
    ("description", "What's Special About This Property"),
    ("features", "Features & Upgrades"),
    ("special_features", "Unique Selling Points"),
    // Tours
    ("tour_3d_url", "3D Tour"),
    ("video_tour_url", "Video Tour"),
    // Source & listing
    ("agent_name", "Listed By"),
    ("mls_id", "MLS Number"),
    ("mls", "Originating MLS"),
    // Legal & tax
    ("tax_history", "Public Tax History"),
    ("tax", "Tax Assessed Value"),
    // Facts & features
    ("property_type", "Property Type"),
    ("interior_features", "Interior Features"),
    ("exterior_features", "Exterior Features"),
    // History
    ("sale_history", "Sale History"),
    // Environment
    ("climate_risk", "Climate Risk"),
    ("commute", "Getting Around"),
    // Nearby
    ("nearby_schools", "Nearby Schools"),
    ("nearby_cities", "Nearby Cities"),
    ("parks", "Parks & Recreation"),
];

/// Ordered, read-only rename mapping shared by every task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ColumnMap {
    entries: Vec<(String, String)>,
}

impl Default for ColumnMap {
    fn default() -> Self {
        ColumnMap::new(COLUMN_MAP.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
    }
}

impl ColumnMap {
    pub(crate) fn new(entries: Vec<(String, String)>) -> Self {
        ColumnMap { entries }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Entries whose key is one of `available`, in map order.
    pub(crate) fn select<'a>(&'a self, available: &[&str]) -> Vec<(&'a str, &'a str)> {
        self.entries
            .iter()
            .filter(|(k, _)| available.contains(&k.as_str()))
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }
}

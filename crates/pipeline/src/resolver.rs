//! Pricing resolver: parameter set to pricing records.
//!
//! Filters come only from the fields present in the parameter set. The
//! on-demand compute scope travels separately on the catalog query. Pages
//! are followed until the catalog stops returning a continuation token.

use crate::params::{ParamKey, ParameterSet};
use crate::record::PricingRecord;
use pricelens_core::catalog::{CatalogFilter, CatalogQuery, PriceCatalog};
use pricelens_core::error::CatalogError;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

/// Fixed filters narrowing the search to shared-tenancy on-demand compute.
pub const SCOPE: [(&str, &str); 4] = [
    ("productFamily", "Compute Instance"),
    ("tenancy", "Shared"),
    ("capacitystatus", "Used"),
    ("preInstalledSw", "NA"),
];

const PREFERRED_CURRENCY: &str = "USD";

/// Catalog attribute filtered for each recognized key.
fn catalog_field(key: ParamKey) -> Option<&'static str> {
    match key {
        ParamKey::Region => Some("regionCode"),
        ParamKey::InstanceType => Some("instanceType"),
        ParamKey::Os => Some("operatingSystem"),
        ParamKey::Service => None,
    }
}

/// One `TERM_MATCH` filter per present field, nothing else.
pub fn filters_for(params: &ParameterSet) -> Vec<CatalogFilter> {
    params
        .recognized()
        .into_iter()
        .filter_map(|(key, value)| {
            catalog_field(key).map(|field| CatalogFilter::term_match(field, value))
        })
        .collect()
}

/// The full catalog query for `params`, scope included.
pub fn catalog_query(params: &ParameterSet) -> CatalogQuery {
    CatalogQuery::new(params.service().service_code(), filters_for(params)).with_scope(
        SCOPE
            .iter()
            .map(|(field, value)| CatalogFilter::term_match(*field, *value))
            .collect(),
    )
}

/// Resolves parameter sets against a price catalog.
pub struct PricingResolver {
    catalog: Arc<dyn PriceCatalog>,
}

impl PricingResolver {
    pub fn new(catalog: Arc<dyn PriceCatalog>) -> Self {
        Self { catalog }
    }

    /// Fetch every matching record, in catalog order.
    pub async fn resolve(&self, params: &ParameterSet) -> Result<Vec<PricingRecord>, CatalogError> {
        let query = catalog_query(params);
        let mut records = Vec::new();
        let mut seen_skus = HashSet::new();
        let mut seen_tokens = HashSet::new();
        let mut next_token: Option<String> = None;
        let mut pages = 0usize;
        let mut skipped = 0usize;

        loop {
            let page = self
                .catalog
                .get_products(&query, next_token.as_deref())
                .await?;
            pages += 1;

            for entry in &page.entries {
                if let Some(sku) = entry["product"]["sku"].as_str() {
                    if !seen_skus.insert(sku.to_string()) {
                        continue;
                    }
                }
                match shape(entry) {
                    Some(record) => records.push(record),
                    None => skipped += 1,
                }
            }

            match page.next_token {
                None => break,
                Some(token) => {
                    if !seen_tokens.insert(token.clone()) {
                        return Err(CatalogError::PaginationLoop(token));
                    }
                    debug!(page = pages, "Following continuation token");
                    next_token = Some(token);
                }
            }
        }

        info!(
            catalog = self.catalog.name(),
            pages,
            records = records.len(),
            skipped,
            "Resolved prices"
        );
        Ok(records)
    }
}

/// Shape a raw price-list entry, or `None` if a required piece is missing.
pub fn shape(entry: &serde_json::Value) -> Option<PricingRecord> {
    let attributes = &entry["product"]["attributes"];
    let attribute = |name: &str| {
        attributes[name]
            .as_str()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(String::from)
    };

    let instance_type = attribute("instanceType")?;
    let operating_system = attribute("operatingSystem")?;
    let region = attribute("regionCode")?;
    let (price, currency, unit) = on_demand_price(&entry["terms"]["OnDemand"])?;

    Some(PricingRecord {
        instance_type,
        operating_system,
        region,
        on_demand_price: price,
        unit: render_unit(&currency, &unit),
    })
}

/// The first price dimension with a parseable price, preferring USD.
fn on_demand_price(on_demand: &serde_json::Value) -> Option<(String, String, String)> {
    on_demand
        .as_object()?
        .values()
        .filter_map(|offer| offer["priceDimensions"].as_object())
        .flat_map(|dimensions| dimensions.values())
        .find_map(|dimension| {
            let prices = dimension["pricePerUnit"].as_object()?;
            let (currency, amount) = prices
                .get_key_value(PREFERRED_CURRENCY)
                .or_else(|| prices.iter().next())?;
            let amount = amount.as_str()?.trim();
            Decimal::from_str(amount).ok()?;
            let unit = dimension["unit"].as_str().unwrap_or("Hrs");
            Some((amount.to_string(), currency.clone(), unit.to_string()))
        })
}

fn render_unit(currency: &str, unit: &str) -> String {
    match unit {
        "Hrs" | "Hr" | "Hours" | "Hour" | "hrs" => format!("{currency} per Hour"),
        other => format!("{currency} per {other}"),
    }
}

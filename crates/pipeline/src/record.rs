//! Pricing records and the per-query result.

use crate::params::ParameterSet;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// One on-demand price for an instance configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingRecord {
    pub instance_type: String,
    pub operating_system: String,
    pub region: String,
    /// Decimal string as published by the catalog
    pub on_demand_price: String,
    /// e.g. "USD per Hour"
    pub unit: String,
}

impl PricingRecord {
    pub fn price(&self) -> Option<Decimal> {
        Decimal::from_str(&self.on_demand_price).ok()
    }

    /// Currency code, taken from the unit.
    pub fn currency(&self) -> &str {
        self.unit.split_whitespace().next().unwrap_or_default()
    }
}

/// The record with the lowest parseable price; the first one on ties.
pub fn lowest_price(records: &[PricingRecord]) -> Option<(&PricingRecord, Decimal)> {
    records
        .iter()
        .filter_map(|r| r.price().map(|p| (r, p)))
        .min_by(|a, b| a.1.cmp(&b.1))
}

/// Everything a query produced, assembled once.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    query: String,
    parameters: ParameterSet,
    pricing_data: Vec<PricingRecord>,
    response: String,
}

impl QueryResult {
    pub fn new(
        query: impl Into<String>,
        parameters: ParameterSet,
        pricing_data: Vec<PricingRecord>,
        response: impl Into<String>,
    ) -> Self {
        Self {
            query: query.into(),
            parameters,
            pricing_data,
            response: response.into(),
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn parameters(&self) -> &ParameterSet {
        &self.parameters
    }

    pub fn pricing_data(&self) -> &[PricingRecord] {
        &self.pricing_data
    }

    pub fn response(&self) -> &str {
        &self.response
    }
}

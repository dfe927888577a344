//! Inputs and results of the trade-in value estimator.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleCondition {
    Excellent,
    #[default]
    Good,
    Fair,
    Poor,
}

impl VehicleCondition {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "excellent" => Some(VehicleCondition::Excellent),
            "good" => Some(VehicleCondition::Good),
            "fair" => Some(VehicleCondition::Fair),
            "poor" => Some(VehicleCondition::Poor),
            _ => None,
        }
    }
}

impl fmt::Display for VehicleCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            VehicleCondition::Excellent => "excellent",
            VehicleCondition::Good => "good",
            VehicleCondition::Fair => "fair",
            VehicleCondition::Poor => "poor",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValuationInput {
    /// Price of the vehicle when new, in whole currency units.
    pub base_price: f64,
    pub model_year: i32,
    /// Odometer reading in kilometres.
    pub mileage_km: u32,
    pub condition: VehicleCondition,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueEstimate {
    pub estimated: f64,
    pub low: f64,
    pub high: f64,
    pub age_years: u32,
}

//! Deterministic trade-in estimate: yearly depreciation, excess mileage and condition.

use ekami_domain::{ValuationInput, ValueEstimate, VehicleCondition};

use crate::CoreError;

const YEARLY_RETENTION: f64 = 0.85;
const EXPECTED_KM_PER_YEAR: f64 = 15_000.0;
const PENALTY_PER_10K_KM: f64 = 0.02;
const MIN_MILEAGE_FACTOR: f64 = 0.5;
const RANGE_SPREAD: f64 = 0.10;
/// First production motor car.
const MIN_MODEL_YEAR: i32 = 1886;

pub struct ValuationService;

impl ValuationService {
    pub fn condition_factor(condition: VehicleCondition) -> f64 {
        match condition {
            VehicleCondition::Excellent => 1.05,
            VehicleCondition::Good => 1.0,
            VehicleCondition::Fair => 0.85,
            VehicleCondition::Poor => 0.70,
        }
    }

    /// Penalises kilometres driven beyond the expected yearly average, floored at half value.
    pub fn mileage_factor(mileage_km: u32, age_years: u32) -> f64 {
        let expected = EXPECTED_KM_PER_YEAR * f64::from(age_years.max(1));
        let excess = (f64::from(mileage_km) - expected).max(0.0);
        (1.0 - PENALTY_PER_10K_KM * (excess / 10_000.0)).max(MIN_MILEAGE_FACTOR)
    }

    pub fn estimate(input: &ValuationInput, current_year: i32) -> Result<ValueEstimate, CoreError> {
        if !input.base_price.is_finite() || input.base_price <= 0.0 {
            return Err(CoreError::Validation(
                "Base price must be a positive amount".into(),
            ));
        }
        if input.model_year > current_year {
            return Err(CoreError::Validation(format!(
                "Model year {} is in the future",
                input.model_year
            )));
        }
        if input.model_year < MIN_MODEL_YEAR {
            return Err(CoreError::Validation(format!(
                "Model year {} is before {MIN_MODEL_YEAR}",
                input.model_year
            )));
        }
        let age_exponent = current_year
            .checked_sub(input.model_year)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Cannot date a {} model from {current_year}",
                    input.model_year
                ))
            })?;
        let age_years = u32::try_from(age_exponent).map_err(|_| {
            CoreError::Validation(format!("Model year {} is in the future", input.model_year))
        })?;

        let value = input.base_price
            * YEARLY_RETENTION.powi(age_exponent)
            * Self::mileage_factor(input.mileage_km, age_years)
            * Self::condition_factor(input.condition);

        Ok(ValueEstimate {
            estimated: value.round(),
            low: (value * (1.0 - RANGE_SPREAD)).round(),
            high: (value * (1.0 + RANGE_SPREAD)).round(),
            age_years,
        })
    }
}

use chrono::Datelike;

use ekami_core::{CurrencyFormatter, GroupedCurrencyFormatter, ValuationService};
use ekami_domain::{ValuationInput, VehicleCondition};

use crate::cli::core::{CommandError, CommandResult, ShellContext};
use crate::cli::registry::CommandEntry;
use crate::cli::{io, output};

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![CommandEntry::new(
        "estimate",
        "Estimate a vehicle's trade-in value",
        "estimate <price-when-new> <model-year> <mileage-km> [excellent|good|fair|poor]",
        cmd_estimate,
    )]
}

fn cmd_estimate(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let [price, year, mileage, rest @ ..] = args else {
        return Err(CommandError::InvalidArguments(
            "usage: estimate <price-when-new> <model-year> <mileage-km> [condition]".into(),
        ));
    };
    let condition = match rest.first() {
        Some(raw) => VehicleCondition::parse(raw).ok_or_else(|| {
            CommandError::InvalidArguments(format!(
                "unknown condition `{raw}`; use excellent, good, fair or poor"
            ))
        })?,
        None => VehicleCondition::default(),
    };
    let input = ValuationInput {
        base_price: parse_number(price, "price")?,
        model_year: parse_number(year, "model year")?,
        mileage_km: parse_number(mileage, "mileage")?,
        condition,
    };

    let current_year = context.services.clock.today().year();
    let estimate = ValuationService::estimate(&input, current_year)?;
    let formatter = GroupedCurrencyFormatter::default();
    let currency = context.config.currency.as_str();

    output::section("Trade-in estimate");
    io::print_info(format!(
        "  Estimated : {}",
        formatter.format_amount(estimate.estimated, currency)
    ));
    io::print_info(format!(
        "  Range     : {} to {}",
        formatter.format_amount(estimate.low, currency),
        formatter.format_amount(estimate.high, currency)
    ));
    io::print_info(format!(
        "  Based on  : {} years, {} km, {} condition",
        estimate.age_years, input.mileage_km, input.condition
    ));
    Ok(())
}

fn parse_number<T: std::str::FromStr>(raw: &str, what: &str) -> Result<T, CommandError> {
    raw.replace(['_', ' '], "").parse().map_err(|_| {
        CommandError::InvalidArguments(format!("{what} must be a number, got `{raw}`"))
    })
}

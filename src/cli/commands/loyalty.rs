use ekami_core::LoyaltyCalculator;
use ekami_domain::LoyaltyActivity;

use crate::cli::core::{CommandError, CommandResult, ShellContext};
use crate::cli::registry::CommandEntry;
use crate::cli::{io, output, render};

const HISTORY_LIMIT: usize = 5;

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![CommandEntry::new(
        "loyalty",
        "Check and use your loyalty points",
        "loyalty [show|earn <repair|rental|purchase|review|referral> [amount] [reference]|redeem <points> [description]]",
        cmd_loyalty,
    )]
}

fn cmd_loyalty(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let identity = context.require_identity()?;
    let action = args.first().map(|value| value.to_lowercase());
    let rest = args.get(1..).unwrap_or_default();
    match action.as_deref() {
        None | Some("show") => show(context, &identity.user_id),
        Some("earn") => earn(context, &identity.user_id, rest),
        Some("redeem") => redeem(context, &identity.user_id, rest),
        Some(other) => Err(CommandError::InvalidArguments(format!(
            "unknown loyalty action `{other}`"
        ))),
    }
}

fn show(context: &mut ShellContext, user_id: &str) -> CommandResult {
    let loyalty = &context.services.loyalty;
    let Some(member) = loyalty.member(user_id)? else {
        io::print_info("You have no loyalty points yet. Book a repair to start earning.");
        return Ok(());
    };
    let progress = LoyaltyCalculator::tier_progress(&member, loyalty.thresholds());
    output::section("Loyalty");
    output::block(&render::render_member(
        &member,
        &progress,
        LoyaltyCalculator::discount_percent(member.tier),
    ));

    let history = loyalty.history(member.id, HISTORY_LIMIT)?;
    if !history.is_empty() {
        output::section("Recent activity");
        output::block(&render::render_history(&history));
    }
    Ok(())
}

fn earn(context: &mut ShellContext, user_id: &str, args: &[&str]) -> CommandResult {
    let Some(raw_activity) = args.first() else {
        return Err(CommandError::InvalidArguments(
            "usage: loyalty earn <activity> [amount] [reference]".into(),
        ));
    };
    let activity = LoyaltyActivity::parse(raw_activity).ok_or_else(|| {
        CommandError::InvalidArguments(format!(
            "unknown activity `{raw_activity}`; use repair, rental, purchase, review or referral"
        ))
    })?;
    let amount = match args.get(1) {
        Some(raw) => parse_whole(raw, "amount")?,
        None => 0,
    };
    let reference = args.get(2).map(|value| value.to_string());

    let outcome = context
        .services
        .loyalty
        .earn(user_id, activity, amount, reference)?;
    io::print_success(format!(
        "{}. Balance: {} pts.",
        outcome.transaction.description, outcome.member.available_points
    ));
    if let Some(previous) = outcome.promoted_from {
        io::print_success(format!(
            "Promoted from {previous} to {}! You now get {}% off.",
            outcome.member.tier,
            LoyaltyCalculator::discount_percent(outcome.member.tier)
        ));
    }
    Ok(())
}

fn redeem(context: &mut ShellContext, user_id: &str, args: &[&str]) -> CommandResult {
    let Some((raw_points, description)) = args.split_first() else {
        return Err(CommandError::InvalidArguments(
            "usage: loyalty redeem <points> [description]".into(),
        ));
    };
    let points = parse_whole(raw_points, "points")?;
    let description = if description.is_empty() {
        "Points redeemed".to_string()
    } else {
        description.join(" ")
    };
    let (member, _) = context
        .services
        .loyalty
        .redeem(user_id, points, &description)?;
    io::print_success(format!(
        "Redeemed {points} pts. Balance: {} pts.",
        member.available_points
    ));
    Ok(())
}

fn parse_whole(raw: &str, what: &str) -> Result<u64, CommandError> {
    raw.replace('_', "").parse().map_err(|_| {
        CommandError::InvalidArguments(format!("{what} must be a whole number, got `{raw}`"))
    })
}

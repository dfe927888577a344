use ekami_config::Config;

use crate::cli::core::{CommandError, CommandResult, ShellContext};
use crate::cli::registry::CommandEntry;
use crate::cli::{io, output};

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![CommandEntry::new(
        "config",
        "View and change preferences",
        "config [show|set <key> <value>|backup [note]|backups|restore <name>]",
        cmd_config,
    )]
}

fn cmd_config(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let action = args.first().map(|value| value.to_lowercase());
    match action.as_deref() {
        None | Some("show") => show(context),
        Some("set") => set(context, &args[1..]),
        Some("backup") => backup(context, &args[1..]),
        Some("backups") => list_backups(context),
        Some("restore") => restore(context, &args[1..]),
        Some(other) => Err(CommandError::InvalidArguments(format!(
            "unknown config action `{other}`"
        ))),
    }
}

fn show(context: &mut ShellContext) -> CommandResult {
    let config = &context.config;
    output::section("Configuration");
    io::print_info(format!(
        "  config file                  : {}",
        context.config_manager.config_path().display()
    ));
    io::print_info(format!(
        "  data root                    : {}",
        config.resolve_data_root(&context.home).display()
    ));
    for (key, value) in entries(config) {
        io::print_info(format!("  {key:<28} : {value}"));
    }
    Ok(())
}

fn entries(config: &Config) -> Vec<(&'static str, String)> {
    vec![
        ("locale", config.locale.clone()),
        ("currency", config.currency.clone()),
        ("theme", config.theme.to_string()),
        ("ui_color_enabled", config.ui_color_enabled.to_string()),
        ("notifications.enabled", config.notifications.enabled.to_string()),
        ("notifications.from_address", config.notifications.from_address.clone()),
        ("notifications.staff_address", config.notifications.staff_address.clone()),
        ("intake.max_photos", config.intake.max_photos.to_string()),
        ("intake.max_photo_bytes", config.intake.max_photo_bytes.to_string()),
        ("loyalty.silver", config.loyalty.silver.to_string()),
        ("loyalty.gold", config.loyalty.gold.to_string()),
        ("loyalty.platinum", config.loyalty.platinum.to_string()),
        (
            "comments.require_moderation",
            config.comments.require_moderation.to_string(),
        ),
    ]
}

fn set(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let [key, value @ ..] = args else {
        return Err(CommandError::InvalidArguments(format!(
            "usage: config set <key> <value>; keys: {}",
            Config::KEYS.join(", ")
        )));
    };
    let mut next = context.config.clone();
    next.set(key, &value.join(" "))?;
    context.config_manager.save(&next)?;
    context.apply_config(next)?;
    tracing::info!(key = %key, "configuration updated");
    io::print_success(format!("Updated {key}."));
    Ok(())
}

fn backup(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let note = (!args.is_empty()).then(|| args.join(" "));
    let name = context
        .config_manager
        .backup(&context.config, note.as_deref())?;
    io::print_success(format!("Configuration backed up as {name}."));
    Ok(())
}

fn list_backups(context: &mut ShellContext) -> CommandResult {
    let backups = context.config_manager.list_backups()?;
    if backups.is_empty() {
        io::print_info("No configuration backups yet.");
        return Ok(());
    }
    output::section("Configuration backups");
    for name in backups {
        io::print_info(format!("  {name}"));
    }
    Ok(())
}

fn restore(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let name = match args.first() {
        Some(name) => name.to_string(),
        None if context.can_prompt() => {
            let backups = context.config_manager.list_backups()?;
            if backups.is_empty() {
                io::print_info("No configuration backups yet.");
                return Ok(());
            }
            match io::select_option(&context.theme, "Restore which backup?", &backups, 0)? {
                Some(idx) => backups[idx].clone(),
                None => {
                    io::print_info("Operation cancelled.");
                    return Ok(());
                }
            }
        }
        None => {
            return Err(CommandError::InvalidArguments(
                "usage: config restore <name>".into(),
            ))
        }
    };
    let restored = context.config_manager.restore(&name)?;
    context.config_manager.save(&restored)?;
    context.apply_config(restored)?;
    io::print_success(format!("Configuration restored from {name}."));
    Ok(())
}

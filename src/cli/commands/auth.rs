use ekami_domain::Identity;

use crate::cli::core::{CommandError, CommandResult, ShellContext};
use crate::cli::io;
use crate::cli::registry::CommandEntry;

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new(
            "login",
            "Sign in for this session",
            "login <user-id> <email> [display name]",
            cmd_login,
        ),
        CommandEntry::new("logout", "Sign out", "logout", cmd_logout),
        CommandEntry::new("whoami", "Show who is signed in", "whoami", cmd_whoami),
    ]
}

fn cmd_login(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let [user_id, email, name @ ..] = args else {
        return Err(CommandError::InvalidArguments(
            "usage: login <user-id> <email> [display name]".into(),
        ));
    };
    let display_name = if name.is_empty() {
        user_id.to_string()
    } else {
        name.join(" ")
    };
    context
        .identity
        .sign_in(Identity::new(*user_id, display_name.clone(), *email));
    // Likes shown in an open thread belong to the previous viewer.
    context.thread = None;
    tracing::info!(user_id = %user_id, "signed in");
    io::print_success(format!("Signed in as {display_name}."));
    Ok(())
}

fn cmd_logout(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    match context.identity.sign_out() {
        Some(identity) => {
            context.thread = None;
            tracing::info!(user_id = %identity.user_id, "signed out");
            io::print_success(format!("Signed out {}.", identity.display_name));
        }
        None => io::print_info("Nobody is signed in."),
    }
    Ok(())
}

fn cmd_whoami(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    match context.current_identity() {
        Some(identity) => io::print_info(format!(
            "{} <{}> (id: {})",
            identity.display_name, identity.email, identity.user_id
        )),
        None => io::print_info("Not signed in."),
    }
    Ok(())
}

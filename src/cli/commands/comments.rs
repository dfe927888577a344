use uuid::Uuid;

use ekami_domain::short_id;

use crate::cli::core::{CommandError, CommandResult, ShellContext};
use crate::cli::registry::CommandEntry;
use crate::cli::shell_context::ActiveThread;
use crate::cli::{io, output, render};

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![CommandEntry::new(
        "comments",
        "Read and take part in a blog post's comment thread",
        "comments [show <post-id>|post <text>|reply <comment> <text>|edit <comment> <text>|delete <comment>|like <comment>|pin <comment> [off]]",
        cmd_comments,
    )]
}

fn cmd_comments(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let Some(action) = args.first() else {
        return print_thread(context);
    };
    let rest = &args[1..];
    match action.to_lowercase().as_str() {
        "show" => show(context, rest),
        "post" => post(context, None, rest),
        "reply" => {
            let (reference, text) = split_reference(rest, "comments reply <comment> <text>")?;
            let parent = context.resolve_comment(reference)?;
            post(context, Some(parent), text)
        }
        "edit" => edit(context, rest),
        "delete" => delete(context, rest),
        "like" => like(context, rest),
        "pin" => pin(context, rest),
        other => Err(CommandError::InvalidArguments(format!(
            "unknown comments action `{other}`"
        ))),
    }
}

fn split_reference<'a>(
    args: &'a [&'a str],
    usage: &str,
) -> Result<(&'a str, &'a [&'a str]), CommandError> {
    match args.split_first() {
        Some((reference, rest)) => Ok((*reference, rest)),
        None => Err(CommandError::InvalidArguments(format!("usage: {usage}"))),
    }
}

fn show(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let post_id = match args.first() {
        Some(raw) => Uuid::parse_str(raw).map_err(|_| {
            CommandError::InvalidArguments(format!("`{raw}` is not a post id"))
        })?,
        None => context.thread_mut()?.post_id,
    };
    let viewer = context.current_identity().map(|identity| identity.user_id);
    let tree = context
        .services
        .comments
        .load_thread(post_id, viewer.as_deref())?;
    context.thread = Some(ActiveThread { post_id, tree });
    print_thread(context)
}

fn print_thread(context: &mut ShellContext) -> CommandResult {
    let thread = context.thread_mut()?;
    output::section(format!(
        "Comments on {} ({})",
        short_id(thread.post_id),
        thread.tree.len()
    ));
    output::block(&render::render_thread(&thread.tree));
    Ok(())
}

fn post(context: &mut ShellContext, parent_id: Option<Uuid>, text: &[&str]) -> CommandResult {
    let author = context.require_identity()?;
    let moderated = context.config.comments.require_moderation;
    let service = &context.services.comments;
    let thread = context.thread.as_mut().ok_or(CommandError::NoThread)?;
    let comment = service.post(
        &mut thread.tree,
        thread.post_id,
        &author,
        &text.join(" "),
        parent_id,
    )?;
    if moderated {
        io::print_success("Comment submitted; it will appear once approved.");
    } else {
        io::print_success(format!("Comment {} posted.", short_id(comment.id)));
    }
    Ok(())
}

fn edit(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (reference, text) = split_reference(args, "comments edit <comment> <text>")?;
    let id = context.resolve_comment(reference)?;
    let editor = context.require_identity()?;
    let service = &context.services.comments;
    let thread = context.thread.as_mut().ok_or(CommandError::NoThread)?;
    service.edit(&mut thread.tree, id, &editor, &text.join(" "))?;
    io::print_success(format!("Comment {} updated.", short_id(id)));
    Ok(())
}

fn delete(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (reference, _) = split_reference(args, "comments delete <comment>")?;
    let id = context.resolve_comment(reference)?;
    let user = context.require_identity()?;
    if context.can_prompt()
        && !io::confirm_action(&context.theme, "Delete this comment and its replies?", false)?
    {
        io::print_info("Operation cancelled.");
        return Ok(());
    }
    let service = &context.services.comments;
    let thread = context.thread.as_mut().ok_or(CommandError::NoThread)?;
    service.delete(&mut thread.tree, id, &user)?;
    io::print_success(format!("Comment {} deleted.", short_id(id)));
    Ok(())
}

fn like(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (reference, _) = split_reference(args, "comments like <comment>")?;
    let id = context.resolve_comment(reference)?;
    let user = context.require_identity()?;
    let service = &context.services.comments;
    let thread = context.thread.as_mut().ok_or(CommandError::NoThread)?;
    let liked = service.toggle_like(&mut thread.tree, id, &user)?;
    let count = thread
        .tree
        .find(id)
        .map(|node| node.comment.like_count)
        .unwrap_or_default();
    let verb = if liked { "Liked" } else { "Removed like from" };
    io::print_success(format!("{verb} comment {} ({count}).", short_id(id)));
    Ok(())
}

fn pin(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (reference, rest) = split_reference(args, "comments pin <comment> [off]")?;
    let pinned = !matches!(rest.first().map(|v| v.to_lowercase()).as_deref(), Some("off"));
    let id = context.resolve_comment(reference)?;
    context.require_identity()?;
    let service = &context.services.comments;
    let thread = context.thread.as_mut().ok_or(CommandError::NoThread)?;
    service.set_pinned(&mut thread.tree, id, pinned)?;
    let state = if pinned { "pinned" } else { "unpinned" };
    io::print_success(format!("Comment {} {state}.", short_id(id)));
    Ok(())
}

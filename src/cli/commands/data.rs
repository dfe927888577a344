use crate::cli::core::{CommandError, CommandResult, ShellContext};
use crate::cli::registry::CommandEntry;
use crate::cli::{io, output};

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![CommandEntry::new(
        "data",
        "Snapshot and restore stored collections",
        "data [collections|snapshot <collection>|snapshots <collection>|restore <collection> <snapshot>]",
        cmd_data,
    )]
}

fn cmd_data(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let store = context.services.store.clone();
    match args {
        [] | ["collections"] => {
            let collections = store.collections()?;
            output::section("Collections");
            if collections.is_empty() {
                io::print_info("Nothing stored yet.");
            }
            for name in collections {
                io::print_info(format!("  {name}"));
            }
            Ok(())
        }
        ["snapshot", collection] => {
            let snapshot = store.snapshot(collection)?;
            io::print_success(format!("Snapshot {} written.", snapshot.id));
            Ok(())
        }
        ["snapshots", collection] => {
            let snapshots = store.list_snapshots(collection)?;
            if snapshots.is_empty() {
                io::print_info(format!("No snapshots of {collection}."));
                return Ok(());
            }
            output::section(format!("Snapshots of {collection}"));
            for snapshot in snapshots {
                io::print_info(format!("  {}", snapshot.id));
            }
            Ok(())
        }
        ["restore", collection, id] => {
            let snapshot = store
                .list_snapshots(collection)?
                .into_iter()
                .find(|snapshot| snapshot.id == *id)
                .ok_or_else(|| {
                    CommandError::Message(format!("No snapshot `{id}` for {collection}."))
                })?;
            let rows = store.restore_snapshot(&snapshot)?;
            // Open views may show rows that no longer exist.
            context.thread = None;
            io::print_success(format!("Restored {collection} ({rows} rows) from {id}."));
            Ok(())
        }
        _ => Err(CommandError::InvalidArguments(
            "usage: data [collections|snapshot <collection>|snapshots <collection>|restore <collection> <snapshot>]".into(),
        )),
    }
}

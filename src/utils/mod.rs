pub mod build_info;
pub mod paths;

use std::sync::Once;

use tracing_subscriber::{filter::Directive, fmt, EnvFilter};

static TRACING_INIT: Once = Once::new();

/// The shell and every workspace crate it drives log at `info` by default.
const DEFAULT_DIRECTIVES: [&str; 4] = [
    "ekami_auto=info",
    "ekami_core=info",
    "ekami_storage_json=info",
    "ekami_config=info",
];

/// Logs go to stderr so script-mode stdout stays clean for callers.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        let filter = default_directives()
            .into_iter()
            .fold(EnvFilter::from_default_env(), EnvFilter::add_directive);
        // A host application may already own the global subscriber.
        let _ = fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    });
}

fn default_directives() -> Vec<Directive> {
    DEFAULT_DIRECTIVES
        .iter()
        .filter_map(|raw| raw.parse::<Directive>().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_workspace_crate_has_a_default_directive() {
        let rendered: Vec<String> = default_directives()
            .iter()
            .map(|directive| directive.to_string().to_lowercase())
            .collect();
        assert_eq!(rendered.len(), DEFAULT_DIRECTIVES.len());
        for target in ["ekami_auto", "ekami_core", "ekami_storage_json", "ekami_config"] {
            assert!(
                rendered.contains(&format!("{target}=info")),
                "{target} missing from {rendered:?}"
            );
        }
    }
}

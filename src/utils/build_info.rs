//! Build metadata captured by `build.rs`.

pub const CLI_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Copy)]
pub struct BuildInfo {
    pub version: &'static str,
    pub git_hash: &'static str,
    pub git_status: &'static str,
    pub timestamp: &'static str,
    pub target: &'static str,
    pub profile: &'static str,
    pub rustc: &'static str,
}

pub fn current() -> BuildInfo {
    BuildInfo {
        version: CLI_VERSION,
        git_hash: env!("EKAMI_BUILD_HASH"),
        git_status: env!("EKAMI_BUILD_STATUS"),
        timestamp: env!("EKAMI_BUILD_TIMESTAMP"),
        target: env!("EKAMI_BUILD_TARGET"),
        profile: env!("EKAMI_BUILD_PROFILE"),
        rustc: env!("EKAMI_BUILD_RUSTC"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_metadata_is_populated() {
        let info = current();
        assert_eq!(info.version, env!("CARGO_PKG_VERSION"));
        assert!(!info.git_hash.is_empty());
        assert!(matches!(info.git_status, "clean" | "dirty" | "unknown"));
    }
}

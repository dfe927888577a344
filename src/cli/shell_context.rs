use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use dialoguer::theme::ColorfulTheme;
use uuid::Uuid;

use ekami_config::{Config, ConfigManager};
use ekami_core::{
    Clock, CommentService, CommentTree, CoreError, DisabledNotifier, IdentityProvider,
    IntakeSession, LoyaltyService, Notifier, OutboxNotifier, PhotoLimits, RecordStore,
    SessionIdentity, SubmissionCoordinator, SubmissionSettings, SystemClock,
};
use ekami_domain::TierThresholds;
use ekami_storage_json::{JsonRecordStore, StoragePaths};

use super::commands;
use super::core::CliError;
use super::output::{self, OutputPreferences};
use super::registry::CommandRegistry;
use crate::utils::paths;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliMode {
    Interactive,
    Script,
}

/// The comment thread the user is currently looking at.
pub struct ActiveThread {
    pub post_id: Uuid,
    pub tree: CommentTree,
}

/// Services wired against the configured data root.
pub struct Services {
    pub store: Arc<JsonRecordStore>,
    pub clock: Arc<dyn Clock>,
    pub submissions: SubmissionCoordinator,
    pub comments: CommentService,
    pub loyalty: LoyaltyService,
}

impl Services {
    pub fn build(
        config: &Config,
        home: &Path,
        identity: Arc<SessionIdentity>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, CoreError> {
        let data_root = config.resolve_data_root(home);
        let store = Arc::new(JsonRecordStore::new(StoragePaths::under(&data_root))?);
        let records: Arc<dyn RecordStore> = store.clone();

        let notifier: Arc<dyn Notifier> = if config.notifications.enabled {
            Arc::new(OutboxNotifier::new(records.clone(), clock.clone()))
        } else {
            Arc::new(DisabledNotifier)
        };
        let settings = SubmissionSettings {
            notify_from: config.notifications.from_address.clone(),
            notify_to: config.notifications.staff_address.clone(),
            ..SubmissionSettings::default()
        };
        let identity: Arc<dyn IdentityProvider> = identity;
        let thresholds = TierThresholds {
            silver: config.loyalty.silver,
            gold: config.loyalty.gold,
            platinum: config.loyalty.platinum,
        };

        tracing::debug!(data_root = %data_root.display(), "services wired");
        Ok(Self {
            submissions: SubmissionCoordinator::new(
                records.clone(),
                identity,
                notifier,
                clock.clone(),
                settings,
            ),
            comments: CommentService::new(records.clone(), clock.clone())
                .with_moderation(config.comments.require_moderation),
            loyalty: LoyaltyService::new(records, clock.clone(), thresholds),
            store,
            clock,
        })
    }
}

pub struct ShellContext {
    pub mode: CliMode,
    pub registry: CommandRegistry,
    pub theme: ColorfulTheme,
    pub home: PathBuf,
    pub config_manager: ConfigManager,
    pub config: Config,
    pub identity: Arc<SessionIdentity>,
    pub services: Services,
    pub intake: Option<IntakeSession>,
    pub thread: Option<ActiveThread>,
    pub last_command: Option<String>,
    pub running: bool,
}

impl ShellContext {
    pub fn new(mode: CliMode) -> Result<Self, CliError> {
        Self::with_home(mode, paths::app_home())
    }

    pub fn with_home(mode: CliMode, home: PathBuf) -> Result<Self, CliError> {
        let mut registry = CommandRegistry::new();
        commands::register_all(&mut registry);

        let config_manager = ConfigManager::with_base_dir(home.clone())?;
        let config = config_manager.load()?;
        output::set_preferences(OutputPreferences::from_config(&config));

        let identity = Arc::new(SessionIdentity::new());
        let services = Services::build(&config, &home, identity.clone(), Arc::new(SystemClock))?;

        Ok(Self {
            mode,
            registry,
            theme: ColorfulTheme::default(),
            home,
            config_manager,
            config,
            identity,
            services,
            intake: None,
            thread: None,
            last_command: None,
            running: true,
        })
    }

    pub fn command_names(&self) -> Vec<&'static str> {
        self.registry.names().collect()
    }

    pub fn photo_limits(&self) -> PhotoLimits {
        PhotoLimits {
            max_photos: self.config.intake.max_photos,
            max_photo_bytes: self.config.intake.max_photo_bytes,
        }
    }

    /// Applies a new configuration: output preferences and every service are rebuilt.
    pub fn apply_config(&mut self, config: Config) -> Result<(), CoreError> {
        let services = Services::build(
            &config,
            &self.home,
            self.identity.clone(),
            self.services.clock.clone(),
        )?;
        output::set_preferences(OutputPreferences::from_config(&config));
        self.services = services;
        self.config = config;
        // Cached likes and moderation state may differ under the new store.
        self.thread = None;
        Ok(())
    }
}

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::auth::CredentialManager;
use crate::blocklist::BlockSetSynchronizer;
use crate::cli::{Args, Commands};
use crate::enforcement::{EnforcementChannel, NoopEnforcement};
use crate::settings::SettingsStore;
use crate::stats::BlockEventAggregator;
use crate::store::{FileKeyValueStore, KeyValueStore, KeyringSecretStore, SecretStore};

mod blocking;
mod credentials;

/// The assembled managers a command works against, one set per process.
pub struct Core {
    pub credentials: CredentialManager,
    pub settings: SettingsStore,
    pub blocklist: BlockSetSynchronizer,
    pub aggregator: BlockEventAggregator,
}

/// Build the platform-backed capabilities and wire the managers to them.
fn open_core(data_file: Option<PathBuf>) -> Result<Core> {
    let path = match data_file {
        Some(path) => path,
        None => FileKeyValueStore::default_path()?,
    };

    let store: Arc<dyn KeyValueStore> = Arc::new(
        FileKeyValueStore::open(&path)
            .with_context(|| format!("Failed to open data file: {}", path.display()))?,
    );
    let secrets: Arc<dyn SecretStore> = Arc::new(KeyringSecretStore::new());

    // Enforcement is platform-provided; this build has no interception
    // mechanism, so pushes are accepted and dropped and no events arrive.
    let channel: Arc<dyn EnforcementChannel> = Arc::new(NoopEnforcement::new());

    Ok(Core {
        credentials: CredentialManager::new(secrets, store.clone()),
        settings: SettingsStore::new(store.clone()),
        blocklist: BlockSetSynchronizer::new(store.clone(), channel.clone()),
        aggregator: BlockEventAggregator::new(store, channel),
    })
}

/// Execute the parsed command line.
pub fn dispatch(args: Args) -> Result<()> {
    let core = open_core(args.data_file)?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        match args.command {
            Commands::SetPassword { question } => credentials::set_password(&core, question).await,
            Commands::Verify => credentials::verify(&core).await,
            Commands::ChangePassword => credentials::change_password(&core).await,
            Commands::Question => credentials::show_question(&core).await,
            Commands::Recover => credentials::recover(&core).await,
            Commands::Notifications { state } => credentials::notifications(&core, state).await,
            Commands::Status => credentials::status(&core).await,
            Commands::Block { command } => blocking::block(&core, command).await,
            Commands::Stats { command } => blocking::stats(&core, command).await,
            Commands::Run => blocking::run(core).await,
            Commands::Reset { yes } => blocking::reset(&core, yes).await,
        }
    })
}

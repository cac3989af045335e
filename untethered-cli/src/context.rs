use std::sync::Arc;

use anyhow::Result;
use untethered_core::UntetheredError;
use untethered_core::auth::Viewer;
use untethered_core::backend::LocalBackend;
use untethered_core::calendar::CommunityCalendar;
use untethered_core::config::UntetheredConfig;
use untethered_core::goal::GoalStore;
use untethered_core::resource::ResourceLibrary;
use untethered_core::tracker::{GoalTracker, SystemClock};

/// Loaded config plus the backend every command talks to.
pub struct Context {
    pub config: UntetheredConfig,
    pub backend: Arc<LocalBackend>,
    pub store: GoalStore<LocalBackend>,
}

impl Context {
    pub fn load() -> Result<Self> {
        let config = UntetheredConfig::load()?;
        let backend = Arc::new(config.open_backend()?);
        tracing::debug!(data = %backend.root().display(), "opened data directory");
        let store = GoalStore::new(backend.clone());

        Ok(Context {
            config,
            backend,
            store,
        })
    }

    pub async fn viewer(&self) -> Result<Viewer> {
        match Viewer::require(self.backend.as_ref(), &self.store).await {
            Ok(viewer) => Ok(viewer),
            Err(UntetheredError::Auth(_)) => anyhow::bail!(
                "Not signed in.\n\n\
                Sign in with:\n  \
                untethered login\n\n\
                Or create an account with:\n  \
                untethered signup"
            ),
            Err(e) => Err(e.into()),
        }
    }

    pub fn tracker(&self, viewer: &Viewer) -> GoalTracker<LocalBackend> {
        GoalTracker::new(
            self.store.clone(),
            Some(viewer.uid().to_string()),
            Arc::new(SystemClock),
        )
        .with_page_size(self.config.history_page_size)
    }

    pub fn calendar(&self) -> CommunityCalendar<LocalBackend> {
        CommunityCalendar::new(self.backend.clone())
    }

    pub fn resources(&self) -> ResourceLibrary<LocalBackend> {
        ResourceLibrary::new(self.backend.clone())
    }
}

use crate::api::HttpApi;
use crate::configuration::Settings;
use crate::errors::Error;
use crate::session::{FileStorage, SessionManager};
use crate::store::TrackedProductStore;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct AppState {
    pub settings: Settings,
    pub api: Arc<HttpApi>,
    pub sessions: Arc<SessionManager<FileStorage>>,
}

impl AppState {
    pub fn init(settings: Settings) -> Result<Self, Error> {
        let api = HttpApi::new(&settings.api)?;
        let storage = FileStorage::open(&settings.session.file_path)?;
        Ok(Self {
            settings,
            api: Arc::new(api),
            sessions: Arc::new(SessionManager::new(storage)),
        })
    }

    /// Store bound to the persisted session; fails when nobody is signed in.
    pub fn store(&self) -> Result<TrackedProductStore<Arc<HttpApi>>, Error> {
        let session = self.sessions.require()?;
        Ok(TrackedProductStore::new(self.api.clone(), session))
    }
}

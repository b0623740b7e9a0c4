use crate::api::AuthApi;
use crate::data_models::{AuthResponse, Credential, Credentials, UserProfile};
use crate::errors::{AuthError, SessionError};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{info, warn};

pub const TOKEN_KEY: &str = "token";
pub const USER_KEY: &str = "user";

/// Client-local string storage, the counterpart of a browser's local storage.
pub trait KeyValueStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError>;
    fn set(&self, key: &str, value: &str) -> Result<(), SessionError>;
    fn remove(&self, key: &str) -> Result<(), SessionError>;
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: RwLock<HashMap<String, String>>,
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        let values = self.values.read().map_err(|_| SessionError::Poisoned)?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SessionError> {
        let mut values = self.values.write().map_err(|_| SessionError::Poisoned)?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        let mut values = self.values.write().map_err(|_| SessionError::Poisoned)?;
        values.remove(key);
        Ok(())
    }
}

/// Keeps all values in one JSON object on disk, rewritten on every change.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    values: RwLock<HashMap<String, String>>,
}

impl FileStorage {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let path = path.as_ref().to_path_buf();
        let values = if path.is_file() {
            let data = fs::read_to_string(&path)?;
            if data.trim().is_empty() {
                HashMap::new()
            } else {
                serde_json::from_str(&data).unwrap_or_else(|err| {
                    warn!(path = %path.display(), "discarding unreadable session file: {err}");
                    HashMap::new()
                })
            }
        } else {
            HashMap::new()
        };
        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &HashMap<String, String>) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_string_pretty(values)?)?;
        Ok(())
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        let values = self.values.read().map_err(|_| SessionError::Poisoned)?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SessionError> {
        let mut values = self.values.write().map_err(|_| SessionError::Poisoned)?;
        values.insert(key.to_string(), value.to_string());
        self.persist(&values)
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        let mut values = self.values.write().map_err(|_| SessionError::Poisoned)?;
        if values.remove(key).is_some() {
            self.persist(&values)?;
        }
        Ok(())
    }
}

/// A signed-in user: the bearer credential and the cached profile.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub credential: Credential,
    pub user: UserProfile,
}

/// Owns the persisted session. Created on login/register, cleared on logout.
#[derive(Debug)]
pub struct SessionManager<S> {
    storage: S,
}

impl<S: KeyValueStorage> SessionManager<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Returns the persisted session if both halves of it are present.
    pub fn restore(&self) -> Result<Option<Session>, SessionError> {
        let token = self.storage.get(TOKEN_KEY)?.filter(|t| !t.is_empty());
        let user = self.storage.get(USER_KEY)?;
        let (Some(token), Some(user)) = (token, user) else {
            return Ok(None);
        };
        match serde_json::from_str::<UserProfile>(&user) {
            Ok(user) => Ok(Some(Session {
                credential: Credential::new(token),
                user,
            })),
            Err(err) => {
                warn!("discarding unreadable session profile: {err}");
                self.end()?;
                Ok(None)
            }
        }
    }

    pub fn begin(&self, response: AuthResponse) -> Result<Session, SessionError> {
        let user = serde_json::to_string(&response.user)?;
        self.storage.set(TOKEN_KEY, response.token.expose())?;
        self.storage.set(USER_KEY, &user)?;
        info!(email = %response.user.email, "session started");
        Ok(Session {
            credential: response.token,
            user: response.user,
        })
    }

    pub fn end(&self) -> Result<(), SessionError> {
        self.storage.remove(TOKEN_KEY)?;
        self.storage.remove(USER_KEY)?;
        Ok(())
    }

    pub async fn login<A>(&self, api: &A, email: &str, password: &str) -> Result<Session, AuthError>
    where
        A: AuthApi + ?Sized,
    {
        let credentials = Credentials::for_login(email, password)?;
        let response = api.login(&credentials).await?;
        Ok(self.begin(response)?)
    }

    pub async fn register<A>(
        &self,
        api: &A,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError>
    where
        A: AuthApi + ?Sized,
    {
        let credentials = Credentials::for_registration(email, password)?;
        let response = api.register(&credentials).await?;
        Ok(self.begin(response)?)
    }

    /// Like [`SessionManager::restore`] but treats a missing session as an error.
    pub fn require(&self) -> Result<Session, AuthError> {
        self.restore()?.ok_or(AuthError::NotSignedIn)
    }
}

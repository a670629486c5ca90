//! Service lifecycle: load stores, serve, drain, flush.

use crate::config::{Config, ConfigError, StorageConfig};
use crate::web::{AppStateInner, create_router};
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokengate_shared::{ConcurrentStore, PersistenceError, StoreFile};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// The two process-wide stores and the files they are persisted to.
///
/// Created once at startup from disk, shared with the services by `Arc`,
/// and flushed once at shutdown.
pub struct Stores {
    pub users: Arc<ConcurrentStore>,
    pub secrets: Arc<ConcurrentStore>,
    users_file: StoreFile,
    secrets_file: StoreFile,
    /// Held for the full duration of every disk write, including the
    /// blocking part, so a flush never overlaps an autosave.
    save_lock: Arc<Mutex<()>>,
}

impl Stores {
    pub fn load(config: &StorageConfig) -> Result<Self, PersistenceError> {
        let users_file = StoreFile::new("users", &config.users_path);
        let secrets_file = StoreFile::new("tokens", &config.tokens_path);
        Ok(Self {
            users: Arc::new(users_file.load()?),
            secrets: Arc::new(secrets_file.load()?),
            users_file,
            secrets_file,
            save_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Save both stores, stopping at the first failure.
    pub async fn save_all(&self) -> Result<(), PersistenceError> {
        self.save(&self.users_file, &self.users).await?;
        self.save(&self.secrets_file, &self.secrets).await
    }

    async fn save(&self, file: &StoreFile, store: &Arc<ConcurrentStore>) -> Result<(), PersistenceError> {
        let guard = self.save_lock.clone().lock_owned().await;
        save_blocking(file.clone(), store.clone(), guard).await
    }

    /// Final save of both stores. Each store gets one retry; a second
    /// failure is logged and the data is abandoned rather than blocking exit.
    ///
    /// Returns the names of the stores that could not be saved.
    pub async fn flush(&self) -> Vec<&'static str> {
        let mut abandoned = Vec::new();
        for (file, store) in [
            (&self.users_file, &self.users),
            (&self.secrets_file, &self.secrets),
        ] {
            let mut attempt = 1;
            loop {
                match self.save(file, store).await {
                    Ok(()) => {
                        tracing::info!("Saved {} store ({} entries)", file.name, store.len());
                        break;
                    }
                    Err(e) if attempt == 1 => {
                        tracing::error!("Saving {} store failed, retrying: {}", file.name, e);
                        attempt += 1;
                    }
                    Err(e) => {
                        tracing::warn!("Giving up on saving {} store: {}", file.name, e);
                        abandoned.push(file.name);
                        break;
                    }
                }
            }
        }
        abandoned
    }
}

/// The guard moves into the blocking task, so aborting the caller does not
/// release the lock while the write is still running.
async fn save_blocking(
    file: StoreFile,
    store: Arc<ConcurrentStore>,
    guard: OwnedMutexGuard<()>,
) -> Result<(), PersistenceError> {
    let path = file.path.clone();
    tokio::task::spawn_blocking(move || {
        let _guard = guard;
        file.save(&store)
    })
    .await
    .unwrap_or_else(|e| {
        Err(PersistenceError::Io {
            path,
            source: io::Error::other(e),
        })
    })
}

fn spawn_autosave(stores: Arc<Stores>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        // The first tick completes immediately.
        interval.tick().await;
        loop {
            interval.tick().await;
            if let Err(e) = stores.save_all().await {
                tracing::warn!("Autosave failed: {}", e);
            }
        }
    })
}

/// Load state, bind the configured address and serve until Ctrl-C.
pub async fn run(config: Config) -> Result<(), ServerError> {
    let listener = TcpListener::bind(&config.server.bind).await?;
    serve(config, listener, shutdown_signal()).await
}

/// Serve on an already bound listener until `shutdown` resolves.
///
/// Store files are loaded first; a corrupt file aborts startup. After the
/// signal the server stops accepting, lets in-flight requests finish and
/// then saves both stores exactly once.
pub async fn serve(
    config: Config,
    listener: TcpListener,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ServerError> {
    let stores = Arc::new(Stores::load(&config.storage)?);
    let state = Arc::new(AppStateInner::from_config(
        &config,
        stores.users.clone(),
        stores.secrets.clone(),
    ));

    let mut background: Vec<JoinHandle<()>> = Vec::new();
    if let Some(limiter) = state.rate_limiter.clone().filter(|l| !l.window.is_zero()) {
        let every = limiter.window;
        background.push(tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                limiter.cleanup().await;
            }
        }));
    }
    if config.storage.autosave_secs > 0 {
        let every = Duration::from_secs(config.storage.autosave_secs);
        background.push(spawn_autosave(stores.clone(), every));
    }

    let app = create_router(state);
    tracing::info!("Web API listening on http://{}", listener.local_addr()?);
    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await;

    for task in background {
        task.abort();
        let _ = task.await;
    }
    let abandoned = stores.flush().await;
    if !abandoned.is_empty() {
        tracing::warn!("Exiting without saving: {}", abandoned.join(", "));
    }

    served?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Stopping server...");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn storage_in(dir: &std::path::Path) -> StorageConfig {
        StorageConfig {
            users_path: dir.join("users.json"),
            tokens_path: dir.join("tokens.json"),
            autosave_secs: 0,
        }
    }

    #[tokio::test]
    async fn test_flush_waits_for_in_progress_save() {
        let dir = tempdir().unwrap();
        let stores = Arc::new(Stores::load(&storage_in(dir.path())).unwrap());
        stores.users.put("alice", "pw");

        // Stand in for an autosave whose blocking write is still running.
        let guard = stores.save_lock.clone().lock_owned().await;
        let flushing = tokio::spawn({
            let stores = stores.clone();
            async move { stores.flush().await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!flushing.is_finished());
        assert!(!dir.path().join("users.json").exists());

        drop(guard);
        assert!(flushing.await.unwrap().is_empty());
        let reloaded = Stores::load(&storage_in(dir.path())).unwrap();
        assert_eq!(reloaded.users.get("alice").as_deref(), Some("pw"));
        assert!(dir.path().join("tokens.json").exists());
    }

    #[tokio::test]
    async fn test_flush_reports_abandoned_store_and_saves_the_other() {
        let dir = tempdir().unwrap();
        let mut storage = storage_in(dir.path());
        storage.users_path = dir.path().join("missing").join("users.json");
        let stores = Stores::load(&storage).unwrap();
        stores.secrets.put("alice", "s3cret");

        assert_eq!(stores.flush().await, vec!["users"]);
        assert!(!storage.users_path.exists());
        let reloaded = StoreFile::new("tokens", &storage.tokens_path).load().unwrap();
        assert_eq!(reloaded.get("alice").as_deref(), Some("s3cret"));
    }
}

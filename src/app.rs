//! Process-wide session: one store connection and one remote client,
//! opened at startup and closed at shutdown.

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::model::{NewScannedCode, ScanEvent, ScannedCode};
use crate::remote::{HttpRemote, RemoteCodes};
use crate::store::{self, Store};

pub struct App<R = HttpRemote> {
    store: Store,
    remote: R,
}

/// Result of handling one scan: what was written and the refreshed log.
#[derive(Debug)]
pub struct ScanOutcome {
    /// `None` when the payload was a duplicate and duplicates are skipped.
    pub inserted: Option<ScannedCode>,
    pub codes: Vec<ScannedCode>,
}

impl App<HttpRemote> {
    pub fn start(config: &Config) -> store::Result<Self> {
        let store = Store::open(&config.db_path)?;
        let remote = HttpRemote::new(&config.remote);
        Ok(App::with_parts(store, remote))
    }
}

impl<R: RemoteCodes> App<R> {
    pub fn with_parts(store: Store, remote: R) -> Self {
        if let Ok(health) = store.health() {
            if health.status.is_degraded() {
                warn!(status = ?health.status, "scan database is running in degraded mode");
            }
        }
        App { store, remote }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Persist a scan and reload the log.
    pub fn handle_scan(&self, event: ScanEvent, skip_duplicates: bool) -> store::Result<ScanOutcome> {
        if skip_duplicates && self.store.exists(&event.data)? {
            debug!(data = %event.data, "skipping duplicate scan");
            return Ok(ScanOutcome {
                inserted: None,
                codes: self.store.list()?,
            });
        }

        let inserted = self.store.insert_code(&NewScannedCode::from(event))?;
        info!(id = %inserted.id, kind = %inserted.kind, "recorded scan");

        Ok(ScanOutcome {
            inserted: Some(inserted),
            codes: self.store.list()?,
        })
    }

    pub fn shutdown(self) -> store::Result<()> {
        self.store.close()
    }
}

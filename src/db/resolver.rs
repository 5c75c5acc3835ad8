//! Driver resolution.
//!
//! Turns a descriptor into a connection URL plus an engine. Async drivers are
//! preferred; when none can serve the database, resolution falls back to the
//! blocking driver and the database runs through the blocking thread pool.

use crate::db::driver::{self, DefaultEngineFactory, DriverError, EngineFactory};
use crate::db::engine::Engine;
use crate::db::url::ConnectionUrl;
use crate::error::{DbError, DbResult};
use crate::models::DatabaseDescriptor;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Outcome of resolving one descriptor.
#[derive(Debug)]
pub struct Resolution {
    pub url: ConnectionUrl,
    pub engine: Engine,
}

impl Resolution {
    pub fn is_async(&self) -> bool {
        self.engine.is_async()
    }
}

/// Chooses a driver and builds the engine for each descriptor.
#[derive(Clone)]
pub struct DriverResolver {
    factory: Arc<dyn EngineFactory>,
}

impl DriverResolver {
    pub fn new(factory: Arc<dyn EngineFactory>) -> Self {
        Self { factory }
    }

    /// Resolve `descriptor` into an engine.
    ///
    /// With an explicit driver, only that driver is tried: asynchronously
    /// first, then in blocking mode. Without one, each known async driver for
    /// the kind is tried in order before falling back to the kind's default
    /// blocking driver. Errors other than "unavailable" abort resolution.
    pub fn resolve(&self, descriptor: &DatabaseDescriptor) -> DbResult<Resolution> {
        let explicit = descriptor.explicit_driver();
        let candidates = match explicit {
            Some(name) => vec![name],
            None => driver::async_candidates(&descriptor.kind),
        };

        for candidate in candidates {
            let url = ConnectionUrl::from_descriptor(descriptor, Some(candidate));
            match self.factory.create_async_engine(&url) {
                Ok(engine) => {
                    debug!(url = %url, "Resolved async engine");
                    return Ok(Resolution {
                        url,
                        engine: Engine::Async(engine),
                    });
                }
                Err(e @ (DriverError::NotInstalled { .. } | DriverError::NotAsyncCapable { .. })) => {
                    debug!(url = %url, reason = %e, "Async driver unavailable");
                }
                Err(DriverError::Other { message }) => {
                    return Err(DbError::configuration(format!(
                        "Failed to create engine for {}: {}",
                        url, message
                    )));
                }
            }
        }

        let url = ConnectionUrl::from_descriptor(descriptor, explicit);
        let engine = self.factory.create_sync_engine(&url).map_err(|e| {
            DbError::configuration(format!("No usable driver for {}: {}", url, e))
        })?;

        if explicit.is_none() {
            warn!(
                url = %url,
                "No async driver available; queries will run on the blocking thread pool"
            );
        } else {
            debug!(url = %url, "Resolved blocking engine");
        }

        Ok(Resolution {
            url,
            engine: Engine::Sync(engine),
        })
    }
}

impl Default for DriverResolver {
    fn default() -> Self {
        Self::new(Arc::new(DefaultEngineFactory))
    }
}

impl fmt::Debug for DriverResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverResolver").finish_non_exhaustive()
    }
}

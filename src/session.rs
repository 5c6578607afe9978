// Coldstash cold-storage backup.
// Copyright 2026 Martin Pool.

// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.

//! The collaborators used by one run, built once at startup.

use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{debug, info};

use crate::gateway::DummyGateway;
use crate::{ArchiveGateway, Compressor, Config, Error, JsonStore, MetadataStore, Result, Vault};

/// Metadata store, gateway and compressor for a run.
#[derive(Debug, Clone)]
pub struct Session {
    store: Arc<dyn MetadataStore>,
    gateway: Arc<dyn ArchiveGateway>,
    compressor: Arc<dyn Compressor>,
}

/// How to connect to the service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionOptions {
    /// Fabricate uploads rather than sending anything.
    pub dummy_upload: bool,
    /// Take the store's lease, breaking any existing one.
    pub break_lock: bool,
    /// Don't take a lease, for commands that only read the store.
    pub read_only: bool,
}

impl Session {
    pub fn new(
        store: Arc<dyn MetadataStore>,
        gateway: Arc<dyn ArchiveGateway>,
        compressor: Arc<dyn Compressor>,
    ) -> Session {
        Session {
            store,
            gateway,
            compressor,
        }
    }

    /// Open the configured store and connect to the configured service.
    ///
    /// Fails if the account id or database is missing.
    pub fn from_config(config: &Config, options: SessionOptions) -> Result<Session> {
        let account_id = config.account_id()?;
        let database = config.database()?;
        let store = if options.read_only {
            JsonStore::open(database)?
        } else {
            JsonStore::open_locked(database, options.break_lock)?
        };
        debug!(path = ?store.path(), locked = store.is_locked(), "Opened metadata store");
        let gateway: Arc<dyn ArchiveGateway> = if options.dummy_upload {
            Arc::new(DummyGateway::new())
        } else {
            glacier_gateway(config, account_id)?
        };
        Ok(Session::new(
            Arc::new(store),
            gateway,
            config.compressor().compressor(),
        ))
    }

    pub fn store(&self) -> &dyn MetadataStore {
        self.store.as_ref()
    }

    pub fn gateway(&self) -> &dyn ArchiveGateway {
        self.gateway.as_ref()
    }

    pub fn compressor(&self) -> &dyn Compressor {
        self.compressor.as_ref()
    }

    /// Create a vault at the service and record it.
    ///
    /// A vault already recorded under this name is refused before contacting
    /// the service.
    pub fn create_vault(&self, name: &str) -> Result<Vault> {
        if self.store.vault_by_name(name)?.is_some() {
            return Err(Error::VaultExists {
                name: name.to_owned(),
            });
        }
        let location = self.gateway.create_vault(name)?;
        let vault = Vault {
            name: name.to_owned(),
            location,
            created: OffsetDateTime::now_utc(),
        };
        self.store.create_vault(vault.clone())?;
        info!(%name, location = %vault.location, "Created vault");
        Ok(vault)
    }
}

#[cfg(feature = "glacier")]
fn glacier_gateway(config: &Config, account_id: &str) -> Result<Arc<dyn ArchiveGateway>> {
    use crate::gateway::glacier::{GlacierGateway, GlacierOptions};
    Ok(Arc::new(GlacierGateway::new(&GlacierOptions {
        account_id: account_id.to_owned(),
        profile: config.aws_profile.clone(),
        region: config.region.clone(),
    })?))
}

#[cfg(not(feature = "glacier"))]
fn glacier_gateway(_config: &Config, _account_id: &str) -> Result<Arc<dyn ArchiveGateway>> {
    Err(Error::GlacierNotBuilt)
}

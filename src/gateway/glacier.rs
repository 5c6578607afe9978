// Coldstash cold-storage backup.
// Copyright 2023-2026 Martin Pool.

// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.

//! Access to AWS Glacier vaults.

// This needs AWS credentials and a real vault, so it's exercised by hand
// rather than by the test suite, and skipped by mutation testing.

use std::fmt;
use std::path::Path;

use aws_config::{AppName, BehaviorVersion};
use aws_sdk_glacier::primitives::ByteStream;
use aws_types::region::Region;
use tokio::runtime::Runtime;
use tracing::{debug, info, trace_span};

use super::{check_receipt, ArchiveGateway, Error, ErrorKind, Result, UploadReceipt};
use crate::TreeHash;

/// Settings for connecting to Glacier.
#[derive(Debug, Clone, Default)]
pub struct GlacierOptions {
    /// AWS account that owns the vaults.
    pub account_id: String,
    /// Named profile from the AWS config files.
    pub profile: Option<String>,
    pub region: Option<String>,
}

pub struct GlacierGateway {
    /// Tokio runtime specifically for Glacier IO.
    ///
    /// The SDK is built on Tokio but the rest of Coldstash is synchronous.
    /// Each call blocks the calling thread until the request is complete.
    runtime: Runtime,
    client: aws_sdk_glacier::Client,
    account_id: String,
}

impl fmt::Debug for GlacierGateway {
    #[mutants::skip] // unimportant to test
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlacierGateway")
            .field("account_id", &self.account_id)
            .finish()
    }
}

#[mutants::skip]
impl GlacierGateway {
    pub fn new(options: &GlacierOptions) -> Result<GlacierGateway> {
        let create_error = |source: Box<dyn std::error::Error + Send + Sync>| Error {
            kind: ErrorKind::CreateGateway,
            vault: None,
            source: Some(source),
        };
        // Like in <https://tokio.rs/tokio/topics/bridging>.
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| create_error(Box::new(err)))?;
        let app_name = AppName::new(format!("coldstash-{}", crate::version()))
            .map_err(|err| create_error(Box::new(err)))?;
        let mut loader = aws_config::defaults(BehaviorVersion::latest()).app_name(app_name);
        if let Some(profile) = &options.profile {
            loader = loader.profile_name(profile);
        }
        if let Some(region) = &options.region {
            loader = loader.region(Region::new(region.clone()));
        }
        let config = runtime.block_on(loader.load());
        debug!(region = ?config.region(), "Loaded AWS config");
        let client = aws_sdk_glacier::Client::new(&config);
        Ok(GlacierGateway {
            runtime,
            client,
            account_id: options.account_id.clone(),
        })
    }
}

#[mutants::skip]
impl ArchiveGateway for GlacierGateway {
    fn create_vault(&self, name: &str) -> Result<String> {
        let _span = trace_span!("GlacierGateway::create_vault", %name).entered();
        let request = self
            .client
            .create_vault()
            .account_id(&self.account_id)
            .vault_name(name);
        let response = self
            .runtime
            .block_on(request.send())
            .map_err(|err| Error::new(ErrorKind::CreateVault, name).with_source(err))?;
        let location = response
            .location()
            .ok_or_else(|| Error::new(ErrorKind::IncompleteResponse, name))?
            .to_owned();
        info!(%name, %location, "Created vault");
        Ok(location)
    }

    fn upload(
        &self,
        vault: &str,
        description: &str,
        bundle: &Path,
        tree_hash: &TreeHash,
    ) -> Result<UploadReceipt> {
        let _span = trace_span!("GlacierGateway::upload", %vault, %description).entered();
        let body = self
            .runtime
            .block_on(ByteStream::from_path(bundle))
            .map_err(|err| Error::new(ErrorKind::Upload, vault).with_source(err))?;
        let request = self
            .client
            .upload_archive()
            .account_id(&self.account_id)
            .vault_name(vault)
            .archive_description(description)
            .checksum(tree_hash.to_string())
            .body(body);
        let response = self
            .runtime
            .block_on(request.send())
            .map_err(|err| Error::new(ErrorKind::Upload, vault).with_source(err))?;
        let incomplete = || Error::new(ErrorKind::IncompleteResponse, vault);
        let checksum = response
            .checksum()
            .ok_or_else(incomplete)?
            .parse::<TreeHash>()
            .map_err(|err| incomplete().with_source(err))?;
        let receipt = UploadReceipt {
            archive_id: response.archive_id().ok_or_else(incomplete)?.to_owned(),
            location: response.location().ok_or_else(incomplete)?.to_owned(),
            checksum,
        };
        debug!(archive_id = %receipt.archive_id, "Upload complete");
        check_receipt(vault, receipt, tree_hash)
    }

    fn delete(&self, vault: &str, archive_id: &str) -> Result<()> {
        let _span = trace_span!("GlacierGateway::delete", %vault, %archive_id).entered();
        let request = self
            .client
            .delete_archive()
            .account_id(&self.account_id)
            .vault_name(vault)
            .archive_id(archive_id);
        match self.runtime.block_on(request.send()) {
            Ok(_) => Ok(()),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_resource_not_found_exception()) =>
            {
                debug!("Archive was already gone");
                Ok(())
            }
            Err(err) => Err(Error::new(ErrorKind::Delete, vault).with_source(err)),
        }
    }
}

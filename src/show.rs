// Coldstash cold-storage backup.
// Copyright 2018-2026 Martin Pool.

// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.

//! Text output of what the metadata store holds.

use std::collections::BTreeSet;
use std::io::{BufWriter, Write};

use time::format_description::well_known::Rfc3339;

use crate::*;

/// Print a vault's location and the names of bundles with an active version.
pub fn show_vault_paths(store: &dyn MetadataStore, vault: &str, w: &mut dyn Write) -> Result<()> {
    let vault = store.vault_by_name(vault)?.ok_or_else(|| Error::VaultNotFound {
        name: vault.to_owned(),
    })?;
    let names: BTreeSet<String> = store
        .list_versions(&vault.name)?
        .into_iter()
        .filter(BundleVersion::is_active)
        .map(|v| v.bundle_name)
        .collect();
    let mut bw = BufWriter::new(w);
    writeln!(bw, "Vault: {}", vault.name)?;
    writeln!(bw, "\tLocation: {}", vault.location)?;
    writeln!(bw, "\tBundles:")?;
    for name in names {
        writeln!(bw, "\t\t{name}")?;
    }
    bw.flush()?;
    Ok(())
}

/// Print every tracked version in a vault, one per line, oldest first.
pub fn show_versions(store: &dyn MetadataStore, vault: &str, w: &mut dyn Write) -> Result<()> {
    if store.vault_by_name(vault)?.is_none() {
        return Err(Error::VaultNotFound {
            name: vault.to_owned(),
        });
    }
    let mut bw = BufWriter::new(w);
    for v in store.list_versions(vault)? {
        let created = v
            .created
            .format(&Rfc3339)
            .unwrap_or_else(|_| "-".to_owned());
        writeln!(
            bw,
            "{:<16} {:>12} {} {} {}",
            v.state, v.size, created, v.bundle_name, v.archive_id,
        )?;
    }
    bw.flush()?;
    Ok(())
}

/// Print the names of all recorded vaults.
pub fn show_vaults(store: &dyn MetadataStore, w: &mut dyn Write) -> Result<()> {
    let mut bw = BufWriter::new(w);
    for vault in store.list_vaults()? {
        writeln!(bw, "{}\t{}", vault.name, vault.location)?;
    }
    bw.flush()?;
    Ok(())
}

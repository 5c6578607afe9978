// Copyright 2025-2026 Martin Pool.

// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.

//! A log of operations on a gateway, for testing.

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Call {
    /// What operation?
    pub verb: Verb,
    pub vault: String,
    /// The vault name, bundle description, or archive id the call acted on.
    pub target: String,
}

impl Call {
    pub fn new<V: ToString, T: ToString>(verb: Verb, vault: V, target: T) -> Self {
        Self {
            verb,
            vault: vault.to_string(),
            target: target.to_string(),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Verb {
    CreateVault,
    Upload,
    Delete,
}

//! Ownership gate shared by every mutating entry point.
//!
//! The host authenticates the acting address (`Address::require_auth`); this
//! module decides whether that address may touch a given row.

use soroban_sdk::Address;

use crate::types::Error;

/// Fails with [`Error::Unauthorized`] unless `actor` is `principal`.
pub fn require(actor: &Address, principal: &Address) -> Result<(), Error> {
    if actor != principal {
        return Err(Error::Unauthorized);
    }
    Ok(())
}

/// Row types whose writes are scoped to a single address.
pub trait Owned {
    /// The address allowed to replace or delete the row.
    fn owner(&self) -> &Address;
}

impl Owned for crate::types::User {
    fn owner(&self) -> &Address {
        &self.id
    }
}

impl Owned for crate::types::Coffee {
    fn owner(&self) -> &Address {
        &self.owner
    }
}

//! Insert-or-update and owner-gated delete, shared by the user and coffee tables.

use soroban_sdk::{log, Address, Env, IntoVal, TryFromVal, Val};

use crate::auth::{self, Owned};
use crate::store::Table;
use crate::types::{Error, UpsertOutcome};

/// Who may create a row under a key that does not exist yet.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CreateRule {
    /// Any authenticated caller; the caller becomes the owner.
    AnyCaller,
    /// Only the address the row is about (a user registering itself).
    SubjectOnly,
}

/// Stages `row` under `key` on behalf of `actor`.
///
/// - absent key: the create rule is checked and the row inserted
/// - present key owned by `actor`: the whole row is replaced
/// - present key owned by someone else: nothing is written and
///   [`UpsertOutcome::Rejected`] is returned instead of an error
///
/// `row` must name the owner it will be stored under; a replacement that
/// tries to change the owner is rejected like any other foreign write.
/// `check` validates the row once the caller is known to be allowed to write
/// it, so a foreign write is reported as `Rejected` whatever its contents.
pub fn upsert<K, V, C>(
    table: &mut Table<K, V>,
    key: K,
    actor: &Address,
    row: V,
    rule: CreateRule,
    check: C,
) -> Result<UpsertOutcome, Error>
where
    K: IntoVal<Env, Val> + TryFromVal<Env, Val> + Clone,
    V: IntoVal<Env, Val> + TryFromVal<Env, Val> + Owned + PartialEq,
    C: FnOnce(&V) -> Result<(), Error>,
{
    let existing = match table.find(key.clone()) {
        None => {
            if rule == CreateRule::SubjectOnly {
                auth::require(actor, row.owner())?;
            }
            check(&row)?;
            table.insert(key, actor, row)?;
            return Ok(UpsertOutcome::Inserted);
        }
        Some(existing) => existing,
    };

    if auth::require(actor, existing.owner()).is_err()
        || auth::require(row.owner(), existing.owner()).is_err()
    {
        log!(table.env(), "upsert by {} ignored, row owned by {}", actor.clone(), existing.owner().clone());
        return Ok(UpsertOutcome::Rejected);
    }

    if existing == row {
        return Ok(UpsertOutcome::Unchanged);
    }
    check(&row)?;

    table.update(key, actor, row)?;
    Ok(UpsertOutcome::Updated)
}

/// Stages removal of the row under `key`.
///
/// Fails with the table's not-found error when the key is absent and with
/// [`Error::Unauthorized`] when `actor` does not own the row. `guard` runs
/// after both checks and can veto the delete. Returns the removed row.
pub fn delete<K, V, G>(
    table: &mut Table<K, V>,
    key: K,
    actor: &Address,
    guard: G,
) -> Result<V, Error>
where
    K: IntoVal<Env, Val> + TryFromVal<Env, Val> + Clone,
    V: IntoVal<Env, Val> + TryFromVal<Env, Val> + Owned,
    G: FnOnce(&V) -> Result<(), Error>,
{
    let existing = table.find(key.clone()).ok_or(table.missing())?;
    auth::require(actor, existing.owner())?;
    guard(&existing)?;
    table.erase(key)?;
    Ok(existing)
}

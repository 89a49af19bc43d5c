//! Keyed tables persisted in contract storage.
//!
//! Each table is a single `Map<K, V>` stored under one persistent key, so rows
//! come back ordered by key. Writes are staged on the in-memory map and reach
//! storage only through [`Table::commit`]; an entry point that bails out with
//! an error before committing leaves the stored table untouched.

use soroban_sdk::{log, symbol_short, Address, Env, IntoVal, Map, Symbol, TryFromVal, Val, Vec};

use crate::types::{Coffee, Error, Sale, User};

pub const USERS_KEY: Symbol = symbol_short!("USERS");
pub const COFFEES_KEY: Symbol = symbol_short!("COFFEES");
pub const SALES_KEY: Symbol = symbol_short!("SALES");

const DAY_IN_LEDGERS: u32 = 17_280;
/// A committed table is bumped once its remaining TTL falls below this.
pub const TABLE_TTL_THRESHOLD: u32 = 30 * DAY_IN_LEDGERS;
pub const TABLE_TTL_EXTEND_TO: u32 = 120 * DAY_IN_LEDGERS;

pub struct Table<K, V> {
    env: Env,
    name: Symbol,
    rows: Map<K, V>,
    missing: Error,
    dirty: bool,
}

impl<K, V> Table<K, V>
where
    K: IntoVal<Env, Val> + TryFromVal<Env, Val> + Clone,
    V: IntoVal<Env, Val> + TryFromVal<Env, Val>,
{
    /// Loads the table stored under `name`. A table that was never written
    /// reads as empty. `missing` is the error reported for absent keys.
    pub fn open(env: &Env, name: Symbol, missing: Error) -> Self {
        let rows = env
            .storage()
            .persistent()
            .get(&name)
            .unwrap_or_else(|| Map::new(env));
        Table {
            env: env.clone(),
            name,
            rows,
            missing,
            dirty: false,
        }
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    /// The error this table reports for a key it does not hold.
    pub fn missing(&self) -> Error {
        self.missing
    }

    pub fn find(&self, key: K) -> Option<V> {
        self.rows.get(key)
    }

    pub fn contains(&self, key: K) -> bool {
        self.rows.contains_key(key)
    }

    /// Stages a new row. `payer` is the address charged for the entry; it is
    /// only recorded in the debug log.
    pub fn insert(&mut self, key: K, payer: &Address, row: V) -> Result<(), Error> {
        if self.rows.contains_key(key.clone()) {
            return Err(Error::AlreadyExists);
        }
        self.rows.set(key, row);
        self.dirty = true;
        log!(&self.env, "{} insert staged, payer {}", self.name, payer.clone());
        Ok(())
    }

    /// Stages a full replacement of an existing row.
    pub fn update(&mut self, key: K, payer: &Address, row: V) -> Result<(), Error> {
        if !self.rows.contains_key(key.clone()) {
            return Err(self.missing);
        }
        self.rows.set(key, row);
        self.dirty = true;
        log!(&self.env, "{} update staged, payer {}", self.name, payer.clone());
        Ok(())
    }

    pub fn erase(&mut self, key: K) -> Result<(), Error> {
        self.rows.remove(key).ok_or(self.missing)?;
        self.dirty = true;
        Ok(())
    }

    /// Every row, ascending by key.
    pub fn scan(&self) -> Vec<V> {
        self.rows.values()
    }

    /// Writes staged changes back in a single storage write and extends the
    /// entry's TTL so live tables are not archived. A table with nothing
    /// staged is not written.
    pub fn commit(self) {
        if self.dirty {
            let storage = self.env.storage().persistent();
            storage.set(&self.name, &self.rows);
            storage.extend_ttl(&self.name, TABLE_TTL_THRESHOLD, TABLE_TTL_EXTEND_TO);
        }
    }
}

pub fn users(env: &Env) -> Table<Address, User> {
    Table::open(env, USERS_KEY, Error::UserNotFound)
}

pub fn coffees(env: &Env) -> Table<u64, Coffee> {
    Table::open(env, COFFEES_KEY, Error::CoffeeNotFound)
}

pub fn sales(env: &Env) -> Table<u64, Sale> {
    Table::open(env, SALES_KEY, Error::SaleNotFound)
}

/*!
 * Type Definitions for the Beancoin Marketplace Contract
 *
 * Records stored in the three contract tables (users, coffees, sales), the
 * outcome of an upsert, the error codes surfaced to clients and the symbols
 * used as event topics.
 */

use soroban_sdk::{contracterror, contracttype, symbol_short, Address, String, Symbol};

// ================================================================================================
// RECORDS
// ================================================================================================

/// A registered marketplace participant.
///
/// Rows are keyed by the participant's own address, so there is at most one
/// row per principal. Only the principal itself may create, replace or delete
/// its row.
///
/// # Fields
/// - `role` is stored verbatim; the off-chain services use `consumer` and `producer`
/// - `hash` is the digest of the profile document kept off-chain
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct User {
    /// Primary key, always equal to the address that registered the row
    pub id: Address,

    /// Free-form role label
    pub role: String,

    /// Digest of the off-chain profile
    pub hash: String,
}

/// A coffee lot listed for sale.
///
/// The id is chosen by the caller. Whoever inserts a fresh id becomes the
/// owner, and the owner never changes afterwards: upserts from any other
/// address are ignored rather than applied.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Coffee {
    /// Primary key supplied by the lister
    pub id: u64,

    /// Address that created the listing
    pub owner: Address,

    /// Digest of the off-chain lot description (origin, pictures, certificates)
    pub hash: String,

    /// Unit price in the marketplace's smallest currency unit
    pub price: i64,

    /// Units still available. Requested sales reserve units from this figure
    pub quantity: i64,
}

/// A purchase request against a coffee listing.
///
/// # Lifecycle
/// 1. Requested: created by the buyer, units reserved on the listing
/// 2. Fulfilled: the seller delivered; terminal
/// 3. Cancelled: either party withdrew; reserved units go back to the listing; terminal
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Sale {
    /// Primary key supplied by the buyer
    pub id: u64,

    /// Listing this sale draws from
    pub coffee_id: u64,

    /// Owner of the listing at request time
    pub seller: Address,

    /// Address that requested the sale
    pub buyer: Address,

    /// Units reserved by this sale
    pub quantity: u64,

    /// Current lifecycle state
    pub status: SaleStatus,
}

// ================================================================================================
// ENUMERATIONS
// ================================================================================================

/// Lifecycle state of a [`Sale`].
///
/// Only `Requested` accepts transitions. `Fulfilled` and `Cancelled` are final.
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SaleStatus {
    Requested,
    Fulfilled,
    Cancelled,
}

impl SaleStatus {
    pub fn label(&self) -> &'static str {
        match self {
            SaleStatus::Requested => "requested",
            SaleStatus::Fulfilled => "fulfilled",
            SaleStatus::Cancelled => "cancelled",
        }
    }
}

/// Result of an insert-or-update call that did not abort.
///
/// `Rejected` is deliberately not an error: an upsert on a row owned by
/// somebody else leaves the row untouched and the transaction still commits.
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UpsertOutcome {
    /// No row existed under the key; one was created
    Inserted,

    /// The caller owns the row and every mutable field was replaced
    Updated,

    /// The caller owns the row and the submitted fields equal the stored ones
    Unchanged,

    /// The row belongs to another address; nothing was written
    Rejected,
}

// ================================================================================================
// ERROR DEFINITIONS
// ================================================================================================

/// Errors that abort an entry point.
///
/// Any of these rolls back every write and event of the invocation.
///
/// # Error Code Ranges
/// - 1-9: Entity not found
/// - 10-19: Authorization and access control
/// - 20-29: Business rule violations
/// - 30-39: Technical errors
#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    // ========== Entity Not Found Errors (1-9) ==========

    /// No user row for the given address
    UserNotFound = 1,

    /// No coffee listing under the given id
    CoffeeNotFound = 2,

    /// No sale under the given id
    SaleNotFound = 3,

    // ========== Authorization Errors (10-19) ==========

    /// Acting address does not own the row it tries to change
    Unauthorized = 10,

    /// Named owner or seller is not the owner of the listing
    InvalidOwner = 11,

    /// Mutations are disabled by the admin
    ContractPaused = 12,

    // ========== Business Rule Violations (20-29) ==========

    /// A row already exists under the key being inserted
    AlreadyExists = 20,

    /// The sale id is already taken
    SaleAlreadyExists = 21,

    /// Requested units exceed what the listing has available
    InsufficientQuantity = 22,

    /// A sale must move at least one unit
    InvalidQuantity = 23,

    /// The sale is not in a state that accepts this transition
    InvalidState = 24,

    /// Buyer and seller are the same address
    SelfTrade = 25,

    /// The listing still has requested sales drawing from it
    CoffeeHasOpenSale = 26,

    /// Price or quantity is negative
    InvalidAmount = 27,

    // ========== Technical Errors (30-39) ==========

    /// A notification does not fit in `MAX_MESSAGE_LEN` bytes
    MessageTooLong = 30,

    /// Quantity arithmetic left the representable range
    Overflow = 31,

    /// The admin surface was used before `initialize`
    NotInitialized = 32,
}

// ================================================================================================
// CONSTANTS
// ================================================================================================

/// Upper bound, in bytes, of a composed notification including the recipient prefix
pub const MAX_MESSAGE_LEN: usize = 512;

// ================================================================================================
// EVENT CONSTANTS
// ================================================================================================
// Topics published alongside state changes so indexers can follow the tables
// without replaying every invocation.

/// Contains: (outcome). Published by upsertuser when the row changed
pub const USER_UPSERTED: Symbol = symbol_short!("user_upst");

/// Contains: (). Published by deluser
pub const USER_DELETED: Symbol = symbol_short!("user_del");

/// Contains: (uuid, outcome). Published by upsertcoffee when the row changed
pub const COFFEE_UPSERTED: Symbol = symbol_short!("cof_upst");

/// Contains: (uuid,). Published by delcoffee
pub const COFFEE_DELETED: Symbol = symbol_short!("cof_del");

/// Contains: (uuid, coffee_id, quantity). Published by requestsale
pub const SALE_REQUESTED: Symbol = symbol_short!("sale_req");

/// Contains: (uuid,). Published by fulfillsale
pub const SALE_FULFILLED: Symbol = symbol_short!("sale_ful");

/// Contains: (uuid,). Published by cancelsale
pub const SALE_CANCELLED: Symbol = symbol_short!("sale_canc");

/// Topic of every notification; the second topic is the recipient and the data the text
pub const NOTIFY: Symbol = symbol_short!("notify");

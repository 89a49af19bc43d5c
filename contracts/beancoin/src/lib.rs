/*!
 * Beancoin Marketplace Smart Contract
 *
 * On-chain registry behind the Beancoin coffee marketplace. Three tables are kept
 * in contract storage:
 * - users: one row per address, written only by that address
 * - coffees: listings keyed by a caller-chosen id, writable only by the lister
 * - sales: purchase requests against listings, moving Requested -> Fulfilled | Cancelled
 *
 * Read actions (getuser, getcoffee, getsale) do not return rows. They publish a
 * notification to the address the row is about, the way the off-chain services
 * learn about profile and listing digests.
 *
 * Authorization model:
 * - every mutating action authenticates its acting address with the host first
 * - upserts on a row owned by another address are ignored, not failed
 * - deletes and sale transitions by a non-owner abort the transaction
 * - an optional admin can pause all mutating actions
 */

#![no_std]

mod auth;
mod notify;
mod store;
mod types;
mod upsert;


use soroban_sdk::{contract, contractimpl, log, symbol_short, Address, Env, String, Symbol, Vec};

use notify::Message;
use upsert::CreateRule;

pub use types::{
    Coffee, Error, Sale, SaleStatus, UpsertOutcome, User, COFFEE_DELETED, COFFEE_UPSERTED,
    MAX_MESSAGE_LEN, NOTIFY, SALE_CANCELLED, SALE_FULFILLED, SALE_REQUESTED, USER_DELETED,
    USER_UPSERTED,
};

#[contract]
pub struct BeancoinContract;

// Instance storage: contract-wide settings that live as long as the instance
const ADMIN_KEY: Symbol = symbol_short!("ADMIN");        // Admin address, absent until initialize
const PAUSED_KEY: Symbol = symbol_short!("PAUSED");      // Emergency brake for mutating actions

#[contractimpl]
impl BeancoinContract {
    // ================================================================================================
    // ADMINISTRATION
    // ================================================================================================

    /// Designates the admin that may pause the marketplace.
    ///
    /// Optional: every marketplace action works on an instance that was never
    /// initialized. Can only be called once.
    pub fn initialize(env: Env, admin: Address) {
        if env.storage().instance().has(&ADMIN_KEY) {
            panic!("Contract already initialized");
        }
        admin.require_auth();
        env.storage().instance().set(&ADMIN_KEY, &admin);
        env.storage().instance().set(&PAUSED_KEY, &false);
    }

    fn _require_admin(env: &Env) -> Result<Address, Error> {
        let admin: Address = env
            .storage()
            .instance()
            .get(&ADMIN_KEY)
            .ok_or(Error::NotInitialized)?;
        admin.require_auth();
        Ok(admin)
    }

    /// Emergency brake: every mutating action fails until paused is cleared
    fn _ensure_active(env: &Env) -> Result<(), Error> {
        if env.storage().instance().get(&PAUSED_KEY).unwrap_or(false) {
            return Err(Error::ContractPaused);
        }
        Ok(())
    }

    /// Halts upserts, deletes and sale transitions. Reads keep working.
    ///
    /// # Errors
    /// - NotInitialized: no admin was ever set
    pub fn pause(env: Env) -> Result<(), Error> {
        let admin = Self::_require_admin(&env)?;
        env.storage().instance().set(&PAUSED_KEY, &true);
        env.events().publish((symbol_short!("paused"), admin), ());
        Ok(())
    }

    pub fn unpause(env: Env) -> Result<(), Error> {
        let admin = Self::_require_admin(&env)?;
        env.storage().instance().set(&PAUSED_KEY, &false);
        env.events().publish((symbol_short!("unpaused"), admin), ());
        Ok(())
    }

    /// Hands the admin role to `new_admin`, which must co-sign.
    pub fn update_admin(env: Env, new_admin: Address) -> Result<(), Error> {
        Self::_require_admin(&env)?;
        new_admin.require_auth();
        env.storage().instance().set(&ADMIN_KEY, &new_admin);
        env.events().publish((symbol_short!("adm_upd"), env.current_contract_address()), new_admin);
        Ok(())
    }

    pub fn get_admin(env: Env) -> Option<Address> {
        env.storage().instance().get(&ADMIN_KEY)
    }

    pub fn is_paused(env: Env) -> bool {
        env.storage().instance().get(&PAUSED_KEY).unwrap_or(false)
    }

    // ================================================================================================
    // NOTIFICATIONS
    // ================================================================================================

    /// Delivers `message` to `user`.
    ///
    /// Only the contract itself may send: the host must see the contract's own
    /// address authorizing the call. Actions inside the contract reach the same
    /// sink directly, with the recipient prefixed to the text.
    pub fn notify(env: Env, user: Address, message: String) -> Result<(), Error> {
        env.current_contract_address().require_auth();
        notify::publish(&env, &user, message);
        Ok(())
    }

    // ================================================================================================
    // USERS
    // ================================================================================================

    /// Registers `user` or replaces its role and hash.
    ///
    /// Only the user can register or modify itself. Resubmitting the stored
    /// values returns `Unchanged` and writes nothing.
    ///
    /// # Errors
    /// - ContractPaused: if mutations are halted
    /// - MessageTooLong: if role and hash would not fit in the getuser notification
    pub fn upsertuser(env: Env, user: Address, role: String, hash: String) -> Result<UpsertOutcome, Error> {
        Self::_ensure_active(&env)?;
        user.require_auth();

        let mut users = store::users(&env);
        let row = User {
            id: user.clone(),
            role: role.clone(),
            hash: hash.clone(),
        };
        let outcome = upsert::upsert(&mut users, user.clone(), &user, row, CreateRule::SubjectOnly, |row| {
            // a stored user must always be reportable by getuser
            notify::compose(&row.id, &notify::user_summary(row)?).map(|_| ())
        })?;
        users.commit();

        match outcome {
            UpsertOutcome::Inserted => {
                log!(&env, "Inserted user({}) {} of hash: '{}'.", role, user, hash);
            }
            UpsertOutcome::Updated | UpsertOutcome::Unchanged => {
                log!(&env, "Updated user({}) {} of hash: '{}'.", role, user, hash);
            }
            UpsertOutcome::Rejected => {
                log!(&env, "Unauthorized user upsert prevented.");
            }
        }
        if matches!(outcome, UpsertOutcome::Inserted | UpsertOutcome::Updated) {
            env.events().publish((USER_UPSERTED, user), outcome);
        }

        Ok(outcome)
    }

    /// Removes the caller's own user row.
    ///
    /// # Errors
    /// - ContractPaused: if mutations are halted
    /// - UserNotFound: if the user is not registered
    pub fn deluser(env: Env, user: Address) -> Result<(), Error> {
        Self::_ensure_active(&env)?;
        user.require_auth();

        let mut users = store::users(&env);
        upsert::delete(&mut users, user.clone(), &user, |_| Ok(()))?;
        users.commit();

        log!(&env, "Deleted user {}.", user);
        env.events().publish((USER_DELETED, user), ());
        Ok(())
    }

    /// Sends the user's role and hash to the user itself.
    ///
    /// Anyone may trigger this; the summary goes to the queried address, not
    /// to the caller.
    ///
    /// # Errors
    /// - UserNotFound: if the user is not registered
    pub fn getuser(env: Env, user: Address) -> Result<(), Error> {
        let users = store::users(&env);
        let queried = users.find(user.clone()).ok_or(Error::UserNotFound)?;
        notify::send(&env, &user, &notify::user_summary(&queried)?)
    }

    // ================================================================================================
    // COFFEE LISTINGS
    // ================================================================================================

    /// Creates listing `uuid` owned by `owner`, or replaces it if `owner`
    /// already owns it.
    ///
    /// A listing owned by another address is left exactly as it is and the
    /// call returns `Rejected` without failing, whatever the submitted values.
    ///
    /// # Errors
    /// - ContractPaused: if mutations are halted
    /// - InvalidAmount: if the write is allowed and price or quantity is negative
    /// - MessageTooLong: if the hash would not fit in the getcoffee notification
    pub fn upsertcoffee(
        env: Env,
        owner: Address,
        uuid: u64,
        hash: String,
        price: i64,
        quantity: i64,
    ) -> Result<UpsertOutcome, Error> {
        Self::_ensure_active(&env)?;
        owner.require_auth();

        let mut coffees = store::coffees(&env);
        let row = Coffee {
            id: uuid,
            owner: owner.clone(),
            hash: hash.clone(),
            price,
            quantity,
        };
        let outcome = upsert::upsert(&mut coffees, uuid, &owner, row, CreateRule::AnyCaller, |row| {
            if row.price < 0 || row.quantity < 0 {
                return Err(Error::InvalidAmount);
            }
            // cancelled sales can grow the quantity later, so size the summary for the widest one
            let widest = Coffee {
                quantity: i64::MAX,
                ..row.clone()
            };
            notify::compose(&row.owner, &notify::coffee_summary(&widest)?).map(|_| ())
        })?;
        coffees.commit();

        match outcome {
            UpsertOutcome::Inserted => log!(
                &env,
                "Inserted coffee | Owner: {} | uuid: {} | hash: {} | price: {} | quantity: {}",
                owner, uuid, hash, price, quantity
            ),
            UpsertOutcome::Updated | UpsertOutcome::Unchanged => log!(
                &env,
                "Updated coffee | Owner: {} | uuid: {} | hash: {} | price: {} | quantity: {}",
                owner, uuid, hash, price, quantity
            ),
            UpsertOutcome::Rejected => log!(&env, "Unauthorized coffee upsert prevented."),
        }
        if matches!(outcome, UpsertOutcome::Inserted | UpsertOutcome::Updated) {
            env.events().publish((COFFEE_UPSERTED, owner), (uuid, outcome));
        }

        Ok(outcome)
    }

    /// Removes listing `uuid`. Only its owner may do so, and only while no
    /// requested sale is drawing from it.
    ///
    /// # Errors
    /// - ContractPaused: if mutations are halted
    /// - CoffeeNotFound: if the listing does not exist
    /// - Unauthorized: if `owner` does not own the listing
    /// - CoffeeHasOpenSale: if a requested sale references the listing
    pub fn delcoffee(env: Env, owner: Address, uuid: u64) -> Result<(), Error> {
        Self::_ensure_active(&env)?;
        owner.require_auth();

        let sales = store::sales(&env);
        let mut coffees = store::coffees(&env);
        upsert::delete(&mut coffees, uuid, &owner, |_| {
            let open = sales
                .scan()
                .iter()
                .any(|sale| sale.coffee_id == uuid && sale.status == SaleStatus::Requested);
            if open {
                return Err(Error::CoffeeHasOpenSale);
            }
            Ok(())
        })?;
        coffees.commit();

        log!(&env, "Delete coffee | Owner: {} | uuid: {}", owner, uuid);
        env.events().publish((COFFEE_DELETED, owner), (uuid,));
        Ok(())
    }

    /// Sends the listing's hash, price and quantity to its owner.
    ///
    /// # Errors
    /// - CoffeeNotFound: if the listing does not exist
    /// - InvalidOwner: if `owner` does not own the listing
    pub fn getcoffee(env: Env, owner: Address, uuid: u64) -> Result<(), Error> {
        let coffees = store::coffees(&env);
        let coffee = coffees.find(uuid).ok_or(Error::CoffeeNotFound)?;
        if coffee.owner != owner {
            return Err(Error::InvalidOwner);
        }
        notify::send(&env, &owner, &notify::coffee_summary(&coffee)?)
    }

    // ================================================================================================
    // SALES
    // ================================================================================================

    /// Requests `quantity` units of listing `uuid_coffee` from `seller` on
    /// behalf of `buyer`, recording the request as sale `uuid`.
    ///
    /// The requested units are reserved: they are taken off the listing's
    /// available quantity until the sale is cancelled. The seller is notified.
    ///
    /// # Errors
    /// - ContractPaused: if mutations are halted
    /// - InvalidQuantity: if `quantity` is zero
    /// - SaleAlreadyExists: if `uuid` is taken
    /// - CoffeeNotFound: if the listing does not exist
    /// - InvalidOwner: if `seller` does not own the listing
    /// - SelfTrade: if `buyer` is the seller
    /// - InsufficientQuantity: if the listing has fewer units available
    pub fn requestsale(
        env: Env,
        uuid: u64,
        uuid_coffee: u64,
        seller: Address,
        buyer: Address,
        quantity: u64,
    ) -> Result<(), Error> {
        Self::_ensure_active(&env)?;
        buyer.require_auth();

        if quantity == 0 {
            return Err(Error::InvalidQuantity);
        }

        let mut sales = store::sales(&env);
        if sales.contains(uuid) {
            return Err(Error::SaleAlreadyExists);
        }

        let mut coffees = store::coffees(&env);
        let mut coffee = coffees.find(uuid_coffee).ok_or(Error::CoffeeNotFound)?;
        if coffee.owner != seller {
            return Err(Error::InvalidOwner);
        }
        if buyer == seller {
            return Err(Error::SelfTrade);
        }

        let wanted = i64::try_from(quantity).map_err(|_| Error::InsufficientQuantity)?;
        if wanted > coffee.quantity {
            log!(&env, "Insufficient quantity. Requested: {}, Available: {}", quantity, coffee.quantity);
            return Err(Error::InsufficientQuantity);
        }
        coffee.quantity = coffee.quantity.checked_sub(wanted).ok_or(Error::Overflow)?;

        let sale = Sale {
            id: uuid,
            coffee_id: uuid_coffee,
            seller: seller.clone(),
            buyer: buyer.clone(),
            quantity,
            status: SaleStatus::Requested,
        };
        coffees.update(uuid_coffee, &buyer, coffee)?;
        sales.insert(uuid, &buyer, sale)?;
        coffees.commit();
        sales.commit();

        log!(&env, "requestsale | uuid: {} | coffee: {} | quantity: {}", uuid, uuid_coffee, quantity);
        env.events().publish((SALE_REQUESTED, buyer.clone()), (uuid, uuid_coffee, quantity));

        let mut message = Message::new();
        message
            .push_fmt(format_args!("Sale {} requested | coffee: {} | quantity: {} | buyer: ", uuid, uuid_coffee, quantity))?
            .push_address(&buyer)?;
        notify::send(&env, &seller, &message)
    }

    /// Sends the sale's listing, quantity and status to both its buyer and its seller.
    ///
    /// # Errors
    /// - SaleNotFound: if the sale does not exist
    pub fn getsale(env: Env, uuid: u64) -> Result<(), Error> {
        let sales = store::sales(&env);
        let sale = sales.find(uuid).ok_or(Error::SaleNotFound)?;

        let mut message = Message::new();
        message.push_fmt(format_args!(
            "Sale {} | coffee: {} | quantity: {} | status: {}",
            sale.id,
            sale.coffee_id,
            sale.quantity,
            sale.status.label()
        ))?;
        notify::send(&env, &sale.buyer, &message)?;
        notify::send(&env, &sale.seller, &message)
    }

    /// Marks a requested sale as delivered. Signed by the seller.
    ///
    /// This is where settlement would hook in; no funds move here.
    ///
    /// # Errors
    /// - ContractPaused: if mutations are halted
    /// - SaleNotFound: if the sale does not exist
    /// - InvalidState: if the sale is not `Requested`
    pub fn fulfillsale(env: Env, uuid: u64) -> Result<(), Error> {
        Self::_ensure_active(&env)?;

        let mut sales = store::sales(&env);
        let mut sale = sales.find(uuid).ok_or(Error::SaleNotFound)?;
        sale.seller.require_auth();

        if sale.status != SaleStatus::Requested {
            return Err(Error::InvalidState);
        }
        sale.status = SaleStatus::Fulfilled;

        let seller = sale.seller.clone();
        let buyer = sale.buyer.clone();
        sales.update(uuid, &seller, sale)?;
        sales.commit();

        log!(&env, "fulfillsale | uuid: {}", uuid);
        env.events().publish((SALE_FULFILLED, seller), (uuid,));

        let mut message = Message::new();
        message.push_fmt(format_args!("Sale {} fulfilled", uuid))?;
        notify::send(&env, &buyer, &message)
    }

    /// Withdraws a requested sale. Either party may cancel.
    ///
    /// Reserved units return to the listing if it still exists, and the other
    /// party is notified.
    ///
    /// # Errors
    /// - ContractPaused: if mutations are halted
    /// - SaleNotFound: if the sale does not exist
    /// - Unauthorized: if `participant` is neither buyer nor seller
    /// - InvalidState: if the sale is not `Requested`
    pub fn cancelsale(env: Env, uuid: u64, participant: Address) -> Result<(), Error> {
        Self::_ensure_active(&env)?;
        participant.require_auth();

        let mut sales = store::sales(&env);
        let mut sale = sales.find(uuid).ok_or(Error::SaleNotFound)?;

        let counterparty = if participant == sale.buyer {
            sale.seller.clone()
        } else if participant == sale.seller {
            sale.buyer.clone()
        } else {
            return Err(Error::Unauthorized);
        };
        if sale.status != SaleStatus::Requested {
            return Err(Error::InvalidState);
        }

        let mut coffees = store::coffees(&env);
        if let Some(mut coffee) = coffees.find(sale.coffee_id) {
            let reserved = i64::try_from(sale.quantity).map_err(|_| Error::Overflow)?;
            coffee.quantity = coffee.quantity.checked_add(reserved).ok_or(Error::Overflow)?;
            coffees.update(sale.coffee_id, &participant, coffee)?;
        }

        sale.status = SaleStatus::Cancelled;
        sales.update(uuid, &participant, sale)?;
        coffees.commit();
        sales.commit();

        log!(&env, "cancelsale | uuid: {} | by: {}", uuid, participant);
        env.events().publish((SALE_CANCELLED, participant.clone()), (uuid,));

        let mut message = Message::new();
        message
            .push_fmt(format_args!("Sale {} cancelled by ", uuid))?
            .push_address(&participant)?;
        notify::send(&env, &counterparty, &message)
    }

    // ================================================================================================
    // QUERY FUNCTIONS (GETTERS)
    // ================================================================================================
    // Plain reads for clients and indexers; unlike getuser/getcoffee/getsale
    // they return the rows and notify nobody.

    pub fn find_user(env: Env, user: Address) -> Option<User> {
        store::users(&env).find(user)
    }

    pub fn find_coffee(env: Env, uuid: u64) -> Option<Coffee> {
        store::coffees(&env).find(uuid)
    }

    pub fn find_sale(env: Env, uuid: u64) -> Option<Sale> {
        store::sales(&env).find(uuid)
    }

    /// All users, ascending by address.
    pub fn list_users(env: Env) -> Vec<User> {
        store::users(&env).scan()
    }

    /// All listings, ascending by id.
    pub fn list_coffees(env: Env) -> Vec<Coffee> {
        store::coffees(&env).scan()
    }

    /// All sales in every state, ascending by id.
    pub fn list_sales(env: Env) -> Vec<Sale> {
        store::sales(&env).scan()
    }
}

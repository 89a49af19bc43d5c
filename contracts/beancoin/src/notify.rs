//! Outbound notifications.
//!
//! A notification is a contract event with topics `("notify", recipient)` and
//! the text `"<recipient> <message>"` as data. It is published under the
//! contract's own address and travels with the invocation: if the invocation
//! fails, the host drops the event together with every storage write.

use core::fmt;

use soroban_sdk::{log, Address, Env, String};

use crate::types::{Coffee, Error, User, MAX_MESSAGE_LEN, NOTIFY};

/// Fixed-capacity text buffer for composing notifications without an allocator.
pub struct Message {
    buf: [u8; MAX_MESSAGE_LEN],
    len: usize,
}

impl Message {
    pub fn new() -> Self {
        Message {
            buf: [0; MAX_MESSAGE_LEN],
            len: 0,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    fn reserve(&mut self, extra: usize) -> Result<core::ops::Range<usize>, Error> {
        let end = self.len.checked_add(extra).ok_or(Error::MessageTooLong)?;
        if end > MAX_MESSAGE_LEN {
            return Err(Error::MessageTooLong);
        }
        let range = self.len..end;
        self.len = end;
        Ok(range)
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) -> Result<&mut Self, Error> {
        let range = self.reserve(bytes.len())?;
        self.buf[range].copy_from_slice(bytes);
        Ok(self)
    }

    pub fn push_str(&mut self, s: &str) -> Result<&mut Self, Error> {
        self.push_bytes(s.as_bytes())
    }

    pub fn push_string(&mut self, s: &String) -> Result<&mut Self, Error> {
        let range = self.reserve(s.len() as usize)?;
        s.copy_into_slice(&mut self.buf[range]);
        Ok(self)
    }

    pub fn push_address(&mut self, address: &Address) -> Result<&mut Self, Error> {
        self.push_string(&address.to_string())
    }

    /// Appends formatted numbers and labels.
    pub fn push_fmt(&mut self, args: fmt::Arguments) -> Result<&mut Self, Error> {
        fmt::Write::write_fmt(self, args).map_err(|_| Error::MessageTooLong)?;
        Ok(self)
    }

    pub fn to_soroban(&self, env: &Env) -> String {
        String::from_bytes(env, self.as_bytes())
    }
}

impl Default for Message {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Write for Message {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.push_str(s).map(|_| ()).map_err(|_| fmt::Error)
    }
}

/// Body of the `getuser` notification.
pub fn user_summary(user: &User) -> Result<Message, Error> {
    let mut message = Message::new();
    message
        .push_str("User role: '")?
        .push_string(&user.role)?
        .push_str("' | User hash: '")?
        .push_string(&user.hash)?
        .push_str("'")?;
    Ok(message)
}

/// Body of the `getcoffee` notification.
pub fn coffee_summary(coffee: &Coffee) -> Result<Message, Error> {
    let mut message = Message::new();
    message
        .push_fmt(format_args!("Coffee {} | hash: '", coffee.id))?
        .push_string(&coffee.hash)?
        .push_fmt(format_args!("' | price: {} | quantity: {}", coffee.price, coffee.quantity))?;
    Ok(message)
}

/// The full text delivered to `recipient`: its address, a space, then `body`.
pub fn compose(recipient: &Address, body: &Message) -> Result<Message, Error> {
    let mut line = Message::new();
    line.push_address(recipient)?.push_str(" ")?.push_bytes(body.as_bytes())?;
    Ok(line)
}

/// Prefixes `body` with the recipient's address and publishes it to `recipient`.
pub fn send(env: &Env, recipient: &Address, body: &Message) -> Result<(), Error> {
    let line = compose(recipient, body)?;
    publish(env, recipient, line.to_soroban(env));
    Ok(())
}

/// Publishes `text` to `recipient` as is.
pub fn publish(env: &Env, recipient: &Address, text: String) {
    log!(env, "notify {}: {}", recipient.clone(), text.clone());
    env.events().publish((NOTIFY, recipient.clone()), text);
}

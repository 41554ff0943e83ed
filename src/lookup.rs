//! The caller-owned datastore contract: resolve a recovered signature key
//! back to its payload record.
//!
//! Modeled as the blocking option from the design notes (the only genuine
//! asynchrony in the system is this collaborator; callers on an async
//! runtime should wrap their store access in a blocking adapter before
//! handing it to `detect`, rather than this crate taking on an async
//! runtime dependency it otherwise has no use for).

use crate::payload::Payload;

pub trait Lookup {
    /// `key` is the canonical UUID-formatted signature key string.
    fn lookup(&self, key: &str) -> Option<Payload>;
}

impl<F> Lookup for F
where
    F: Fn(&str) -> Option<Payload>,
{
    fn lookup(&self, key: &str) -> Option<Payload> {
        self(key)
    }
}

//! Parties: the customers and vendors that orders and invoices refer to.
//!
//! Pure domain logic, no IO. A party may carry a stable unique key so that
//! well-known parties (the generic vendor) can be found without knowing their id.

pub mod party;

pub use party::{
    Party, PartyCommand, PartyEvent, PartyId, PartyKind, PartyRegistered, PartyRenamed,
    RegisterParty, RenameParty,
};

//! Providers Module - External Collaborators
//!
//! Node access (blocks, subscriptions, contract calls) and the token store backend.

pub mod chain;
pub mod supabase;

pub use chain::*;
pub use supabase::*;

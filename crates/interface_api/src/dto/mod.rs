//! Request and response types

pub mod claims;

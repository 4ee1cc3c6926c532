//! Row types and DTOs.

pub mod account;
pub mod georegion;

//! Zero-sized repositories over `&PgPool`.

pub mod account_repo;
pub mod georegion_repo;

pub use account_repo::AccountRepo;
pub use georegion_repo::GeoRegionRepo;

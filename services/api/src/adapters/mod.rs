pub mod db;
pub mod google;
pub mod memory;

pub use db::PgUserRepository;
pub use google::GoogleIdentityVerifier;
pub use memory::InMemoryUserRepository;

//! Database access for the Waymark service

pub mod init;
pub mod venue_cache;

pub use init::init_database;

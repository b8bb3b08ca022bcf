pub mod client_store;
pub mod import;
pub mod sessions;
pub mod worker;

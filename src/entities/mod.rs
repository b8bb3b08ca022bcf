pub mod prelude;

pub mod clients;

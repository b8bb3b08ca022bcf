pub use super::clients::Entity as Clients;

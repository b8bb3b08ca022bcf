pub mod owner;
pub mod request_id;

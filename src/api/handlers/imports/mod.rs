pub mod stream;
pub mod types;
pub mod upload;

pub use types::*;

pub use stream::{import_chunked, import_stream, session_status};
pub use upload::{import_clients, import_json, import_multi_sheet};

pub mod request;

pub use request::{parse_id, JsonBody, QueryParams};

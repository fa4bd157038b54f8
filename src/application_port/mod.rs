mod request;
mod user_service;

pub use request::*;
pub use user_service::*;

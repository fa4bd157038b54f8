mod user_cache;
mod user_service_impl;

pub use user_cache::*;
pub use user_service_impl::*;

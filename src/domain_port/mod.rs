mod db_session;

pub use db_session::*;

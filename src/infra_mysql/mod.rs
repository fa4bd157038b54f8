mod session_mysql;

pub use session_mysql::*;

mod util;

mod preferences;
mod user;
mod userid;

pub use preferences::*;
pub use user::*;
pub use userid::*;

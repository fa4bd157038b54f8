mod session_memory;

pub use session_memory::*;

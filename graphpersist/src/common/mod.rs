mod constants;
mod context;
mod util;

pub use constants::*;
pub use context::*;
pub use util::*;

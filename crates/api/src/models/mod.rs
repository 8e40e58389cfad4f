pub mod library;
pub mod output;
pub mod split;
pub mod symbol;

pub use library::*;
pub use output::*;
pub use split::*;
pub use symbol::*;

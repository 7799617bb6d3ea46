pub mod entities;
pub mod enums;
pub mod repositories;
pub mod types;

pub use entities::*;
pub use enums::*;
pub use types::*;

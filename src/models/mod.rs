pub mod enums;
pub mod analysis;
pub mod plant;
pub mod garden;

pub use analysis::*;
pub use enums::*;
pub use garden::*;
pub use plant::*;

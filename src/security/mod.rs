pub mod access_control;
pub mod directory;
pub mod policy;

pub use access_control::*;
pub use directory::*;
pub use policy::*;

pub mod layer;
pub mod query;
pub mod store;
pub mod symbology;
pub mod system;
pub mod vector;

pub use layer::*;
pub use store::*;
pub use symbology::*;

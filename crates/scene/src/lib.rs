pub mod camera;
pub mod interaction;
pub mod picking;
pub mod render;
pub mod viewport;

pub use camera::*;
pub use interaction::*;
pub use render::*;
pub use viewport::*;

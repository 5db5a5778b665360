pub mod engine;
pub mod error;
pub mod geom;
mod handle;
pub mod scene;
pub mod sim;

// Prelude
pub use error::{Error, Result};
pub use geom::point::Point;
pub use geom::vector::Vector;
pub use handle::EntityHandle;

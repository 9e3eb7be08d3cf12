mod component;
mod render;
mod state;
mod types;

pub use component::TechTreeCanvas;
pub use types::{SharedProgress, share};

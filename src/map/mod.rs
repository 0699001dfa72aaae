mod geometry;
pub mod layers;
mod projection;
mod renderer;

pub use layers::{Category, Label, LayerRegistry};
pub use projection::Viewport;
pub use renderer::{MapLayers, MapRenderer};

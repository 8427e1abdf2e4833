mod canvas;
mod renderer;
mod transform;

pub use canvas::{Canvas, Surface};
pub use renderer::Renderer;
pub use transform::{ScreenMode, ScreenRect, Viewport, ViewportError};

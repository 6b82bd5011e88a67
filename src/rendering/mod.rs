//! Page template rendering.

mod template_renderer;

pub use template_renderer::{MAX_NESTING_DEPTH, RenderContext, RenderValue, TemplateRenderer};

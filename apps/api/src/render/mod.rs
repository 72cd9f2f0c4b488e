// Presentation / print layer: stateless HTML rendering of a toolkit into four
// paper-sized sheets. Interactive-only controls carry the `no-print` class.

pub mod handlers;
pub mod sheets;

pub use sheets::{render_toolkit, RenderMode};

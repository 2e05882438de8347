pub mod engine;
mod geometry;
pub mod projection;
mod spatial;
mod surface;

pub use engine::{EngineEvent, MapEngine, MapOptions, MarkerId, MarkerKind, MarkerStyle};
pub use surface::{MarkerGlyph, SurfaceFrame, TerminalMap};

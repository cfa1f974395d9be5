//! Clipstack Compose Engine
//!
//! Combines a main clip and an overlay clip into a single vertically
//! stacked output file. The engine probes both inputs with `ffprobe`,
//! plans the output geometry and a randomized overlay offset, builds a
//! single `ffmpeg` invocation, and reports live progress while the
//! encoder runs.
//!
//! The encoder and prober are treated as opaque external processes; the
//! engine owns validation, timing, and progress reporting only.

pub mod compose;
pub mod invocation;
pub mod plan;
pub mod probe;
pub mod progress;

pub use compose::{
    compose, compose_job, ComposeJob, ComposeOptions, ComposeProgress, ComposeReport,
    ProgressCallback,
};
pub use invocation::EncodeSettings;
pub use plan::{build_plan, CompositionPlan, LayoutConfig};
pub use probe::{probe_media, MediaProbe};

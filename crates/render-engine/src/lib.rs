//! Kamishibai Render Engine
//!
//! Offline rendering pipeline that turns an ordered scene list
//! into one finished video file through an external encoder.
//!
//! # Pipeline Architecture
//!
//! ```text
//! project.json ──┐
//!                ├── Narration (cache / synthesize)
//! audio cache ───┘         │
//!                          ├── Duration Resolution (silence padding)
//!                          │
//!              per scene:  ├── Base Clip (image loop / video trim / filler)
//!                          ├── Subtitle Burn-In (band + wrapped text)
//!                          ├── Audio Mux (padded narration / mix / retain)
//!                          ▼
//!                  scene_NNN.mp4 ...
//!                          │
//!                          ├── Concat (stream copy)
//!                          ▼
//!                      output.mp4
//! ```

pub mod compose;
pub mod duration;
pub mod encoder;
pub mod font;
pub mod pipeline;
pub mod scene;
pub mod subtitle;

pub use compose::VideoComposer;
pub use duration::{resolve, resolve_scene, SILENCE_PAD_SECS};
pub use encoder::{Encoder, FfmpegEncoder};
pub use font::{select_font, FixedFont, FontResolver, SystemFontResolver};
pub use pipeline::{
    export, export_project, ExportContext, ExportJob, ExportProgress, ExportStage,
    ProgressCallback,
};
pub use scene::{AudioPolicy, RenderJob, RenderStage, SceneRenderer};
pub use subtitle::{escape_filter_path, escape_filter_value, wrap_subtitle};

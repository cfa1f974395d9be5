//! Encoder invocation construction.
//!
//! Builds the argument list and filter graph for a single `ffmpeg` run
//! from a [`CompositionPlan`]. Nothing here touches the process table.

use serde::{Deserialize, Serialize};

use crate::plan::CompositionPlan;

/// Encoder parameters. Defaults favor speed over compression; callers
/// may tune them but never have to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodeSettings {
    /// Encoder binary (default: ffmpeg). Overridable for tests.
    pub ffmpeg_bin: String,

    /// Video codec (default: libx264).
    pub video_codec: String,

    /// Encoder speed preset (default: ultrafast).
    pub video_preset: String,

    /// Constant rate factor (default: 28).
    pub video_crf: u32,

    /// Audio codec (default: aac).
    pub audio_codec: String,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            ffmpeg_bin: "ffmpeg".to_string(),
            video_codec: "libx264".to_string(),
            video_preset: "ultrafast".to_string(),
            video_crf: 28,
            audio_codec: "aac".to_string(),
        }
    }
}

/// Build the filter graph: reset the main clip's timestamps and scale it,
/// trim the overlay at the plan offset for the main duration, then stack
/// the two streams vertically with the main clip on top.
pub fn build_filter_graph(plan: &CompositionPlan) -> String {
    format!(
        "[0:v]setpts=PTS-STARTPTS,scale={w}:{main_h}[main];\
         [1:v]trim=start={start:.6}:duration={dur:.6},setpts=PTS-STARTPTS,scale={w}:{overlay_h}[overlay];\
         [main][overlay]vstack=inputs=2[vout]",
        w = plan.width,
        main_h = plan.main_height,
        overlay_h = plan.overlay_height,
        start = plan.overlay_start_secs,
        dur = plan.main_duration_secs,
    )
}

/// Build the full `ffmpeg` argument list for a plan.
///
/// Maps the stacked video plus the main input's audio when present
/// (`0:a?` keeps a missing audio stream non-fatal), and requests the
/// machine-readable progress stream on stdout alongside the normal
/// stderr diagnostics.
pub fn build_ffmpeg_args(plan: &CompositionPlan, settings: &EncodeSettings) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-i".to_string(),
        plan.main_path.display().to_string(),
        "-i".to_string(),
        plan.overlay_path.display().to_string(),
        "-filter_complex".to_string(),
        build_filter_graph(plan),
        "-map".to_string(),
        "[vout]".to_string(),
        "-map".to_string(),
        "0:a?".to_string(),
        "-c:v".to_string(),
        settings.video_codec.clone(),
        "-preset".to_string(),
        settings.video_preset.clone(),
        "-crf".to_string(),
        settings.video_crf.to_string(),
        "-c:a".to_string(),
        settings.audio_codec.clone(),
        "-progress".to_string(),
        "pipe:1".to_string(),
        plan.output_path.display().to_string(),
    ]
}

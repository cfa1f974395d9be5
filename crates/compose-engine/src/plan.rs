//! Composition planning: split geometry and overlay offset selection.

use clipstack_common::{ClipstackError, ClipstackResult};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::compose::ComposeJob;
use crate::probe::MediaProbe;
use std::path::PathBuf;

/// Vertical split layout for the stacked output.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Fraction of the output height given to the main clip, in (0, 1).
    /// The overlay clip receives the remainder.
    pub main_height_fraction: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            main_height_fraction: 0.7,
        }
    }
}

impl LayoutConfig {
    /// Fraction of the output height given to the overlay clip.
    pub fn overlay_height_fraction(&self) -> f64 {
        1.0 - self.main_height_fraction
    }

    /// Reject fractions outside the open interval (0, 1).
    pub fn validate(&self) -> ClipstackResult<()> {
        let f = self.main_height_fraction;
        if !f.is_finite() || f <= 0.0 || f >= 1.0 {
            return Err(ClipstackError::config(format!(
                "main_height_fraction must lie in (0, 1), got {f}"
            )));
        }
        Ok(())
    }
}

/// Fully resolved plan for one composition. Immutable once built;
/// consumed by the invocation builder.
#[derive(Debug, Clone)]
pub struct CompositionPlan {
    /// Main clip path (top of the stack, audio source).
    pub main_path: PathBuf,

    /// Overlay clip path (bottom of the stack).
    pub overlay_path: PathBuf,

    /// Output file path.
    pub output_path: PathBuf,

    /// Output width in pixels (taken from the main clip).
    pub width: u32,

    /// Pixel height of the main segment.
    pub main_height: u32,

    /// Pixel height of the overlay segment.
    pub overlay_height: u32,

    /// Duration of the main clip in seconds.
    pub main_duration_secs: f64,

    /// Where in the overlay clip the trimmed segment starts.
    pub overlay_start_secs: f64,
}

/// Build a composition plan from two probes and a layout.
///
/// The overlay start offset is drawn uniformly from
/// `[0, max(0, overlay_duration - main_duration)]`, so the trimmed
/// overlay segment never runs past the end of its source. When the
/// overlay is shorter than the main clip the offset is forced to zero
/// and the segment simply comes out shorter (no stretching).
///
/// The RNG is injected so callers can substitute a seeded generator.
pub fn build_plan(
    job: &ComposeJob,
    layout: &LayoutConfig,
    main: &MediaProbe,
    overlay: &MediaProbe,
    rng: &mut impl Rng,
) -> ClipstackResult<CompositionPlan> {
    layout.validate()?;

    let max_start = (overlay.duration_secs - main.duration_secs).max(0.0);
    let overlay_start_secs = if max_start > 0.0 {
        rng.gen_range(0.0..=max_start)
    } else {
        0.0
    };

    let main_height = (main.height as f64 * layout.main_height_fraction) as u32;
    let overlay_height = (main.height as f64 * layout.overlay_height_fraction()) as u32;

    Ok(CompositionPlan {
        main_path: job.main_path.clone(),
        overlay_path: job.overlay_path.clone(),
        output_path: job.output_path.clone(),
        width: main.width,
        main_height,
        overlay_height,
        main_duration_secs: main.duration_secs,
        overlay_start_secs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn job() -> ComposeJob {
        ComposeJob {
            main_path: PathBuf::from("clip1.mp4"),
            overlay_path: PathBuf::from("overlay.mp4"),
            output_path: PathBuf::from("output.mp4"),
        }
    }

    fn probe(width: u32, height: u32, duration_secs: f64) -> MediaProbe {
        MediaProbe {
            width,
            height,
            duration_secs,
        }
    }

    #[test]
    fn test_offset_within_slack_for_longer_overlay() {
        // main=10s, overlay=30s: offset must land in [0, 20].
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let plan = build_plan(
                &job(),
                &LayoutConfig::default(),
                &probe(1080, 1000, 10.0),
                &probe(1080, 1920, 30.0),
                &mut rng,
            )
            .unwrap();
            assert!(plan.overlay_start_secs >= 0.0);
            assert!(plan.overlay_start_secs <= 20.0);
        }
    }

    #[test]
    fn test_offset_forced_to_zero_for_shorter_overlay() {
        let mut rng = StdRng::seed_from_u64(7);
        let plan = build_plan(
            &job(),
            &LayoutConfig::default(),
            &probe(1080, 1920, 10.0),
            &probe(1080, 1920, 5.0),
            &mut rng,
        )
        .unwrap();
        assert_eq!(plan.overlay_start_secs, 0.0);
    }

    #[test]
    fn test_split_heights_truncate() {
        // height=1000, fraction=0.7: 700 over 300.
        let mut rng = StdRng::seed_from_u64(7);
        let plan = build_plan(
            &job(),
            &LayoutConfig::default(),
            &probe(1080, 1000, 10.0),
            &probe(1080, 1920, 30.0),
            &mut rng,
        )
        .unwrap();
        assert_eq!(plan.main_height, 700);
        assert_eq!(plan.overlay_height, 300);
        assert_eq!(plan.width, 1080);
    }

    #[test]
    fn test_seeded_rng_is_reproducible() {
        let build = || {
            let mut rng = StdRng::seed_from_u64(42);
            build_plan(
                &job(),
                &LayoutConfig::default(),
                &probe(1080, 1920, 10.0),
                &probe(1080, 1920, 120.0),
                &mut rng,
            )
            .unwrap()
            .overlay_start_secs
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn test_invalid_fraction_rejected() {
        let mut rng = StdRng::seed_from_u64(7);
        for fraction in [0.0, 1.0, -0.1, 1.5, f64::NAN] {
            let layout = LayoutConfig {
                main_height_fraction: fraction,
            };
            assert!(build_plan(
                &job(),
                &layout,
                &probe(1080, 1920, 10.0),
                &probe(1080, 1920, 30.0),
                &mut rng,
            )
            .is_err());
        }
    }

    proptest! {
        #[test]
        fn prop_offset_never_exceeds_overlay_slack(
            main_secs in 0.1f64..600.0,
            overlay_secs in 0.1f64..600.0,
            seed in any::<u64>(),
        ) {
            let mut rng = StdRng::seed_from_u64(seed);
            let plan = build_plan(
                &job(),
                &LayoutConfig::default(),
                &probe(1080, 1920, main_secs),
                &probe(1080, 1920, overlay_secs),
                &mut rng,
            )
            .unwrap();

            prop_assert!(plan.overlay_start_secs >= 0.0);
            if overlay_secs >= main_secs {
                prop_assert!(plan.overlay_start_secs <= overlay_secs - main_secs);
            } else {
                prop_assert_eq!(plan.overlay_start_secs, 0.0);
            }
        }

        #[test]
        fn prop_split_heights_never_overshoot(
            height in 1u32..4320,
            fraction in 0.01f64..0.99,
        ) {
            let mut rng = StdRng::seed_from_u64(0);
            let layout = LayoutConfig {
                main_height_fraction: fraction,
            };
            let plan = build_plan(
                &job(),
                &layout,
                &probe(1080, height, 10.0),
                &probe(1080, height, 30.0),
                &mut rng,
            )
            .unwrap();

            prop_assert!(plan.main_height + plan.overlay_height <= height);
        }
    }
}

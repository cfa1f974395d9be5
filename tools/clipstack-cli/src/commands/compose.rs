//! Compose a main clip and an overlay clip into one stacked output.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use clipstack_common::config::AppConfig;
use clipstack_compose_engine::compose::{
    compose_job, ComposeJob, ComposeOptions, ComposeProgress, ProgressCallback,
};
use clipstack_compose_engine::invocation::EncodeSettings;
use clipstack_compose_engine::plan::LayoutConfig;

#[allow(clippy::too_many_arguments)]
pub async fn run(
    config: &AppConfig,
    main: PathBuf,
    overlay: PathBuf,
    output: PathBuf,
    main_fraction: Option<f64>,
    preset: Option<String>,
    crf: Option<u32>,
    seed: Option<u64>,
    timeout_secs: Option<u64>,
) -> anyhow::Result<()> {
    let defaults = &config.compose;
    let opts = ComposeOptions {
        layout: LayoutConfig {
            main_height_fraction: main_fraction.unwrap_or(defaults.main_height_fraction),
        },
        encode: EncodeSettings {
            video_codec: defaults.video_codec.clone(),
            video_preset: preset.unwrap_or_else(|| defaults.video_preset.clone()),
            video_crf: crf.unwrap_or(defaults.video_crf),
            audio_codec: defaults.audio_codec.clone(),
            ..EncodeSettings::default()
        },
        timeout: timeout_secs.map(Duration::from_secs),
        seed,
        ..ComposeOptions::default()
    };

    println!("Composing stacked video");
    println!("  Main clip: {}", main.display());
    println!("  Overlay clip: {}", overlay.display());
    println!("  Output: {}", output.display());

    let job = ComposeJob {
        main_path: main,
        overlay_path: overlay,
        output_path: output.clone(),
    };

    let progress_cb: ProgressCallback = Box::new(|p: ComposeProgress| {
        print!(
            "\r  Progress: {:.1}% ({:.1}s / {:.1}s, elapsed: {:.1}s)  ",
            p.percent, p.out_time_secs, p.total_secs, p.elapsed_secs,
        );
        let _ = std::io::stdout().flush();
    });

    match compose_job(job, opts, Some(progress_cb)).await {
        Ok(report) => {
            println!(
                "\nComposition complete: {} ({:.1}s of video in {:.1}s, overlay offset {:.2}s)",
                report.output_path.display(),
                report.total_secs,
                report.elapsed_secs,
                report.overlay_start_secs,
            );
            Ok(())
        }
        Err(e) => {
            println!("\nComposition failed: {e}");
            Err(e.into())
        }
    }
}

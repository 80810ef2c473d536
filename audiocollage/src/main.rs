mod cli;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context};
use audiocollage_core::{plan_clips, run_with_progress, Config, ProgressEvent};
use indicatif::{HumanDuration, ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::debug;

use crate::cli::build_cli;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let matches = build_cli().get_matches();

    let input_dir = matches
        .get_one::<PathBuf>("dir")
        .expect("defaulted argument");
    if !input_dir.is_dir() {
        return Err(anyhow!(
            "input directory does not exist: {}",
            input_dir.display()
        ));
    }

    let output_path = matches
        .get_one::<PathBuf>("out")
        .expect("defaulted argument");
    let clip_length = *matches
        .get_one::<Duration>("length")
        .expect("defaulted argument");
    let clip_count = *matches
        .get_one::<usize>("count")
        .expect("defaulted argument");
    let seed = matches.get_one::<u64>("seed").copied();
    let dry_run = matches.get_flag("dry-run");

    let config = Config::builder(input_dir, output_path, clip_length)
        .clip_count(clip_count)
        .seed(seed)
        .build()
        .with_context(|| {
            format!(
                "failed to create configuration for '{}'",
                input_dir.display()
            )
        })?;
    debug!("configuration: {config:?}");

    if dry_run {
        let plan = plan_clips(&config)
            .with_context(|| format!("failed to plan clips from '{}'", input_dir.display()))?;

        if plan.clips.is_empty() {
            println!("Dry run: no clips would be generated.");
        } else {
            println!(
                "Dry run: would generate {} clip(s) (seed {}):",
                plan.clips.len(),
                plan.seed
            );
            for clip in plan.clips {
                println!(
                    "  {} {:.3} {:.3}",
                    clip.path.display(),
                    clip.start_seconds,
                    clip.end_seconds
                );
            }
        }

        return Ok(());
    }

    let sample_rate = f64::from(config.signal.sample_rate);
    let progress = ProgressBar::new(clip_count as u64);
    progress.set_draw_target(ProgressDrawTarget::stderr());
    let bar_style = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    progress.set_style(bar_style);

    let progress_handle = progress.clone();
    let mut reporter = move |event: ProgressEvent| match event {
        ProgressEvent::Scanned {
            files,
            total_duration,
        } => {
            progress_handle.set_message(format!(
                "{files} file(s), {} of audio",
                HumanDuration(total_duration)
            ));
        }
        ProgressEvent::Start { clips } => {
            progress_handle.set_length(clips as u64);
            progress_handle.enable_steady_tick(Duration::from_millis(100));
        }
        ProgressEvent::Clip { index, path, .. } => {
            progress_handle.set_position(index as u64);
            let name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            progress_handle.set_message(name);
        }
        ProgressEvent::Finish => {
            progress_handle.set_position(clip_count as u64);
            progress_handle.set_message(String::from("Completed"));
        }
    };

    let result = run_with_progress(config, &mut reporter)
        .with_context(|| format!("failed to write '{}'", output_path.display()));

    progress.finish_and_clear();

    let summary = result?;
    println!(
        "Wrote {} clip(s), {:.3}s, to {} (seed {})",
        summary.clips_written,
        summary.frames_written as f64 / sample_rate,
        output_path.display(),
        summary.seed
    );

    Ok(())
}

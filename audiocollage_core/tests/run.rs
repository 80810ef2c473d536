use audiocollage_core::{
    plan_clips, run, run_with_progress, AudioBackend, ClipPipeline, CollageError, Config,
    OutputAccumulator, ProgressEvent, ProgressReporter, SignalDescriptor,
};
use std::error::Error;
use std::fs::{self, File};
use std::io::Write;
use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;
use tempfile::tempdir;

/// Generate WAV fixtures for the tests at runtime.
///
/// `sample` receives the frame index and returns the value written to every
/// channel of that frame, so tests can recognise where output audio came from.
fn write_tone<P: AsRef<Path>>(
    path: P,
    sample_rate: u32,
    channels: u16,
    frames: u32,
    sample: impl Fn(u32) -> i16,
) -> Result<(), Box<dyn Error>> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for frame in 0..frames {
        let value = sample(frame);
        for _ in 0..channels {
            writer.write_sample(value)?;
        }
    }
    writer.finalize()?;
    Ok(())
}

fn write_sine<P: AsRef<Path>>(
    path: P,
    sample_rate: u32,
    channels: u16,
    duration_ms: u32,
) -> Result<(), Box<dyn Error>> {
    let frames = (u64::from(sample_rate) * u64::from(duration_ms) / 1_000) as u32;
    write_tone(path, sample_rate, channels, frames, |n| {
        let theta = (n as f32 / sample_rate as f32) * 2.0 * std::f32::consts::PI * 440.0;
        (theta.sin() * i16::MAX as f32 * 0.5) as i16
    })
}

fn output_frames(path: &Path) -> Result<u32, Box<dyn Error>> {
    let reader = hound::WavReader::open(path)?;
    assert_eq!(reader.spec().sample_rate, 44_100);
    assert_eq!(reader.spec().channels, 2);
    assert_eq!(reader.spec().bits_per_sample, 16);
    Ok(reader.duration())
}

fn generate(
    source: &Path,
    start: f64,
    length: f64,
    output_path: &Path,
) -> Result<u64, Box<dyn Error>> {
    generate_buffered(source, start, length, output_path, 1_024)
}

fn generate_buffered(
    source: &Path,
    start: f64,
    length: f64,
    output_path: &Path,
    buffer_frames: usize,
) -> Result<u64, Box<dyn Error>> {
    let backend = AudioBackend::new();
    let buffer_frames = NonZeroUsize::new(buffer_frames).expect("non-zero");
    let pipeline = ClipPipeline::new(&backend, buffer_frames);
    let mut output = OutputAccumulator::create(output_path, SignalDescriptor::CD_QUALITY)?;
    let report = pipeline.generate_clip(source, start, length, &mut output)?;
    assert_eq!(output.close()?, report.frames_appended);
    Ok(report.frames_appended)
}

#[test]
fn clip_from_matching_source_has_exact_length() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let source = work_dir.path().join("stereo.wav");
    write_sine(&source, 44_100, 2, 2_000)?;
    let output_path = work_dir.path().join("out.wav");

    let frames = generate(&source, 0.0, 0.75, &output_path)?;

    assert_eq!(frames, 33_075);
    assert_eq!(output_frames(&output_path)?, 33_075);
    work_dir.close()?;
    Ok(())
}

#[test]
fn clip_starting_past_the_end_appends_nothing() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let source = work_dir.path().join("short.wav");
    write_sine(&source, 44_100, 2, 500)?;
    let output_path = work_dir.path().join("out.wav");

    assert_eq!(generate(&source, 0.5, 1.0, &output_path)?, 0);
    assert_eq!(generate(&source, 10.0, 1.0, &output_path)?, 0);
    assert_eq!(output_frames(&output_path)?, 0);
    work_dir.close()?;
    Ok(())
}

#[test]
fn clip_overlapping_the_end_is_truncated() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let source = work_dir.path().join("one_second.wav");
    write_sine(&source, 44_100, 2, 1_000)?;
    let output_path = work_dir.path().join("out.wav");

    let frames = generate(&source, 0.75, 1.0, &output_path)?;

    assert_eq!(frames, 11_025);
    work_dir.close()?;
    Ok(())
}

#[test]
fn clip_is_taken_from_the_requested_offset() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let source = work_dir.path().join("ramp.wav");
    write_tone(&source, 44_100, 2, 44_100, |frame| (frame % 30_000) as i16)?;
    let output_path = work_dir.path().join("out.wav");

    let frames = generate(&source, 0.5, 0.01, &output_path)?;
    assert_eq!(frames, 441);

    let samples: Vec<i16> = hound::WavReader::open(&output_path)?
        .samples::<i16>()
        .collect::<Result<_, _>>()?;
    let first = i32::from(samples[0]);
    let last = i32::from(samples[samples.len() - 1]);
    assert!((first - 22_050).abs() <= 1, "first sample {first}");
    assert!((last - 22_490).abs() <= 1, "last sample {last}");
    work_dir.close()?;
    Ok(())
}

#[test]
fn mono_low_rate_source_is_conformed() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let source = work_dir.path().join("mono.wav");
    write_sine(&source, 8_000, 1, 1_000)?;
    let output_path = work_dir.path().join("out.wav");

    let frames = generate(&source, 0.0, 0.5, &output_path)?;

    assert_eq!(frames, 22_050);
    let samples: Vec<i16> = hound::WavReader::open(&output_path)?
        .samples::<i16>()
        .collect::<Result<_, _>>()?;
    assert_eq!(samples.len(), 44_100);
    for frame in samples.chunks_exact(2) {
        assert_eq!(frame[0], frame[1], "mono source must be duplicated");
    }
    work_dir.close()?;
    Ok(())
}

#[test]
fn high_rate_surround_source_is_conformed() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let source = work_dir.path().join("surround.wav");
    write_sine(&source, 48_000, 6, 1_000)?;
    let output_path = work_dir.path().join("out.wav");

    let frames = generate(&source, 0.25, 0.5, &output_path)?;

    assert_eq!(frames, 22_050);
    work_dir.close()?;
    Ok(())
}

#[test]
fn resampled_clip_length_does_not_depend_on_buffer_size() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let source = work_dir.path().join("mono48k.wav");
    write_sine(&source, 48_000, 1, 1_000)?;

    for buffer_frames in [1, 2, 3, 5, 64, 4_096] {
        let output_path = work_dir.path().join(format!("out_{buffer_frames}.wav"));
        let frames = generate_buffered(&source, 0.0, 0.3, &output_path, buffer_frames)?;
        assert_eq!(frames, 13_230, "buffer of {buffer_frames} frame(s)");

        let tail_path = work_dir.path().join(format!("tail_{buffer_frames}.wav"));
        let tail = generate_buffered(&source, 0.9, 0.5, &tail_path, buffer_frames)?;
        assert_eq!(tail, 4_410, "tail with buffer of {buffer_frames} frame(s)");
    }
    work_dir.close()?;
    Ok(())
}

#[test]
fn failed_clip_leaves_earlier_clips_readable() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let source = work_dir.path().join("tone.wav");
    write_sine(&source, 44_100, 2, 1_000)?;
    let output_path = work_dir.path().join("out.wav");

    let backend = AudioBackend::new();
    let pipeline = ClipPipeline::new(&backend, NonZeroUsize::new(1_024).expect("non-zero"));
    let mut output = OutputAccumulator::create(&output_path, SignalDescriptor::CD_QUALITY)?;

    let report = pipeline.generate_clip(&source, 0.0, 0.5, &mut output)?;
    assert_eq!(report.frames_appended, 22_050);

    let gone = work_dir.path().join("gone.wav");
    match pipeline.generate_clip(&gone, 0.0, 0.5, &mut output) {
        Err(CollageError::OpenSource { path, .. }) => assert_eq!(path, gone),
        other => panic!("unexpected result: {other:?}"),
    }
    drop(output);

    assert_eq!(output_frames(&output_path)?, 22_050);
    work_dir.close()?;
    Ok(())
}

#[test]
fn run_with_zero_clips_writes_an_empty_container() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let corpus_dir = work_dir.path().join("corpus");
    fs::create_dir(&corpus_dir)?;
    let output_path = work_dir.path().join("out.wav");

    let config = Config::builder(&corpus_dir, &output_path, Duration::from_secs(1))
        .clip_count(0)
        .build()?;
    let summary = run(config)?;

    assert_eq!(summary.clips_written, 0);
    assert_eq!(summary.frames_written, 0);
    assert_eq!(output_frames(&output_path)?, 0);
    work_dir.close()?;
    Ok(())
}

#[test]
fn run_fills_count_clips_in_draw_order() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let corpus_dir = work_dir.path().join("corpus");
    fs::create_dir_all(corpus_dir.join("nested"))?;
    write_sine(corpus_dir.join("a.wav"), 44_100, 2, 3_000)?;
    write_sine(corpus_dir.join("nested").join("b.wav"), 22_050, 1, 2_000)?;
    let output_path = work_dir.path().join("out.wav");

    let config = Config::builder(&corpus_dir, &output_path, Duration::from_millis(400))
        .clip_count(8)
        .seed(Some(99))
        .build()?;

    let plan = plan_clips(&config)?;
    assert_eq!(plan.seed, 99);
    assert_eq!(plan.clips.len(), 8);
    let durations = |path: &Path| if path.ends_with("a.wav") { 3.0 } else { 2.0 };
    let expected: f64 = plan
        .clips
        .iter()
        .map(|clip| clip.end_seconds.min(durations(&clip.path)) - clip.start_seconds)
        .sum();

    let summary = run(config)?;
    assert_eq!(summary.corpus_files, 2);
    assert!((summary.corpus_seconds - 5.0).abs() < 1e-9);
    assert_eq!(summary.seed, 99);

    let frames = output_frames(&output_path)?;
    assert_eq!(u64::from(frames), summary.frames_written);
    let expected_frames = expected * 44_100.0;
    assert!(
        (frames as f64 - expected_frames).abs() <= 8.0 * 2.0,
        "wrote {frames} frames, expected about {expected_frames}"
    );
    assert!(f64::from(frames) <= 8.0 * 0.4 * 44_100.0 + 8.0);
    work_dir.close()?;
    Ok(())
}

#[test]
fn unseeded_plan_reports_the_seed_it_drew_with() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let corpus_dir = work_dir.path().join("corpus");
    fs::create_dir(&corpus_dir)?;
    write_sine(corpus_dir.join("a.wav"), 44_100, 2, 1_000)?;
    write_sine(corpus_dir.join("b.wav"), 8_000, 1, 4_000)?;
    let output_path = work_dir.path().join("out.wav");

    let builder = || Config::builder(&corpus_dir, &output_path, Duration::from_millis(200));
    let unseeded = plan_clips(&builder().clip_count(6).build()?)?;
    let replayed = plan_clips(&builder().clip_count(6).seed(Some(unseeded.seed)).build()?)?;
    assert_eq!(unseeded, replayed);

    let summary = run(builder().clip_count(6).seed(Some(unseeded.seed)).build()?)?;
    assert_eq!(summary.seed, unseeded.seed);
    work_dir.close()?;
    Ok(())
}

#[test]
fn identical_seeds_produce_identical_output() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let corpus_dir = work_dir.path().join("corpus");
    fs::create_dir(&corpus_dir)?;
    write_sine(corpus_dir.join("a.wav"), 44_100, 2, 1_000)?;
    write_tone(corpus_dir.join("b.wav"), 16_000, 1, 32_000, |n| (n % 512) as i16)?;

    let mut outputs = Vec::new();
    for name in ["first.wav", "second.wav"] {
        let output_path = work_dir.path().join(name);
        let config = Config::builder(&corpus_dir, &output_path, Duration::from_millis(250))
            .clip_count(5)
            .seed(Some(7))
            .build()?;
        run(config)?;
        outputs.push(fs::read(&output_path)?);
    }

    assert_eq!(outputs[0], outputs[1]);
    work_dir.close()?;
    Ok(())
}

#[test]
fn unreadable_files_are_left_out_of_the_corpus() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let corpus_dir = work_dir.path().join("corpus");
    fs::create_dir(&corpus_dir)?;
    write_sine(corpus_dir.join("tone.wav"), 44_100, 2, 500)?;
    File::create(corpus_dir.join("notes.txt"))?.write_all(b"not an audio file")?;
    File::create(corpus_dir.join("empty.wav"))?;

    let output_path = work_dir.path().join("out.wav");
    let config = Config::builder(&corpus_dir, &output_path, Duration::from_millis(100))
        .clip_count(3)
        .build()?;
    let summary = run(config)?;

    assert_eq!(summary.corpus_files, 1);
    work_dir.close()?;
    Ok(())
}

#[test]
fn output_inside_the_corpus_is_not_sampled() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    write_sine(work_dir.path().join("tone.wav"), 44_100, 2, 500)?;
    let output_path = work_dir.path().join("out.wav");

    for _ in 0..2 {
        let config = Config::builder(work_dir.path(), &output_path, Duration::from_millis(100))
            .clip_count(2)
            .build()?;
        let summary = run(config)?;
        assert_eq!(summary.corpus_files, 1);
    }
    work_dir.close()?;
    Ok(())
}

#[test]
fn requesting_clips_from_an_empty_corpus_fails() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let corpus_dir = work_dir.path().join("corpus");
    fs::create_dir(&corpus_dir)?;
    File::create(corpus_dir.join("readme.md"))?.write_all(b"# nothing to hear")?;

    let output_path = work_dir.path().join("out.wav");
    let config = Config::builder(&corpus_dir, &output_path, Duration::from_secs(1))
        .clip_count(1)
        .build()?;
    let err = run(config).expect_err("an empty corpus cannot be sampled");
    assert!(matches!(err, CollageError::EmptyCorpus));
    work_dir.close()?;
    Ok(())
}

#[test]
fn missing_destination_directory_is_reported() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    write_sine(work_dir.path().join("tone.wav"), 44_100, 2, 500)?;
    let output_path = work_dir.path().join("missing").join("out.wav");

    let config = Config::builder(work_dir.path(), &output_path, Duration::from_millis(100))
        .clip_count(1)
        .build()?;
    match run(config) {
        Err(CollageError::OpenDestination { path, .. }) => assert_eq!(path, output_path),
        other => panic!("unexpected result: {other:?}"),
    }
    work_dir.close()?;
    Ok(())
}

struct RecordingProgress {
    events: Vec<ProgressEvent>,
}

impl ProgressReporter for RecordingProgress {
    fn report(&mut self, event: ProgressEvent) {
        self.events.push(event);
    }
}

#[test]
fn run_limits_block_size_and_reports_progress() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let corpus_dir = work_dir.path().join("corpus");
    fs::create_dir(&corpus_dir)?;
    write_sine(corpus_dir.join("tone.wav"), 48_000, 2, 1_000)?;

    let buffer_frames = NonZeroUsize::new(32).expect("non-zero");
    let output_path = work_dir.path().join("out.wav");
    let config = Config::builder(&corpus_dir, &output_path, Duration::from_millis(200))
        .clip_count(3)
        .seed(Some(3))
        .buffer_frames(buffer_frames)
        .build()?;

    let mut progress = RecordingProgress { events: Vec::new() };
    let summary = run_with_progress(config, &mut progress)?;

    assert!(summary.peak_block_frames > 0, "expected audio to flow");
    assert!(
        summary.peak_block_frames <= buffer_frames.get(),
        "peak block {} exceeded buffer size {}",
        summary.peak_block_frames,
        buffer_frames
    );

    assert!(matches!(
        progress.events.first(),
        Some(ProgressEvent::Scanned { files: 1, .. })
    ));
    assert!(matches!(
        progress.events.get(1),
        Some(ProgressEvent::Start { clips: 3 })
    ));
    let clips: Vec<usize> = progress
        .events
        .iter()
        .filter_map(|event| match event {
            ProgressEvent::Clip { index, .. } => Some(*index),
            _ => None,
        })
        .collect();
    assert_eq!(clips, vec![0, 1, 2]);
    assert_eq!(progress.events.last(), Some(&ProgressEvent::Finish));
    work_dir.close()?;
    Ok(())
}

mod audio;
mod cli;
mod detectors;
mod error;
mod filters;
mod json;
mod output;
mod segmenter;
mod states;

use std::path::Path;
use std::process::ExitCode;

use clap::{CommandFactory, Parser};

use audio::Audio;
use cli::{Cli, Settings};
use detectors::cut_points;
use error::SliceError;
use json::FileReport;
use output::Output;
use segmenter::{OutputLayout, plan};

fn slice_file(settings: &Settings, input: &Path) -> Result<FileReport, SliceError> {
    let original = Audio::open(input)?;
    output!("[+] file:               {}", input.display());
    output!("[+] sample rate:        {}", original.sample_rate);
    output!("[+] channels:           {}", original.channels);
    output!("[+] duration:           {:.3}s", original.duration_secs());

    let conditioned = filters::condition(&original, &settings.filters);
    let signal = conditioned.loudness();

    let mut detector = settings.detection.detector(&signal);
    let progress = Output::new(settings.no_progress, signal.len() as u64);
    let cuts = cut_points(&signal, detector.as_mut(), settings.keep_intro, &progress);
    progress.finish();
    if cuts.is_empty() {
        output!("[+] no audio to slice");
    }

    let segments = plan(&cuts, settings.max_slices);
    if segments.len() < cuts.slices() {
        output!(
            "[+] keeping {} of {} slices",
            segments.len(),
            cuts.slices()
        );
    }

    let layout = OutputLayout::new(&settings.destination, input, &settings.format);
    if let Some(dir) = layout.directory() {
        output!("[+] output directory:   {}", dir.display());
    }
    let slices = segmenter::export(
        &original,
        &segments,
        &layout,
        settings.fade,
        settings.json.is_some(),
    )?;
    output!("[+] wrote {} slices", slices.len());

    Ok(FileReport {
        input: input.display().to_string(),
        cut_points: cuts.as_slice().to_vec(),
        slices,
    })
}

fn run(args: &Cli) -> Result<(), SliceError> {
    let settings = args.settings()?;
    output!("[+] detection:          {}", settings.detection.name());

    let mut reports = Vec::with_capacity(settings.files.len());
    for input in &settings.files {
        reports.push(slice_file(&settings, input)?);
    }

    if let Some(path) = &settings.json {
        json::write_json(path, &settings, &reports)?;
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Cli::parse();
    output::set_verbosity(args.quiet, args.debug);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("failure: {err}");
            eprintln!("{}", Cli::command().render_help());
            ExitCode::from(1)
        }
    }
}

use anyhow::{Context, Result, bail};
use clap::{Arg, Command};
use std::path::Path;

use mmlc::{compile_multi_track, compile_single_track, validate_mml};

#[cfg(feature = "player")]
use mmlc::{MidirOutput, Player};

#[derive(Debug, PartialEq)]
enum FileFormat {
    Midi,
    Mml,
}

fn detect_file_format(file_path: &str) -> FileFormat {
    let extension = Path::new(file_path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase());

    match extension.as_deref() {
        Some("mid") | Some("midi") | Some("smf") => FileFormat::Midi,
        _ => FileFormat::Mml,
    }
}

fn main() -> Result<()> {
    let matches = Command::new("mmlc")
        .version(env!("CARGO_PKG_VERSION"))
        .about("MML to MIDI compiler and player")
        .arg(
            Arg::new("input")
                .help("MML input files; several compile as one multi-track file")
                .value_name("INPUT")
                .num_args(0..)
                .index(1),
        )
        .arg(
            Arg::new("eval")
                .help("Literal MML string instead of a file (repeatable)")
                .short('e')
                .long("eval")
                .value_name("MML")
                .action(clap::ArgAction::Append),
        )
        .arg(
            Arg::new("output")
                .help("Write the compiled MIDI bytes to this path")
                .short('o')
                .long("output")
                .value_name("FILE"),
        )
        .arg(
            Arg::new("check")
                .help("Validate the MML syntax and report, without compiling")
                .long("check")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("play")
                .help("Stream the result to a MIDI output device")
                .long("play")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("device")
                .help("MIDI output device (case-insensitive substring match)")
                .long("device")
                .value_name("NAME"),
        )
        .arg(
            Arg::new("list-devices")
                .help("List available MIDI output devices and exit")
                .long("list-devices")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("ticks-per-quarter")
                .help("MIDI resolution in ticks per quarter note")
                .long("ticks-per-quarter")
                .value_name("N")
                .default_value("480")
                .value_parser(clap::value_parser!(u16).range(1..=32767)),
        )
        .arg(
            Arg::new("verbose")
                .help("Enable verbose output")
                .short('v')
                .long("verbose")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let verbose = matches.get_flag("verbose");
    let check = matches.get_flag("check");
    let play = matches.get_flag("play");
    let ticks_per_quarter = *matches
        .get_one::<u16>("ticks-per-quarter")
        .expect("has a default");

    if matches.get_flag("list-devices") {
        return list_devices();
    }

    let input_files: Vec<&String> = matches.get_many::<String>("input").unwrap_or_default().collect();
    let eval_sources: Vec<&String> = matches.get_many::<String>("eval").unwrap_or_default().collect();

    if input_files.is_empty() && eval_sources.is_empty() {
        bail!("no input: pass one or more MML files or --eval strings");
    }

    // A ready-made MIDI file streams directly, without compiling.
    if play && input_files.len() == 1 && eval_sources.is_empty() {
        let input = input_files[0];
        if detect_file_format(input) == FileFormat::Midi {
            let bytes = std::fs::read(input)
                .with_context(|| format!("Failed to read MIDI file: {}", input))?;
            return play_bytes(&bytes, matches.get_one::<String>("device"), verbose);
        }
    }

    // (label, MML text) per track, files first, in argument order.
    let mut sources: Vec<(String, String)> = Vec::new();
    for input in &input_files {
        if detect_file_format(input) == FileFormat::Midi {
            bail!("{}: MIDI files can only be used with --play", input);
        }
        let text = std::fs::read_to_string(input)
            .with_context(|| format!("Failed to read input file: {}", input))?;
        sources.push((input.to_string(), text));
    }
    for (i, text) in eval_sources.iter().enumerate() {
        sources.push((format!("--eval #{}", i + 1), text.to_string()));
    }

    if check {
        let mut all_valid = true;
        for (label, text) in &sources {
            let (valid, message) = validate_mml(text);
            println!("{}: {}", label, message);
            all_valid &= valid;
        }
        if !all_valid {
            bail!("validation failed");
        }
        return Ok(());
    }

    if verbose {
        println!(
            "Compiling {} track(s) at {} ticks per quarter note",
            sources.len(),
            ticks_per_quarter
        );
    }

    let bytes = if sources.len() == 1 {
        compile_single_track(&sources[0].1, ticks_per_quarter)?
    } else {
        let texts: Vec<&str> = sources.iter().map(|(_, text)| text.as_str()).collect();
        compile_multi_track(&texts, ticks_per_quarter)?
    };

    if verbose {
        println!("Compiled {} bytes", bytes.len());
    }

    let mut did_something = false;

    if let Some(output_file) = matches.get_one::<String>("output") {
        std::fs::write(output_file, &bytes)
            .with_context(|| format!("Failed to write MIDI file: {}", output_file))?;
        if verbose {
            println!("Wrote {}", output_file);
        }
        did_something = true;
    }

    if play {
        play_bytes(&bytes, matches.get_one::<String>("device"), verbose)?;
        did_something = true;
    }

    if !did_something {
        bail!("nothing to do: pass --output, --check, or --play");
    }

    Ok(())
}

#[cfg(feature = "player")]
fn list_devices() -> Result<()> {
    let devices = MidirOutput::list_devices();
    if devices.is_empty() {
        println!("No MIDI output devices available");
    } else {
        for name in devices {
            println!("{}", name);
        }
    }
    Ok(())
}

#[cfg(not(feature = "player"))]
fn list_devices() -> Result<()> {
    bail!("Player support is not enabled. Compile with --features player");
}

#[cfg(feature = "player")]
fn play_bytes(bytes: &[u8], device: Option<&String>, verbose: bool) -> Result<()> {
    let output = MidirOutput::open(device.map(|s| s.as_str()))
        .context("Failed to open MIDI output")?;
    if verbose {
        println!("Playing on {}", output.port_name());
    }

    let mut player = Player::new();
    player
        .play(output, bytes)
        .context("Failed to start playback")?;
    player.wait().context("Playback failed")?;
    Ok(())
}

#[cfg(not(feature = "player"))]
fn play_bytes(_bytes: &[u8], _device: Option<&String>, _verbose: bool) -> Result<()> {
    bail!("Player support is not enabled. Compile with --features player");
}

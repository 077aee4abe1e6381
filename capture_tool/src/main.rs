mod wav;

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::info;
use mic_capture::Command;
use progressing::Baring;
use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
};

#[derive(Parser, Debug)] // requires `derive` feature
#[command()]
struct Args {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Write the command packet that grants the device `credit` blocks
    Grant {
        #[arg(value_parser = clap::value_parser!(u8).range(1..))]
        credit: u8,

        /// Write to this file instead of stdout, e.g. the command endpoint's device node
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Turn a dump of the data endpoint into a 6 channel wav file
    Wav {
        #[arg()]
        source: PathBuf,

        #[arg()]
        destination: PathBuf,
    },
}

fn grant(credit: u8, output: Option<&Path>) -> anyhow::Result<()> {
    let packet = Command::GrantCredit(credit).encode();
    match output {
        Some(path) => File::create(path)
            .and_then(|mut f| f.write_all(&packet))
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => std::io::stdout()
            .write_all(&packet)
            .context("failed to write stdout")?,
    }
    Ok(())
}

fn dump_to_wav(source: &Path, destination: &Path) -> anyhow::Result<()> {
    let src = File::open(source).with_context(|| format!("failed to open {}", source.display()))?;
    let len = src.metadata()?.len();
    let src = std::io::BufReader::new(src);

    let out_file = File::create(destination)
        .with_context(|| format!("failed to create {}", destination.display()))?;
    let out_file = std::io::BufWriter::new(out_file);

    let mut progress_bar = progressing::mapping::Bar::with_range(0, len as i64).timed();
    let blocks = wav::dump_to_wav(src, out_file, |read| {
        progress_bar.set(read as i64);
        if progress_bar.has_progressed_significantly() {
            print!("\r{}", progress_bar);
        }
    })?;
    println!(" Done");

    info!(
        "{} blocks, {:.2} s",
        blocks,
        (blocks * config::SAMPLES_PER_BLOCK) as f32 / config::SAMPLE_RATE as f32
    );
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    match args.command {
        Cmd::Grant { credit, output } => grant(credit, output.as_deref()),
        Cmd::Wav {
            source,
            destination,
        } => dump_to_wav(&source, &destination),
    }
}

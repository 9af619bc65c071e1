mod beep;
mod emulator;
mod keymap;

use std::fs::File;
use std::path::PathBuf;

use anyhow::Context;
use chip8_interp::RomLayout;
use clap::Parser;
use env_logger::{Builder, Env, Target};

use crate::emulator::{DEFAULT_FRAME_RATE, DEFAULT_INSTRUCTIONS_PER_SECOND, Emulator, Settings};

/// Run a CHIP-8 program in the terminal.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Program file to run
    rom: PathBuf,

    /// Frames per second; the timers count down once per frame
    #[arg(long, default_value_t = DEFAULT_FRAME_RATE)]
    frame_rate: u64,

    /// Instructions executed per second
    #[arg(long, default_value_t = DEFAULT_INSTRUCTIONS_PER_SECOND)]
    ips: u64,

    /// Treat the file as a complete 4096-byte memory image instead of a program
    #[arg(long)]
    raw_image: bool,

    /// Seed for the random number instruction
    #[arg(long)]
    seed: Option<u64>,

    /// Write logs here (the terminal is taken by the display)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl From<&Args> for Settings {
    fn from(args: &Args) -> Self {
        Settings {
            frame_rate: args.frame_rate,
            ips: args.ips,
            rom: args.rom.clone(),
            layout: if args.raw_image {
                RomLayout::Image
            } else {
                RomLayout::Program
            },
            seed: args.seed,
        }
    }
}

fn init_logging(log_file: Option<&PathBuf>) -> anyhow::Result<()> {
    let mut builder = Builder::from_env(Env::default().default_filter_or("info"));
    match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create log file {}", path.display()))?;
            builder.target(Target::Pipe(Box::new(file)));
        }
        None => {
            builder.filter_level(log::LevelFilter::Off);
        }
    }
    builder.try_init()?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_ref())?;

    let mut emulator = Emulator::new(Settings::from(&args))?;
    emulator.run()
}

mod config;
mod controller;
mod error;
mod graphics;
mod host;
mod input;
mod math;
mod state;
mod timer;
mod tour;
mod widget;

use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Instant;

use anyhow::{ensure, Context, Result};
use clap::Parser;
use crossterm::cursor::{Hide, Show};
use crossterm::event::{
    self, DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture,
};
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen, SetTitle};
use crossterm::execute;

use crate::config::Settings;
use crate::controller::PanoramaController;
use crate::host::{CommandSpeech, TerminalFullscreen};
use crate::widget::{Flow, PanoramaWidget};

/// Walk through a 360° panorama tour in the terminal
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Tour file (TOML); the built-in monastery tour is used when omitted
    #[arg(long)]
    tour: Option<PathBuf>,
    /// Scene to open instead of the tour's start scene
    #[arg(long)]
    start: Option<String>,
    /// Write log output to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
    /// Disable the voice guide
    #[arg(long)]
    no_speech: bool,
    /// Program used for the voice guide
    #[arg(long)]
    speech_program: Option<String>,
    /// Print the scenes of the tour and exit
    #[arg(long)]
    list: bool,
    /// Print the tour as TOML and exit
    #[arg(long)]
    dump_tour: bool,
}

fn init_logging(log_file: Option<&PathBuf>) -> Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if let Some(path) = log_file {
        let file = File::create(path)
            .with_context(|| format!("failed to create log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}

/// Puts the terminal into full-screen interactive mode and restores it on drop
struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        execute!(
            io::stdout(),
            EnterAlternateScreen,
            EnableMouseCapture,
            EnableFocusChange,
            Hide
        )?;
        Ok(TerminalGuard)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = execute!(
            io::stdout(),
            Show,
            DisableFocusChange,
            DisableMouseCapture,
            LeaveAlternateScreen
        );
        let _ = terminal::disable_raw_mode();
    }
}

fn run(widget: &mut PanoramaWidget) -> Result<()> {
    let mut stdout = io::stdout();
    loop {
        widget.paint(&mut stdout)?;
        if event::poll(widget.poll_timeout(Instant::now()))? {
            if widget.event(&event::read()?) == Flow::Quit {
                break;
            }
        }
        widget.update(Instant::now());
    }
    Ok(())
}

/// Main function
fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_ref())?;

    let mut settings = match &args.tour {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if let Some(program) = args.speech_program {
        settings.viewer.speech.program = program;
    }

    if args.dump_tour {
        print!("{}", settings.to_toml()?);
        return Ok(());
    }
    if args.list {
        let mut out = io::stdout().lock();
        for scene in settings.tour.scenes() {
            writeln!(out, "{:<20} {} ({} hotspots)", scene.id, scene.name, scene.hotspots.len())?;
        }
        return Ok(());
    }

    let Settings { viewer, tour } = settings;
    if let Some(start) = &args.start {
        ensure!(tour.contains(start), "scene `{start}` is not part of the tour");
    }

    let speech = (!args.no_speech).then(|| CommandSpeech::new(&viewer.speech));
    let mut controller = PanoramaController::new(Rc::new(tour), viewer)
        .with_fullscreen(Box::new(TerminalFullscreen));
    if let Some(speech) = speech {
        controller = controller.with_speech(Box::new(speech));
    }
    controller.set_location_listener(|id| {
        log::info!("location changed to `{id}`");
        let _ = execute!(io::stdout(), SetTitle(format!("panotour - {id}")));
    });
    if let Some(start) = &args.start {
        controller.select_scene(start);
    }

    let (width, height) = terminal::size().context("failed to query terminal size")?;
    let _guard = TerminalGuard::enter().context("failed to set up the terminal")?;
    let mut widget = PanoramaWidget::new(controller, width, height);
    run(&mut widget)
}

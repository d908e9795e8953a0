use std::env;
use std::io::{self, BufRead, Write};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::Duration;

use tracing::{error, info};

use crate::audio::{AudioOutput, RodioOutput};
use crate::logging;
use crate::persist::{Flusher, Snapshot, spawn_flusher};
use crate::player::{Engine, EngineOptions, EventHub};

pub mod console;
mod startup;

use console::{Flow, describe_event, execute, parse_command};

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let settings = startup::load_settings();
    logging::init(&settings.logging);

    let dir = startup::music_dir(env::args().nth(1), &settings);
    let state_path = settings.persistence.resolve_state_path();
    let catalog = startup::build_catalog(&dir, &settings, state_path.as_deref());
    if catalog.is_empty() {
        info!("No audio files under {}", dir.display());
    }

    let events = EventHub::new();
    let rx = events.subscribe();
    let gains = settings.audio.gain_range();
    let engine = Arc::new(Engine::start_with_events(
        catalog,
        EngineOptions::from_settings(&settings),
        events,
        move || -> Box<dyn AudioOutput> { Box::new(RodioOutput::new(gains)) },
    ));

    // Detached: the receiver only closes once the engine is gone.
    let printer: Weak<Engine> = Arc::downgrade(&engine);
    thread::spawn(move || {
        for event in rx {
            let Some(engine) = printer.upgrade() else { break };
            if let Some(line) = engine.with_catalog(|c| describe_event(c, &event)) {
                println!("{line}");
            }
        }
    });

    let mut flusher: Option<Flusher> = state_path.map(|path| {
        let engine = engine.clone();
        spawn_flusher(
            path,
            Duration::from_secs(settings.persistence.flush_interval_secs),
            move || engine.with_catalog(Snapshot::capture),
        )
    });

    println!("{}", console::HELP);
    let result = read_commands(&engine);

    engine.shutdown();
    if let Some(f) = flusher.as_mut() {
        f.stop();
    }
    result
}

fn read_commands(engine: &Engine) -> Result<(), Box<dyn std::error::Error>> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    for line in stdin.lock().lines() {
        let line = line?;
        let cmd = match parse_command(&line) {
            Ok(Some(cmd)) => cmd,
            Ok(None) => continue,
            Err(msg) => {
                println!("{msg}");
                continue;
            }
        };
        match execute(engine, cmd) {
            Ok((Flow::Quit, _)) => break,
            Ok((Flow::Continue, Some(text))) => println!("{}", text.trim_end()),
            Ok((Flow::Continue, None)) => {}
            Err(msg) => {
                error!("{msg}");
                println!("{msg}");
            }
        }
        stdout.flush()?;
    }
    Ok(())
}

use std::fmt::Write as _;

use crate::audio::EqPreset;
use crate::catalog::{Catalog, PlaylistId, Slot, TrackId};
use crate::player::{Engine, LoopState, PlayerEvent};

/// A row addressed from the console: `INDEX` for "Tracks", or
/// `PLAYLIST:INDEX` for any named playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub playlist: Option<String>,
    pub index: usize,
}

impl Target {
    pub fn tracks(index: usize) -> Self {
        Self {
            playlist: None,
            index,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Play,
    Pause,
    Next,
    Prev,
    Fade,
    Seek(u32),
    Volume(i32),
    Balance(i32),
    EqBand { band: usize, value: i32 },
    EqEnabled(bool),
    Preset(EqPreset),
    NextTrack(Target),
    NextCortina(Target),
    NextTanda(Target),
    Check(Target),
    Uncheck(Target),
    Now(Target),
    /// Rows of the named playlist, "Tracks" when absent.
    List(Option<String>),
    Status,
    Help,
    Quit,
}

/// Whether the console keeps reading after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub const HELP: &str = "\
commands:
  play | pause | next | prev | fade
  seek SECONDS | vol 0..20 | bal -10..10
  eq BAND VALUE | eq on | eq off | preset NAME
  next-track ROW | cortina ROW | tanda ROW | now ROW
  check ROW | uncheck ROW
  list [PLAYLIST] | status | help | quit
ROW is an index into \"Tracks\" or PLAYLIST:INDEX";

fn arg<T: std::str::FromStr>(word: Option<&str>, what: &str) -> Result<T, String> {
    let word = word.ok_or_else(|| format!("missing {what}"))?;
    word.parse()
        .map_err(|_| format!("invalid {what}: {word:?}"))
}

fn target(word: Option<&str>) -> Result<Target, String> {
    let word = word.ok_or_else(|| "missing track index".to_string())?;
    match word.rsplit_once(':') {
        Some((name, _)) if name.is_empty() => Err(format!("missing playlist name in {word:?}")),
        Some((name, index)) => Ok(Target {
            playlist: Some(name.to_string()),
            index: arg(Some(index), "track index")?,
        }),
        None => Ok(Target::tracks(arg(Some(word), "track index")?)),
    }
}

/// Parse one console line. Blank lines parse to `None`.
pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };

    let cmd = match verb.to_ascii_lowercase().as_str() {
        "play" => Command::Play,
        "pause" => Command::Pause,
        "next" => Command::Next,
        "prev" => Command::Prev,
        "fade" => Command::Fade,
        "seek" => Command::Seek(arg(words.next(), "position")?),
        "vol" | "volume" => Command::Volume(arg(words.next(), "volume")?),
        "bal" | "balance" => Command::Balance(arg(words.next(), "balance")?),
        "eq" => match words.next() {
            Some("on") => Command::EqEnabled(true),
            Some("off") => Command::EqEnabled(false),
            band => Command::EqBand {
                band: arg(band, "band")?,
                value: arg(words.next(), "band value")?,
            },
        },
        "preset" => Command::Preset(
            words
                .next()
                .ok_or_else(|| "missing preset name".to_string())?
                .parse()?,
        ),
        "next-track" => Command::NextTrack(target(words.next())?),
        "cortina" => Command::NextCortina(target(words.next())?),
        "tanda" => Command::NextTanda(target(words.next())?),
        "now" => Command::Now(target(words.next())?),
        "check" => Command::Check(target(words.next())?),
        "uncheck" => Command::Uncheck(target(words.next())?),
        "list" | "ls" => Command::List(words.next().map(str::to_string)),
        "status" => Command::Status,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(format!("unknown command {other:?}, try `help`")),
    };

    match words.next() {
        Some(extra) => Err(format!("unexpected argument {extra:?}")),
        None => Ok(Some(cmd)),
    }
}

fn playlist_named(catalog: &Catalog, name: Option<&str>) -> Result<PlaylistId, String> {
    match name {
        None => Ok(catalog.tracks_playlist()),
        Some(name) => catalog
            .playlist_by_name(name)
            .ok_or_else(|| format!("no playlist named {name:?}")),
    }
}

fn slot_of(engine: &Engine, target: &Target) -> Result<Slot, String> {
    engine.with_catalog(|c| {
        playlist_named(c, target.playlist.as_deref()).map(|p| Slot::new(p, target.index))
    })
}

fn check(engine: &Engine, target: &Target, wanted: bool) -> Result<(), String> {
    let slot = slot_of(engine, target)?;
    let id = engine
        .with_catalog(|c| c.entry(slot))
        .ok_or_else(|| format!("no track at row {}", target.index))?;
    if engine.check_track(id, wanted) != wanted {
        return Err(format!("row {} is missing and cannot be checked", target.index));
    }
    Ok(())
}

/// Run a command against the engine. The returned text, if any, is for the
/// operator.
pub fn execute(engine: &Engine, cmd: Command) -> Result<(Flow, Option<String>), String> {
    let schedule = |r: Result<(), crate::error::ScheduleError>| r.map_err(|e| e.to_string());

    match cmd {
        Command::Play => engine.pause(false),
        Command::Pause => engine.pause(true),
        Command::Next => engine.next(),
        Command::Prev => engine.prev(),
        Command::Fade => engine.fade(),
        Command::Seek(seconds) => engine.set_position(seconds),
        Command::Volume(v) => engine.set_volume(v),
        Command::Balance(b) => engine.set_balance(b),
        Command::EqBand { band, value } => {
            if !engine.set_equalizer_band(band, value) {
                return Err(format!("no equalizer band {band}"));
            }
        }
        Command::EqEnabled(on) => engine.set_equalizer_enabled(on),
        Command::Preset(p) => engine.apply_equalizer_preset(p),
        Command::NextTrack(t) => schedule(engine.set_next_track(slot_of(engine, &t)?))?,
        Command::NextCortina(t) => schedule(engine.set_next_cortina(slot_of(engine, &t)?))?,
        Command::NextTanda(t) => schedule(engine.set_next_tanda(slot_of(engine, &t)?))?,
        Command::Now(t) => schedule(engine.play_now(slot_of(engine, &t)?))?,
        Command::Check(t) => check(engine, &t, true)?,
        Command::Uncheck(t) => check(engine, &t, false)?,
        Command::List(name) => {
            let playlist = engine.with_catalog(|c| playlist_named(c, name.as_deref()))?;
            return Ok((Flow::Continue, Some(render_list(engine, playlist))));
        }
        Command::Status => return Ok((Flow::Continue, Some(render_status(engine)))),
        Command::Help => return Ok((Flow::Continue, Some(HELP.to_string()))),
        Command::Quit => return Ok((Flow::Quit, None)),
    }
    Ok((Flow::Continue, None))
}

fn title_of(catalog: &Catalog, slot: Option<Slot>) -> String {
    slot.and_then(|s| catalog.track_at(s))
        .map_or_else(|| "-".to_string(), |t| t.title().to_string())
}

fn clock(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// One row per playlist entry: index, markers, title, genre, orchestra.
pub fn render_list(engine: &Engine, playlist_id: PlaylistId) -> String {
    let sel = engine.selections();
    engine.with_catalog(|c| {
        let mut out = String::new();
        let Some(playlist) = c.playlist(playlist_id) else {
            return out;
        };
        for (index, &id) in playlist.entries().iter().enumerate() {
            let Some(t) = c.track(id) else { continue };
            let slot = Some(Slot::new(playlist_id, index));
            let marker = if sel.current == slot {
                '>'
            } else if sel.next == slot {
                '+'
            } else {
                ' '
            };
            let check = if t.is_missing() {
                '!'
            } else if t.is_checked() {
                'x'
            } else {
                ' '
            };
            let _ = writeln!(
                out,
                "{marker}[{check}] {index:>4}  {}  {}  {}  {}",
                t.title(),
                t.genre().unwrap_or("-"),
                t.orchestra().unwrap_or("-"),
                clock(t.duration()),
            );
        }
        out
    })
}

pub fn render_status(engine: &Engine) -> String {
    let sel = engine.selections();
    let state = match engine.loop_state() {
        LoopState::Idle => "idle",
        LoopState::WaitingForTail => "waiting",
        LoopState::Playing if engine.is_paused() => "paused",
        LoopState::Playing => "playing",
    };
    let (current, next) = engine.with_catalog(|c| (title_of(c, sel.current), title_of(c, sel.next)));
    format!(
        "{state}: {current} [{}/{}]  next: {next}  vol {} ({:+.1} dB)  bal {}  eq {}\n{}",
        clock(engine.position()),
        clock(engine.duration()),
        engine.volume(),
        engine.gain_db(),
        engine.balance(),
        if engine.equalizer_enabled() { "on" } else { "off" },
        engine.next_tanda_text(),
    )
}

/// Text for an engine event, or `None` for events not worth a line.
pub fn describe_event(catalog: &Catalog, event: &PlayerEvent) -> Option<String> {
    let title = |id: TrackId| {
        catalog
            .track(id)
            .map_or_else(|| format!("#{}", id.0), |t| t.title().to_string())
    };
    match event {
        PlayerEvent::TrackStarted { slot, track } => {
            Some(format!("now playing [{}]: {}", slot.index, title(*track)))
        }
        PlayerEvent::PlaybackFailed { track, error } => {
            Some(format!("skipped {}: {error}", title(*track)))
        }
        PlayerEvent::Idle => Some("end of playlist, idle".to_string()),
        PlayerEvent::SelectionChanged(sel) => Some(format!("next: {}", title_of(catalog, sel.next))),
        PlayerEvent::PositionChanged(_) => None,
    }
}

//! tempo-cli - 命令行播放器
//!
//! 播放命令行给出的文件，从标准输入读取交互命令。

mod commands;
mod config;

use std::fs;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use clap::Parser;
use crossbeam_channel::{never, select, unbounded, Receiver, Sender};
use rand::seq::SliceRandom;
use tempo_backend::{select_backend, BackendKind};
use tempo_player::{
    format_time, is_supported_media, spawn_player, PlaybackListener, PlaybackState, PlayerHandle,
    Sequencer, Track,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::{parse_command, Command, HELP};
use crate::config::load_config;

#[derive(Parser)]
#[command(name = "tempo-cli")]
#[command(about = "Play audio and video files from the terminal", long_about = None)]
struct Cli {
    /// Files or directories to queue
    files: Vec<PathBuf>,

    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Wrap around at the end of the playlist
    #[arg(long)]
    repeat: bool,

    /// Shuffle the initial order
    #[arg(long)]
    shuffle: bool,

    /// Use the sequential backend (seek is emulated)
    #[arg(long)]
    simple: bool,

    /// Initial volume (0-100)
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    volume: Option<u8>,

    /// Progress sync interval in milliseconds
    #[arg(long)]
    tick_ms: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tempo=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(volume) = cli.volume {
        config.initial_volume = volume;
    }
    if let Some(tick_ms) = cli.tick_ms {
        config.tick_interval_ms = tick_ms;
    }

    let kind = if cli.simple {
        BackendKind::Simple
    } else {
        BackendKind::Full
    };
    let selection = select_backend(kind);
    if let Some(reason) = &selection.unavailable {
        println!("! {} (playing silently)", reason);
    }

    let handle = spawn_player(selection.backend, config);
    let sequencer = Sequencer::new(handle.engine().clone());
    sequencer.set_repeat(cli.repeat);
    sequencer.set_shuffle(cli.shuffle);

    let mut files = collect_files(&cli.files);
    if cli.shuffle {
        files.shuffle(&mut rand::thread_rng());
    }
    for file in files {
        sequencer.add(Track::new(file));
    }

    let (ui_tx, ui_rx) = unbounded();
    handle
        .engine()
        .add_listener(Arc::new(ConsoleListener { events: ui_tx }));

    if !sequencer.is_empty() {
        report_flag(sequencer.select_and_load(0));
    } else {
        println!("Playlist is empty. Type `add <path>` or `help`.");
    }

    let result = run(&handle, &sequencer, spawn_stdin_reader(), ui_rx);
    handle.shutdown();
    result
}

/// 展开目录并过滤不支持的文件
fn collect_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            match fs::read_dir(path) {
                Ok(entries) => {
                    let mut found: Vec<_> = entries
                        .filter_map(|e| e.ok().map(|e| e.path()))
                        .filter(|p| p.is_file() && is_supported_media(p))
                        .collect();
                    found.sort();
                    files.extend(found);
                }
                Err(e) => warn!("Cannot read directory {}: {}", path.display(), e),
            }
        } else if is_supported_media(path) {
            files.push(path.clone());
        } else {
            warn!("Skipping unsupported file {}", path.display());
        }
    }
    files
}

type Input = Result<Command, String>;

fn spawn_stdin_reader() -> Receiver<Input> {
    let (tx, rx) = unbounded();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            let input = match parse_command(&line) {
                Ok(Some(command)) => Ok(command),
                Ok(None) => continue,
                Err(message) => Err(message),
            };
            if tx.send(input).is_err() {
                break;
            }
        }
    });
    rx
}

/// 引擎停下来时通知主循环
enum UiEvent {
    Idle,
}

struct ConsoleListener {
    events: Sender<UiEvent>,
}

impl PlaybackListener for ConsoleListener {
    fn on_playback_started(&self) {
        println!("> playing");
    }

    fn on_playback_paused(&self) {
        println!("|| paused");
    }

    fn on_playback_stopped(&self) {
        println!("[] stopped");
    }

    fn on_playback_finished(&self) {
        println!("-- finished");
        let _ = self.events.send(UiEvent::Idle);
    }

    fn on_playback_error(&self, message: &str) {
        println!("! playback error: {}", message);
        let _ = self.events.send(UiEvent::Idle);
    }
}

fn run(
    handle: &PlayerHandle,
    sequencer: &Arc<Sequencer>,
    commands: Receiver<Input>,
    ui_events: Receiver<UiEvent>,
) -> anyhow::Result<()> {
    let engine = handle.engine();
    let mut commands = commands;
    let mut interactive = true;

    loop {
        let step = select! {
            recv(commands) -> input => match input {
                Ok(Ok(command)) => {
                    if execute(command, handle, sequencer) {
                        Step::Continue
                    } else {
                        Step::Quit
                    }
                }
                Ok(Err(message)) => {
                    println!("? {}", message);
                    Step::Continue
                }
                Err(_) => Step::InputClosed,
            },
            recv(ui_events) -> _ => Step::Idle,
        };

        match step {
            Step::Continue => {}
            Step::Quit => break,
            Step::InputClosed => {
                // 输入结束：播放完列表后退出
                info!("Input closed, playing to the end of the playlist");
                commands = never();
                interactive = false;
                if engine.state() != PlaybackState::Playing {
                    break;
                }
            }
            Step::Idle => {
                if !interactive && engine.state() != PlaybackState::Playing {
                    break;
                }
            }
        }
    }
    Ok(())
}

enum Step {
    Continue,
    Quit,
    InputClosed,
    Idle,
}

/// 执行一条命令，返回 false 表示退出
fn execute(command: Command, handle: &PlayerHandle, sequencer: &Arc<Sequencer>) -> bool {
    let engine = handle.engine();
    match command {
        Command::Play => report(engine.play()),
        Command::Pause => report(engine.pause()),
        Command::Stop => engine.stop(),
        Command::Next => {
            if !report_flag(sequencer.next()) {
                println!("(end of playlist)");
            }
        }
        Command::Previous => {
            if !report_flag(sequencer.previous()) {
                println!("(start of playlist)");
            }
        }
        Command::Seek(ms) => report(engine.seek_to(ms)),
        Command::Volume(volume) => {
            engine.set_volume(volume);
            println!("volume {}", engine.volume());
        }
        Command::Repeat => println!("repeat {}", on_off(sequencer.toggle_repeat())),
        Command::Shuffle => println!("shuffle {}", on_off(sequencer.toggle_shuffle())),
        Command::List => print_playlist(sequencer),
        Command::Status => print_status(handle, sequencer),
        Command::Select(index) => {
            if !report_flag(sequencer.select_and_load(index)) {
                println!("? no entry {}", index + 1);
            }
        }
        Command::Remove(index) => {
            if index >= sequencer.len() {
                println!("? no entry {}", index + 1);
            } else {
                report_flag(sequencer.remove(index));
            }
        }
        Command::Add(path) => add_path(sequencer, &path),
        Command::Clear => sequencer.clear(),
        Command::Help => println!("{}", HELP),
        Command::Quit => return false,
    }
    true
}

fn add_path(sequencer: &Sequencer, path: &Path) {
    let files = collect_files(&[path.to_path_buf()]);
    if files.is_empty() {
        println!("? nothing playable at {}", path.display());
        return;
    }
    for file in files {
        let track = Track::new(file);
        let name = track.display_name();
        if sequencer.add(track) {
            println!("+ {}", name);
        }
    }
}

fn print_playlist(sequencer: &Sequencer) {
    let playlist = sequencer.snapshot();
    if playlist.is_empty() {
        println!("(empty)");
        return;
    }
    for (i, track) in playlist.tracks().iter().enumerate() {
        let marker = if playlist.current_index() == Some(i) { '>' } else { ' ' };
        println!("{} {:>3}. {}", marker, i + 1, track.display_name());
    }
}

fn print_status(handle: &PlayerHandle, sequencer: &Sequencer) {
    let snapshot = handle.engine().snapshot();
    let playlist = sequencer.snapshot();
    let title = snapshot
        .track
        .as_ref()
        .map(|t| t.display_name())
        .unwrap_or_else(|| "-".to_string());
    println!(
        "{:?} {} {} / {}{} vol {} [repeat {}, shuffle {}] via {}",
        snapshot.state,
        title,
        format_time(snapshot.position_ms),
        format_time(snapshot.duration_ms),
        if snapshot.duration_estimated { "~" } else { "" },
        snapshot.volume,
        on_off(playlist.repeat()),
        on_off(playlist.shuffle()),
        handle.engine().backend_name(),
    );
}

fn report<E: std::fmt::Display>(result: Result<(), E>) {
    if let Err(e) = result {
        println!("! {}", e);
    }
}

fn report_flag<E: std::fmt::Display>(result: Result<bool, E>) -> bool {
    match result {
        Ok(done) => done,
        Err(e) => {
            println!("! {}", e);
            true
        }
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

//! Terminal runner
//!
//! Runs a session without a window. A current-thread tokio runtime ticks
//! the orchestrator every 16 ms and applies line commands read from stdin.
//! Ctrl+C ends the session and prints a summary.

use crate::config::AppConfig;
use anyhow::Result;
use breathpacer_core::catalog::PRESETS;
use breathpacer_core::{
    CycleError, CycleOrchestrator, Phase, Presenter, SessionStats, ToneSynthesizer,
};
use std::io::Write;
use std::str::FromStr;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

/// Interval between orchestrator ticks
pub const TICK_INTERVAL: Duration = Duration::from_millis(16);

const HELP: &str = "Commands: start | pause | resume | stop | sound on|off | \
pattern TEXT | preset N | status | help | quit";

/// A line typed on stdin
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Pause,
    Resume,
    Stop,
    Sound(bool),
    Pattern(String),
    Preset(usize),
    Status,
    Help,
    Quit,
}

/// Errors from parsing a command line
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command: {0} (type 'help')")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = line
            .split_once(char::is_whitespace)
            .map(|(w, r)| (w, r.trim()))
            .unwrap_or((line, ""));

        match word.to_ascii_lowercase().as_str() {
            "start" => Ok(Command::Start),
            "pause" => Ok(Command::Pause),
            "resume" => Ok(Command::Resume),
            "stop" => Ok(Command::Stop),
            "status" => Ok(Command::Status),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" | "q" => Ok(Command::Quit),
            "sound" => match rest.to_ascii_lowercase().as_str() {
                "on" => Ok(Command::Sound(true)),
                "off" => Ok(Command::Sound(false)),
                _ => Err(CommandError::Usage("sound on|off")),
            },
            "pattern" if !rest.is_empty() => Ok(Command::Pattern(rest.to_string())),
            "pattern" => Err(CommandError::Usage("pattern 4-7-8")),
            "preset" => rest
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .map(Command::Preset)
                .ok_or(CommandError::Usage("preset N (1-based)")),
            _ => Err(CommandError::Unknown(word.to_string())),
        }
    }
}

/// Prints phase changes and the countdown as plain lines
pub struct TerminalPresenter<W: Write> {
    out: W,
    phase: Option<Phase>,
}

impl TerminalPresenter<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> TerminalPresenter<W> {
    pub fn new(out: W) -> Self {
        Self { out, phase: None }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Phase last announced
    pub fn phase(&self) -> Option<Phase> {
        self.phase
    }

    fn line(&mut self, text: std::fmt::Arguments<'_>) {
        writeln!(self.out, "{}", text).ok();
        self.out.flush().ok();
    }
}

impl<W: Write> Presenter for TerminalPresenter<W> {
    fn show_phase(&mut self, phase: Phase, total: Duration, start_from: Duration) {
        self.phase = Some(phase);
        if start_from < total {
            self.line(format_args!(
                "{} ({:.1}s of {}s left)",
                phase.label(),
                start_from.as_secs_f32(),
                total.as_secs()
            ));
        } else {
            self.line(format_args!("{} ({}s)", phase.label(), total.as_secs()));
        }
    }

    fn show_countdown(&mut self, seconds: u64) {
        if seconds > 0 {
            self.line(format_args!("  {}", seconds));
        }
    }

    fn show_running(&mut self) {
        self.line(format_args!("-- running --"));
    }

    fn show_paused(&mut self) {
        self.line(format_args!("-- paused (type 'resume') --"));
    }

    fn show_idle(&mut self) {
        self.phase = None;
        self.line(format_args!("-- ready (type 'start') --"));
    }

    fn show_error(&mut self, error: &CycleError) {
        self.line(format_args!("Error: {}", error));
    }
}

/// Whether the loop should keep going after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Apply one command to the orchestrator
pub fn apply<W: Write>(
    orchestrator: &mut CycleOrchestrator<TerminalPresenter<W>>,
    command: Command,
    now: Instant,
) -> Flow {
    match command {
        Command::Start => {
            if let Err(e) = orchestrator.start(now) {
                tracing::debug!(error = %e, "Start refused");
            }
        }
        Command::Pause => orchestrator.pause(now),
        Command::Resume => orchestrator.resume(now),
        Command::Stop => {
            if let Some(stats) = orchestrator.stop(now) {
                let text = summary(&stats);
                orchestrator.presenter_mut().line(format_args!("{}", text));
            }
        }
        Command::Sound(enabled) => {
            orchestrator.set_sound_enabled(enabled);
            let state = if enabled { "on" } else { "off" };
            orchestrator
                .presenter_mut()
                .line(format_args!("Sound {}", state));
        }
        Command::Pattern(text) => {
            let message = match orchestrator.submit_custom_pattern(&text) {
                Ok(pattern) => format!("Pattern {} selected", pattern),
                Err(e) => format!("Invalid pattern: {}", e),
            };
            orchestrator.presenter_mut().line(format_args!("{}", message));
        }
        Command::Preset(index) => {
            let message = match orchestrator.select_pattern(index) {
                Ok(pattern) => format!("{} ({}) selected", PRESETS[index].name, pattern),
                Err(e) => e.to_string(),
            };
            orchestrator.presenter_mut().line(format_args!("{}", message));
        }
        Command::Status => {
            let snapshot = orchestrator.snapshot(now);
            let line = match serde_json::to_string(&snapshot) {
                Ok(json) => json,
                Err(e) => format!("Status unavailable: {}", e),
            };
            orchestrator.presenter_mut().line(format_args!("{}", line));
        }
        Command::Help => orchestrator.presenter_mut().line(format_args!("{}", HELP)),
        Command::Quit => return Flow::Quit,
    }
    Flow::Continue
}

/// One-line description of a finished session
pub fn summary(stats: &SessionStats) -> String {
    let elapsed = stats.elapsed();
    format!(
        "Session {}: {}m {:02}s, {} cycles, {} phases (started {})",
        stats.pattern,
        elapsed.num_minutes(),
        elapsed.num_seconds() % 60,
        stats.cycles_completed,
        stats.phases_completed,
        stats.started_at.format("%H:%M:%S")
    )
}

/// Run a session in the terminal until `quit` or Ctrl+C
pub fn run(config: &AppConfig, synth: ToneSynthesizer) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_io()
        .enable_time()
        .build()?;
    runtime.block_on(run_loop(config, synth))
}

async fn run_loop(config: &AppConfig, synth: ToneSynthesizer) -> Result<()> {
    let mut orchestrator = super::build_orchestrator(config, TerminalPresenter::stdout(), synth);

    let (tx, mut rx) = mpsc::channel::<Command>(16);

    let ctrlc_tx = tx.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        ctrlc_tx.try_send(Command::Quit).ok();
    }) {
        tracing::warn!(error = %e, "Failed to install Ctrl+C handler");
    }

    tokio::spawn(read_commands(tx));

    let pattern = orchestrator.pattern();
    orchestrator
        .presenter_mut()
        .line(format_args!("Pattern {}. {}", pattern, HELP));
    if let Err(e) = orchestrator.start(Instant::now()) {
        tracing::warn!(error = %e, "Could not start session");
    }

    let mut interval = tokio::time::interval(TICK_INTERVAL);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = interval.tick() => orchestrator.tick(Instant::now()),
            command = rx.recv() => {
                let Some(command) = command else {
                    break;
                };
                if apply(&mut orchestrator, command, Instant::now()) == Flow::Quit {
                    break;
                }
            }
        }
    }

    if let Some(stats) = orchestrator.stop(Instant::now()) {
        let text = summary(&stats);
        orchestrator.presenter_mut().line(format_args!("{}", text));
    }
    tracing::info!("Terminal session ended");
    Ok(())
}

/// Forward parsed stdin lines to the loop; parse errors are printed here
async fn read_commands(tx: mpsc::Sender<Command>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if line.trim().is_empty() => {}
            Ok(Some(line)) => match line.parse::<Command>() {
                Ok(command) => {
                    if tx.send(command).await.is_err() {
                        break;
                    }
                }
                Err(e) => eprintln!("{}", e),
            },
            Ok(None) => {
                tracing::debug!("stdin closed, Ctrl+C to quit");
                break;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read stdin");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use breathpacer_core::audio::engine::AudioEngineError;
    use breathpacer_core::{Pattern, ToneSettings, WaveformSettings};

    fn silent_synth() -> ToneSynthesizer {
        ToneSynthesizer::new(
            ToneSettings::default(),
            Box::new(|| Err(AudioEngineError::NoOutputDevice)),
        )
    }

    fn orchestrator() -> CycleOrchestrator<TerminalPresenter<Vec<u8>>> {
        CycleOrchestrator::new(
            TerminalPresenter::new(Vec::new()),
            silent_synth(),
            &WaveformSettings::default(),
        )
    }

    fn output(orch: &CycleOrchestrator<TerminalPresenter<Vec<u8>>>) -> String {
        String::from_utf8(orch.presenter().out.clone()).unwrap()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!("start".parse(), Ok(Command::Start));
        assert_eq!("  PAUSE ".parse(), Ok(Command::Pause));
        assert_eq!("sound off".parse(), Ok(Command::Sound(false)));
        assert_eq!("pattern 4-7-8".parse(), Ok(Command::Pattern("4-7-8".to_string())));
        assert_eq!("preset 2".parse(), Ok(Command::Preset(1)));
        assert_eq!("exit".parse(), Ok(Command::Quit));
    }

    #[test]
    fn test_parse_rejects_bad_commands() {
        assert!(matches!(
            "breathe".parse::<Command>(),
            Err(CommandError::Unknown(_))
        ));
        assert!(matches!(
            "sound loud".parse::<Command>(),
            Err(CommandError::Usage(_))
        ));
        assert!(matches!("preset 0".parse::<Command>(), Err(CommandError::Usage(_))));
        assert!(matches!("pattern".parse::<Command>(), Err(CommandError::Usage(_))));
    }

    #[test]
    fn test_commands_drive_session() {
        let t0 = Instant::now();
        let mut orch = orchestrator();
        assert_eq!(
            apply(&mut orch, Command::Pattern("2-0-2".into()), t0),
            Flow::Continue
        );
        assert_eq!(orch.pattern(), Pattern::new([2, 0, 2, 0]));

        apply(&mut orch, Command::Start, t0);
        orch.tick(t0 + Duration::from_millis(2100));
        apply(&mut orch, Command::Pause, t0 + Duration::from_millis(2500));
        assert!(orch.state().is_paused());
        apply(&mut orch, Command::Stop, t0 + Duration::from_millis(3000));
        assert!(!orch.state().is_running());
        assert_eq!(apply(&mut orch, Command::Quit, t0), Flow::Quit);

        let text = output(&orch);
        assert!(text.contains("Pattern 2-0-2-0 selected"));
        assert!(text.contains("Inhale (2s)"));
        assert!(text.contains("Exhale (2s)"));
        assert!(text.contains("-- paused"));
        assert!(text.contains("Session 2-0-2-0"));
    }

    #[test]
    fn test_invalid_pattern_reported() {
        let mut orch = orchestrator();
        apply(&mut orch, Command::Pattern("4-x".into()), Instant::now());
        apply(&mut orch, Command::Preset(7), Instant::now());
        let text = output(&orch);
        assert!(text.contains("Invalid pattern"));
        assert!(text.contains("No predefined pattern at index 7"));
    }
}

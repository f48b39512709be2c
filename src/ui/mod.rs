//! User interface module
//!
//! Contains:
//! - Desktop window with the breathing circle and waveform ([`app`])
//! - Terminal runner driven from stdin ([`headless`])

pub mod app;
pub mod headless;

use crate::config::AppConfig;
use breathpacer_core::{CycleOrchestrator, Presenter, ToneSynthesizer};

/// Build an idle orchestrator with the configured pattern and sound setting
///
/// The output device stays closed until the first tone is played.
pub fn build_orchestrator<P: Presenter>(
    config: &AppConfig,
    presenter: P,
    synth: ToneSynthesizer,
) -> CycleOrchestrator<P> {
    let mut orchestrator = CycleOrchestrator::new(presenter, synth, &config.waveform);
    orchestrator.set_pattern(config.initial_pattern());
    if !config.sound_enabled {
        orchestrator.set_sound_enabled(false);
    }
    orchestrator
}

#[cfg(test)]
mod tests {
    use super::*;
    use app::DisplayState;
    use breathpacer_core::audio::engine::AudioEngineError;
    use breathpacer_core::{Pattern, ToneSettings};
    use std::cell::Cell;
    use std::rc::Rc;
    use std::time::Instant;

    fn counting_synth() -> (ToneSynthesizer, Rc<Cell<u32>>) {
        let opened = Rc::new(Cell::new(0));
        let counter = opened.clone();
        let synth = ToneSynthesizer::new(
            ToneSettings::default(),
            Box::new(move || {
                counter.set(counter.get() + 1);
                Err(AudioEngineError::NoOutputDevice)
            }),
        );
        (synth, opened)
    }

    #[test]
    fn test_device_opens_on_first_start() {
        let (synth, opened) = counting_synth();
        let config = AppConfig {
            pattern: Some("4-7-8".to_string()),
            ..Default::default()
        };
        let mut orch = build_orchestrator(&config, DisplayState::default(), synth);
        assert_eq!(orch.pattern(), Pattern::new([4, 7, 8, 0]));
        assert!(orch.synth().is_enabled());
        assert_eq!(opened.get(), 0);

        orch.start(Instant::now()).unwrap();
        assert_eq!(opened.get(), 1);
    }

    #[test]
    fn test_muted_config_never_opens_device() {
        let (synth, opened) = counting_synth();
        let config = AppConfig {
            sound_enabled: false,
            ..Default::default()
        };
        let mut orch = build_orchestrator(&config, DisplayState::default(), synth);
        assert!(!orch.synth().is_enabled());

        orch.start(Instant::now()).unwrap();
        assert_eq!(opened.get(), 0);
    }
}

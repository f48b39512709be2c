//! Audio output engine for device management and stream handling
//!
//! Provides high-level interface for:
//! - Enumerating output devices
//! - Opening the default output stream
//! - Handing tones to the audio callback
//!
//! The callback owns the active [`ToneVoice`] outright. Play/stop commands
//! cross from the UI thread over a bounded crossbeam channel, so the audio
//! thread never takes a lock.

use super::synth::ToneOutput;
use super::tone::{ToneSpec, ToneVoice};
use anyhow::Result;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Pending commands the callback can lag behind before new ones are dropped
const COMMAND_QUEUE_DEPTH: usize = 16;

/// Errors that can occur while opening audio output
#[derive(Error, Debug)]
pub enum AudioEngineError {
    #[error("No output device available")]
    NoOutputDevice,

    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to query output config: {0}")]
    ConfigError(String),

    #[error("Failed to open stream: {0}")]
    StreamError(String),
}

/// Commands sent from the synthesizer to the audio callback
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ToneCommand {
    /// Replace whatever is sounding with a new tone
    Play(ToneSpec),
    /// Silence immediately
    Stop,
}

/// Output device information
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    /// Device name
    pub name: String,
    /// Whether this is the default output device
    pub is_default: bool,
    /// Supported sample rates
    pub sample_rates: Vec<u32>,
    /// Number of output channels
    pub output_channels: u16,
}

/// cpal-backed tone output
pub struct AudioEngine {
    stream: Option<Stream>,
    command_tx: Option<Sender<ToneCommand>>,
    /// Running flag (shared with the callback via Arc)
    running: Option<Arc<AtomicBool>>,
    /// Frames rendered so far (shared with the callback via Arc)
    rendered_frames: Option<Arc<AtomicUsize>>,
}

impl AudioEngine {
    /// Create a stopped engine
    pub fn new() -> Self {
        Self {
            stream: None,
            command_tx: None,
            running: None,
            rendered_frames: None,
        }
    }

    /// Open and start the default output device
    pub fn open_default() -> Result<Self, AudioEngineError> {
        let mut engine = Self::new();
        engine.start()?;
        Ok(engine)
    }

    /// True while an output stream is open
    pub fn is_running(&self) -> bool {
        self.stream.is_some()
    }

    /// List available output devices
    pub fn list_devices() -> Result<Vec<DeviceInfo>> {
        let host = cpal::default_host();
        let default_output = host.default_output_device().and_then(|d| d.name().ok());
        let mut devices = Vec::new();

        for device in host.output_devices()? {
            let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
            let is_default = default_output.as_deref() == Some(name.as_str());

            let output_channels = device
                .default_output_config()
                .map(|c| c.channels())
                .unwrap_or(0);

            let common_rates = [44100, 48000, 88200, 96000];
            let mut sample_rates = Vec::new();
            if let Ok(configs) = device.supported_output_configs() {
                for config in configs {
                    for &rate in &common_rates {
                        if (config.min_sample_rate().0..=config.max_sample_rate().0).contains(&rate)
                            && !sample_rates.contains(&rate)
                        {
                            sample_rates.push(rate);
                        }
                    }
                }
            }
            sample_rates.sort();

            devices.push(DeviceInfo {
                name,
                is_default,
                sample_rates,
                output_channels,
            });
        }

        Ok(devices)
    }

    /// Open the default output device and start rendering silence
    pub fn start(&mut self) -> Result<(), AudioEngineError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(AudioEngineError::NoOutputDevice)?;

        let supported = device
            .default_output_config()
            .map_err(|e| AudioEngineError::ConfigError(e.to_string()))?;
        let sample_format = supported.sample_format();
        let config: StreamConfig = supported.config();

        tracing::info!(
            "Output device default config: {} Hz, {} channels, {:?}",
            config.sample_rate.0,
            config.channels,
            sample_format
        );

        let (command_tx, command_rx) = crossbeam_channel::bounded::<ToneCommand>(COMMAND_QUEUE_DEPTH);
        let running = Arc::new(AtomicBool::new(true));
        let rendered_frames = Arc::new(AtomicUsize::new(0));

        let stream = match sample_format {
            SampleFormat::F32 => {
                Self::build_stream::<f32>(&device, &config, command_rx, &running, &rendered_frames)
            }
            SampleFormat::I16 => {
                Self::build_stream::<i16>(&device, &config, command_rx, &running, &rendered_frames)
            }
            SampleFormat::U16 => {
                Self::build_stream::<u16>(&device, &config, command_rx, &running, &rendered_frames)
            }
            other => Err(AudioEngineError::UnsupportedFormat(format!("{:?}", other))),
        }?;

        stream
            .play()
            .map_err(|e| AudioEngineError::StreamError(e.to_string()))?;

        self.stream = Some(stream);
        self.command_tx = Some(command_tx);
        self.running = Some(running);
        self.rendered_frames = Some(rendered_frames);

        tracing::info!(
            "Audio engine started: {} @ {}Hz, {} channels",
            device.name().unwrap_or_else(|_| "unknown".to_string()),
            config.sample_rate.0,
            config.channels
        );

        Ok(())
    }

    fn build_stream<T>(
        device: &Device,
        config: &StreamConfig,
        command_rx: Receiver<ToneCommand>,
        running: &Arc<AtomicBool>,
        rendered_frames: &Arc<AtomicUsize>,
    ) -> Result<Stream, AudioEngineError>
    where
        T: SizedSample + FromSample<f32>,
    {
        let sample_rate = config.sample_rate.0;
        let num_channels = config.channels.max(1) as usize;
        let callback_running = Arc::clone(running);
        let frame_count = Arc::clone(rendered_frames);
        // Voice is moved into the closure (lock-free)
        let mut voice: Option<ToneVoice> = None;

        device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    while let Ok(command) = command_rx.try_recv() {
                        voice = match command {
                            ToneCommand::Play(spec) => Some(ToneVoice::new(spec, sample_rate)),
                            ToneCommand::Stop => None,
                        };
                    }

                    if !callback_running.load(Ordering::Relaxed) {
                        data.fill(T::EQUILIBRIUM);
                        return;
                    }

                    let mut frames = 0usize;
                    for frame in data.chunks_mut(num_channels) {
                        let sample = voice.as_mut().map(|v| v.next_sample()).unwrap_or(0.0);
                        let value = T::from_sample(sample);
                        for out in frame.iter_mut() {
                            *out = value;
                        }
                        frames += 1;
                    }
                    if voice.as_ref().is_some_and(|v| v.is_finished()) {
                        voice = None;
                    }
                    frame_count.fetch_add(frames, Ordering::Relaxed);
                },
                move |err| {
                    tracing::error!("Output stream error: {}", err);
                },
                None,
            )
            .map_err(|e| AudioEngineError::StreamError(e.to_string()))
    }

    /// Stop the stream and release the device
    pub fn stop(&mut self) {
        if let Some(ref running) = self.running {
            running.store(false, Ordering::Relaxed);
        }

        if self.is_running() {
            tracing::info!(frames = self.rendered_frames(), "Audio engine stopped");
        }
        self.stream = None;
        self.command_tx = None;
        self.running = None;
        self.rendered_frames = None;
    }

    /// Frames rendered by the callback since start
    pub fn rendered_frames(&self) -> usize {
        self.rendered_frames
            .as_ref()
            .map(|f| f.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    fn send(&self, command: ToneCommand) {
        let Some(tx) = self.command_tx.as_ref() else {
            return;
        };
        match tx.try_send(command) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                tracing::warn!("Audio command queue full, dropping {:?}", command);
            }
            Err(TrySendError::Disconnected(_)) => {
                tracing::warn!("Audio callback gone, dropping {:?}", command);
            }
        }
    }
}

impl ToneOutput for AudioEngine {
    fn play(&mut self, tone: &ToneSpec) {
        self.send(ToneCommand::Play(*tone));
    }

    fn silence(&mut self) {
        self.send(ToneCommand::Stop);
    }
}

impl Default for AudioEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

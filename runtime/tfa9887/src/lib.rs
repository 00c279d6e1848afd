// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2024 Takashi Sakamoto

pub mod amp;
pub mod device;
pub mod keep_alive;
pub mod pair;
pub mod pcm;

#[cfg(test)]
mod simulator;

use {
    amp::*,
    device::*,
    glib::{Error, FileError},
    keep_alive::*,
    nix::sys::signal,
    pair::*,
    pcm::*,
    runtime_core::{dispatcher::*, LogLevel, *},
    std::{
        path::{Path, PathBuf},
        sync::mpsc,
    },
    tfa9887_protocols::{dsp::*, hw_ctl::*, mode::*, patch::*, *},
    tracing::{debug, debug_span, info, Level},
};

/// The directory for firmware and parameter files.
pub const FIRMWARE_DIR: &str = "/system/etc/tfa";

/// The parameters of service.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    /// The numeric identifier of sound card which has the mixer control for I2S interface.
    pub card_id: u32,
    pub firmware_dir: PathBuf,
    pub rate: u32,
    /// The mode applied after bring-up.
    pub mode: Mode,
    /// Whether to power on after bring-up.
    pub power: bool,
    /// The name of PCM device to keep I2S interface clocked.
    pub pcm: String,
    pub mixer_control: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            card_id: 0,
            firmware_dir: PathBuf::from(FIRMWARE_DIR),
            rate: TFA9887_DEFAULT_RATE,
            mode: Default::default(),
            power: false,
            pcm: KEEP_ALIVE_PCM.to_string(),
            mixer_control: I2S_MIXER_CTL.to_string(),
        }
    }
}

/// The platform with character devices added by the kernel driver and ALSA sound card.
#[derive(Debug)]
pub struct DevicePlatform {
    clock: AlsaClock,
}

impl DevicePlatform {
    pub fn new(config: &ServiceConfig) -> Self {
        Self {
            clock: AlsaClock::new(config.card_id, &config.mixer_control, &config.pcm),
        }
    }
}

impl Platform for DevicePlatform {
    type Device = CharDevice;
    type Clock = AlsaClock;

    fn open_device(&mut self, channel: Channel) -> Result<Self::Device, Error> {
        CharDevice::open(Path::new(device_path(channel)))
    }

    fn clock(&self, _: Channel) -> Self::Clock {
        self.clock.clone()
    }
}

enum Event {
    Shutdown,
}

pub struct TfaRuntime {
    config: ServiceConfig,
    pair: Option<AmpPair<CharDevice>>,
    rx: mpsc::Receiver<Event>,
    tx: mpsc::SyncSender<Event>,
    dispatchers: Vec<Dispatcher>,
}

impl Drop for TfaRuntime {
    fn drop(&mut self) {
        // At first, stop event loop in all of dispatchers to avoid queueing new events.
        for dispatcher in &mut self.dispatchers {
            dispatcher.stop();
        }

        // Next, consume all events in queue to release blocked thread for sender.
        for _ in self.rx.try_iter() {}

        // Finally Finish I/O threads.
        self.dispatchers.clear();
    }
}

impl RuntimeOperation<ServiceConfig> for TfaRuntime {
    fn new(config: ServiceConfig, log_level: Option<LogLevel>) -> Result<Self, Error> {
        if let Some(level) = log_level {
            let fmt_level = match level {
                LogLevel::Error => Level::ERROR,
                LogLevel::Warn => Level::WARN,
                LogLevel::Info => Level::INFO,
                LogLevel::Debug => Level::DEBUG,
            };
            tracing_subscriber::fmt().with_max_level(fmt_level).init();
        }

        if !config.firmware_dir.is_dir() {
            let msg = format!("{} is not directory", config.firmware_dir.display());
            Err(Error::new(FileError::Notdir, &msg))?;
        }

        debug!(?config);

        // Use uni-directional channel for communication to child threads.
        let (tx, rx) = mpsc::sync_channel(32);

        Ok(Self {
            config,
            pair: None,
            rx,
            tx,
            dispatchers: Default::default(),
        })
    }

    fn listen(&mut self) -> Result<(), Error> {
        self.launch_system_event_dispatcher()?;

        let mut platform = DevicePlatform::new(&self.config);
        let mut pair = AmpPair::open(&mut platform, &self.config.firmware_dir, self.config.rate);

        pair.set_mode(self.config.mode);
        if self.config.power {
            pair.set_power(true);
        }

        self.pair = Some(pair);

        Ok(())
    }

    fn run(&mut self) -> Result<(), Error> {
        let enter = debug_span!("event").entered();
        loop {
            let ev = match self.rx.recv() {
                Ok(ev) => ev,
                Err(_) => continue,
            };

            match ev {
                Event::Shutdown => break,
            }
        }
        enter.exit();

        if let Some(pair) = self.pair.take() {
            pair.close();
        }
        info!("Amplifiers are closed");

        Ok(())
    }
}

impl TfaRuntime {
    const SYSTEM_DISPATCHER_NAME: &'static str = "system event dispatcher";

    fn launch_system_event_dispatcher(&mut self) -> Result<(), Error> {
        let name = Self::SYSTEM_DISPATCHER_NAME.to_string();
        let mut dispatcher = Dispatcher::run(name)?;

        [signal::Signal::SIGINT, signal::Signal::SIGTERM]
            .iter()
            .for_each(|&signum| {
                let tx = self.tx.clone();
                dispatcher.attach_signal_handler(signum, move || {
                    let _ = tx.send(Event::Shutdown);
                    glib::ControlFlow::Break
                });
            });

        self.dispatchers.push(dispatcher);

        Ok(())
    }
}

// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2024 Takashi Sakamoto

use {
    super::*,
    std::path::{Path, PathBuf},
    tracing::{debug_span, error, info},
};

/// The platform to provide character devices and clock for the amplifiers.
pub trait Platform {
    type Device: Tfa9887Transport;
    type Clock: ClockBackend;

    /// Open the character device for the amplifier of channel.
    fn open_device(&mut self, channel: Channel) -> Result<Self::Device, Error>;

    /// The clock driven while the amplifier of channel is initialized.
    fn clock(&self, channel: Channel) -> Self::Clock;
}

/// The pair of amplifiers for right and left channels. The pair is operable till closed, and
/// any failure of one amplifier does not affect the other.
#[derive(Debug)]
pub struct AmpPair<D: Tfa9887Transport> {
    amps: Vec<Amplifier<D>>,
    firmware_dir: PathBuf,
}

impl<D: Tfa9887Transport> Drop for AmpPair<D> {
    fn drop(&mut self) {
        self.close_amps();
    }
}

impl<D: Tfa9887Transport> AmpPair<D> {
    /// Bring up both amplifiers, then leave them powered down in default mode. The amplifier
    /// failing at any step is left as is, so that the pair can run with the other.
    pub fn open<P>(platform: &mut P, firmware_dir: &Path, rate: u32) -> Self
    where
        P: Platform<Device = D>,
    {
        let _enter = debug_span!("open").entered();

        let amps = Channel::ALL
            .iter()
            .map(|&channel| {
                let mut amp = Amplifier::new(channel);

                match platform.open_device(channel) {
                    Ok(device) => {
                        amp.attach(device);
                        let clock = platform.clock(channel);
                        match amp.bring_up(clock, firmware_dir, rate) {
                            Ok(_) => info!("The amplifier for {} channel is ready", channel),
                            Err(e) => error!(
                                state = ?amp.state(),
                                "Fail to initialize amplifier for {} channel: {}", channel, e
                            ),
                        }
                    }
                    Err(e) => error!("Fail to open amplifier for {} channel: {}", channel, e),
                }

                amp
            })
            .collect();

        Self {
            amps,
            firmware_dir: firmware_dir.to_path_buf(),
        }
    }

    pub fn amps(&self) -> &[Amplifier<D>] {
        &self.amps
    }

    pub fn amp_mut(&mut self, channel: Channel) -> Option<&mut Amplifier<D>> {
        self.amps.iter_mut().find(|amp| amp.channel() == channel)
    }

    pub fn firmware_dir(&self) -> &Path {
        &self.firmware_dir
    }

    /// Power on or off both amplifiers. Any failure is just logged.
    pub fn set_power(&mut self, on: bool) {
        let _enter = debug_span!("power", on).entered();

        self.amps.iter_mut().for_each(|amp| {
            if let Err(e) = amp.set_power(on) {
                error!(
                    "Unable to power {} {} amplifier: {}",
                    if on { "on" } else { "off" },
                    amp.channel(),
                    e
                );
            }
        });

        info!("Set amplifier power to {}", on);
    }

    /// Switch the mode of both amplifiers. The amplifier failing to switch keeps the previous
    /// mode, and any failure is just logged.
    pub fn set_mode(&mut self, mode: Mode) {
        let _enter = debug_span!("mode", %mode).entered();

        let dir = self.firmware_dir.clone();
        self.amps.iter_mut().for_each(|amp| {
            if let Err(e) = amp.switch_mode(&dir, mode) {
                error!(
                    "Fail to switch {} amplifier to {} mode: {}",
                    amp.channel(),
                    mode,
                    e
                );
            }
        });
    }

    fn close_amps(&mut self) {
        self.amps.iter_mut().for_each(|amp| amp.close());
    }

    /// Power off and release both amplifiers.
    pub fn close(mut self) {
        let _enter = debug_span!("close").entered();
        self.close_amps();
    }
}

// SPDX-License-Identifier: LGPL-3.0-or-later
// Copyright (c) 2024 Takashi Sakamoto

//! Protocol about audio mode.
//!
//! Each mode is a profile of DSP for the use case of audio, and consists of four parameter files;
//! configuration, preset, equalizer, and dynamic range compression. The files differ between
//! amplifiers for left and right channels except for the configuration.

use {
    super::*,
    dsp::*,
    eq::*,
    hw_ctl::*,
    tracing::{debug_span, info},
};

/// The name of patch file for the chip.
pub const PATCH_FILE: &str = "tfa9887.patch";

/// The name of speaker model file for the amplifier of right channel.
pub const SPEAKER_FILE_RIGHT: &str = "tfa9887.speaker";

/// The name of speaker model file for the amplifier of left channel.
pub const SPEAKER_FILE_LEFT: &str = "tfa9887_l.speaker";

const CONFIG_FILE: &str = "tfa9887.config";

/// The mode of audio.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Mode {
    Playback,
    Ring,
    Voice,
    Voip,
}

impl Default for Mode {
    fn default() -> Self {
        Self::Playback
    }
}

impl Mode {
    pub const ALL: [Mode; 4] = [Mode::Playback, Mode::Ring, Mode::Voice, Mode::Voip];
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let label = match self {
            Mode::Playback => "playback",
            Mode::Ring => "ring",
            Mode::Voice => "voice",
            Mode::Voip => "voip",
        };
        write!(f, "{}", label)
    }
}

/// The set of parameter files for the mode.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ModeConfig {
    /// The configuration of speaker boost.
    pub config: &'static str,
    /// The preset of speaker boost.
    pub preset: &'static str,
    /// The coefficients of biquad filter bank in text.
    pub eq: &'static str,
    /// The dynamic range compression.
    pub drc: &'static str,
}

/// The table of parameter files for the amplifier of right channel, indexed by mode.
pub const RIGHT_MODE_CONFIGS: [ModeConfig; 4] = [
    ModeConfig {
        config: CONFIG_FILE,
        preset: "playback.preset",
        eq: "playback.eq",
        drc: "playback.drc",
    },
    ModeConfig {
        config: CONFIG_FILE,
        preset: "ring.preset",
        eq: "ring.eq",
        drc: "ring.drc",
    },
    ModeConfig {
        config: CONFIG_FILE,
        preset: "voice.preset",
        eq: "voice.eq",
        drc: "voice.drc",
    },
    ModeConfig {
        config: CONFIG_FILE,
        preset: "voip.preset",
        eq: "voip.eq",
        drc: "voip.drc",
    },
];

/// The table of parameter files for the amplifier of left channel, indexed by mode.
pub const LEFT_MODE_CONFIGS: [ModeConfig; 4] = [
    ModeConfig {
        config: CONFIG_FILE,
        preset: "playback_l.preset",
        eq: "playback_l.eq",
        drc: "playback_l.drc",
    },
    ModeConfig {
        config: CONFIG_FILE,
        preset: "ring_l.preset",
        eq: "ring_l.eq",
        drc: "ring_l.drc",
    },
    ModeConfig {
        config: CONFIG_FILE,
        preset: "voice_l.preset",
        eq: "voice_l.eq",
        drc: "voice_l.drc",
    },
    ModeConfig {
        config: CONFIG_FILE,
        preset: "voip_l.preset",
        eq: "voip_l.eq",
        drc: "voip_l.drc",
    },
];

fn mode_index(mode: Mode) -> usize {
    match mode {
        Mode::Playback => 0,
        Mode::Ring => 1,
        Mode::Voice => 2,
        Mode::Voip => 3,
    }
}

/// The parameter files for the mode of the channel.
pub fn mode_config(channel: Channel, mode: Mode) -> &'static ModeConfig {
    let table = match channel {
        Channel::Right => &RIGHT_MODE_CONFIGS,
        Channel::Left => &LEFT_MODE_CONFIGS,
    };
    &table[mode_index(mode)]
}

/// The name of speaker model file for the channel.
pub fn speaker_file(channel: Channel) -> &'static str {
    match channel {
        Channel::Right => SPEAKER_FILE_RIGHT,
        Channel::Left => SPEAKER_FILE_LEFT,
    }
}

/// The trait for operation to apply audio mode to DSP.
pub trait Tfa9887ModeOperation: Tfa9887EqualizerOperation + Tfa9887HardwareOperation {
    /// Deliver the parameter files of the mode in the order of configuration, preset, equalizer,
    /// and dynamic range compression, then notify configured and wait till MTP is not busy.
    fn set_dsp_mode(&mut self, dir: &Path, channel: Channel, mode: Mode) -> Result<(), Error> {
        let _enter = debug_span!("set_dsp_mode", %channel, %mode).entered();

        let config = mode_config(channel, mode);

        self.load_param_file(&dir.join(config.config))?;
        self.load_param_file(&dir.join(config.preset))?;
        self.load_eq_file(&dir.join(config.eq))?;
        self.load_param_file(&dir.join(config.drc))?;

        self.set_configured()?;
        self.wait_mtp_idle()?;

        info!("Set {} DSP mode to {}", channel, mode);

        Ok(())
    }
}

impl<O: Tfa9887EqualizerOperation + Tfa9887HardwareOperation> Tfa9887ModeOperation for O {}

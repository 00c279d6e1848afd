// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2024 Takashi Sakamoto

use {
    clap::{Parser, ValueEnum},
    runtime_core::{cmdline::*, LogLevel},
    std::path::PathBuf,
    tfa9887_protocols::{hw_ctl::TFA9887_DEFAULT_RATE, mode::Mode},
    tfa9887_runtime::{pcm::*, ServiceConfig, TfaRuntime, FIRMWARE_DIR},
};

struct TfaServiceCmd;

/// The mode of audio.
#[derive(ValueEnum, Debug, Copy, Clone, Eq, PartialEq)]
enum ModeArg {
    Playback,
    Ring,
    Voice,
    Voip,
}

impl From<ModeArg> for Mode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Playback => Mode::Playback,
            ModeArg::Ring => Mode::Ring,
            ModeArg::Voice => Mode::Voice,
            ModeArg::Voip => Mode::Voip,
        }
    }
}

#[derive(Parser)]
#[clap(name = "tfa9887-ctl-service")]
struct Arguments {
    /// The numeric identifier of sound card which has the mixer control for I2S interface.
    card_id: u32,

    /// The directory for patch, speaker model, and parameter files.
    #[clap(long, default_value = FIRMWARE_DIR)]
    firmware_dir: PathBuf,

    /// The sampling rate of I2S interface.
    #[clap(long, default_value_t = TFA9887_DEFAULT_RATE)]
    rate: u32,

    /// The mode of audio applied after bring-up.
    #[clap(long, value_enum, default_value_t = ModeArg::Playback)]
    mode: ModeArg,

    /// Power on the amplifiers after bring-up.
    #[clap(long)]
    power: bool,

    /// The name of PCM device to keep I2S interface clocked.
    #[clap(long, default_value = KEEP_ALIVE_PCM)]
    pcm: String,

    /// The name of mixer control to enable I2S interface.
    #[clap(long, default_value = I2S_MIXER_CTL)]
    mixer_control: String,

    /// The level to debug runtime, disabled as a default.
    #[clap(long, short, value_enum)]
    log_level: Option<LogLevel>,
}

impl ServiceCmd<Arguments, ServiceConfig, TfaRuntime> for TfaServiceCmd {
    fn params(args: &Arguments) -> (ServiceConfig, Option<LogLevel>) {
        let config = ServiceConfig {
            card_id: args.card_id,
            firmware_dir: args.firmware_dir.clone(),
            rate: args.rate,
            mode: args.mode.into(),
            power: args.power,
            pcm: args.pcm.clone(),
            mixer_control: args.mixer_control.clone(),
        };
        (config, args.log_level)
    }
}

fn main() {
    TfaServiceCmd::run()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn arguments() {
        let args = Arguments::try_parse_from(["tfa9887-ctl-service", "1"]).unwrap();
        let (config, log_level) = TfaServiceCmd::params(&args);
        assert_eq!(config, ServiceConfig { card_id: 1, ..Default::default() });
        assert_eq!(log_level, None);

        let args = Arguments::try_parse_from([
            "tfa9887-ctl-service",
            "0",
            "--firmware-dir",
            "/vendor/etc/tfa",
            "--rate",
            "44100",
            "--mode",
            "voip",
            "--power",
            "--log-level",
            "info",
        ])
        .unwrap();
        let (config, log_level) = TfaServiceCmd::params(&args);
        assert_eq!(config.firmware_dir, PathBuf::from("/vendor/etc/tfa"));
        assert_eq!(config.rate, 44100);
        assert_eq!(config.mode, Mode::Voip);
        assert!(config.power);
        assert_eq!(log_level, Some(LogLevel::Info));

        assert!(Arguments::try_parse_from(["tfa9887-ctl-service", "0", "--mode", "music"]).is_err());
    }
}

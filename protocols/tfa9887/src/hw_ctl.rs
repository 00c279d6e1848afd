// SPDX-License-Identifier: LGPL-3.0-or-later
// Copyright (c) 2024 Takashi Sakamoto

//! Protocol about hardware control.
//!
//! The module includes the sequences of register access to bring the chip from cold boot to the
//! state in which DSP accepts parameters, as well as the controls of power, mute, and volume.

use {
    super::*,
    register::*,
    tracing::{debug, info},
};

/// The sampling rate applied at bring-up.
pub const TFA9887_DEFAULT_RATE: u32 = 48000;

/// The number of polls for status register.
pub const READY_POLL_COUNT: usize = 10;

/// The selector of input used at bring-up.
pub const TFA9887_DEFAULT_INPUT: u32 = 2;

const I2SCTRL_RATE_SHIFT: u16 = 12;
const I2SCTRL_RATE_MASK: u16 = 0xf << I2SCTRL_RATE_SHIFT;
const I2SCTRL_CHANSEL_SHIFT: u16 = 3;
const I2SCTRL_CHANSEL_MASK: u16 = 0x3 << I2SCTRL_CHANSEL_SHIFT;
const I2SCTRL_INPUT_SEL_SHIFT: u16 = 6;
const I2SCTRL_INPUT_SEL_MASK: u16 = 0x3 << I2SCTRL_INPUT_SEL_SHIFT;

const SYSCTRL_RESET_DEFAULT: u16 = 0x0002;
const SYSCTRL_TUNED: u16 = 0x024d;

const ERRATUM_REG: u8 = TFA9887_SPKR_CALIBRATION;
const ERRATUM_FLAG: u16 = 0x0400;

const PLL_LOCK_BITS: u16 = TFA9887_STATUS_CLKS | TFA9887_STATUS_PLLS;

/// The register fixups for the wiring of amplifiers in the board. Each entry consists of the
/// register to read, the register to write, the mask applied to the read value, and the bits to
/// set.
///
/// The first three entries are for the right amplifier and the rest are for the left amplifier,
/// while both amplifiers receive all of them. The last entry writes the value derived from 0x0a
/// to 0x09.
pub const HTC_FIXUPS: [(u8, u8, u16, u16); 6] = [
    (0x07, 0x07, 0x0000, 0x0005),
    (0x09, 0x09, 0xffff, 0x0200),
    (0x0a, 0x0a, 0xf9fe, 0x0010),
    (0x07, 0x07, 0xffff, 0x0006),
    (0x09, 0x09, 0xffff, 0x0200),
    (0x0a, 0x09, 0xf9fe, 0x0010),
];

/// The mode of mute.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MuteMode {
    /// The amplifier is enabled and no mute.
    Off,
    /// The amplifier is enabled and digital mute is effective.
    Digital,
    /// The amplifier is disabled.
    Amplifier,
}

impl Default for MuteMode {
    fn default() -> Self {
        Self::Off
    }
}

fn config_error(msg: &str) -> Error {
    Error::new(Tfa9887Error::Config, msg)
}

fn serialize_sample_rate(rate: u32) -> Result<u16, Error> {
    let val = match rate {
        8000 => 0,
        11025 => 1,
        12000 => 2,
        16000 => 3,
        22050 => 4,
        24000 => 5,
        32000 => 6,
        44100 => 7,
        48000 => 8,
        _ => {
            let msg = format!("Unsupported sampling rate: {}", rate);
            Err(config_error(&msg))?
        }
    };
    Ok(val << I2SCTRL_RATE_SHIFT)
}

fn serialize_channel_selector(selector: u32) -> Result<u16, Error> {
    match selector {
        0 => Ok(0x0008),
        1 => Ok(0x0010),
        2 => Ok(0x0018),
        _ => {
            let msg = format!("Invalid selector of channel: {}", selector);
            Err(config_error(&msg))
        }
    }
}

fn serialize_input_selector(selector: u32) -> Result<u16, Error> {
    match selector {
        1 => Ok(0x0040),
        2 => Ok(0x0080),
        _ => {
            let msg = format!("Invalid selector of input: {}", selector);
            Err(config_error(&msg))
        }
    }
}

/// The selector of channel in I2S interface for the amplifier.
pub fn channel_selector(channel: Channel) -> u32 {
    match channel {
        Channel::Right => 1,
        Channel::Left => 0,
    }
}

/// The trait for operations of hardware control.
pub trait Tfa9887HardwareOperation: Tfa9887RegisterOperation {
    /// Poll the status register till the masked bits are equivalent to the state.
    fn wait_ready(&mut self, bits: u16, state: u16) -> Result<(), Error> {
        let mut status = 0;
        let ready = poll(READY_POLL_COUNT, || {
            self.read_register(TFA9887_STATUS).map(|val| {
                status = val;
                val & bits == state
            })
        })?;
        if ready {
            Ok(())
        } else {
            let msg = format!(
                "Timed out waiting for 0x{:04x} in 0x{:04x}, current 0x{:04x}",
                state, bits, status
            );
            Err(Error::new(Tfa9887Error::Timeout, &msg))
        }
    }

    /// Wait till MTP is not busy.
    fn wait_mtp_idle(&mut self) -> Result<(), Error> {
        self.wait_ready(TFA9887_STATUS_MTPB, 0)
    }

    /// Wait till PLL is locked and clock is stable.
    fn wait_pll_lock(&mut self) -> Result<(), Error> {
        self.wait_ready(PLL_LOCK_BITS, PLL_LOCK_BITS)
    }

    /// Restore the default of registers at cold boot, then tune for the behaviour of amplifier.
    fn startup(&mut self) -> Result<(), Error> {
        self.write_register(TFA9887_SYSTEM_CONTROL, SYSCTRL_RESET_DEFAULT)?;

        // Clear the flag, then write back the value read after clearing.
        let val = self.read_register(ERRATUM_REG)?;
        if val & ERRATUM_FLAG > 0 {
            self.write_register(ERRATUM_REG, val & !ERRATUM_FLAG)?;
            let val = self.read_register(ERRATUM_REG)?;
            self.write_register(ERRATUM_REG, val)?;
        }

        self.write_register(TFA9887_SYSTEM_CONTROL, SYSCTRL_RESET_DEFAULT)?;

        // DSP controls the amplifier to avoid plops.
        let val = self.read_register(TFA9887_SYSTEM_CONTROL)?;
        self.write_register(TFA9887_SYSTEM_CONTROL, val | TFA9887_SYSCTRL_SEL_ENBL_AMP)?;

        [
            (TFA9887_BAT_PROT, 0x13ab),
            (TFA9887_AUDIO_CONTROL, 0x001f),
            (TFA9887_SPKR_CALIBRATION, 0x3c4e),
            (TFA9887_SYSTEM_CONTROL, SYSCTRL_TUNED),
            (TFA9887_PWM_CONTROL, 0x0308),
            (TFA9887_CURRENTSENSE4, 0x0e82),
        ]
        .iter()
        .try_for_each(|&(addr, val)| self.write_register(addr, val))?;

        info!("Hardware startup complete");

        Ok(())
    }

    /// Apply the register fixups for the board.
    fn htc_init(&mut self) -> Result<(), Error> {
        HTC_FIXUPS
            .iter()
            .try_for_each(|&(read_addr, write_addr, mask, bits)| {
                let val = self.read_register(read_addr)?;
                self.write_register(write_addr, (val & mask) | bits)
            })
    }

    /// Configure sampling rate of I2S interface.
    fn set_sample_rate(&mut self, rate: u32) -> Result<(), Error> {
        let bits = serialize_sample_rate(rate)?;
        self.update_register(TFA9887_I2S_CONTROL, I2SCTRL_RATE_MASK, bits)
            .map(|_| ())
    }

    /// Select the channel of I2S interface; 0 for left, 1 for right, 2 for both.
    fn select_channel(&mut self, selector: u32) -> Result<(), Error> {
        let bits = serialize_channel_selector(selector)?;
        self.update_register(TFA9887_I2S_CONTROL, I2SCTRL_CHANSEL_MASK, bits)
            .map(|_| ())
    }

    /// Select the input source; 1 or 2.
    fn select_input(&mut self, selector: u32) -> Result<(), Error> {
        let bits = serialize_input_selector(selector)?;
        self.update_register(TFA9887_I2S_CONTROL, I2SCTRL_INPUT_SEL_MASK, bits)
            .map(|_| ())
    }

    /// Set attenuation in dB. The step is 0.5 dB.
    fn set_volume(&mut self, db: f32) -> Result<(), Error> {
        if db > 0.0 {
            let msg = format!("Positive volume is not supported: {}", db);
            Err(config_error(&msg))?;
        }

        let steps = (-2.0 * db) as u8;
        self.update_register(TFA9887_AUDIO_CONTROL, 0xff00, (steps as u16) << 8)
            .map(|_| ())
    }

    /// Power on or down the chip.
    fn set_power(&mut self, on: bool) -> Result<(), Error> {
        let val = if on { 0 } else { TFA9887_SYSCTRL_POWERDOWN };
        self.update_register(TFA9887_SYSTEM_CONTROL, TFA9887_SYSCTRL_POWERDOWN, val)?;
        if !on {
            thread::sleep(POLL_INTERVAL);
        }
        Ok(())
    }

    /// Configure mute.
    fn mute(&mut self, mode: MuteMode) -> Result<(), Error> {
        let mut audio = self.read_register(TFA9887_AUDIO_CONTROL)?;
        let mut system = self.read_register(TFA9887_SYSTEM_CONTROL)?;

        match mode {
            MuteMode::Off => {
                audio &= !TFA9887_AUDIOCTRL_MUTE;
                system |= TFA9887_SYSCTRL_ENBL_AMP;
            }
            MuteMode::Digital => {
                audio |= TFA9887_AUDIOCTRL_MUTE;
                system |= TFA9887_SYSCTRL_ENBL_AMP;
            }
            MuteMode::Amplifier => {
                audio &= !TFA9887_AUDIOCTRL_MUTE;
                system &= !TFA9887_SYSCTRL_ENBL_AMP;
            }
        }

        debug!(?mode, audio, system);

        self.write_register(TFA9887_AUDIO_CONTROL, audio)?;
        self.write_register(TFA9887_SYSTEM_CONTROL, system)
    }

    /// Notify that DSP is configured.
    fn set_configured(&mut self) -> Result<(), Error> {
        let val = self.read_register(TFA9887_SYSTEM_CONTROL)?;
        self.write_register(TFA9887_SYSTEM_CONTROL, val | TFA9887_SYSCTRL_CONFIGURED)
    }
}

impl<O: Tfa9887RegisterOperation> Tfa9887HardwareOperation for O {}

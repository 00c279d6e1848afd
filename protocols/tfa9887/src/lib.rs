// SPDX-License-Identifier: LGPL-3.0-or-later
// Copyright (c) 2024 Takashi Sakamoto

#![doc = include_str!("../README.md")]

pub mod dsp;
pub mod eq;
pub mod hw_ctl;
pub mod memory;
pub mod mode;
pub mod patch;
pub mod register;

#[cfg(test)]
mod simulator;

use {
    glib::{error::ErrorDomain, Error, FileError, Quark},
    std::{path::Path, thread, time::Duration},
};

/// The address of status register.
pub const TFA9887_STATUS: u8 = 0x00;
/// The address of I2S control register.
pub const TFA9887_I2S_CONTROL: u8 = 0x04;
/// The address of battery protection register.
pub const TFA9887_BAT_PROT: u8 = 0x05;
/// The address of audio control register.
pub const TFA9887_AUDIO_CONTROL: u8 = 0x06;
/// The address of speaker calibration register.
pub const TFA9887_SPKR_CALIBRATION: u8 = 0x08;
/// The address of system control register.
pub const TFA9887_SYSTEM_CONTROL: u8 = 0x09;
/// The address of PWM control register.
pub const TFA9887_PWM_CONTROL: u8 = 0x41;
/// The address of the fourth current sense register.
pub const TFA9887_CURRENTSENSE4: u8 = 0x49;
/// The address of control register for CoolFlux DSP.
pub const TFA9887_CF_CONTROLS: u8 = 0x70;
/// The address of memory address register for CoolFlux DSP.
pub const TFA9887_CF_MAD: u8 = 0x71;
/// The address of memory window for CoolFlux DSP.
pub const TFA9887_CF_MEM: u8 = 0x72;
/// The address of status register for CoolFlux DSP.
pub const TFA9887_CF_STATUS: u8 = 0x73;

/// Vddd is within operation range.
pub const TFA9887_STATUS_VDDS: u16 = 1 << 0;
/// PLL is locked.
pub const TFA9887_STATUS_PLLS: u16 = 1 << 1;
/// Clocks are stable.
pub const TFA9887_STATUS_CLKS: u16 = 1 << 6;
/// MTP is busy.
pub const TFA9887_STATUS_MTPB: u16 = 1 << 8;

pub const TFA9887_SYSCTRL_POWERDOWN: u16 = 1 << 0;
pub const TFA9887_SYSCTRL_ENBL_AMP: u16 = 1 << 3;
pub const TFA9887_SYSCTRL_CONFIGURED: u16 = 1 << 5;
pub const TFA9887_SYSCTRL_SEL_ENBL_AMP: u16 = 1 << 6;

pub const TFA9887_AUDIOCTRL_MUTE: u16 = 1 << 5;

/// The maximum length of single transfer in the kernel driver.
pub const MAX_I2C_LENGTH: usize = 254;

/// The offset added to status code reported by DSP in failure of remote procedure call.
pub const RPC_STATUS_OFFSET: i32 = 100;

/// The physical channel which the amplifier drives.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Channel {
    Right,
    Left,
}

impl Channel {
    /// The pair of channels in the order to initialize.
    pub const ALL: [Channel; 2] = [Channel::Right, Channel::Left];
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let label = match self {
            Channel::Right => "right",
            Channel::Left => "left",
        };
        write!(f, "{}", label)
    }
}

/// Any error of communication with TFA9887.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Tfa9887Error {
    /// Failure of ioctl(2) or the device is not opened.
    Transport,
    /// The budget of polling is exhausted.
    Timeout,
    /// Malformed content of patch, parameter, or equalizer file.
    Format,
    /// The requested configuration is not supported.
    Config,
    /// DSP reports non-zero status of remote procedure call.
    Rpc(i32),
    Invalid(i32),
}

impl std::fmt::Display for Tfa9887Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let msg = match self {
            Tfa9887Error::Transport => "transport",
            Tfa9887Error::Timeout => "timeout",
            Tfa9887Error::Format => "format",
            Tfa9887Error::Config => "config",
            Tfa9887Error::Rpc(_) => "rpc",
            Tfa9887Error::Invalid(_) => "invalid",
        };

        write!(f, "Tfa9887Error::{}", msg)
    }
}

impl ErrorDomain for Tfa9887Error {
    fn domain() -> Quark {
        Quark::from_str("tfa9887-protocol-error-quark")
    }

    fn code(self) -> i32 {
        match self {
            Tfa9887Error::Transport => 0,
            Tfa9887Error::Timeout => 1,
            Tfa9887Error::Format => 2,
            Tfa9887Error::Config => 3,
            Tfa9887Error::Rpc(status) => RPC_STATUS_OFFSET + status,
            Tfa9887Error::Invalid(v) => v,
        }
    }

    fn from(code: i32) -> Option<Self> {
        let enumeration = match code {
            0 => Tfa9887Error::Transport,
            1 => Tfa9887Error::Timeout,
            2 => Tfa9887Error::Format,
            3 => Tfa9887Error::Config,
            _ if code > RPC_STATUS_OFFSET => Tfa9887Error::Rpc(code - RPC_STATUS_OFFSET),
            _ => Tfa9887Error::Invalid(code),
        };
        Some(enumeration)
    }
}

/// The trait for the primitive requests which the kernel driver accepts.
///
/// Each request corresponds to single ioctl(2) call against the character device. The buffer for
/// `write_config` and `read_config` is transferred as is, thus it should include the leading
/// padding byte and the address byte when the chip protocol requires them.
pub trait Tfa9887Transport {
    /// Transfer the content of buffer to the chip.
    fn write_config(&mut self, buf: &[u8]) -> Result<(), Error>;

    /// Fill the buffer with the content transferred from the chip.
    fn read_config(&mut self, buf: &mut [u8]) -> Result<(), Error>;

    /// Acquire or release the lock of amplifier in kernel driver.
    fn kernel_lock(&mut self, lock: bool) -> Result<(), Error>;

    /// Enable or disable the DSP processing in kernel driver.
    fn enable_dsp(&mut self, enable: bool) -> Result<(), Error>;
}

/// The interval between polls of register or memory.
pub const POLL_INTERVAL: Duration = Duration::from_millis(1);

// Evaluate the condition till it holds, up to the given count with interval. Any error to
// evaluate is returned immediately.
pub(crate) fn poll<F>(count: usize, mut cond: F) -> Result<bool, Error>
where
    F: FnMut() -> Result<bool, Error>,
{
    for _ in 0..count {
        if cond()? {
            return Ok(true);
        }
        thread::sleep(POLL_INTERVAL);
    }
    Ok(false)
}

pub(crate) fn read_file(path: &Path) -> Result<Vec<u8>, Error> {
    std::fs::read(path).map_err(|e| {
        let kind = match e.kind() {
            std::io::ErrorKind::NotFound => FileError::Noent,
            std::io::ErrorKind::PermissionDenied => FileError::Acces,
            _ => FileError::Io,
        };
        let msg = format!("Fail to read {}: {}", path.display(), e);
        Error::new(kind, &msg)
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn error_domain_code() {
        [
            Tfa9887Error::Transport,
            Tfa9887Error::Timeout,
            Tfa9887Error::Format,
            Tfa9887Error::Config,
            Tfa9887Error::Rpc(1),
            Tfa9887Error::Rpc(0x7fff),
        ]
        .iter()
        .for_each(|&kind| {
            assert_eq!(<Tfa9887Error as ErrorDomain>::from(kind.code()), Some(kind));
        });

        assert_eq!(Tfa9887Error::Rpc(5).code(), 105);
        assert_eq!(
            <Tfa9887Error as ErrorDomain>::from(42),
            Some(Tfa9887Error::Invalid(42))
        );
    }

    #[test]
    fn error_kind_in_glib_error() {
        let err = Error::new(Tfa9887Error::Rpc(3), "DSP reports failure");
        assert_eq!(err.kind::<Tfa9887Error>(), Some(Tfa9887Error::Rpc(3)));
        assert!(err.kind::<FileError>().is_none());
    }
}

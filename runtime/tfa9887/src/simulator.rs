// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2024 Takashi Sakamoto

//! Simulated amplifiers and clock for unit tests.

use {
    super::*,
    std::{
        collections::HashMap,
        path::{Path, PathBuf},
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc, Mutex,
        },
    },
};

const CF_CTRL_REQ_MSG: u16 = 1 << 8;
const CF_STATUS_ACK_MSG: u16 = 0x0100;

/// The chip which responds to requests like the real one, except for DSP which accepts any
/// parameter.
pub struct SimChip {
    pub regs: HashMap<u8, u16>,
    pub writes: Vec<(u8, Vec<u8>)>,
    pub locks: Vec<bool>,
    pub dsp_enables: Vec<bool>,
    pub pll_lockable: bool,
    pub lockable: bool,
    pub responsive: bool,
    selected: u8,
}

impl Default for SimChip {
    fn default() -> Self {
        let mut regs = HashMap::new();
        regs.insert(TFA9887_SYSTEM_CONTROL, TFA9887_SYSCTRL_POWERDOWN);

        Self {
            regs,
            writes: Default::default(),
            locks: Default::default(),
            dsp_enables: Default::default(),
            pll_lockable: true,
            lockable: true,
            responsive: true,
            selected: 0,
        }
    }
}

impl SimChip {
    pub fn reg(&self, addr: u8) -> u16 {
        self.regs.get(&addr).copied().unwrap_or_default()
    }

    pub fn reg_writes(&self, addr: u8) -> Vec<u16> {
        self.writes
            .iter()
            .filter(|(a, data)| *a == addr && data.len() == 2)
            .map(|(_, data)| u16::from_be_bytes([data[0], data[1]]))
            .collect()
    }

    /// The selectors of module and parameter delivered to DSP, in order.
    pub fn param_selectors(&self) -> Vec<[u8; 3]> {
        self.writes
            .iter()
            .filter(|(addr, data)| *addr == TFA9887_CF_MEM && data.len() == 3 && data[0] == 0)
            .filter(|(_, data)| data[1] >= 128)
            .map(|(_, data)| [data[0], data[1], data[2]])
            .collect()
    }

    fn status(&self) -> u16 {
        let mut status = TFA9887_STATUS_VDDS;
        if self.pll_lockable && self.reg(TFA9887_SYSTEM_CONTROL) & TFA9887_SYSCTRL_POWERDOWN == 0 {
            status |= TFA9887_STATUS_PLLS | TFA9887_STATUS_CLKS;
        }
        status
    }

    fn check(&self, label: &str) -> Result<(), Error> {
        if self.responsive {
            Ok(())
        } else {
            Err(Error::new(Tfa9887Error::Transport, label))
        }
    }
}

impl Tfa9887Transport for SimChip {
    fn write_config(&mut self, buf: &[u8]) -> Result<(), Error> {
        self.check("write_config")?;

        let addr = buf[1];
        self.selected = addr;

        let data = &buf[2..];
        if !data.is_empty() {
            self.writes.push((addr, data.to_vec()));

            if addr != TFA9887_CF_MEM && data.len() == 2 {
                let val = u16::from_be_bytes([data[0], data[1]]);
                self.regs.insert(addr, val);

                if addr == TFA9887_CF_CONTROLS {
                    let ack = if val & CF_CTRL_REQ_MSG > 0 {
                        CF_STATUS_ACK_MSG
                    } else {
                        0
                    };
                    self.regs.insert(TFA9887_CF_STATUS, ack);
                }
            }
        }

        Ok(())
    }

    fn read_config(&mut self, buf: &mut [u8]) -> Result<(), Error> {
        self.check("read_config")?;

        match self.selected {
            // Any word in X memory is zero, thus RPC always succeeds.
            TFA9887_CF_MEM => buf.iter_mut().for_each(|b| *b = 0),
            addr => {
                let val = if addr == TFA9887_STATUS {
                    self.status()
                } else {
                    self.reg(addr)
                };
                buf.copy_from_slice(&val.to_be_bytes()[..buf.len()]);
            }
        }

        Ok(())
    }

    fn kernel_lock(&mut self, lock: bool) -> Result<(), Error> {
        if self.lockable {
            self.locks.push(lock);
            Ok(())
        } else {
            Err(Error::new(Tfa9887Error::Transport, "ioctl(KERNEL_LOCK)"))
        }
    }

    fn enable_dsp(&mut self, enable: bool) -> Result<(), Error> {
        self.check("ioctl(ENABLE_DSP)")?;
        self.dsp_enables.push(enable);
        Ok(())
    }
}

/// The record of clock operations shared with the writer thread.
#[derive(Default)]
pub struct ClockEvents {
    pub i2s: Mutex<Vec<bool>>,
    pub writes: AtomicUsize,
}

#[derive(Default)]
pub struct SimClock {
    pub events: Arc<ClockEvents>,
    pub fail_i2s: bool,
    pub fail_stream: bool,
    pub fail_write: bool,
}

impl ClockBackend for SimClock {
    type Stream = SimStream;

    fn enable_i2s(&mut self, enable: bool) -> Result<(), Error> {
        if self.fail_i2s {
            Err(Error::new(FileError::Nodev, "simulated mixer control"))
        } else {
            self.events.i2s.lock().unwrap().push(enable);
            Ok(())
        }
    }

    fn open_stream(&mut self) -> Result<Self::Stream, Error> {
        if self.fail_stream {
            Err(Error::new(FileError::Io, "simulated PCM"))
        } else {
            Ok(SimStream {
                events: self.events.clone(),
                fail: self.fail_write,
            })
        }
    }
}

pub struct SimStream {
    events: Arc<ClockEvents>,
    fail: bool,
}

impl SilenceStream for SimStream {
    fn write_silence(&mut self) -> Result<(), Error> {
        self.events.writes.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(std::time::Duration::from_micros(100));
        if self.fail {
            Err(Error::new(FileError::Io, "simulated underrun"))
        } else {
            Ok(())
        }
    }
}

/// The directory to put firmware files for each test.
pub fn test_dir(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "tfa9887-ctl-service-{}-{}",
        name,
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&path);
    std::fs::create_dir_all(&path).unwrap();
    path
}

/// Write the patch, speaker models and parameters of all modes for both channels.
pub fn populate_firmware(dir: &Path) {
    // The header, then one record of 3 bytes payload for the memory window.
    let patch = [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x04, 0x00, 0x72, 0x01, 0x02, 0x03];
    std::fs::write(dir.join(PATCH_FILE), &patch).unwrap();

    std::fs::write(dir.join(SPEAKER_FILE_RIGHT), &[0x11; 423]).unwrap();
    std::fs::write(dir.join(SPEAKER_FILE_LEFT), &[0x12; 423]).unwrap();

    Channel::ALL.iter().for_each(|&channel| {
        Mode::ALL.iter().for_each(|&mode| {
            let config = mode_config(channel, mode);
            std::fs::write(dir.join(config.config), &[0x01; 165]).unwrap();
            std::fs::write(dir.join(config.preset), &[0x02; 87]).unwrap();
            std::fs::write(dir.join(config.eq), "1 1 0 0 0 0\n2 0.5 -0.25 0 0.125 0\n").unwrap();
            std::fs::write(dir.join(config.drc), &[0x03; 381]).unwrap();
        });
    });
}

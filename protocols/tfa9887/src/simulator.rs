// SPDX-License-Identifier: LGPL-3.0-or-later
// Copyright (c) 2024 Takashi Sakamoto

//! Simulated chip for unit tests.

use {super::*, std::collections::HashMap};

pub const CF_STATUS_READY: u16 = 0x0100;
pub const CF_REQ_BIT: u16 = 1 << 8;

pub struct SimChip {
    pub regs: HashMap<u8, u16>,
    pub writes: Vec<(u8, Vec<u8>)>,
    pub reads: Vec<u8>,
    pub dsp_ready: bool,
    pub rpc_status: u32,
    pub version: u32,
    pub locks: Vec<bool>,
    pub dsp_enables: Vec<bool>,
    pub failing_register: Option<u8>,
    selected: u8,
}

impl Default for SimChip {
    fn default() -> Self {
        let mut regs = HashMap::new();
        regs.insert(
            TFA9887_STATUS,
            TFA9887_STATUS_VDDS | TFA9887_STATUS_PLLS | TFA9887_STATUS_CLKS,
        );
        regs.insert(TFA9887_SYSTEM_CONTROL, TFA9887_SYSCTRL_POWERDOWN);

        Self {
            regs,
            writes: Default::default(),
            reads: Default::default(),
            dsp_ready: true,
            rpc_status: 0,
            version: 0x000012,
            locks: Default::default(),
            dsp_enables: Default::default(),
            failing_register: None,
            selected: 0,
        }
    }
}

impl SimChip {
    pub fn reg(&self, addr: u8) -> u16 {
        self.regs.get(&addr).copied().unwrap_or_default()
    }

    /// The payloads written to the memory window, in order.
    pub fn mem_writes(&self) -> Vec<Vec<u8>> {
        self.writes
            .iter()
            .filter(|(addr, _)| *addr == TFA9887_CF_MEM)
            .map(|(_, data)| data.clone())
            .collect()
    }

    /// The values written to the register, in order.
    pub fn reg_writes(&self, addr: u8) -> Vec<u16> {
        self.writes
            .iter()
            .filter(|(a, data)| *a == addr && data.len() == 2)
            .map(|(_, data)| u16::from_be_bytes([data[0], data[1]]))
            .collect()
    }

    pub fn count_reads(&self, addr: u8) -> usize {
        self.reads.iter().filter(|&&a| a == addr).count()
    }
}

impl Tfa9887Transport for SimChip {
    fn write_config(&mut self, buf: &[u8]) -> Result<(), Error> {
        assert!(buf.len() >= 2);
        assert_eq!(buf[0], 0);

        let addr = buf[1];
        if self.failing_register == Some(addr) {
            return Err(Error::new(FileError::Io, "simulated failure"));
        }

        self.selected = addr;

        let data = &buf[2..];
        if data.is_empty() {
            return Ok(());
        }

        self.writes.push((addr, data.to_vec()));

        if addr != TFA9887_CF_MEM && data.len() == 2 {
            let val = u16::from_be_bytes([data[0], data[1]]);
            self.regs.insert(addr, val);

            if addr == TFA9887_CF_CONTROLS {
                let status = self.reg(TFA9887_CF_STATUS);
                if val & CF_REQ_BIT > 0 && self.dsp_ready {
                    self.regs.insert(TFA9887_CF_STATUS, status | CF_STATUS_READY);
                } else {
                    self.regs.insert(TFA9887_CF_STATUS, status & !CF_STATUS_READY);
                }
            }
        }

        Ok(())
    }

    fn read_config(&mut self, buf: &mut [u8]) -> Result<(), Error> {
        let addr = self.selected;
        if self.failing_register == Some(addr) {
            return Err(Error::new(FileError::Io, "simulated failure"));
        }

        self.reads.push(addr);

        if addr == TFA9887_CF_MEM {
            let word = if self.reg(TFA9887_CF_MAD) == 0 {
                self.rpc_status
            } else {
                self.version
            };
            buf.chunks_mut(3).for_each(|chunk| {
                let bytes = word.to_be_bytes();
                let len = chunk.len();
                chunk.copy_from_slice(&bytes[1..(1 + len)]);
            });
        } else {
            let val = self.reg(addr).to_be_bytes();
            buf.iter_mut()
                .zip(val.iter())
                .for_each(|(b, v)| *b = *v);
        }

        Ok(())
    }

    fn kernel_lock(&mut self, lock: bool) -> Result<(), Error> {
        self.locks.push(lock);
        Ok(())
    }

    fn enable_dsp(&mut self, enable: bool) -> Result<(), Error> {
        self.dsp_enables.push(enable);
        Ok(())
    }
}

/// The directory to put firmware files for each test.
pub fn test_dir(name: &str) -> std::path::PathBuf {
    let path = std::env::temp_dir().join(format!(
        "tfa9887-protocols-{}-{}",
        name,
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&path);
    std::fs::create_dir_all(&path).unwrap();
    path
}

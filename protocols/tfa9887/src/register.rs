// SPDX-License-Identifier: LGPL-3.0-or-later
// Copyright (c) 2024 Takashi Sakamoto

//! Protocol about access to registers and memory window.
//!
//! The kernel driver transfers the given buffer to the chip as is. Each buffer starts with one
//! byte which the chip skips, then the byte of register address follows. Read operations are
//! expressed by a pair of requests; the first one selects the register, the second one fetches
//! the content.

use super::*;

fn transport_error(label: &str, addr: u8, e: Error) -> Error {
    let msg = format!("{} 0x{:02x}: {}", label, addr, e);
    Error::new(Tfa9887Error::Transport, &msg)
}

/// The trait for operations to registers and memory window.
pub trait Tfa9887RegisterOperation: Tfa9887Transport {
    /// Read 16 bit value from the register.
    fn read_register(&mut self, addr: u8) -> Result<u16, Error> {
        let mut buf = [0, addr];
        self.write_config(&buf)
            .map_err(|e| transport_error("Fail to select register", addr, e))?;
        self.read_config(&mut buf)
            .map_err(|e| transport_error("Fail to read register", addr, e))?;
        Ok(u16::from_be_bytes(buf))
    }

    /// Write 16 bit value to the register.
    fn write_register(&mut self, addr: u8, val: u16) -> Result<(), Error> {
        let mut buf = [0; 4];
        buf[1] = addr;
        buf[2..].copy_from_slice(&val.to_be_bytes());
        self.write_config(&buf)
            .map_err(|e| transport_error("Fail to write register", addr, e))
    }

    /// Read the block of data from the register.
    fn read_block(&mut self, addr: u8, data: &mut [u8]) -> Result<(), Error> {
        let buf = [0, addr];
        self.write_config(&buf)
            .map_err(|e| transport_error("Fail to select register", addr, e))?;
        self.read_config(data)
            .map_err(|e| transport_error("Fail to read block from", addr, e))
    }

    /// Write the block of data to the register.
    fn write_block(&mut self, addr: u8, data: &[u8]) -> Result<(), Error> {
        let mut buf = Vec::with_capacity(2 + data.len());
        buf.push(0);
        buf.push(addr);
        buf.extend_from_slice(data);
        self.write_config(&buf)
            .map_err(|e| transport_error("Fail to write block to", addr, e))
    }

    /// Clear the bits in mask, then set the bits of value, for the register.
    fn update_register(&mut self, addr: u8, mask: u16, val: u16) -> Result<u16, Error> {
        let curr = self.read_register(addr)?;
        let next = (curr & !mask) | (val & mask);
        self.write_register(addr, next).map(|_| next)
    }
}

impl<O: Tfa9887Transport> Tfa9887RegisterOperation for O {}

// SPDX-License-Identifier: LGPL-3.0-or-later
// Copyright (c) 2024 Takashi Sakamoto

//! Protocol about firmware patch.
//!
//! The patch file consists of fixed-size header and the sequence of records. Each record has
//! 2 bytes length field in little endian, then the byte of register address and payload follow.
//! The length counts the address byte and payload.

use {
    super::*,
    memory::*,
    register::*,
    tracing::{debug, info, warn},
};

/// The length of header in patch file.
pub const PATCH_HEADER_LENGTH: usize = 6;

/// The offset of word for ROM version in X memory.
pub const ROM_VERSION_OFFSET: u16 = 0x2210;

const PATCH_STATUS_OK: u16 = TFA9887_STATUS_VDDS | TFA9887_STATUS_PLLS | TFA9887_STATUS_CLKS;

/// The record of patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchRecord<'a> {
    /// The address of register.
    pub addr: u8,
    /// The payload written to the register.
    pub data: &'a [u8],
}

/// Parse the content of patch file, including its header.
pub fn parse_patch(raw: &[u8]) -> Result<Vec<PatchRecord>, Error> {
    if raw.len() < PATCH_HEADER_LENGTH {
        let msg = format!(
            "The size of patch should be greater than {} but {}",
            PATCH_HEADER_LENGTH,
            raw.len()
        );
        Err(Error::new(Tfa9887Error::Format, &msg))?;
    }

    let body = &raw[PATCH_HEADER_LENGTH..];
    let mut records = Vec::new();
    let mut pos = 0;

    while pos < body.len() {
        if pos + 2 > body.len() {
            let msg = format!("Truncated length field at {}", PATCH_HEADER_LENGTH + pos);
            Err(Error::new(Tfa9887Error::Format, &msg))?;
        }
        let size = u16::from_le_bytes([body[pos], body[pos + 1]]) as usize;
        pos += 2;

        if size == 0 || size > MAX_I2C_LENGTH {
            let msg = format!(
                "Invalid size of record {} at {}",
                size,
                PATCH_HEADER_LENGTH + pos
            );
            Err(Error::new(Tfa9887Error::Format, &msg))?;
        }

        if pos + size > body.len() {
            let msg = format!(
                "The record at {} exceeds the end of patch: {} > {}",
                PATCH_HEADER_LENGTH + pos,
                size,
                body.len() - pos
            );
            Err(Error::new(Tfa9887Error::Format, &msg))?;
        }

        records.push(PatchRecord {
            addr: body[pos],
            data: &body[(pos + 1)..(pos + size)],
        });
        pos += size;
    }

    Ok(records)
}

/// The trait for operation to apply firmware patch.
pub trait Tfa9887PatchOperation: Tfa9887MemoryOperation {
    /// Apply the content of patch file, including its header.
    fn load_patch(&mut self, raw: &[u8]) -> Result<(), Error> {
        let records = parse_patch(raw)?;

        // The result of check is not used to abort the operation, just for logging.
        match self.read_register(TFA9887_STATUS) {
            Ok(status) if status & PATCH_STATUS_OK != PATCH_STATUS_OK => {
                warn!(
                    "Checking for 0x{:04x}, got 0x{:04x}",
                    PATCH_STATUS_OK, status
                );
            }
            Ok(status) => debug!(status),
            Err(e) => warn!("Fail to read status: {}", e),
        }

        match self.read_mem(ROM_VERSION_OFFSET, 1) {
            Ok(words) => info!("ROM version 0x{:06x}", words[0]),
            Err(e) => warn!("Fail to read ROM version: {}", e),
        }

        records.iter().try_for_each(|record| {
            debug!(addr = record.addr, size = record.data.len());
            self.write_block(record.addr, record.data)
        })
    }

    /// Apply the patch file.
    fn load_patch_file(&mut self, path: &Path) -> Result<(), Error> {
        let raw = read_file(path)?;
        self.load_patch(&raw)
    }
}

impl<O: Tfa9887MemoryOperation> Tfa9887PatchOperation for O {}

// SPDX-License-Identifier: LGPL-3.0-or-later
// Copyright (c) 2024 Takashi Sakamoto

//! Protocol about parameters of CoolFlux DSP.
//!
//! The parameters are delivered by remote procedure call. The caller writes module/parameter
//! selector and payload into the memory window, then raises request and interrupt bits in the
//! control register. The DSP acknowledges the request by ready bit in its status register, then
//! reports the result of call in the first word of X memory.

use {super::*, memory::BYTES_PER_WORD, register::*, tracing::debug};

pub const MODULE_SPEAKERBOOST: u8 = 1;
pub const MODULE_BIQUADFILTERBANK: u8 = 2;

pub const PARAM_SET_LSMODEL: u8 = 0x06;
pub const PARAM_SET_EQ: u8 = 0x0a;
pub const PARAM_SET_PRESET: u8 = 0x0d;
pub const PARAM_SET_CONFIG: u8 = 0x0e;
pub const PARAM_SET_DRC: u8 = 0x0f;

/// The maximum size of parameter file.
pub const MAX_PARAM_SIZE: usize = 768;

/// The number of polls for acknowledge and result of remote procedure call.
pub const RPC_POLL_COUNT: usize = 100;

// cf_req=0, cf_int=0, cf_aif=0, cf_dmem=XMEM, cf_rst_dsp=0.
const CF_CTRL_XMEM: u16 = 0x0002;
const CF_CTRL_REQ_MSG: u16 = 1 << 8;
const CF_CTRL_INT: u16 = 1 << 4;

// 0 for status, 1 for identifier, 2 for parameters.
const CF_MAD_STATUS: u16 = 0x0000;
const CF_MAD_ID: u16 = 0x0001;

const CF_STATUS_ACK_MSG: u16 = 0x0100;

const MODULE_ID_OFFSET: u8 = 128;

/// The kind of parameter which DSP accepts.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ParamKind {
    /// The model of loudspeaker.
    SpeakerModel,
    /// The configuration of speaker boost.
    Config,
    /// The preset of speaker boost.
    Preset,
    /// Dynamic range compression.
    Drc,
    /// Coefficients of biquad filter bank.
    Equalizer,
}

impl ParamKind {
    /// The pair of parameter and module identifiers.
    pub fn ids(&self) -> (u8, u8) {
        match self {
            ParamKind::SpeakerModel => (PARAM_SET_LSMODEL, MODULE_SPEAKERBOOST),
            ParamKind::Config => (PARAM_SET_CONFIG, MODULE_SPEAKERBOOST),
            ParamKind::Preset => (PARAM_SET_PRESET, MODULE_SPEAKERBOOST),
            ParamKind::Drc => (PARAM_SET_DRC, MODULE_SPEAKERBOOST),
            ParamKind::Equalizer => (PARAM_SET_EQ, MODULE_BIQUADFILTERBANK),
        }
    }

    /// Detect the kind of parameter file by its extension.
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("speaker") => Ok(ParamKind::SpeakerModel),
            Some("config") => Ok(ParamKind::Config),
            Some("preset") => Ok(ParamKind::Preset),
            Some("drc") => Ok(ParamKind::Drc),
            _ => {
                let msg = format!("Invalid DSP parameter file: {}", path.display());
                Err(Error::new(Tfa9887Error::Format, &msg))
            }
        }
    }
}

/// The trait for operations to deliver parameters to DSP.
pub trait Tfa9887DspOperation: Tfa9887RegisterOperation {
    /// Deliver the parameter to the module in DSP by remote procedure call.
    fn write_params(&mut self, param_id: u8, module_id: u8, data: &[u8]) -> Result<(), Error> {
        if data.len() > MAX_PARAM_SIZE {
            let msg = format!(
                "The size of parameter should be less than {} but {}",
                MAX_PARAM_SIZE,
                data.len()
            );
            Err(Error::new(Tfa9887Error::Format, &msg))?;
        }

        self.write_register(TFA9887_CF_CONTROLS, CF_CTRL_XMEM)?;
        self.write_register(TFA9887_CF_MAD, CF_MAD_ID)?;

        let id = [0, module_id + MODULE_ID_OFFSET, param_id];
        self.write_block(TFA9887_CF_MEM, &id)?;
        self.write_block(TFA9887_CF_MEM, data)?;

        self.write_register(
            TFA9887_CF_CONTROLS,
            CF_CTRL_XMEM | CF_CTRL_REQ_MSG | CF_CTRL_INT,
        )?;

        // DSP is expected to respond within 1 msec.
        let acked = poll(RPC_POLL_COUNT, || {
            self.read_register(TFA9887_CF_STATUS)
                .map(|status| status & CF_STATUS_ACK_MSG > 0)
        })?;
        if !acked {
            let msg = format!(
                "Timed out waiting for acknowledge of module {}, param {}",
                module_id, param_id
            );
            Err(Error::new(Tfa9887Error::Timeout, &msg))?;
        }

        self.write_register(TFA9887_CF_CONTROLS, CF_CTRL_XMEM)?;
        self.write_register(TFA9887_CF_MAD, CF_MAD_STATUS)?;

        let mut rpc_status = 0;
        let _ = poll(RPC_POLL_COUNT, || {
            let mut raw = [0; BYTES_PER_WORD];
            self.read_block(TFA9887_CF_MEM, &mut raw).map(|_| {
                rpc_status = u32::from_be_bytes([0, raw[0], raw[1], raw[2]]);
                rpc_status == 0
            })
        })?;

        debug!(module_id, param_id, size = data.len(), rpc_status);

        if rpc_status != 0 {
            let msg = format!(
                "DSP reports status {} for module {}, param {}",
                rpc_status, module_id, param_id
            );
            Err(Error::new(Tfa9887Error::Rpc(rpc_status as i32), &msg))
        } else {
            Ok(())
        }
    }

    /// Deliver the content of parameter file. The kind of parameter is detected by extension of
    /// the file.
    fn load_param_file(&mut self, path: &Path) -> Result<(), Error> {
        let kind = ParamKind::from_path(path)?;
        let data = read_file(path)?;
        let (param_id, module_id) = kind.ids();
        self.write_params(param_id, module_id, &data)
    }
}

impl<O: Tfa9887RegisterOperation> Tfa9887DspOperation for O {}

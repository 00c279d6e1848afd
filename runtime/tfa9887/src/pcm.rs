// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2024 Takashi Sakamoto

use {
    super::*,
    alsa::{
        pcm::{Access, Format, HwParams, PCM},
        Direction, ValueOr,
    },
    alsactl::ElemIfaceType,
    runtime_core::card_cntr::CardCntr,
    tracing::{debug, debug_span},
};

/// The name of mixer control to gate I2S interface.
pub const I2S_MIXER_CTL: &str = "QUAT_MI2S_RX Audio Mixer MultiMedia1";

/// The name of PCM device to emit silence.
pub const KEEP_ALIVE_PCM: &str = "hw:0,0";

const PCM_CHANNELS: u32 = 2;
const PCM_RATE: u32 = 48000;
const PCM_PERIOD_SIZE: alsa::pcm::Frames = 960;
const PCM_PERIOD_COUNT: u32 = 8;
const PCM_THRESHOLD: alsa::pcm::Frames = PCM_PERIOD_SIZE / 4;

fn pcm_error(label: &str, e: alsa::Error) -> Error {
    let msg = format!("{}: {}", label, e);
    Error::new(FileError::Io, &msg)
}

/// The clock of I2S interface driven by ALSA control and PCM interfaces.
#[derive(Debug, Clone)]
pub struct AlsaClock {
    card_id: u32,
    mixer_control: String,
    pcm: String,
}

impl AlsaClock {
    pub fn new(card_id: u32, mixer_control: &str, pcm: &str) -> Self {
        Self {
            card_id,
            mixer_control: mixer_control.to_string(),
            pcm: pcm.to_string(),
        }
    }
}

impl ClockBackend for AlsaClock {
    type Stream = AlsaPcmStream;

    fn enable_i2s(&mut self, enable: bool) -> Result<(), Error> {
        let _enter = debug_span!("i2s").entered();

        // The control character device is opened each time since the writer thread owns this.
        let card_cntr = CardCntr::default();
        card_cntr.open(self.card_id)?;
        let elem_id = card_cntr.find_elem_by_name(ElemIfaceType::Mixer, &self.mixer_control)?;
        card_cntr.write_bool(&elem_id, enable)?;

        debug!(card_id = self.card_id, enable);

        Ok(())
    }

    fn open_stream(&mut self) -> Result<Self::Stream, Error> {
        AlsaPcmStream::open(&self.pcm)
    }
}

/// The PCM substream to emit silence.
pub struct AlsaPcmStream {
    pcm: PCM,
    buffer: Vec<i16>,
}

impl AlsaPcmStream {
    pub fn open(name: &str) -> Result<Self, Error> {
        let _enter = debug_span!("pcm").entered();

        let pcm = PCM::new(name, Direction::Playback, false)
            .map_err(|e| pcm_error(&format!("Fail to open {}", name), e))?;

        let frames = {
            let hwp = HwParams::any(&pcm).map_err(|e| pcm_error("hw_params", e))?;
            hwp.set_channels(PCM_CHANNELS)
                .and_then(|_| hwp.set_rate(PCM_RATE, ValueOr::Nearest))
                .and_then(|_| hwp.set_format(Format::S16LE))
                .and_then(|_| hwp.set_access(Access::RWInterleaved))
                .and_then(|_| hwp.set_period_size(PCM_PERIOD_SIZE, ValueOr::Nearest))
                .and_then(|_| hwp.set_periods(PCM_PERIOD_COUNT, ValueOr::Nearest))
                .and_then(|_| pcm.hw_params(&hwp))
                .map_err(|e| pcm_error("hw_params", e))?;
            hwp.get_buffer_size().map_err(|e| pcm_error("hw_params", e))?
        };

        {
            let swp = pcm
                .sw_params_current()
                .map_err(|e| pcm_error("sw_params", e))?;
            swp.set_start_threshold(PCM_THRESHOLD)
                .and_then(|_| swp.set_avail_min(PCM_THRESHOLD))
                .and_then(|_| swp.get_boundary())
                .and_then(|boundary| swp.set_stop_threshold(boundary))
                .and_then(|_| pcm.sw_params(&swp))
                .map_err(|e| pcm_error("sw_params", e))?;
        }

        debug!(pcm = name, frames);

        let buffer = vec![0; frames as usize * PCM_CHANNELS as usize];
        Ok(Self { pcm, buffer })
    }
}

impl SilenceStream for AlsaPcmStream {
    fn write_silence(&mut self) -> Result<(), Error> {
        let io = self.pcm.io_i16().map_err(|e| pcm_error("io", e))?;
        match io.writei(&self.buffer) {
            Ok(_) => Ok(()),
            Err(e) => {
                // Recover from underrun for the next write.
                let _ = self.pcm.try_recover(e, true);
                Err(pcm_error("writei", e))
            }
        }
    }
}

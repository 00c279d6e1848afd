// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2024 Takashi Sakamoto

use {
    super::*,
    std::path::Path,
    tracing::{debug, debug_span, error, warn},
};

/// The furthest step which bring-up of amplifier reached.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum BringUpState {
    Closed,
    DeviceOpen,
    ClockRunning,
    ColdBooted,
    ChannelConfigured,
    PoweredOn,
    PllLocked,
    PatchLoaded,
    SpeakerLoaded,
    Idle,
}

impl Default for BringUpState {
    fn default() -> Self {
        Self::Closed
    }
}

/// The instance of amplifier for one channel.
#[derive(Debug)]
pub struct Amplifier<D: Tfa9887Transport> {
    channel: Channel,
    device: Option<D>,
    is_on: bool,
    mode: Mode,
    state: BringUpState,
    keep_alive: Option<KeepAlive>,
}

impl<D: Tfa9887Transport> Amplifier<D> {
    pub fn new(channel: Channel) -> Self {
        Self {
            channel,
            device: None,
            is_on: false,
            mode: Default::default(),
            state: Default::default(),
            keep_alive: None,
        }
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn is_on(&self) -> bool {
        self.is_on
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn state(&self) -> BringUpState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == BringUpState::Idle
    }

    pub fn device_mut(&mut self) -> Option<&mut D> {
        self.device.as_mut()
    }

    fn device(&mut self) -> Result<&mut D, Error> {
        let channel = self.channel;
        self.device.as_mut().ok_or_else(|| {
            let msg = format!("The device for {} channel is not opened", channel);
            Error::new(Tfa9887Error::Transport, &msg)
        })
    }

    fn advance(&mut self, state: BringUpState) {
        debug!(channel = %self.channel, ?state);
        self.state = state;
    }

    /// Take the opened character device.
    pub fn attach(&mut self, device: D) {
        self.device = Some(device);
        self.advance(BringUpState::DeviceOpen);
    }

    /// Start the keep-alive writer and wait till it starts writing.
    pub fn start_clock<C: ClockBackend>(&mut self, clock: C) -> Result<(), Error> {
        let name = format!("{} keep-alive", self.channel);
        let keep_alive = KeepAlive::start(&name, clock)?;
        self.keep_alive = Some(keep_alive);
        self.advance(BringUpState::ClockRunning);
        Ok(())
    }

    /// Stop the keep-alive writer if running.
    pub fn stop_clock(&mut self) {
        if let Some(mut keep_alive) = self.keep_alive.take() {
            keep_alive.stop();
        }
    }

    pub fn is_clocked(&self) -> bool {
        self.keep_alive.is_some()
    }

    /// Initialize the chip from cold boot till the speaker model is loaded. It leaves the chip
    /// powered on.
    pub fn hw_init(&mut self, dir: &Path, rate: u32) -> Result<(), Error> {
        let _enter = debug_span!("hw-init", channel = %self.channel).entered();

        let channel = self.channel;

        let device = self.device()?;
        device.wait_mtp_idle()?;
        device.startup()?;
        self.advance(BringUpState::ColdBooted);

        let device = self.device()?;
        device.htc_init()?;
        device.set_sample_rate(rate)?;
        device.select_channel(channel_selector(channel))?;
        device.select_input(TFA9887_DEFAULT_INPUT)?;
        device.set_volume(0.0)?;
        self.advance(BringUpState::ChannelConfigured);

        self.set_power(true)?;
        self.advance(BringUpState::PoweredOn);

        self.device()?.wait_pll_lock()?;
        self.advance(BringUpState::PllLocked);

        self.device()?.load_patch_file(&dir.join(PATCH_FILE))?;
        self.advance(BringUpState::PatchLoaded);

        self.device()?
            .load_param_file(&dir.join(speaker_file(channel)))?;
        self.advance(BringUpState::SpeakerLoaded);

        Ok(())
    }

    /// Run whole bring-up with the clock, then apply the recorded mode and enable DSP. The
    /// clock is stopped and the chip is powered down in the end even if any step fails.
    pub fn bring_up<C: ClockBackend>(
        &mut self,
        clock: C,
        dir: &Path,
        rate: u32,
    ) -> Result<(), Error> {
        let res = self.start_clock(clock).and_then(|_| {
            self.hw_init(dir, rate)?;
            let mode = self.mode;
            self.set_dsp_mode(dir, mode)?;
            self.enable_dsp(true)
        });

        self.stop_clock();
        if let Err(e) = self.set_power(false) {
            warn!(channel = %self.channel, "Fail to power off: {}", e);
        }

        if res.is_ok() {
            self.advance(BringUpState::Idle);
        }

        res
    }

    /// Power on or off. Nothing happens when the power is already at the state.
    pub fn set_power(&mut self, on: bool) -> Result<(), Error> {
        if self.is_on == on {
            return Ok(());
        }

        Tfa9887HardwareOperation::set_power(self.device()?, on)?;
        self.is_on = on;
        Ok(())
    }

    /// Load parameter files for the mode, then record it.
    pub fn set_dsp_mode(&mut self, dir: &Path, mode: Mode) -> Result<(), Error> {
        let channel = self.channel;
        self.device()?.set_dsp_mode(dir, channel, mode)?;
        self.mode = mode;
        Ok(())
    }

    pub fn enable_dsp(&mut self, enable: bool) -> Result<(), Error> {
        self.device()?.enable_dsp(enable)
    }

    /// Switch the mode under the lock in kernel driver, with digital mute while loading.
    /// Returns `Ok(false)` when the mode is already applied.
    pub fn switch_mode(&mut self, dir: &Path, mode: Mode) -> Result<bool, Error> {
        if self.mode == mode {
            debug!(channel = %self.channel, %mode, "No mode change needed");
            return Ok(false);
        }

        let _enter = debug_span!("switch-mode", channel = %self.channel, %mode).entered();

        self.device()?.kernel_lock(true)?;

        if let Err(e) = self.device()?.mute(MuteMode::Digital) {
            warn!(channel = %self.channel, "Fail to mute: {}", e);
        }

        let res = self.set_dsp_mode(dir, mode);
        if let Err(e) = &res {
            error!(channel = %self.channel, %mode, "Fail to load parameters: {}", e);
        }

        if let Err(e) = self.device()?.mute(MuteMode::Off) {
            warn!(channel = %self.channel, "Fail to unmute: {}", e);
        }
        if let Err(e) = self.device()?.kernel_lock(false) {
            warn!(channel = %self.channel, "Fail to unlock: {}", e);
        }

        res.map(|_| true)
    }

    /// Power off and release the character device.
    pub fn close(&mut self) {
        self.stop_clock();

        if self.device.is_some() {
            if let Err(e) = self.set_power(false) {
                error!(channel = %self.channel, "Fail to power off: {}", e);
            }
        }

        self.device = None;
        self.advance(BringUpState::Closed);
    }
}

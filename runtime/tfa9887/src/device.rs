// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2024 Takashi Sakamoto

use {
    super::*,
    libc::c_uint,
    std::{
        fs::{File, OpenOptions},
        os::unix::io::AsRawFd,
        path::{Path, PathBuf},
    },
    tracing::debug,
};

/// The character device for the amplifier of right channel.
pub const TFA9887_DEVICE: &str = "/dev/tfa9887";
/// The character device for the amplifier of left channel.
pub const TFA9887L_DEVICE: &str = "/dev/tfa9887l";

const TFA9887_IOCTL_MAGIC: u8 = b'a';
const TFA9887_WRITE_CONFIG_NR: u8 = 1;
const TFA9887_READ_CONFIG_NR: u8 = 2;
const TFA9887_ENABLE_DSP_NR: u8 = 3;
const TFA9887_KERNEL_LOCK_NR: u8 = 6;

// The layout of argument for WRITE_CONFIG/READ_CONFIG requests.
#[repr(C)]
struct ConfigRequest {
    len: c_uint,
    buf: *mut u8,
}

nix::ioctl_write_ptr_bad!(
    tfa9887_write_config,
    nix::request_code_write!(
        TFA9887_IOCTL_MAGIC,
        TFA9887_WRITE_CONFIG_NR,
        std::mem::size_of::<c_uint>()
    ),
    ConfigRequest
);
nix::ioctl_write_ptr_bad!(
    tfa9887_read_config,
    nix::request_code_write!(
        TFA9887_IOCTL_MAGIC,
        TFA9887_READ_CONFIG_NR,
        std::mem::size_of::<c_uint>()
    ),
    ConfigRequest
);
nix::ioctl_write_ptr_bad!(
    tfa9887_enable_dsp,
    nix::request_code_write!(
        TFA9887_IOCTL_MAGIC,
        TFA9887_ENABLE_DSP_NR,
        std::mem::size_of::<c_uint>()
    ),
    [c_uint; 2]
);
nix::ioctl_write_ptr_bad!(
    tfa9887_kernel_lock,
    nix::request_code_write!(
        TFA9887_IOCTL_MAGIC,
        TFA9887_KERNEL_LOCK_NR,
        std::mem::size_of::<c_uint>()
    ),
    [c_uint; 2]
);

/// The path of character device for the channel.
pub fn device_path(channel: Channel) -> &'static str {
    match channel {
        Channel::Right => TFA9887_DEVICE,
        Channel::Left => TFA9887L_DEVICE,
    }
}

fn ioctl_error(label: &str, e: nix::Error) -> Error {
    let msg = format!("ioctl({}) {}({})", label, e as i32, e.desc());
    Error::new(Tfa9887Error::Transport, &msg)
}

/// The character device added by the kernel driver for the amplifier.
#[derive(Debug)]
pub struct CharDevice {
    file: File,
    path: PathBuf,
}

impl CharDevice {
    pub fn open(path: &Path) -> Result<Self, Error> {
        OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map(|file| {
                debug!(path = %path.display(), "opened");
                Self {
                    file,
                    path: path.to_path_buf(),
                }
            })
            .map_err(|e| {
                let kind = match e.kind() {
                    std::io::ErrorKind::NotFound => FileError::Noent,
                    std::io::ErrorKind::PermissionDenied => FileError::Acces,
                    _ => FileError::Failed,
                };
                let msg = format!("Fail to open {}: {}", path.display(), e);
                Error::new(kind, &msg)
            })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn switch(
        &self,
        label: &str,
        func: unsafe fn(libc::c_int, *const [c_uint; 2]) -> nix::Result<libc::c_int>,
        state: bool,
    ) -> Result<(), Error> {
        let args: [c_uint; 2] = [1, state as c_uint];
        unsafe { func(self.file.as_raw_fd(), &args) }
            .map(|_| ())
            .map_err(|e| ioctl_error(label, e))
    }
}

impl Tfa9887Transport for CharDevice {
    fn write_config(&mut self, buf: &[u8]) -> Result<(), Error> {
        // The kernel driver just copies from the buffer.
        let req = ConfigRequest {
            len: buf.len() as c_uint,
            buf: buf.as_ptr() as *mut u8,
        };
        unsafe { tfa9887_write_config(self.file.as_raw_fd(), &req) }
            .map(|_| ())
            .map_err(|e| ioctl_error("WRITE_CONFIG", e))
    }

    fn read_config(&mut self, buf: &mut [u8]) -> Result<(), Error> {
        let req = ConfigRequest {
            len: buf.len() as c_uint,
            buf: buf.as_mut_ptr(),
        };
        unsafe { tfa9887_read_config(self.file.as_raw_fd(), &req) }
            .map(|_| ())
            .map_err(|e| ioctl_error("READ_CONFIG", e))
    }

    fn kernel_lock(&mut self, lock: bool) -> Result<(), Error> {
        self.switch("KERNEL_LOCK", tfa9887_kernel_lock, lock)
    }

    fn enable_dsp(&mut self, enable: bool) -> Result<(), Error> {
        self.switch("ENABLE_DSP", tfa9887_enable_dsp, enable)
    }
}

// SPDX-License-Identifier: MIT
//
// Entropy Pool Feeder: Remote Entropy to Kernel Pool Bridge

//! Privileged interface to the Linux kernel entropy pool
//!
//! Pool size discovery reads `/proc/sys/kernel/random/poolsize` (bits);
//! feeding goes through `/dev/random` with the random-device ioctls. Both
//! require the process to run with CAP_SYS_ADMIN. The [`EntropySink`] trait
//! is the seam the feeder loop is written against, so tests can substitute
//! an in-memory sink.

use crate::{Error, Result, MAX_POOL_BYTES};
use std::fs::{File, OpenOptions};
use std::os::unix::io::AsRawFd;

/// Location of the kernel entropy pool device
pub const POOL_DEVICE: &str = "/dev/random";

/// Location of the kernel entropy pool size (in bits)
pub const POOL_SIZE_PATH: &str = "/proc/sys/kernel/random/poolsize";

const RNDGETENTCNT: libc::c_ulong = 0x8004_5200;
const RNDADDENTROPY: libc::c_ulong = 0x4008_5203;

/// Mirror of the kernel's `rand_pool_info` ioctl record
#[repr(C)]
struct RandPoolInfo {
    entropy_count: libc::c_int,
    buf_size: libc::c_int,
    buf: [u8; MAX_POOL_BYTES],
}

/// Destination for verified entropy bytes
pub trait EntropySink {
    /// Current entropy level of the sink, in bits.
    fn entropy_bits(&mut self) -> Result<i32>;

    /// Inject `bytes` and credit `entropy_bits_after` total bits.
    fn inject(&mut self, entropy_bits_after: i32, bytes: &[u8]) -> Result<()>;
}

/// Write-only handle to the kernel entropy pool
pub struct KernelPool {
    device: File,
}

impl KernelPool {
    /// Read the kernel pool size and convert it to bytes, clamped to
    /// [`MAX_POOL_BYTES`].
    pub fn pool_size_bytes() -> Result<usize> {
        let text = std::fs::read_to_string(POOL_SIZE_PATH)
            .map_err(|e| Error::KernelQuery(format!("{}: {}", POOL_SIZE_PATH, e)))?;
        parse_pool_size(&text)
    }

    /// Open the pool device and probe it with an entropy count query,
    /// returning the handle together with the probed entropy bit count.
    ///
    /// Opening requires write access to the device; the probe requires
    /// CAP_SYS_ADMIN.
    pub fn open() -> Result<(Self, i32)> {
        let device = OpenOptions::new()
            .write(true)
            .open(POOL_DEVICE)
            .map_err(|e| Error::KernelOpen(format!("{}: {}", POOL_DEVICE, e)))?;
        let mut pool = Self { device };
        let bits = pool.entropy_bits()?;
        Ok((pool, bits))
    }
}

impl EntropySink for KernelPool {
    fn entropy_bits(&mut self) -> Result<i32> {
        let mut count: libc::c_int = 0;
        let rc = unsafe { libc::ioctl(self.device.as_raw_fd(), RNDGETENTCNT, &mut count) };
        if rc < 0 {
            return Err(Error::KernelQuery(
                std::io::Error::last_os_error().to_string(),
            ));
        }
        Ok(count)
    }

    fn inject(&mut self, entropy_bits_after: i32, bytes: &[u8]) -> Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        if bytes.len() > MAX_POOL_BYTES {
            return Err(Error::KernelInject(format!(
                "injection of {} bytes exceeds the {} byte pool record",
                bytes.len(),
                MAX_POOL_BYTES
            )));
        }

        let mut info = Box::new(RandPoolInfo {
            entropy_count: entropy_bits_after,
            buf_size: bytes.len() as libc::c_int,
            buf: [0u8; MAX_POOL_BYTES],
        });
        info.buf[..bytes.len()].copy_from_slice(bytes);

        let rc = unsafe {
            libc::ioctl(
                self.device.as_raw_fd(),
                RNDADDENTROPY,
                &*info as *const RandPoolInfo,
            )
        };
        if rc < 0 {
            return Err(Error::KernelInject(
                std::io::Error::last_os_error().to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_pool_size(text: &str) -> Result<usize> {
    let bits: usize = text
        .trim()
        .parse()
        .map_err(|_| Error::KernelQuery(format!("unreadable pool size '{}'", text.trim())))?;
    Ok((bits / 8).min(MAX_POOL_BYTES))
}

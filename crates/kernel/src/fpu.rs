//! Flush-to-zero / denormals-are-zero for the duration of a physics update.

/// Enables FTZ and DAZ on creation and restores the previous control state on drop.
///
/// On targets without an SSE control register this is a no-op.
#[derive(Debug)]
pub struct FlushToZeroGuard {
    saved: u32,
}

impl FlushToZeroGuard {
    pub fn enable() -> Self {
        let saved = imp::read();
        imp::write(saved | imp::FLUSH_MASK);
        Self { saved }
    }
}

impl Drop for FlushToZeroGuard {
    fn drop(&mut self) {
        imp::write(self.saved);
    }
}

#[cfg(target_arch = "x86_64")]
mod imp {
    use std::arch::asm;

    const FLUSH_TO_ZERO: u32 = 1 << 15;
    const DENORMALS_ARE_ZERO: u32 = 1 << 6;
    pub const FLUSH_MASK: u32 = FLUSH_TO_ZERO | DENORMALS_ARE_ZERO;

    pub fn read() -> u32 {
        let mut csr: u32 = 0;
        // SAFETY: stmxcsr stores the 32-bit MXCSR register into `csr`.
        unsafe {
            asm!("stmxcsr [{}]", in(reg) &mut csr as *mut u32, options(nostack, preserves_flags));
        }
        csr
    }

    pub fn write(csr: u32) {
        // SAFETY: only FTZ/DAZ bits are changed relative to a value read from MXCSR.
        unsafe {
            asm!("ldmxcsr [{}]", in(reg) &csr as *const u32, options(nostack, readonly, preserves_flags));
        }
    }
}

#[cfg(not(target_arch = "x86_64"))]
mod imp {
    pub const FLUSH_MASK: u32 = 0;

    pub fn read() -> u32 {
        0
    }

    pub fn write(_csr: u32) {}
}

//! Ways to make a process die on purpose, for exercising crash reporting.
//!
//! Every function here either performs the kind of mistake that makes the
//! hardware raise a fatal signal, or delivers one directly. None of them
//! print anything; whatever ends up on stderr comes from the crash reporter
//! under test.

use std::arch::asm;

/// Raises `SIGABRT` the usual way, through `abort()`.
pub fn raise_abort() -> ! {
    std::process::abort();
}

/// Reads through a null pointer, raising `SIGSEGV`.
pub fn raise_segfault() {
    // launder the pointer so the deref_nullptr lint stays quiet
    fn nowhere() -> *const u32 {
        std::ptr::null()
    }

    // SAFETY: nothing about this is safe, a fault is the goal. The volatile
    // read cannot be optimized away.
    let doomed = unsafe { std::ptr::read_volatile(nowhere()) };
    std::hint::black_box(doomed);
}

/// Divides an integer by zero. Raises `SIGFPE` on architectures where that
/// traps; where the hardware shrugs it off instead, the signal is delivered
/// directly so the observable outcome is the same.
pub fn raise_floating_point_exception() {
    unsafe {
        cfg_if::cfg_if! {
            if #[cfg(target_arch = "x86_64")] {
                let mut divisor: u32;
                asm!(
                    "mov eax, 1",
                    "cdq",
                    "mov {div:e}, 0",
                    "idiv {div:e}",
                    div = out(reg) divisor
                );
                std::hint::black_box(divisor);
            } else {
                // aarch64 defines integer division by zero as zero
                libc::raise(libc::SIGFPE);
            }
        }
    }
}

/// Executes an illegal instruction, raising `SIGILL`.
pub fn raise_illegal_instruction() {
    unsafe {
        cfg_if::cfg_if! {
            if #[cfg(target_arch = "x86_64")] {
                asm!("ud2");
            } else if #[cfg(target_arch = "aarch64")] {
                asm!("udf #0");
            } else {
                libc::raise(libc::SIGILL);
            }
        }
    }
}

/// Delivers `SIGINT` to the current process, as if ctrl+c had been pressed.
pub fn raise_interrupt() {
    // SAFETY: raising a signal in our own process
    unsafe {
        libc::raise(libc::SIGINT);
    }
}

/// Delivers `SIGTERM` to the current process.
pub fn raise_termination() {
    // SAFETY: raising a signal in our own process
    unsafe {
        libc::raise(libc::SIGTERM);
    }
}

/// Blows through the stack guard page in one go, raising `SIGSEGV`.
pub fn raise_stack_overflow() {
    let mut big_boi = [0u8; 9 * 1024 * 1024];
    big_boi[big_boi.len() - 1] = 1;
    std::hint::black_box(&big_boi[big_boi.len() - 20..]);
}

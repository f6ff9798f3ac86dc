pub mod address;
mod call;
pub mod error;
pub mod probe;
pub mod process;
pub mod register;
pub mod symbol;

pub use error::Error;

use crate::debugger::process::Child;
use crate::debugger::register::{Register, RegisterMap};
use crate::debugger::symbol::{ImageIndex, Symbol};
use crate::weak_error;
use call::{CallContext, CallHelper};
use log::debug;
use nix::libc::{c_long, c_void, uintptr_t};
use nix::sys;
use nix::unistd::Pid;
use std::cell::Cell;
use std::mem;
use std::str::FromStr;
use strum::IntoEnumIterator;

/// Upper bound for a single remote string read.
const MAX_REMOTE_STRING: usize = 0x0010_0000;

/// Main debugger object. Attaches to a running application and gives access
/// to its memory, registers, symbols and in-process debug views. The whole
/// application stays suspended while the debugger is alive, every operation
/// here is synchronous and serialized by construction.
pub struct Debugger {
    process: Child,
    images: ImageIndex,
    /// Data page mapped into the debuggee, staging area for call results
    /// returned by value. Mapped lazily, unmapped at detach.
    scratch: Cell<Option<u64>>,
}

impl Debugger {
    pub fn new(process: Child) -> Result<Self, Error> {
        let images = ImageIndex::new(process.pid())?;
        Ok(Self {
            process,
            images,
            scratch: Cell::new(None),
        })
    }

    pub fn process(&self) -> &Child {
        &self.process
    }

    pub(crate) fn images(&self) -> &ImageIndex {
        &self.images
    }

    /// Read N bytes from debuggee process.
    pub fn read_memory(&self, addr: usize, read_n: usize) -> Result<Vec<u8>, Error> {
        read_memory_by_pid(self.process.pid(), addr, read_n).map_err(Error::Ptrace)
    }

    /// Read one machine word from debuggee process.
    pub fn read_word(&self, addr: usize) -> Result<usize, Error> {
        let bytes = self.read_memory(addr, mem::size_of::<usize>())?;
        Ok(usize::from_ne_bytes(bytes.try_into().expect("unexpected size")))
    }

    /// Read a NUL-terminated string out of debuggee memory, decoded lossily
    /// as UTF-8. Reads are bounded, a missing terminator is an error rather
    /// than an endless scan.
    pub fn read_c_string(&self, addr: usize) -> Result<String, Error> {
        if addr == 0 {
            return Err(Error::NullRemotePointer);
        }

        let mut result = Vec::new();
        loop {
            let word = self.read_memory(addr + result.len(), mem::size_of::<c_long>())?;
            match word.iter().position(|&b| b == 0) {
                Some(pos) => {
                    result.extend_from_slice(&word[..pos]);
                    return Ok(String::from_utf8_lossy(&result).to_string());
                }
                None => result.extend_from_slice(&word),
            }
            if result.len() >= MAX_REMOTE_STRING {
                return Err(Error::UnterminatedString(MAX_REMOTE_STRING));
            }
        }
    }

    pub fn write_memory(&self, addr: uintptr_t, value: uintptr_t) -> Result<(), Error> {
        unsafe {
            sys::ptrace::write(self.process.pid(), addr as *mut c_void, value as *mut c_void)
                .map_err(Error::Ptrace)
        }
    }

    pub fn get_register_value(&self, register_name: &str) -> Result<u64, Error> {
        let register = Register::from_str(register_name)
            .map_err(|_| Error::RegisterNameNotFound(register_name.to_string()))?;
        let map = RegisterMap::current(self.process.pid()).map_err(Error::Ptrace)?;
        Ok(map.value(register))
    }

    /// Dump all general purpose registers of the stopped application.
    pub fn registers(&self) -> Result<Vec<(Register, u64)>, Error> {
        let map = RegisterMap::current(self.process.pid()).map_err(Error::Ptrace)?;
        Ok(Register::iter().map(|reg| (reg, map.value(reg))).collect())
    }

    /// Find all symbols matching a regular expression in the loaded images.
    pub fn get_symbols(&self, regex: &str) -> Result<Vec<&Symbol>, Error> {
        self.images.find_symbols(regex)
    }

    /// Return the staging page address, mapping it into the debuggee on
    /// first use.
    pub(crate) fn scratch_region(&self) -> Result<u64, Error> {
        if let Some(addr) = self.scratch.get() {
            return Ok(addr);
        }

        debug!(target: "debugger", "map staging page into the debuggee");
        let ctx = CallContext::new(self)?;
        let addr = ctx.with_ctx(|ctx| CallHelper::mmap(ctx))?;
        self.scratch.set(Some(addr));
        Ok(addr)
    }

    /// Release debugger-owned resources inside the debuggee and detach,
    /// the application resumes on its own.
    pub fn detach(&self) -> Result<(), Error> {
        if let Some(addr) = self.scratch.take() {
            debug!(target: "debugger", "unmap staging page");
            let unmap = CallContext::new(self).and_then(|ctx| ctx.with_ctx(|c| CallHelper::munmap(c, addr)));
            weak_error!(unmap, "staging page unmap:");
        }
        self.process.detach()
    }
}

/// Read N bytes from `PID` process.
pub fn read_memory_by_pid(pid: Pid, addr: usize, read_n: usize) -> nix::Result<Vec<u8>> {
    let mut read_reminder = read_n as isize;
    let mut result = Vec::with_capacity(read_n);

    let single_read_size = mem::size_of::<c_long>();

    let mut addr = addr as *mut c_long;
    while read_reminder > 0 {
        let value = sys::ptrace::read(pid, addr as *mut c_void)?;
        result.extend(value.to_ne_bytes().into_iter().take(read_reminder as usize));

        read_reminder -= single_read_size as isize;
        addr = unsafe { addr.offset(1) };
    }

    debug_assert!(result.len() == read_n);

    Ok(result)
}

use nix::libc::user_regs_struct;
use nix::sys;
use nix::unistd::Pid;
use strum_macros::Display;
use strum_macros::EnumIter;
use strum_macros::EnumString;

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, EnumString, EnumIter, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Register {
    Rax,
    Rbx,
    Rcx,
    Rdx,
    Rdi,
    Rsi,
    Rbp,
    Rsp,
    R8,
    R9,
    R10,
    R11,
    R12,
    R13,
    R14,
    R15,
    Rip,
    Eflags,
    Cs,
    OrigRax,
    FsBase,
    GsBase,
    Fs,
    Gs,
    Ss,
    Ds,
    Es,
}

/// Snapshot of general purpose registers of a stopped tracee.
#[derive(Clone)]
pub struct RegisterMap(user_regs_struct);

impl From<user_regs_struct> for RegisterMap {
    fn from(value: user_regs_struct) -> Self {
        Self(value)
    }
}

impl From<RegisterMap> for user_regs_struct {
    fn from(map: RegisterMap) -> user_regs_struct {
        map.0
    }
}

impl RegisterMap {
    pub fn current(pid: Pid) -> nix::Result<Self> {
        let regs = sys::ptrace::getregs(pid)?;
        Ok(regs.into())
    }

    pub fn value(&self, register: Register) -> u64 {
        match register {
            Register::Rax => self.0.rax,
            Register::Rbx => self.0.rbx,
            Register::Rcx => self.0.rcx,
            Register::Rdx => self.0.rdx,
            Register::Rdi => self.0.rdi,
            Register::Rsi => self.0.rsi,
            Register::Rbp => self.0.rbp,
            Register::Rsp => self.0.rsp,
            Register::R8 => self.0.r8,
            Register::R9 => self.0.r9,
            Register::R10 => self.0.r10,
            Register::R11 => self.0.r11,
            Register::R12 => self.0.r12,
            Register::R13 => self.0.r13,
            Register::R14 => self.0.r14,
            Register::R15 => self.0.r15,
            Register::Rip => self.0.rip,
            Register::Eflags => self.0.eflags,
            Register::Cs => self.0.cs,
            Register::OrigRax => self.0.orig_rax,
            Register::FsBase => self.0.fs_base,
            Register::GsBase => self.0.gs_base,
            Register::Fs => self.0.fs,
            Register::Gs => self.0.gs,
            Register::Ss => self.0.ss,
            Register::Ds => self.0.ds,
            Register::Es => self.0.es,
        }
    }

    pub fn update(&mut self, register: Register, value: u64) {
        match register {
            Register::Rax => self.0.rax = value,
            Register::Rbx => self.0.rbx = value,
            Register::Rcx => self.0.rcx = value,
            Register::Rdx => self.0.rdx = value,
            Register::Rdi => self.0.rdi = value,
            Register::Rsi => self.0.rsi = value,
            Register::Rbp => self.0.rbp = value,
            Register::Rsp => self.0.rsp = value,
            Register::R8 => self.0.r8 = value,
            Register::R9 => self.0.r9 = value,
            Register::R10 => self.0.r10 = value,
            Register::R11 => self.0.r11 = value,
            Register::R12 => self.0.r12 = value,
            Register::R13 => self.0.r13 = value,
            Register::R14 => self.0.r14 = value,
            Register::R15 => self.0.r15 = value,
            Register::Rip => self.0.rip = value,
            Register::Eflags => self.0.eflags = value,
            Register::Cs => self.0.cs = value,
            Register::OrigRax => self.0.orig_rax = value,
            Register::FsBase => self.0.fs_base = value,
            Register::GsBase => self.0.gs_base = value,
            Register::Fs => self.0.fs = value,
            Register::Gs => self.0.gs = value,
            Register::Ss => self.0.ss = value,
            Register::Ds => self.0.ds = value,
            Register::Es => self.0.es = value,
        };
    }

    pub fn persist(self, pid: Pid) -> nix::Result<()> {
        sys::ptrace::setregs(pid, self.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn register_names_round_trip() {
        assert_eq!(Register::from_str("rip").unwrap(), Register::Rip);
        assert_eq!(Register::from_str("r9").unwrap(), Register::R9);
        assert_eq!(Register::from_str("fs_base").unwrap(), Register::FsBase);
        assert_eq!(Register::Rax.to_string(), "rax");
        assert_eq!(Register::OrigRax.to_string(), "orig_rax");
        assert!(Register::from_str("xmm0").is_err());
    }
}

use super::{
    Debugger,
    address::RelocatedAddress,
    error::{CallError, Error},
    register::{Register, RegisterMap},
};
use crate::debugger::read_memory_by_pid;
use crate::muted_error;
use log::debug;
use nix::sys::{self, signal::Signal, wait::WaitStatus};

/// Function call arguments, integer or pointer class only.
#[derive(Default)]
pub struct CallArgs(Box<[u64]>);

impl CallArgs {
    pub fn new(args: &[u64]) -> Result<Self, CallError> {
        if args.len() > 6 {
            return Err(CallError::TooManyArguments);
        }
        Ok(CallArgs(args.into()))
    }

    /// Fill registers with arguments.
    fn prepare_registers(&self, reg_map: &mut RegisterMap) {
        for (no, value) in self.0.iter().enumerate() {
            reg_map.update(get_reg_for_no(no), *value);
        }
    }
}

/// Map argument to the register according to System V AMD64 ABI.
fn get_reg_for_no(no: usize) -> Register {
    match no {
        0 => Register::Rdi,
        1 => Register::Rsi,
        2 => Register::Rdx,
        3 => Register::Rcx,
        4 => Register::R8,
        5 => Register::R9,
        _ => unreachable!("unsupported arg no"),
    }
}

/// Program state before a call.
pub(super) struct CallContext<'a> {
    dbg: &'a Debugger,
    pid: nix::unistd::Pid,
    pc: RelocatedAddress,
    regs: RegisterMap,
    text: usize,
}

impl<'a> CallContext<'a> {
    pub fn new(dbg: &'a Debugger) -> Result<Self, Error> {
        let pid = dbg.process().pid();
        let regs = RegisterMap::current(pid).map_err(Error::Ptrace)?;
        let pc = RelocatedAddress::from(regs.value(Register::Rip));
        let text = read_memory_by_pid(pid, pc.as_usize(), size_of::<u64>()).map_err(Error::Ptrace)?;
        let text = usize::from_ne_bytes(text.try_into().expect("unexpected size"));

        Ok(Self {
            dbg,
            pid,
            pc,
            regs,
            text,
        })
    }

    fn retrieve_original_state(&self) -> Result<(), Error> {
        self.regs.clone().persist(self.pid).map_err(Error::Ptrace)?;
        self.dbg.write_memory(self.pc.as_usize(), self.text)?;
        Ok(())
    }

    pub fn with_ctx<F, T>(mut self, f: F) -> Result<T, Error>
    where
        F: FnOnce(&mut Self) -> Result<T, Error>,
    {
        let result = f(&mut self);

        debug!(target: "debugger", "retrieve original registers and instructions");
        let restore = self.retrieve_original_state();
        match result {
            Ok(value) => restore.map(|_| value),
            Err(e) => {
                muted_error!(restore, "state restore after failed call:");
                Err(e)
            }
        }
    }
}

pub(super) struct CallHelper;

impl CallHelper {
    /// Execute a function inside a mmap'ed region and return its result value (%rax).
    fn call_fn(ctx: &CallContext, mem_ptr: u64, fn_addr: u64, args: &CallArgs) -> Result<u64, Error> {
        // new text:
        // FF D0 - CALL %rax
        // CC - break
        const CALL_FN: usize = 0xFFusize | (0xD0usize << 0x8) | (0xCCusize << 0x10);

        debug!(target: "debugger", "add call instructions");
        ctx.dbg.write_memory(mem_ptr as usize, CALL_FN)?;

        debug!(target: "debugger", "prepare function arguments");
        let mut regs: RegisterMap = ctx.regs.clone();
        args.prepare_registers(&mut regs);
        regs.update(Register::Rax, fn_addr);
        regs.update(Register::Rip, mem_ptr);
        // skip the red zone of the interrupted frame, the ABI requires
        // 16-byte stack alignment at the call site
        let rsp = (ctx.regs.value(Register::Rsp) - 128) & !0xF;
        regs.update(Register::Rsp, rsp);
        regs.persist(ctx.pid).map_err(Error::Ptrace)?;

        debug!(target: "debugger", "call a function, wait until breakpoint are hit");
        sys::ptrace::cont(ctx.pid, None).map_err(Error::Ptrace)?;
        let res = nix::sys::wait::waitpid(ctx.pid, None).map_err(Error::Waitpid)?;
        if !matches!(res, WaitStatus::Stopped(_, Signal::SIGTRAP)) {
            return Err(CallError::UnexpectedStop.into());
        }

        let regs = RegisterMap::current(ctx.pid).map_err(Error::Ptrace)?;
        Ok(regs.value(Register::Rax))
    }

    fn jump(ctx: &CallContext, dest_ptr: u64) -> Result<(), Error> {
        debug_assert!(ctx.regs.value(Register::Rip) == ctx.pc.as_u64());

        let mut regs = ctx.regs.clone();
        regs.update(Register::Rax, dest_ptr);
        regs.persist(ctx.pid).map_err(Error::Ptrace)?;

        const JMP_RAX: usize = 0x000000000000E0FF;
        const JMP_RAX_MASK: usize = 0xFFFFFFFFFFFF0000;

        let new_text = (ctx.text & JMP_RAX_MASK) | JMP_RAX;

        ctx.dbg.write_memory(ctx.pc.as_usize(), new_text)?;

        sys::ptrace::step(ctx.pid, None).map_err(Error::Ptrace)?;
        let res = nix::sys::wait::waitpid(ctx.pid, None).map_err(Error::Waitpid)?;
        debug_assert!(matches!(res, WaitStatus::Stopped(_, _)));

        if RegisterMap::current(ctx.pid)
            .map_err(Error::Ptrace)?
            .value(Register::Rip)
            != dest_ptr
        {
            return Err(CallError::Jmp.into());
        }

        Ok(())
    }

    pub fn mmap(ctx: &CallContext) -> Result<u64, Error> {
        debug_assert!(ctx.regs.value(Register::Rip) == ctx.pc.as_u64());

        // Update registers for calling a `mmap` syscall
        let mut regs = ctx.regs.clone();
        const MMAP: u64 = 9;
        const PROT: u64 =
            (nix::libc::PROT_READ | nix::libc::PROT_EXEC | nix::libc::PROT_WRITE) as u64;
        const FLAGS: u64 = (nix::libc::MAP_PRIVATE | nix::libc::MAP_ANONYMOUS) as u64;
        regs.update(Register::Rax, MMAP);
        regs.update(Register::Rdi, 0);
        let page_size = unsafe { nix::libc::sysconf(nix::libc::_SC_PAGESIZE) as u64 };
        regs.update(Register::Rsi, page_size);
        regs.update(Register::Rdx, PROT);
        regs.update(Register::R10, FLAGS);
        regs.update(Register::R8, -1i32 as u64);
        regs.update(Register::R9, 0);

        regs.persist(ctx.pid).map_err(Error::Ptrace)?;

        const SYSCALL: usize = 0x000000000000050F;
        const SYSCALL_MASK: usize = 0xFFFFFFFFFFFF0000;

        let new_instructions = (ctx.text & SYSCALL_MASK) | SYSCALL;

        ctx.dbg.write_memory(ctx.pc.as_usize(), new_instructions)?;

        sys::ptrace::step(ctx.pid, None).map_err(Error::Ptrace)?;
        let res = nix::sys::wait::waitpid(ctx.pid, None).map_err(Error::Waitpid)?;
        debug_assert!(matches!(res, WaitStatus::Stopped(_, _)));

        let regs = RegisterMap::current(ctx.pid).map_err(Error::Ptrace)?;
        let alloc_ptr: u64 = regs.value(Register::Rax);
        if alloc_ptr as i64 == -1 {
            return Err(CallError::Mmap.into());
        }

        debug_assert!(region_exist(ctx.pid, alloc_ptr)?);

        Ok(alloc_ptr)
    }

    pub fn munmap(ctx: &CallContext, addr: u64) -> Result<(), Error> {
        const SYSCALL: usize = 0x000000000000050F;
        const SYSCALL_MASK: usize = 0xFFFFFFFFFFFF0000;

        let new_text = (ctx.text & SYSCALL_MASK) | SYSCALL;
        ctx.dbg.write_memory(ctx.pc.as_usize(), new_text)?;

        // Update registers for calling a `munmap` syscall
        let mut regs = ctx.regs.clone();
        const MUNMAP: u64 = 11;
        regs.update(Register::Rax, MUNMAP);
        regs.update(Register::Rdi, addr);
        let page_size = unsafe { nix::libc::sysconf(nix::libc::_SC_PAGESIZE) as u64 };
        regs.update(Register::Rsi, page_size);
        regs.persist(ctx.pid).map_err(Error::Ptrace)?;

        sys::ptrace::step(ctx.pid, None).map_err(Error::Ptrace)?;
        let res = nix::sys::wait::waitpid(ctx.pid, None).map_err(Error::Waitpid)?;
        debug_assert!(matches!(res, WaitStatus::Stopped(_, _)));

        let regs: RegisterMap = RegisterMap::current(ctx.pid).map_err(Error::Ptrace)?;
        if regs.value(Register::Rax) != 0 {
            return Err(CallError::Munmap.into());
        }
        debug_assert!(region_non_exist(ctx.pid, addr)?);

        ctx.dbg.write_memory(ctx.pc.as_usize(), ctx.text)?;

        Ok(())
    }
}

fn region_exist(pid: nix::unistd::Pid, addr: u64) -> Result<bool, Error> {
    let maps = proc_maps::get_process_maps(pid.as_raw())?;
    Ok(maps
        .iter()
        .any(|range| range.start() as u64 <= addr && addr < (range.start() + range.size()) as u64))
}

fn region_non_exist(pid: nix::unistd::Pid, addr: u64) -> Result<bool, Error> {
    region_exist(pid, addr).map(|exist| !exist)
}

impl Debugger {
    /// Execute a function inside the debuggee and return its result value.
    /// Debuggee execution state (registers, text under the staging
    /// instructions, stack) is restored on every path.
    pub(super) fn call_fn_raw(&self, fn_addr: RelocatedAddress, args: CallArgs) -> Result<u64, Error> {
        let call_context = CallContext::new(self)?;

        call_context.with_ctx(|ctx| {
            debug!(target: "debugger", "alloc temporary memory area");
            let alloc_ptr = CallHelper::mmap(ctx)?;

            debug!(target: "debugger", "jump into mmap'ed region");
            CallHelper::jump(ctx, alloc_ptr)?;

            debug!(target: "debugger", "call a given function");
            let result = CallHelper::call_fn(ctx, alloc_ptr, fn_addr.as_u64(), &args)?;

            debug!(target: "debugger", "going to original rip");
            ctx.regs.clone().persist(ctx.pid).map_err(Error::Ptrace)?;

            debug!(target: "debugger", "dealloc temporary memory area");
            CallHelper::munmap(ctx, alloc_ptr)?;

            Ok(result)
        })
    }

    /// Resolve a function by its linkage name template and call it with the
    /// given arguments.
    ///
    /// # Arguments
    ///
    /// * `template`: linkage name template of a function to call.
    /// * `args`: list of integer or pointer arguments.
    pub fn call_function(&self, template: &str, args: &[u64]) -> Result<u64, Error> {
        debug!(target: "debugger", "find function address and prepare arguments");
        let fn_addr = self.images().find_function(template)?;
        let args = CallArgs::new(args)?;
        self.call_fn_raw(fn_addr, args)
    }
}

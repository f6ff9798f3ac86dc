use crate::debugger::error::Error;
use nix::sys;
use nix::sys::ptrace::Options;
use nix::sys::signal::SIGTRAP;
use nix::sys::wait::WaitStatus::PtraceEvent;
use nix::sys::wait::waitpid;
use nix::unistd::Pid;
use std::collections::HashSet;
use std::iter;
use std::path::PathBuf;
use sysinfo::{RefreshKind, System};

/// Running application attached with the `ptrace` system call. Every thread
/// observed at attach time is seized and stopped, the application stays
/// suspended until [`Child::detach`] resumes it.
pub struct Child {
    program: String,
    cwd: Option<PathBuf>,
    pid: Pid,
    /// List of threads observed at the time of attaching.
    threads: Vec<Pid>,
}

impl Child {
    /// Attach to an already running external process.
    ///
    /// # Arguments
    ///
    /// * `pid`: an external process pid
    pub fn from_external(pid: Pid) -> Result<Self, Error> {
        let sys =
            System::new_with_specifics(RefreshKind::everything().without_cpu().without_memory());

        let external_process = System::process(&sys, sysinfo::Pid::from_u32(pid.as_raw() as u32))
            .ok_or(Error::AttachedProcessNotFound(pid))?;

        let program_name = external_process
            .exe()
            .ok_or(Error::AttachedProcessNotFound(pid))?
            .to_string_lossy()
            .to_string();

        let cwd = external_process.cwd().map(ToOwned::to_owned);

        let mut interrupted_threads = HashSet::new();
        // two interrupt rounds, new threads may be spawned while the first round runs
        for _ in 0..2 {
            let threads_iter = iter::once(pid);
            let threads: Vec<Pid> = if let Some(tasks) = external_process.tasks() {
                threads_iter
                    .chain(tasks.iter().map(|tid| Pid::from_raw(tid.as_u32() as i32)))
                    .collect()
            } else {
                threads_iter.collect()
            };

            // remove already interrupted threads
            let threads: Vec<Pid> = threads
                .into_iter()
                .filter(|t| !interrupted_threads.contains(t))
                .collect();

            for tid in &threads {
                sys::ptrace::seize(*tid, Options::empty()).map_err(Error::Attach)?;
            }

            for tid in &threads {
                sys::ptrace::interrupt(*tid).map_err(Error::Attach)?;
            }

            for tid in &threads {
                let status = waitpid(*tid, None).map_err(Error::Attach)?;
                // currently we assume that attached process not in stop status
                debug_assert!(matches!(status, PtraceEvent(_, SIGTRAP, _)));
            }

            interrupted_threads.extend(threads);
        }

        Ok(Self {
            program: program_name,
            cwd,
            pid,
            threads: interrupted_threads.into_iter().collect(),
        })
    }

    /// Return a program name.
    pub fn program(&self) -> &str {
        self.program.as_str()
    }

    /// Return a program working directory.
    pub fn cwd(&self) -> Option<&PathBuf> {
        self.cwd.as_ref()
    }

    /// Return attached process pid.
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Detach every seized thread, the application resumes on its own.
    pub fn detach(&self) -> Result<(), Error> {
        for tid in &self.threads {
            sys::ptrace::detach(*tid, None).map_err(Error::Ptrace)?;
        }
        Ok(())
    }
}

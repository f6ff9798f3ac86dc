use nix::unistd::Pid;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // --------------------------------- generic errors --------------------------------------------
    #[error(transparent)]
    IO(#[from] std::io::Error),
    #[error(transparent)]
    RegEx(#[from] regex::Error),

    // --------------------------------- debugger entity not found----------------------------------
    #[error("unknown register {0:?}")]
    RegisterNameNotFound(String),

    // --------------------------------- symbol resolution -----------------------------------------
    #[error("function `{0}` not found in any loaded image")]
    FunctionNotFound(String),
    #[error("function `{0}` matches multiple symbols, template is ambiguous")]
    FunctionAmbiguous(String),
    #[error("object file parsing error: {0}")]
    ObjParsing(#[from] object::Error),
    #[error("no file-backed executable mappings found in /proc/{0}/maps")]
    NoExecutableMappings(Pid),

    // --------------------------------- remote memory errors --------------------------------------
    #[error("null pointer dereference while reading debuggee memory")]
    NullRemotePointer,
    #[error("no string terminator found in {0} bytes of debuggee memory")]
    UnterminatedString(usize),

    // --------------------------------- syscall errors --------------------------------------------
    #[error("waitpid syscall error: {0}")]
    Waitpid(nix::Error),
    #[error("ptrace syscall error: {0}")]
    Ptrace(nix::Error),

    // --------------------------------- remote call errors ----------------------------------------
    #[error(transparent)]
    Call(#[from] CallError),

    // --------------------------------- render errors ---------------------------------------------
    #[error("malformed remote status document: {0}")]
    StatusDocument(#[from] serde_json::Error),

    // --------------------------------- attach debuggee errors ------------------------------------
    #[error("process pid {0} not found")]
    AttachedProcessNotFound(Pid),
    #[error("attach a running process: {0}")]
    Attach(nix::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error("at most 6 8-byte arguments allowed at this moment")]
    TooManyArguments,
    #[error("mmap call failed")]
    Mmap,
    #[error("munmap call failed")]
    Munmap,
    #[error("JMP instruction failed")]
    Jmp,
    #[error("debuggee stopped unexpectedly during an injected call")]
    UnexpectedStop,
}

impl Error {
    /// Return a hint to an interface - continue after error or stop the whole session.
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::IO(_) => false,
            Error::RegEx(_) => false,
            Error::RegisterNameNotFound(_) => false,
            Error::FunctionNotFound(_) => false,
            Error::FunctionAmbiguous(_) => false,
            Error::NullRemotePointer => false,
            Error::UnterminatedString(_) => false,
            Error::Waitpid(_) => false,
            Error::Ptrace(_) => false,
            Error::Call(_) => false,
            Error::StatusDocument(_) => false,

            // currently fatal errors
            Error::ObjParsing(_) => true,
            Error::NoExecutableMappings(_) => true,
            Error::AttachedProcessNotFound(_) => true,
            Error::Attach(_) => true,
        }
    }
}

#[macro_export]
macro_rules! _error {
    ($log_fn: path, $res: expr) => {
        match $res {
            Ok(value) => Some(value),
            Err(e) => {
                $log_fn!(target: "debugger", "{:#}", e);
                None
            }
        }
    };
    ($log_fn: path, $res: expr, $msg: tt) => {
        match $res {
            Ok(value) => Some(value),
            Err(e) => {
                $log_fn!(target: "debugger", concat!($msg, " {:#}"), e);
                None
            }
        }
    };
}

/// Transforms `Result` into `Option` and logs an error if it occurs.
#[macro_export]
macro_rules! weak_error {
    ($res: expr) => {
        $crate::_error!(log::warn, $res)
    };
    ($res: expr, $msg: tt) => {
        $crate::_error!(log::warn, $res, $msg)
    };
}

/// Transforms `Result` into `Option` and put error into debug logs if it occurs.
#[macro_export]
macro_rules! muted_error {
    ($res: expr) => {
        $crate::_error!(log::debug, $res)
    };
    ($res: expr, $msg: tt) => {
        $crate::_error!(log::debug, $res, $msg)
    };
}

//! Probes for IP blocks of an FPGA-accelerated application. A probe calls an
//! introspection entry point inside the suspended application, the
//! application returns a heap-allocated debug view, the probe renders the
//! view to text through the view's own `getstring` method and releases it.
//!
//! All probe logic lives behind the [`ProbeRuntime`] seam, everything on the
//! other side of that seam is process-control machinery.

use crate::debugger::{Debugger, Error};
use serde::Serialize;
use serde_json::value::RawValue;

/// Stringify method exposed by every debug view.
pub const GETSTRING_METHOD: &str = "getstring";

const ACQUIRE_COUNTERS_FN: &str = "appdebug::clGetDebugCounters";
const ACQUIRE_CHECKERS_FN: &str = "appdebug::clGetDebugCheckers";
const RELEASE_VIEW_FN: &str = "appdebug::clFreeAppDebugView";

/// Debug view object layout, fixed by the application binary: a buffer
/// pointer, a validity flag and an operator message.
const VIEW_VALID_OFFSET: usize = 8;
const VIEW_MSG_OFFSET: usize = 16;

/// libstdc++ `std::string`: the character data pointer is the first word of
/// the object.
const STD_STRING_DATA_OFFSET: usize = 0;

/// Kind of an IP block a probe targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpBlock {
    /// Performance monitor counters.
    Spm,
    /// Lightweight AXI protocol checker status.
    Lapc,
}

/// Immutable descriptor of one probe: which entry point acquires the debug
/// view, which one releases it, and which branch of the view's stringify
/// method applies.
#[derive(Debug, Clone, Copy)]
pub struct ProbeTarget {
    pub kind: IpBlock,
    pub acquire_fn: &'static str,
    pub release_fn: &'static str,
    pub selector: u64,
}

impl ProbeTarget {
    pub fn spm() -> Self {
        Self {
            kind: IpBlock::Spm,
            acquire_fn: ACQUIRE_COUNTERS_FN,
            release_fn: RELEASE_VIEW_FN,
            selector: 1,
        }
    }

    pub fn lapc() -> Self {
        Self {
            kind: IpBlock::Lapc,
            acquire_fn: ACQUIRE_CHECKERS_FN,
            release_fn: RELEASE_VIEW_FN,
            selector: 0,
        }
    }

    pub fn for_block(kind: IpBlock) -> Self {
        match kind {
            IpBlock::Spm => Self::spm(),
            IpBlock::Lapc => Self::lapc(),
        }
    }
}

/// Result of an acquire call. `staging` must be handed back to the release
/// entry point, `handle == 0` means the probed IP block is not present and
/// `message` explains why.
#[derive(Debug, Clone)]
pub struct StagedView {
    pub staging: u64,
    pub handle: u64,
    pub message: String,
}

/// The seam between probe logic and the host process-control machinery:
/// call a function, call a method of a remote object, decode a remote
/// string, release a staged view.
pub trait ProbeRuntime {
    fn call_view_fn(&self, fn_template: &str) -> Result<StagedView, Error>;
    fn call_view_method(&self, handle: u64, method_template: &str, args: &[u64])
        -> Result<u64, Error>;
    fn read_remote_string(&self, addr: u64) -> Result<String, Error>;
    fn release_view(&self, fn_template: &str, staging: u64) -> Result<(), Error>;
}

/// Run one probe to completion and return its report, formatted as plain
/// text or JSON by the view itself. An unavailable IP block is a report,
/// not an error, failures of the call machinery are errors.
pub fn fetch(rt: &impl ProbeRuntime, target: &ProbeTarget, json: bool) -> Result<String, Error> {
    let view = rt.call_view_fn(target.acquire_fn)?;

    if view.handle == 0 {
        // unavailable view: report and stop, no release call is issued on
        // this path (historical runtime contract)
        return Ok(unavailable_report(&view.message, json));
    }

    let remote_str =
        rt.call_view_method(view.handle, GETSTRING_METHOD, &[target.selector, json as u64])?;
    let report = rt.read_remote_string(remote_str)?;

    rt.release_view(target.release_fn, view.staging)?;

    Ok(report)
}

/// Fetch every known IP block in JSON mode and assemble one document.
pub fn fetch_all_json(rt: &impl ProbeRuntime) -> Result<String, Error> {
    let spm = fetch(rt, &ProbeTarget::spm(), true)?;
    let lapc = fetch(rt, &ProbeTarget::lapc(), true)?;
    status_document(&spm, &lapc)
}

fn unavailable_report(message: &str, json: bool) -> String {
    if json {
        serde_json::json!([{ "error": message }]).to_string()
    } else {
        message.to_string()
    }
}

/// Assemble `{"spm": <spm>, "lapc": <lapc>}` with both reports spliced in
/// verbatim. [`RawValue`] keeps the envelope well-formed and rejects
/// fragments that are not valid JSON.
fn status_document(spm: &str, lapc: &str) -> Result<String, Error> {
    #[derive(Serialize)]
    struct StatusDocument<'a> {
        spm: &'a RawValue,
        lapc: &'a RawValue,
    }

    let spm = RawValue::from_string(spm.to_string())?;
    let lapc = RawValue::from_string(lapc.to_string())?;
    Ok(serde_json::to_string(&StatusDocument {
        spm: &spm,
        lapc: &lapc,
    })?)
}

impl Debugger {
    /// Read a `std::string` object out of debuggee memory.
    fn read_std_string(&self, obj_addr: usize) -> Result<String, Error> {
        let data_ptr = self.read_word(obj_addr + STD_STRING_DATA_OFFSET)?;
        self.read_c_string(data_ptr)
    }
}

impl ProbeRuntime for Debugger {
    fn call_view_fn(&self, fn_template: &str) -> Result<StagedView, Error> {
        let view = self.call_function(fn_template, &[])?;
        if view == 0 {
            return Ok(StagedView {
                staging: 0,
                handle: 0,
                message: "debug view was not returned by the application".to_string(),
            });
        }

        let valid = self.read_memory(view as usize + VIEW_VALID_OFFSET, 1)?[0] != 0;
        if valid {
            Ok(StagedView {
                staging: view,
                handle: view,
                message: String::new(),
            })
        } else {
            let message = self.read_std_string(view as usize + VIEW_MSG_OFFSET)?;
            Ok(StagedView {
                staging: view,
                handle: 0,
                message,
            })
        }
    }

    fn call_view_method(
        &self,
        handle: u64,
        method_template: &str,
        args: &[u64],
    ) -> Result<u64, Error> {
        // `getstring` returns a `std::string` by value, the ABI passes a
        // hidden pointer to caller-provided storage before `this`
        let sret = self.scratch_region()?;
        let mut call_args = vec![sret, handle];
        call_args.extend_from_slice(args);
        self.call_function(method_template, &call_args)?;
        Ok(sret)
    }

    fn read_remote_string(&self, addr: u64) -> Result<String, Error> {
        self.read_std_string(addr as usize)
    }

    fn release_view(&self, fn_template: &str, staging: u64) -> Result<(), Error> {
        self.call_function(fn_template, &[staging]).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Debug, PartialEq)]
    enum RuntimeCall {
        Acquire(String),
        Method(u64, String, Vec<u64>),
        ReadString(u64),
        Release(String, u64),
    }

    /// Scripted stand-in for an attached application.
    struct MockRuntime {
        available: bool,
        message: &'static str,
        rendered: &'static str,
        facility_error: bool,
        journal: RefCell<Vec<RuntimeCall>>,
    }

    const STAGING: u64 = 0xA000;
    const HANDLE: u64 = 0xA000;
    const STR_OBJ: u64 = 0xC000;

    impl MockRuntime {
        fn available(rendered: &'static str) -> Self {
            Self {
                available: true,
                message: "",
                rendered,
                facility_error: false,
                journal: RefCell::default(),
            }
        }

        fn unavailable(message: &'static str) -> Self {
            Self {
                available: false,
                message,
                rendered: "",
                facility_error: false,
                journal: RefCell::default(),
            }
        }

        fn broken() -> Self {
            Self {
                available: false,
                message: "",
                rendered: "",
                facility_error: true,
                journal: RefCell::default(),
            }
        }

        fn releases(&self) -> usize {
            self.journal
                .borrow()
                .iter()
                .filter(|call| matches!(call, RuntimeCall::Release(_, _)))
                .count()
        }
    }

    impl ProbeRuntime for MockRuntime {
        fn call_view_fn(&self, fn_template: &str) -> Result<StagedView, Error> {
            self.journal
                .borrow_mut()
                .push(RuntimeCall::Acquire(fn_template.to_string()));
            if self.facility_error {
                return Err(Error::FunctionNotFound(fn_template.to_string()));
            }
            if self.available {
                Ok(StagedView {
                    staging: STAGING,
                    handle: HANDLE,
                    message: String::new(),
                })
            } else {
                Ok(StagedView {
                    staging: STAGING,
                    handle: 0,
                    message: self.message.to_string(),
                })
            }
        }

        fn call_view_method(
            &self,
            handle: u64,
            method_template: &str,
            args: &[u64],
        ) -> Result<u64, Error> {
            self.journal.borrow_mut().push(RuntimeCall::Method(
                handle,
                method_template.to_string(),
                args.to_vec(),
            ));
            Ok(STR_OBJ)
        }

        fn read_remote_string(&self, addr: u64) -> Result<String, Error> {
            self.journal
                .borrow_mut()
                .push(RuntimeCall::ReadString(addr));
            Ok(self.rendered.to_string())
        }

        fn release_view(&self, fn_template: &str, staging: u64) -> Result<(), Error> {
            self.journal
                .borrow_mut()
                .push(RuntimeCall::Release(fn_template.to_string(), staging));
            Ok(())
        }
    }

    #[test]
    fn unavailable_block_reports_message_unchanged_in_text_mode() {
        for target in [ProbeTarget::spm(), ProbeTarget::lapc()] {
            let rt = MockRuntime::unavailable("no SPM monitor found");
            let report = fetch(&rt, &target, false).unwrap();
            assert_eq!(report, "no SPM monitor found");
            assert_eq!(rt.releases(), 0);
        }
    }

    #[test]
    fn unavailable_block_reports_error_document_in_json_mode() {
        for target in [ProbeTarget::spm(), ProbeTarget::lapc()] {
            let rt = MockRuntime::unavailable("no SPM monitor found");
            let report = fetch(&rt, &target, true).unwrap();
            assert_eq!(report, r#"[{"error":"no SPM monitor found"}]"#);
            assert_eq!(rt.releases(), 0);
        }
    }

    #[test]
    fn error_document_stays_well_formed_for_hostile_messages() {
        let rt = MockRuntime::unavailable(r#"bad "quote" and \backslash"#);
        let report = fetch(&rt, &ProbeTarget::spm(), true).unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&report).unwrap();
        assert_eq!(parsed[0]["error"], r#"bad "quote" and \backslash"#);
    }

    #[test]
    fn available_block_runs_one_stringify_and_one_release() {
        let rt = MockRuntime::available("SPM 0: writes 42");
        let report = fetch(&rt, &ProbeTarget::spm(), false).unwrap();
        assert_eq!(report, "SPM 0: writes 42");

        let journal = rt.journal.borrow();
        assert_eq!(
            *journal,
            vec![
                RuntimeCall::Acquire(ACQUIRE_COUNTERS_FN.to_string()),
                RuntimeCall::Method(HANDLE, GETSTRING_METHOD.to_string(), vec![1, 0]),
                RuntimeCall::ReadString(STR_OBJ),
                RuntimeCall::Release(RELEASE_VIEW_FN.to_string(), STAGING),
            ]
        );
    }

    #[test]
    fn stringify_selector_and_json_flag_are_per_target() {
        let cases = [
            (ProbeTarget::spm(), false, vec![1, 0]),
            (ProbeTarget::spm(), true, vec![1, 1]),
            (ProbeTarget::lapc(), false, vec![0, 0]),
            (ProbeTarget::lapc(), true, vec![0, 1]),
        ];

        for (target, json, expected_args) in cases {
            let rt = MockRuntime::available("{}");
            fetch(&rt, &target, json).unwrap();

            let journal = rt.journal.borrow();
            let method = journal
                .iter()
                .find(|call| matches!(call, RuntimeCall::Method(_, _, _)))
                .unwrap();
            assert_eq!(
                *method,
                RuntimeCall::Method(HANDLE, GETSTRING_METHOD.to_string(), expected_args)
            );
        }
    }

    #[test]
    fn facility_failure_aborts_without_release() {
        let rt = MockRuntime::broken();
        let err = fetch(&rt, &ProbeTarget::lapc(), false).unwrap_err();
        assert!(matches!(err, Error::FunctionNotFound(_)));
        assert_eq!(rt.releases(), 0);
    }

    #[test]
    fn status_document_splices_fragments_verbatim() {
        let doc = status_document(r#"[{"error":"no SPM monitor found"}]"#, r#"{"violations":0}"#)
            .unwrap();
        assert_eq!(
            doc,
            r#"{"spm":[{"error":"no SPM monitor found"}],"lapc":{"violations":0}}"#
        );
    }

    #[test]
    fn status_document_rejects_malformed_fragments() {
        let err = status_document("SPM 0: writes 42", "{}").unwrap_err();
        assert!(matches!(err, Error::StatusDocument(_)));
    }

    #[test]
    fn fetch_all_json_combines_both_probes() {
        let rt = MockRuntime::unavailable("no SPM monitor found");
        let doc = fetch_all_json(&rt).unwrap();
        assert_eq!(
            doc,
            r#"{"spm":[{"error":"no SPM monitor found"}],"lapc":[{"error":"no SPM monitor found"}]}"#
        );

        let journal = rt.journal.borrow();
        let acquires = journal
            .iter()
            .filter_map(|call| match call {
                RuntimeCall::Acquire(name) => Some(name.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(acquires, vec![ACQUIRE_COUNTERS_FN, ACQUIRE_CHECKERS_FN]);
    }
}

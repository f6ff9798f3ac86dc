use crate::debugger::address::{GlobalAddress, RelocatedAddress};
use crate::debugger::error::Error;
use crate::weak_error;
use nix::unistd::Pid;
use object::{Object, ObjectKind, ObjectSymbol, SymbolKind};
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Symbol from one of the debuggee images, address already relocated into
/// the debuggee address space.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub addr: RelocatedAddress,
}

impl Symbol {
    /// Name suitable for printing, rust symbols are demangled, anything else
    /// is shown as it appears in the symbol table.
    pub fn display_name(&self) -> String {
        rustc_demangle::demangle(&self.name).to_string()
    }
}

/// Index over symbol tables of every file-backed image with executable
/// mappings in the debuggee (the main executable and loaded shared
/// libraries, the application runtime included).
pub struct ImageIndex {
    symbols: Vec<Symbol>,
}

impl ImageIndex {
    pub fn new(pid: Pid) -> Result<Self, Error> {
        let maps = proc_maps::get_process_maps(pid.as_raw())?;

        // lowest mapping start per file, files without executable mappings
        // (data files, locale archives) are skipped
        let mut lowest_starts: HashMap<PathBuf, usize> = HashMap::new();
        let mut executables: HashMap<PathBuf, bool> = HashMap::new();
        for map in maps.iter() {
            let Some(file) = map.filename() else {
                continue;
            };
            if file.to_string_lossy().starts_with('[') {
                continue;
            }
            let start = lowest_starts.entry(file.to_path_buf()).or_insert(usize::MAX);
            *start = (*start).min(map.start());
            let exec = executables.entry(file.to_path_buf()).or_insert(false);
            *exec |= map.is_exec();
        }
        lowest_starts.retain(|file, _| executables.get(file).copied().unwrap_or_default());

        if lowest_starts.is_empty() {
            return Err(Error::NoExecutableMappings(pid));
        }

        let mut symbols = vec![];
        for (path, lowest_start) in lowest_starts {
            if let Some(image_symbols) =
                weak_error!(load_image(&path, lowest_start), "load image:")
            {
                symbols.extend(image_symbols);
            }
        }

        symbols.sort_by(|s1, s2| (&s1.name, s1.addr.as_usize()).cmp(&(&s2.name, s2.addr.as_usize())));
        symbols.dedup_by(|s1, s2| s1.name == s2.name && s1.addr == s2.addr);

        Ok(Self { symbols })
    }

    /// Find a single function by a linkage name template, see
    /// [`matches_template`] for the matching rules.
    pub fn find_function(&self, template: &str) -> Result<RelocatedAddress, Error> {
        let mut candidates = self
            .symbols
            .iter()
            .filter(|sym| matches!(sym.kind, SymbolKind::Text | SymbolKind::Unknown))
            .filter(|sym| matches_template(&sym.name, template))
            .map(|sym| sym.addr)
            .collect::<Vec<_>>();
        candidates.sort_by_key(|addr| addr.as_usize());
        candidates.dedup();

        match candidates.as_slice() {
            [] => Err(Error::FunctionNotFound(template.to_string())),
            [addr] => Ok(*addr),
            _ => Err(Error::FunctionAmbiguous(template.to_string())),
        }
    }

    /// Find all symbols whose raw or demangled name matches a regular expression.
    pub fn find_symbols(&self, regex: &str) -> Result<Vec<&Symbol>, Error> {
        let re = Regex::new(regex)?;
        Ok(self
            .symbols
            .iter()
            .filter(|sym| re.is_match(&sym.name) || re.is_match(&sym.display_name()))
            .collect())
    }
}

/// Linkage name template matching: an exact symbol name, or a namespaced
/// template each `::` segment of which occurs in the (possibly mangled)
/// symbol name. `appdebug::clGetDebugCounters` matches
/// `_ZN8appdebug19clGetDebugCountersEv` without a C++ demangler.
fn matches_template(name: &str, template: &str) -> bool {
    if name == template {
        return true;
    }
    template
        .split("::")
        .all(|segment| !segment.is_empty() && name.contains(segment))
}

/// Bias added to `st_value` of image symbols: position dependent executables
/// are mapped at their link-time addresses, everything else is shifted by the
/// lowest mapping start of the image.
fn relocation_bias(kind: ObjectKind, lowest_mapping_start: usize) -> usize {
    match kind {
        ObjectKind::Dynamic => lowest_mapping_start,
        _ => 0,
    }
}

fn load_image(path: &Path, lowest_mapping_start: usize) -> Result<Vec<Symbol>, Error> {
    let file = fs::File::open(path)?;
    let mmap = unsafe { memmap2::Mmap::map(&file)? };
    let object = object::File::parse(&*mmap)?;

    let bias = relocation_bias(object.kind(), lowest_mapping_start);

    let mut symbols = vec![];
    for symbol in object.symbols().chain(object.dynamic_symbols()) {
        if symbol.address() == 0 {
            continue;
        }
        let Ok(name) = symbol.name() else {
            continue;
        };
        if name.is_empty() {
            continue;
        }
        symbols.push(Symbol {
            name: name.to_string(),
            kind: symbol.kind(),
            addr: GlobalAddress::from(symbol.address() as usize).relocate(bias),
        });
    }

    Ok(symbols)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_matches_mangled_cpp_names() {
        assert!(matches_template(
            "_ZN8appdebug19clGetDebugCountersEv",
            "appdebug::clGetDebugCounters"
        ));
        assert!(matches_template(
            "_ZN8appdebug18clFreeAppDebugViewEPv",
            "appdebug::clFreeAppDebugView"
        ));
        assert!(!matches_template(
            "_ZN8appdebug19clGetDebugCheckersEv",
            "appdebug::clGetDebugCounters"
        ));
    }

    #[test]
    fn template_matches_exact_names() {
        assert!(matches_template("getstring", "getstring"));
        assert!(matches_template("_ZN4view9getstringEii", "getstring"));
        assert!(!matches_template("getstr", "getstring"));
    }

    #[test]
    fn empty_template_segments_never_match() {
        assert!(!matches_template("_ZN8appdebugEv", "appdebug::"));
        assert!(!matches_template("anything", "::"));
    }

    #[test]
    fn bias_applied_only_to_shared_objects() {
        assert_eq!(relocation_bias(ObjectKind::Dynamic, 0x7f00_0000), 0x7f00_0000);
        assert_eq!(relocation_bias(ObjectKind::Executable, 0x7f00_0000), 0);
    }
}

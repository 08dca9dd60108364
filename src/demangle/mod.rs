//! Symbol name demangling for reports.
//!
//! Rust (legacy and v0), Itanium C++ and MSVC names are recognized. Names
//! that match none of them are returned unchanged by [`display_name`].

use once_cell::sync::Lazy;
use regex::Regex;

/// Itanium C++ mangled names, with or without the Mach-O extra underscore.
static RE_ITA_MANGLED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^_{1,2}Z[a-zA-Z0-9_][a-zA-Z0-9_.$]*$"#).expect("valid regex"));

static RE_MSVC_MANGLED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\?\??[A-Za-z0-9_@\$\?]+@@[A-Za-z0-9_@\$\?]+$"#).expect("valid regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolFlavor {
    Rust,
    Itanium,
    Msvc,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemangleResult {
    pub original: String,
    pub demangled: String,
    pub flavor: SymbolFlavor,
}

pub fn detect_flavor(s: &str) -> SymbolFlavor {
    if rustc_demangle::try_demangle(s).is_ok() {
        return SymbolFlavor::Rust;
    }
    if RE_ITA_MANGLED.is_match(s) {
        return SymbolFlavor::Itanium;
    }
    if RE_MSVC_MANGLED.is_match(s) {
        return SymbolFlavor::Msvc;
    }
    SymbolFlavor::Unknown
}

/// Attempt to demangle a single symbol. Returns None when not recognized.
pub fn demangle_one(s: &str) -> Option<DemangleResult> {
    let result = |demangled: String, flavor| DemangleResult {
        original: s.to_string(),
        demangled,
        flavor,
    };
    // Rust (v0 + legacy); `{:#}` drops the hash suffix
    if let Ok(dm) = rustc_demangle::try_demangle(s) {
        return Some(result(format!("{:#}", dm), SymbolFlavor::Rust));
    }
    if RE_ITA_MANGLED.is_match(s) {
        // Mach-O prefixes one more underscore
        let candidate = if s.starts_with("__Z") { &s[1..] } else { s };
        if let Ok(sym) = cpp_demangle::Symbol::new(candidate) {
            return Some(result(sym.to_string(), SymbolFlavor::Itanium));
        }
    }
    if RE_MSVC_MANGLED.is_match(s) {
        if let Ok(out) = msvc_demangler::demangle(s, msvc_demangler::DemangleFlags::COMPLETE) {
            return Some(result(out, SymbolFlavor::Msvc));
        }
    }
    None
}

/// Demangled form of `s`, or `s` itself.
pub fn display_name(s: &str) -> String {
    demangle_one(s)
        .map(|r| r.demangled)
        .unwrap_or_else(|| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_flavor_simple() {
        assert_eq!(detect_flavor("_Z3foov"), SymbolFlavor::Itanium);
        assert_ne!(detect_flavor("_ZN3foo3barE"), SymbolFlavor::Unknown);
        assert_eq!(detect_flavor("main"), SymbolFlavor::Unknown);
    }

    #[test]
    fn demangles_itanium() {
        assert_eq!(display_name("_Z3foov"), "foo()");
        assert_eq!(display_name("__Z3foov"), "foo()");
    }

    #[test]
    fn demangles_rust_legacy() {
        let name = "_ZN4core3fmt5write17h0123456789abcdefE";
        let r = demangle_one(name).unwrap();
        assert_eq!(r.flavor, SymbolFlavor::Rust);
        assert_eq!(r.demangled, "core::fmt::write");
    }

    #[test]
    fn plain_names_pass_through() {
        assert_eq!(display_name("main"), "main");
        assert!(demangle_one("_start").is_none());
    }
}

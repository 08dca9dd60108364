//! The binary container: open, format detection, archive members, close.
//!
//! Opening runs the probes in a fixed order (archive, then object, then
//! core) and stops at the first match. Objects and core dumps get a section
//! registry and a symbol table; archives get one child container per member.
//!
//! ```no_run
//! use objscope::bfd::{Bfd, Source};
//!
//! let bfd = Bfd::open(Source::Path("/bin/ls".into()), "default")?;
//! for section in bfd.sections().ordered() {
//!     println!("{} {:#x}", section.name()?, section.vma()?);
//! }
//! # Ok::<(), objscope::error::BfdError>(())
//! ```

use std::fmt;
use std::fs::File;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use tracing::{debug, trace, warn};

use crate::config::Config;
use crate::core::arch::{self, ArchId};
use crate::core::binary::{Endian, FileFlags, Format};
use crate::core::section::{Section, SectionRegistry};
use crate::core::symbol::{Symbol, SymbolTable};
use crate::error::{BfdError, Result};
use crate::io;
use crate::native::object_file::ObjectHandle;
use crate::native::{
    empty_handle, take_handle, with_handle, with_handle_mut, Attributes, NativeHandle,
    SharedHandle,
};

/// Where a container's bytes come from.
pub enum Source {
    /// A path opened by the container.
    Path(PathBuf),
    /// A file the caller already opened. The descriptor is duplicated, so the
    /// caller's copy can be closed independently. `path` must not be a symlink.
    File { file: File, path: PathBuf },
    /// A ready native handle, used as is.
    Native(Box<dyn NativeHandle>),
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Path(p) => f.debug_tuple("Path").field(p).finish(),
            Source::File { path, .. } => f.debug_struct("File").field("path", path).finish(),
            Source::Native(_) => f.write_str("Native"),
        }
    }
}

/// An archive member that could not be opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberDiagnostic {
    /// Position in the archive
    pub index: usize,
    pub name: String,
    pub error: String,
}

/// A binary container.
pub struct Bfd {
    handle: SharedHandle,
    format: Format,
    sections: SectionRegistry,
    symbols: SymbolTable,
    members: Vec<Bfd>,
    diagnostics: Vec<MemberDiagnostic>,
    config: Config,
}

impl Default for Bfd {
    fn default() -> Self {
        Self::with_config(Config::default())
    }
}

impl fmt::Debug for Bfd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bfd")
            .field("format", &self.format)
            .field("filename", &self.filename().ok())
            .field("sections", &self.sections.len())
            .field("symbols", &self.symbols.len())
            .field("members", &self.members.len())
            .finish()
    }
}

impl Bfd {
    /// A closed container that will open with `config`.
    pub fn with_config(config: Config) -> Self {
        Self {
            handle: empty_handle(),
            format: Format::Unknown,
            sections: SectionRegistry::new(),
            symbols: SymbolTable::new(),
            members: Vec::new(),
            diagnostics: Vec::new(),
            config,
        }
    }

    /// Opens `source` with default configuration.
    ///
    /// `target` is `"default"` to auto-detect, or a name from
    /// [`arch::targets`].
    pub fn open(source: Source, target: &str) -> Result<Self> {
        Self::open_with(source, target, &Config::default())
    }

    pub fn open_with(source: Source, target: &str, config: &Config) -> Result<Self> {
        let mut bfd = Self::with_config(config.clone());
        bfd.load(source, target)?;
        Ok(bfd)
    }

    /// Closes whatever is open and opens `source` in its place.
    pub fn load(&mut self, source: Source, target: &str) -> Result<()> {
        if let Err(e) = self.close() {
            warn!(error = %e, "Failed to close previous container before reopening");
        }
        let handle = self.acquire(source, target)?;
        self.open_handle(handle, true)
    }

    fn acquire(&self, source: Source, target: &str) -> Result<Box<dyn NativeHandle>> {
        let limits = self.config.io.clone();
        match source {
            Source::Path(path) => {
                debug!(path = %path.display(), target, "Opening container");
                ObjectHandle::from_path(&path, target, limits)
                    .map(|h| Box::new(h) as Box<dyn NativeHandle>)
                    .map_err(|e| BfdError::OpenFailure {
                        path: path.display().to_string(),
                        reason: e.message,
                    })
            }
            Source::File { file, path } => {
                if io::is_symlink(&path) {
                    return Err(BfdError::InvalidInput(format!(
                        "{} is a symbolic link",
                        path.display()
                    )));
                }
                debug!(path = %path.display(), target, "Opening container from file handle");
                let dup = file.try_clone().map_err(|e| BfdError::OpenFailure {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })?;
                ObjectHandle::from_file(&dup, &path, target, limits)
                    .map(|h| Box::new(h) as Box<dyn NativeHandle>)
                    .map_err(|e| BfdError::OpenFailure {
                        path: path.display().to_string(),
                        reason: e.message,
                    })
            }
            Source::Native(handle) => Ok(handle),
        }
    }

    /// Installs `handle`, detects the format and populates. Closes on failure.
    fn open_handle(&mut self, handle: Box<dyn NativeHandle>, allow_archive: bool) -> Result<()> {
        self.handle = Arc::new(RwLock::new(Some(handle)));
        let result = self
            .detect(allow_archive)
            .and_then(|format| self.populate(format));
        if let Err(e) = result {
            if let Err(close_err) = self.close() {
                warn!(error = %close_err, "Failed to close after open error");
            }
            return Err(e);
        }
        Ok(())
    }

    fn detect(&self, allow_archive: bool) -> Result<Format> {
        let mut diagnostic = String::new();
        for format in Format::PROBE_ORDER {
            if format == Format::Archive && !allow_archive {
                continue;
            }
            match with_handle_mut(&self.handle, |h| Ok(h.check_format(format)))? {
                Ok(()) => {
                    debug!(?format, "Detected format");
                    return Ok(format);
                }
                Err(e) => {
                    trace!(?format, error = %e, "Probe did not match");
                    diagnostic = e.message;
                }
            }
        }
        Err(BfdError::FormatUnrecognized(diagnostic))
    }

    fn populate(&mut self, format: Format) -> Result<()> {
        match format {
            Format::Archive => self.open_members()?,
            Format::Object | Format::Core => {
                let sections = SectionRegistry::populate(&self.handle)?;
                let native = with_handle(&self.handle, |h| {
                    h.symbols().map_err(|e| BfdError::Internal(e.message))
                })?;
                self.symbols = SymbolTable::populate(native, &sections)?;
                self.sections = sections;
            }
            Format::Unknown => {}
        }
        self.format = format;
        Ok(())
    }

    fn open_members(&mut self) -> Result<()> {
        let natives = with_handle_mut(&self.handle, |h| Ok(h.archive_members()))?;
        let max = self.config.archive.max_members;
        if natives.len() > max {
            warn!(
                members = natives.len(),
                limit = max,
                "Archive has more members than allowed, ignoring the rest"
            );
        }
        for (index, member) in natives.into_iter().take(max).enumerate() {
            let name = member.name;
            let opened = member
                .handle
                .map_err(|e| BfdError::OpenFailure {
                    path: name.clone(),
                    reason: e.message,
                })
                .and_then(|h| {
                    let mut child = Bfd::with_config(self.config.clone());
                    child
                        .open_handle(h, self.config.archive.recurse_nested)
                        .map(|_| child)
                });
            match opened {
                Ok(child) => self.members.push(child),
                Err(e) => {
                    warn!(index, name = %name, error = %e, "Archive member failed to open");
                    self.diagnostics.push(MemberDiagnostic {
                        index,
                        name,
                        error: e.to_string(),
                    });
                }
            }
        }
        debug!(
            members = self.members.len(),
            failed = self.diagnostics.len(),
            "Opened archive members"
        );
        Ok(())
    }

    /// Closes members first, then releases the native handle.
    ///
    /// The handle slot is empty afterwards even when the engine reports a
    /// failure. Closing a closed container does nothing.
    pub fn close(&mut self) -> Result<()> {
        let mut failure = None;
        for mut member in self.members.drain(..) {
            if let Err(e) = member.close() {
                warn!(error = %e, "Archive member failed to close");
                failure.get_or_insert(e);
            }
        }
        self.diagnostics.clear();
        self.sections.clear();
        self.symbols.clear();
        self.format = Format::Unknown;
        if let Some(mut handle) = take_handle(&self.handle) {
            trace!(filename = %handle.attributes().filename, "Closing native handle");
            if let Err(e) = handle.close() {
                warn!(error = %e, "Native handle failed to close");
                failure.get_or_insert(BfdError::CloseFailure(e.message));
            }
        }
        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn attr<T>(&self, f: impl FnOnce(&Attributes) -> T) -> Result<T> {
        with_handle(&self.handle, |h| Ok(f(h.attributes())))
    }

    fn attr_mut(&self, f: impl FnOnce(&mut Attributes)) -> Result<()> {
        with_handle_mut(&self.handle, |h| {
            f(h.attributes_mut());
            Ok(())
        })
    }

    pub fn is_open(&self) -> bool {
        with_handle(&self.handle, |_| Ok(())).is_ok()
    }

    pub fn file_format(&self) -> Format {
        self.format
    }

    pub fn is_archive(&self) -> bool {
        self.format == Format::Archive
    }

    pub fn is_object(&self) -> bool {
        self.format == Format::Object
    }

    pub fn is_core_dump(&self) -> bool {
        self.format == Format::Core
    }

    /// Long description of the detected format.
    pub fn format_name(&self) -> Result<&'static str> {
        let format = self.format;
        self.attr(|_| format.description())
    }

    pub fn filename(&self) -> Result<String> {
        self.attr(|a| a.filename.clone())
    }

    /// Target name the engine detected (or was asked for).
    pub fn target(&self) -> Result<String> {
        self.attr(|a| a.target.clone())
    }

    pub fn architecture(&self) -> Result<ArchId> {
        self.attr(|a| a.arch)
    }

    pub fn architecture_name(&self) -> Result<&'static str> {
        self.attr(|a| a.arch.name())
    }

    pub fn machine(&self) -> Result<u64> {
        self.attr(|a| a.machine)
    }

    pub fn set_machine(&mut self, machine: u64) -> Result<()> {
        self.attr_mut(|a| a.machine = machine)
    }

    /// `arch:machine` form, e.g. `i386:x86-64`.
    pub fn printable_arch_mach(&self) -> Result<String> {
        self.attr(|a| arch::printable_arch_mach(a.arch, a.machine))
    }

    pub fn endian(&self) -> Result<Endian> {
        self.attr(|a| a.endian)
    }

    pub fn header_endian(&self) -> Result<Endian> {
        self.attr(|a| a.header_endian)
    }

    pub fn is_big_endian(&self) -> Result<bool> {
        self.attr(|a| a.endian.is_big())
    }

    pub fn is_little_endian(&self) -> Result<bool> {
        self.attr(|a| a.endian.is_little())
    }

    pub fn cacheable(&self) -> Result<bool> {
        self.attr(|a| a.cacheable)
    }

    pub fn file_flags(&self) -> Result<FileFlags> {
        self.attr(|a| a.file_flags)
    }

    /// Replaces the file flags. Flags the target cannot represent are refused.
    pub fn set_file_flags(&mut self, flags: FileFlags) -> Result<()> {
        let applicable = self.applicable_file_flags()?;
        if !applicable.contains(flags) {
            return Err(BfdError::InvalidInput(format!(
                "file flags {:#x} not applicable to this target (allowed {:#x})",
                flags.bits(),
                applicable.bits()
            )));
        }
        self.attr_mut(|a| a.file_flags = flags)
    }

    pub fn applicable_file_flags(&self) -> Result<FileFlags> {
        self.attr(|a| a.applicable_file_flags)
    }

    /// Entry point.
    pub fn start_address(&self) -> Result<u64> {
        self.attr(|a| a.start_address)
    }

    pub fn set_start_address(&mut self, address: u64) -> Result<()> {
        self.attr_mut(|a| a.start_address = address)
    }

    /// Address width in bits (32 or 64), 0 when unknown.
    pub fn arch_size(&self) -> Result<u32> {
        self.attr(|a| a.arch_size)
    }

    /// True when the archive carries a symbol map.
    pub fn has_map(&self) -> Result<bool> {
        self.attr(|a| a.has_map)
    }

    pub fn is_thin_archive(&self) -> Result<bool> {
        self.attr(|a| a.is_thin_archive)
    }

    pub fn symbols_count(&self) -> Result<usize> {
        self.attr(|a| a.symbol_count)
    }

    pub fn dynamic_symbols_count(&self) -> Result<usize> {
        self.attr(|a| a.dynamic_symbol_count)
    }

    /// Number of sections the engine reports.
    pub fn sections_count(&self) -> Result<usize> {
        with_handle(&self.handle, |h| Ok(h.sections().len()))
    }

    pub fn symbol_leading_char(&self) -> Result<Option<char>> {
        self.attr(|a| a.symbol_leading_char)
    }

    pub fn sections(&self) -> &SectionRegistry {
        &self.sections
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.get(name)
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Owning section of `symbol` in this container.
    pub fn symbol_section(&self, symbol: &Symbol) -> Option<&Section> {
        symbol.section(&self.sections)
    }

    /// Members opened successfully, in archive order.
    pub fn archive_members(&self) -> &[Bfd] {
        &self.members
    }

    pub fn archive_filenames(&self) -> Vec<String> {
        self.members
            .iter()
            .filter_map(|m| m.filename().ok())
            .collect()
    }

    /// Members that failed to open.
    pub fn archive_diagnostics(&self) -> &[MemberDiagnostic] {
        &self.diagnostics
    }

    /// Hands the member containers to the caller; they no longer close with this one.
    pub fn detach_archive_members(&mut self) -> Vec<Bfd> {
        std::mem::take(&mut self.members)
    }
}

impl Drop for Bfd {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "Close on drop failed");
        }
    }
}

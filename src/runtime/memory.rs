//! One finalized function mapped into read-execute memory, and the
//! typed handle user code calls through.

use std::os::raw::c_char;
use std::sync::Arc;

use region::Protection;

use crate::code_holder::FinalizedCode;
use crate::error::CodegenError;

/// A finalized function's machine code, mapped read-execute. Never both
/// writable and executable at once: pages are allocated read-write,
/// populated, then transitioned to read-execute before this value is
/// constructed. Unmapped on drop.
pub struct MappedCode {
    alloc: region::Allocation,
    len: usize,
}

// `region::Allocation` wraps a raw pointer with no interior mutability;
// the memory it owns is never written to again after `MappedCode::new`
// transitions it to read-execute.
unsafe impl Send for MappedCode {}
unsafe impl Sync for MappedCode {}

impl MappedCode {
    /// Allocate, populate, and protect a fresh read-execute mapping of
    /// `code`'s bytes.
    pub fn new(code: &FinalizedCode) -> Result<Self, CodegenError> {
        let bytes = code.bytes();
        let len = bytes.len().max(1);
        let mut alloc =
            region::alloc(len, Protection::READ_WRITE).map_err(map_region_err)?;
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), alloc.as_mut_ptr::<u8>(), bytes.len());
        }
        unsafe {
            region::protect(alloc.as_ptr::<u8>(), len, Protection::READ_EXECUTE)
                .map_err(map_region_err)?;
        }
        flush_icache(alloc.as_ptr::<u8>(), bytes.len());
        log::debug!("mapped {} bytes of JIT code at {:p}", bytes.len(), alloc.as_ptr::<u8>());
        Ok(MappedCode { alloc, len: bytes.len() })
    }

    /// The mapping's base address.
    pub fn as_ptr(&self) -> *const u8 {
        self.alloc.as_ptr::<u8>()
    }

    /// Length of the mapped code, in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Is the mapping empty (a zero-byte function)?
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

fn map_region_err(e: region::Error) -> CodegenError {
    CodegenError::OutOfMemory(std::io::Error::new(std::io::ErrorKind::Other, e))
}

#[cfg(target_arch = "aarch64")]
fn flush_icache(ptr: *const u8, len: usize) {
    extern "C" {
        fn __clear_cache(begin: *mut c_char, end: *mut c_char);
    }
    unsafe {
        let begin = ptr as *mut c_char;
        let end = ptr.add(len) as *mut c_char;
        __clear_cache(begin, end);
    }
}

/// x86-64 has a coherent instruction cache; no flush is needed.
#[cfg(not(target_arch = "aarch64"))]
fn flush_icache(_ptr: *const u8, _len: usize) {}

/// A typed, callable handle over one [`MappedCode`] mapping. Keeps the
/// mapping alive for as long as the handle exists.
///
/// `F` must be a `extern "C" fn(...) -> ...` pointer type matching the
/// actual machine code's signature and calling convention exactly — this
/// crate cannot check that for you.
pub struct JitFunction<F> {
    mapped: Arc<MappedCode>,
    f: F,
}

impl<F: Copy> JitFunction<F> {
    /// Wrap `mapped`'s base address as a callable `F`.
    ///
    /// # Safety
    /// `F` must be a function-pointer type whose signature and calling
    /// convention exactly match the mapped machine code; calling the
    /// result is undefined behavior otherwise.
    pub unsafe fn new(mapped: Arc<MappedCode>) -> Self {
        let ptr = mapped.as_ptr();
        let f = std::mem::transmute_copy::<*const u8, F>(&ptr);
        JitFunction { mapped, f }
    }

    /// The callable function pointer.
    pub fn get(&self) -> F {
        self.f
    }

    /// The underlying mapping, e.g. to inspect `len()`.
    pub fn mapped(&self) -> &Arc<MappedCode> {
        &self.mapped
    }
}

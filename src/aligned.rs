//! A heap buffer aligned to `PAGE_SIZE`, for page-granularity direct I/O.
//!
//! `original_source/src/sst.cpp` allocates its write buffers with
//! `posix_memalign(&buffer, PAGE_SIZE, buffer_size)`. This is the safe Rust
//! equivalent: a single allocation with an explicit `Layout`, freed on
//! `Drop`, exposed as an ordinary `[u8]` slice everywhere else.

use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

use crate::core::PAGE_SIZE;
use crate::error::{Error, Result};

pub struct AlignedPage {
    ptr: NonNull<u8>,
    layout: Layout,
}

unsafe impl Send for AlignedPage {}
unsafe impl Sync for AlignedPage {}

impl AlignedPage {
    /// A single zero-filled page, aligned to `PAGE_SIZE`.
    pub fn new() -> Result<AlignedPage> {
        let layout = Layout::from_size_align(PAGE_SIZE, PAGE_SIZE)
            .map_err(|err| Error::Alignment(err.to_string()))?;
        // SAFETY: layout has non-zero size.
        let raw = unsafe { alloc_zeroed(layout) };
        let ptr = NonNull::new(raw).ok_or_else(|| {
            Error::Alignment("aligned page allocation returned null".to_string())
        })?;
        Ok(AlignedPage { ptr, layout })
    }

    /// Reset every byte to the pad pattern (`0xFF`, which reads back as the
    /// `PAD` sentinel in every 8-byte slot — §4.5 step 2).
    pub fn fill_pad(&mut self) {
        self.as_mut_slice().fill(0xFF);
    }

    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: ptr is valid for `layout.size()` bytes for the lifetime
        // of `self`.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.layout.size()) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: see as_slice; `&mut self` guarantees exclusivity.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.layout.size()) }
    }
}

impl Deref for AlignedPage {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl DerefMut for AlignedPage {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.as_mut_slice()
    }
}

impl Drop for AlignedPage {
    fn drop(&mut self) {
        // SAFETY: ptr/layout were obtained from a matching alloc_zeroed.
        unsafe { dealloc(self.ptr.as_ptr(), self.layout) };
    }
}

impl Clone for AlignedPage {
    fn clone(&self) -> AlignedPage {
        let mut page = AlignedPage::new().expect("aligned page allocation");
        page.as_mut_slice().copy_from_slice(self.as_slice());
        page
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_filled_on_creation() {
        let page = AlignedPage::new().unwrap();
        assert!(page.as_slice().iter().all(|&b| b == 0));
        assert_eq!(page.len(), PAGE_SIZE);
    }

    #[test]
    fn fill_pad_sets_all_bytes() {
        let mut page = AlignedPage::new().unwrap();
        page.fill_pad();
        assert!(page.as_slice().iter().all(|&b| b == 0xFF));
        let as_i64 = i64::from_le_bytes(page[0..8].try_into().unwrap());
        assert_eq!(as_i64, -1);
    }
}

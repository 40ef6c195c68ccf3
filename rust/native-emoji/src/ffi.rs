//! FFI module for browser host integration
//!
//! C-compatible functions for embedding the replacer: a host loads a page,
//! applies its own edits through the page handle and flushes after each
//! turn so the watcher sees the changes.

use std::ffi::{c_char, c_int, CStr, CString};
use std::ptr;

use emoji_dom::{Document, NodeId, SelectorList};

use crate::page::Page;

// ============================================================================
// Initialization
// ============================================================================

/// Initialize the library (installs the logger, honours `RUST_LOG`)
#[no_mangle]
pub extern "C" fn native_emoji_init() {
    let _ = env_logger::try_init();
}

/// Get library version
#[no_mangle]
pub extern "C" fn native_emoji_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

/// Borrow a C string as UTF-8, `None` for null or invalid input
unsafe fn c_str<'a>(s: *const c_char) -> Option<&'a str> {
    if s.is_null() {
        return None;
    }
    CStr::from_ptr(s).to_str().ok()
}

fn first_match(document: &Document, selector: &str) -> Option<NodeId> {
    match SelectorList::parse(selector) {
        Ok(selectors) => document.query_selector(document.root(), &selectors),
        Err(err) => {
            log::warn!("ffi: {}", err);
            None
        }
    }
}

// ============================================================================
// Page FFI
// ============================================================================

/// Parse HTML, run the startup scan and install the watcher
#[no_mangle]
pub extern "C" fn native_emoji_page_load(html: *const c_char) -> *mut Page {
    let Some(html) = (unsafe { c_str(html) }) else {
        return ptr::null_mut();
    };
    Box::into_raw(Box::new(Page::load(html)))
}

/// Unload and free a page
#[no_mangle]
pub extern "C" fn native_emoji_page_free(page: *mut Page) {
    if !page.is_null() {
        unsafe {
            let mut page = Box::from_raw(page);
            page.unload();
        }
    }
}

/// Append parsed `html` to the first element matching `parent_selector`
/// (the document itself when the selector is empty)
///
/// Returns 0 on success, -1 on error.
#[no_mangle]
pub extern "C" fn native_emoji_page_append_html(
    page: *mut Page,
    parent_selector: *const c_char,
    html: *const c_char,
) -> c_int {
    if page.is_null() {
        return -1;
    }
    unsafe {
        let (Some(selector), Some(html)) = (c_str(parent_selector), c_str(html)) else {
            return -1;
        };
        let document = (*page).document_mut();
        let parent = if selector.trim().is_empty() {
            document.root()
        } else {
            match first_match(document, selector) {
                Some(parent) => parent,
                None => return -1,
            }
        };
        let nodes = document.parse_fragment(html);
        for (i, &node) in nodes.iter().enumerate() {
            if let Err(err) = document.append_child(parent, node) {
                log::warn!("ffi: append failed: {}", err);
                for &orphan in &nodes[i..] {
                    let _ = document.release(orphan);
                }
                return -1;
            }
        }
        0
    }
}

/// Set an attribute on the first element matching `selector`
///
/// Returns 0 on success, -1 on error.
#[no_mangle]
pub extern "C" fn native_emoji_page_set_attribute(
    page: *mut Page,
    selector: *const c_char,
    name: *const c_char,
    value: *const c_char,
) -> c_int {
    if page.is_null() {
        return -1;
    }
    unsafe {
        let (Some(selector), Some(name), Some(value)) = (c_str(selector), c_str(name), c_str(value))
        else {
            return -1;
        };
        let document = (*page).document_mut();
        let Some(target) = first_match(document, selector) else {
            return -1;
        };
        match document.set_attribute(target, name, value) {
            Ok(()) => 0,
            Err(err) => {
                log::warn!("ffi: set attribute failed: {}", err);
                -1
            }
        }
    }
}

/// Deliver pending change batches until the page is idle
///
/// Returns the number of images replaced.
#[no_mangle]
pub extern "C" fn native_emoji_page_flush(page: *mut Page) -> u32 {
    if page.is_null() {
        return 0;
    }
    unsafe { (*page).run_until_idle() as u32 }
}

/// Serialize the page (free with `native_emoji_string_free`)
#[no_mangle]
pub extern "C" fn native_emoji_page_html(page: *const Page) -> *mut c_char {
    if page.is_null() {
        return ptr::null_mut();
    }
    unsafe {
        match CString::new((*page).to_html()) {
            Ok(c_string) => c_string.into_raw(),
            Err(_) => ptr::null_mut(),
        }
    }
}

/// Free a string returned by this library
#[no_mangle]
pub extern "C" fn native_emoji_string_free(s: *mut c_char) {
    if !s.is_null() {
        unsafe {
            drop(CString::from_raw(s));
        }
    }
}

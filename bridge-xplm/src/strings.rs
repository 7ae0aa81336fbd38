//! String and buffer conversions at the SDK boundary.

use std::ffi::{c_char, CStr, CString};

/// Size of the buffers the SDK fills with paths.
pub const PATH_BUFFER_LEN: usize = 512;

/// Prefix on every line the bridge writes to `Log.txt`.
pub const LOG_PREFIX: &str = "[x-ai-mcp] ";

/// Convert for passing to the SDK. `None` when `value` holds a NUL byte,
/// which the SDK would silently truncate at.
pub fn to_c_string(value: &str) -> Option<CString> {
    CString::new(value).ok()
}

/// Read a NUL-terminated string the SDK wrote into `buffer`.
pub fn from_buffer(buffer: &[u8]) -> String {
    let end = buffer.iter().position(|&b| b == 0).unwrap_or(buffer.len());
    String::from_utf8_lossy(&buffer[..end]).into_owned()
}

/// Copy a string the SDK returned by pointer. Null reads as empty.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string that stays valid
/// for the duration of the call.
pub unsafe fn from_ptr(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    CStr::from_ptr(ptr).to_string_lossy().into_owned()
}

/// One `Log.txt` line: prefixed, newline-terminated, interior NULs dropped.
pub fn log_line(message: &str) -> CString {
    let mut line: String = LOG_PREFIX
        .chars()
        .chain(message.chars())
        .filter(|&c| c != '\0')
        .collect();
    if !line.ends_with('\n') {
        line.push('\n');
    }
    // No NULs remain, so this cannot fail.
    CString::new(line).unwrap_or_default()
}

/// Pointer to pass as instance data. The SDK reads through it even when no
/// datarefs are bound, so an empty slice maps to `placeholder`.
pub fn instance_data_ptr(data: &[f32], placeholder: &[f32; 1]) -> *const f32 {
    if data.is_empty() {
        placeholder.as_ptr()
    } else {
        data.as_ptr()
    }
}

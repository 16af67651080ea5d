//! Conversion of platform-native paths into UTF-8 text.
//!
//! File names are the payload of a listing, so malformed input is an
//! error rather than being replaced with `U+FFFD`.
use std::ffi::OsStr;

use crate::errors::Error;

/// Encodes a native path or file name as UTF-8 text.
///
/// On Unix the native representation is a byte string; valid UTF-8 is
/// passed through unchanged. On Windows the UTF-16 code units are
/// transcoded. Encoding text that is already UTF-8 is a no-op, so
/// `encode(encode(p)?)` equals `encode(p)`.
pub fn encode<S: AsRef<OsStr>>(native: S) -> Result<String, Error> {
    let native = native.as_ref();
    encode_native(native).ok_or_else(|| Error::PathEncoding {
        path: native.to_string_lossy().into_owned(),
    })
}

#[cfg(unix)]
fn encode_native(native: &OsStr) -> Option<String> {
    use std::os::unix::ffi::OsStrExt;

    std::str::from_utf8(native.as_bytes())
        .ok()
        .map(str::to_owned)
}

#[cfg(windows)]
fn encode_native(native: &OsStr) -> Option<String> {
    use std::os::windows::ffi::OsStrExt;

    char::decode_utf16(native.encode_wide())
        .collect::<Result<String, _>>()
        .ok()
}

#[cfg(not(any(unix, windows)))]
fn encode_native(native: &OsStr) -> Option<String> {
    native.to_str().map(str::to_owned)
}

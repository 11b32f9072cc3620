//! UTF-16 string helpers for Win32 calls

/// NUL-terminated UTF-16 buffer for passing into Win32
pub(crate) fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

/// String from a UTF-16 buffer, stopping at the first NUL
pub(crate) fn from_wide(buf: &[u16]) -> String {
    let len = buf.iter().position(|&u| u == 0).unwrap_or(buf.len());
    String::from_utf16_lossy(&buf[..len])
}

/// Strings from a REG_MULTI_SZ byte buffer
pub(crate) fn multi_sz_from_bytes(raw: &[u8]) -> Vec<String> {
    let units: Vec<u16> = raw
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    units
        .split(|&u| u == 0)
        .filter(|chunk| !chunk.is_empty())
        .map(String::from_utf16_lossy)
        .collect()
}

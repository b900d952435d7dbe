//! Map settings: NUL-separated command strings in one raw-data block.

/// Split a settings block into its ordered command strings. Order is
/// significant — consumers apply entries front to back. Consecutive NULs
/// yield empty entries; a trailing run without a terminator still becomes
/// the final entry instead of being read past the block.
pub(crate) fn parse_settings(block: &[u8]) -> Vec<String> {
    let mut settings = Vec::new();
    let mut rest = block;
    while let Some(nul) = rest.iter().position(|&b| b == 0) {
        settings.push(String::from_utf8_lossy(&rest[..nul]).into_owned());
        rest = &rest[nul + 1..];
    }
    if !rest.is_empty() {
        settings.push(String::from_utf8_lossy(rest).into_owned());
    }
    settings
}

/// Read a single NUL-terminated string block (author, credits, ...).
pub(crate) fn parse_string(block: &[u8]) -> String {
    let end = block.iter().position(|&b| b == 0).unwrap_or(block.len());
    String::from_utf8_lossy(&block[..end]).into_owned()
}

//! Cache file format constants

/// File magic: a line feed followed by a CRLF, so any line-ending
/// normalization of the file is caught before a single record is read.
pub const FILE_MAGIC: &[u8] = b"VCR-CACHE/1\n\r\n";

/// Line closing the last record; a file that stops short of it was cut off
pub const END_MARKER: &str = "VCR-END";

/// Line terminator written after every line
pub const CRLF: &[u8] = b"\r\n";

/// Cache file extension, without the dot
pub const FILE_EXTENSION: &str = "vcr";

/// Name of the VCS attributes marker written next to cache files
pub const ATTRIBUTES_FILE: &str = ".gitattributes";

/// Contents of the attributes marker: never normalize line endings in cache files
pub const ATTRIBUTES_CONTENTS: &str = "*.vcr -text\n";

/// Upper bound on a single header or start line
pub const MAX_LINE_LEN: usize = 64 * 1024;

//! Line-oriented cache file codec
//!
//! A cache file is [`FILE_MAGIC`] followed by records. A record is a request
//! then a response, each written as a start line, header lines, a blank line
//! and `Content-Length` raw bytes of content. The content is followed by a
//! line break and a blank line. The last record is followed by
//! [`END_MARKER`], so a file cut between two records is still detected.

mod format;
mod reader;
mod writer;

pub use format::{
    ATTRIBUTES_CONTENTS, ATTRIBUTES_FILE, CRLF, END_MARKER, FILE_EXTENSION, FILE_MAGIC,
    MAX_LINE_LEN,
};
pub use reader::{decode_request, decode_response, read_cache_file, read_record, skip_blank};
pub use writer::{encode_request, encode_response, write_cache_file, write_record};

use crate::exchange::{Request, Response};

/// A recorded request/response pair
pub type Exchange = (Request, Response);

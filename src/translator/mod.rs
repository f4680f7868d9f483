pub mod dump_sanitizer;
pub mod hex_literal;

pub use dump_sanitizer::{DumpSanitizer, SanitizeRule};
pub use hex_literal::{HexDecodeMode, HexLiteralCodec};

use crate::Result;

/// Sanitize a raw dump and convert its blob literals
pub fn prepare_dump(raw_dump: &str, hex_mode: HexDecodeMode) -> Result<String> {
    let sanitized = DumpSanitizer::sanitize(raw_dump);
    HexLiteralCodec::translate(&sanitized, hex_mode)
}

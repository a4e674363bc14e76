//! Purpose: Define the stable public Rust API boundary for tabwire.
//! Exports: Frame codec, quantizer, projector, materializer, and width operations.
//! Role: Public, additive-only surface; internal helpers stay in `core`.
//! Invariants: Every exported operation is synchronous and stateless.

#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::display::render_ascii_table;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::frame::{
    DecodeOptions, FORMAT_TAG, FRAME_HEADER_LEN, FrameHeader, MAX_RECORD_SIZE, decode,
    decode_with, encode,
};
pub use crate::core::materialize::materialize;
pub use crate::core::project::{extract_keyed, limit_from_signed, project};
pub use crate::core::quantize::{
    Precision, f16_bits_to_f32, f32_to_f16_bits, quantize, quantize_slice, quantize_to,
    quantize_to_double, quantize_to_half, quantize_to_single,
};
pub use crate::core::table::{Batch, MemoryBatch, MemoryTable, Table};
pub use crate::core::value::{DATETIME_MARKER, Record, Value};
pub use crate::core::width::{MIN_COLUMN_WIDTH, column_widths, single_column_width, text_width};

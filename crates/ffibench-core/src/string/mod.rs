//! String helpers behind the string-passing and string-returning call shapes.

pub mod str;
pub mod table;

pub use str::strlen;
pub use table::{MAX_LENGTH, StringTable, pattern_byte};

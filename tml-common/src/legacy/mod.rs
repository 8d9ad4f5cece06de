//! Legacy array grammar
//!
//! Reader and writer for the nested associative-array serialization used by
//! the memo and image columns (the PHP `serialize()` wire format). This layer
//! knows nothing about field names or discriminants.

mod decode;
mod encode;
mod value;

pub use decode::{decode, MAX_DEPTH};
pub use encode::encode;
pub use value::{Key, Value};

//! PDF object model.
//!
//! - `objects` - `Obj`, `Dict`, `Name`, `Cmd`, `Ref` and shared `StreamRef` handles

pub mod objects;

pub use objects::{Cmd, Dict, Name, Obj, Ref, StreamRef};

//! Document-level collaborators of the parser.
//!
//! - `security` - standard security handler: password checks, key derivation, cipher transforms
//! - `xref` - the `XRef` resolution seam and an in-memory table

pub mod security;
pub mod xref;

pub use security::{
    AuthenticatedAs, CipherTransform, CipherTransformFactory, PASSWORD_PADDING, PasswordAlgorithm,
    Pdf17, Pdf20,
};
pub use xref::{MemoryXRef, XRef};

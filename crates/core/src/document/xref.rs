//! Object resolution seam.
//!
//! The parser only needs to turn an indirect reference into an object; how
//! the table is read from the file is up to the implementation.

use crate::error::{PdfError, Result};
use crate::model::objects::{Obj, Ref};
use rustc_hash::FxHashMap;
use std::cell::RefCell;

/// Resolves indirect references.
pub trait XRef {
    /// The object stored under `r`.
    fn fetch(&self, r: Ref) -> Result<Obj>;

    /// `obj` itself, or the object it refers to when it is a reference.
    fn fetch_if_ref(&self, obj: &Obj) -> Result<Obj> {
        match obj {
            Obj::Ref(r) => self.fetch(*r),
            other => Ok(other.clone()),
        }
    }
}

/// Object table kept in memory.
#[derive(Debug, Default)]
pub struct MemoryXRef {
    objects: RefCell<FxHashMap<Ref, Obj>>,
}

impl MemoryXRef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, r: Ref, obj: Obj) {
        self.objects.borrow_mut().insert(r, obj);
    }

    pub fn len(&self) -> usize {
        self.objects.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.borrow().is_empty()
    }
}

impl XRef for MemoryXRef {
    fn fetch(&self, r: Ref) -> Result<Obj> {
        self.objects
            .borrow()
            .get(&r)
            .cloned()
            .ok_or(PdfError::ObjectNotFound(r))
    }
}

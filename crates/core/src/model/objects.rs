//! PDF object types.
//!
//! `Obj` is the value type produced by the parser. Streams are shared
//! handles (`StreamRef`) so that the object graph can hand the same lazily
//! decoded stream to several consumers without copying it.

use crate::document::xref::XRef;
use crate::error::{PdfError, Result};
use crate::stream::BaseStream;
use indexmap::IndexMap;
use smol_str::SmolStr;
use std::borrow::Borrow;
use std::cell::{RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

/// A PDF name (`/Type`, `/Filter`, ...), stored without the leading slash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name(SmolStr);

impl Name {
    pub fn new(name: &str) -> Self {
        Self(SmolStr::new(name))
    }

    /// Build a name from raw bytes, mapping each byte to one char.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(latin1_string(bytes).into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Name {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Name {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.0)
    }
}

/// A bare keyword: content-stream operator or structural word (`obj`, `R`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cmd(SmolStr);

impl Cmd {
    pub fn new(cmd: &str) -> Self {
        Self(SmolStr::new(cmd))
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(latin1_string(bytes).into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub(crate) fn latin1_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Indirect object reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ref {
    /// Object number
    pub num: u32,
    /// Generation number
    pub generation: u16,
}

impl Ref {
    pub const fn new(num: u32, generation: u16) -> Self {
        Self { num, generation }
    }
}

impl fmt::Display for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} R", self.num, self.generation)
    }
}

/// Name to object mapping.
///
/// Entries keep insertion order. A dictionary may carry the xref it was
/// parsed against so that indirect values can be resolved lazily.
#[derive(Clone, Default)]
pub struct Dict {
    map: IndexMap<Name, Obj>,
    xref: Option<Rc<dyn XRef>>,
}

impl Dict {
    pub fn new(xref: Option<Rc<dyn XRef>>) -> Self {
        Self {
            map: IndexMap::new(),
            xref,
        }
    }

    pub fn xref(&self) -> Option<&Rc<dyn XRef>> {
        self.xref.as_ref()
    }

    pub fn assign_xref(&mut self, xref: Option<Rc<dyn XRef>>) {
        self.xref = xref;
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Raw lookup; indirect references are returned as `Obj::Ref`.
    pub fn get(&self, key: &str) -> Option<&Obj> {
        self.map.get(key)
    }

    /// Raw lookup under the first key that is present (`Filter` / `F`).
    pub fn get_any(&self, keys: &[&str]) -> Option<&Obj> {
        keys.iter().find_map(|key| self.map.get(*key))
    }

    /// Lookup that follows one level of indirection through the xref.
    ///
    /// Without an attached xref a reference is returned unresolved.
    pub fn get_resolved(&self, key: &str) -> Result<Option<Obj>> {
        match self.map.get(key) {
            Some(obj) => self.resolve(obj).map(Some),
            None => Ok(None),
        }
    }

    pub fn get_resolved_any(&self, keys: &[&str]) -> Result<Option<Obj>> {
        match self.get_any(keys) {
            Some(obj) => self.resolve(obj).map(Some),
            None => Ok(None),
        }
    }

    fn resolve(&self, obj: &Obj) -> Result<Obj> {
        match (obj, &self.xref) {
            (Obj::Ref(r), Some(xref)) => xref.fetch(*r),
            _ => Ok(obj.clone()),
        }
    }

    /// Name value under `key`, if the entry is a direct name.
    pub fn get_name(&self, key: &str) -> Option<&str> {
        match self.map.get(key) {
            Some(Obj::Name(name)) => Some(name.as_str()),
            _ => None,
        }
    }

    pub fn set(&mut self, key: impl Into<Name>, value: Obj) {
        self.map.insert(key.into(), value);
    }

    pub fn has(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Obj> {
        self.map.shift_remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &Name> {
        self.map.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Name, &Obj)> {
        self.map.iter()
    }

    /// True when `/Type` is the given name.
    pub fn is_type(&self, type_name: &str) -> bool {
        self.get_name("Type") == Some(type_name)
    }
}

impl PartialEq for Dict {
    fn eq(&self, other: &Self) -> bool {
        self.map == other.map
    }
}

impl fmt::Debug for Dict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.map.iter()).finish()
    }
}

/// Shared handle to a (possibly decoding) stream.
///
/// Cloning the handle shares the cursor; readers that need an independent
/// view should call `make_sub_stream` on it.
#[derive(Clone)]
pub struct StreamRef(Rc<RefCell<Box<dyn BaseStream>>>);

impl StreamRef {
    pub fn new(stream: Box<dyn BaseStream>) -> Self {
        Self(Rc::new(RefCell::new(stream)))
    }

    /// Exclusive access to the underlying stream.
    ///
    /// # Panics
    /// Panics if the stream is already borrowed.
    pub fn borrow_mut(&self) -> RefMut<'_, Box<dyn BaseStream>> {
        self.0.borrow_mut()
    }

    /// The stream dictionary.
    pub fn dict(&self) -> Option<Dict> {
        RefCell::borrow(&self.0).dict().cloned()
    }

    /// Rewind and read every remaining byte, decoding as needed.
    pub fn get_all_bytes(&self) -> Result<Vec<u8>> {
        let mut stream = self.0.borrow_mut();
        stream.reset();
        stream.get_bytes(None)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for StreamRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for StreamRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(stream) => f
                .debug_struct("StreamRef")
                .field("dict", &stream.dict())
                .finish(),
            Err(_) => f.write_str("StreamRef(<borrowed>)"),
        }
    }
}

/// PDF object - the value type produced by the parser.
#[derive(Debug, Clone, PartialEq)]
pub enum Obj {
    Null,
    Bool(bool),
    Int(i64),
    Real(f64),
    /// Byte string (literal or hex)
    String(Vec<u8>),
    Name(Name),
    Ref(Ref),
    Array(Vec<Self>),
    Dict(Dict),
    Stream(StreamRef),
    /// Keyword that is not a value (`R`, `obj`, content operators)
    Cmd(Cmd),
}

impl Obj {
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// True for a command with the given keyword.
    pub fn is_cmd(&self, cmd: &str) -> bool {
        matches!(self, Self::Cmd(c) if c.as_str() == cmd)
    }

    /// True for a name with the given value.
    pub fn is_name(&self, name: &str) -> bool {
        matches!(self, Self::Name(n) if n.as_str() == name)
    }

    pub const fn as_bool(&self) -> Result<bool> {
        match self {
            Self::Bool(b) => Ok(*b),
            _ => Err(self.type_error("bool")),
        }
    }

    pub const fn as_int(&self) -> Result<i64> {
        match self {
            Self::Int(n) => Ok(*n),
            _ => Err(self.type_error("int")),
        }
    }

    /// Numeric value, integers coerced to f64.
    pub const fn as_num(&self) -> Result<f64> {
        match self {
            Self::Int(n) => Ok(*n as f64),
            Self::Real(n) => Ok(*n),
            _ => Err(self.type_error("number")),
        }
    }

    pub fn as_name(&self) -> Result<&str> {
        match self {
            Self::Name(n) => Ok(n.as_str()),
            _ => Err(self.type_error("name")),
        }
    }

    pub fn as_string(&self) -> Result<&[u8]> {
        match self {
            Self::String(s) => Ok(s),
            _ => Err(self.type_error("string")),
        }
    }

    pub fn as_array(&self) -> Result<&[Self]> {
        match self {
            Self::Array(arr) => Ok(arr),
            _ => Err(self.type_error("array")),
        }
    }

    pub const fn as_dict(&self) -> Result<&Dict> {
        match self {
            Self::Dict(d) => Ok(d),
            _ => Err(self.type_error("dict")),
        }
    }

    pub const fn as_stream(&self) -> Result<&StreamRef> {
        match self {
            Self::Stream(s) => Ok(s),
            _ => Err(self.type_error("stream")),
        }
    }

    pub const fn as_ref(&self) -> Result<Ref> {
        match self {
            Self::Ref(r) => Ok(*r),
            _ => Err(self.type_error("ref")),
        }
    }

    pub fn as_cmd(&self) -> Result<&str> {
        match self {
            Self::Cmd(c) => Ok(c.as_str()),
            _ => Err(self.type_error("cmd")),
        }
    }

    const fn type_error(&self, expected: &'static str) -> PdfError {
        PdfError::TypeError {
            expected,
            got: self.type_name(),
        }
    }

    /// Type name for error messages and dumps.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Real(_) => "real",
            Self::String(_) => "string",
            Self::Name(_) => "name",
            Self::Ref(_) => "ref",
            Self::Array(_) => "array",
            Self::Dict(_) => "dict",
            Self::Stream(_) => "stream",
            Self::Cmd(_) => "cmd",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dict_keeps_insertion_order() {
        let mut dict = Dict::default();
        dict.set("Type", Obj::Name(Name::new("XObject")));
        dict.set("Length", Obj::Int(3));
        dict.set("Filter", Obj::Name(Name::new("FlateDecode")));
        let keys: Vec<&str> = dict.keys().map(Name::as_str).collect();
        assert_eq!(keys, ["Type", "Length", "Filter"]);
        assert!(dict.is_type("XObject"));
    }

    #[test]
    fn get_any_prefers_first_present_key() {
        let mut dict = Dict::default();
        dict.set("F", Obj::Name(Name::new("AHx")));
        assert!(dict.get_any(&["Filter", "F"]).unwrap().is_name("AHx"));
        assert!(dict.get_any(&["DecodeParms", "DP"]).is_none());
    }

    #[test]
    fn unresolved_ref_without_xref() {
        let mut dict = Dict::default();
        dict.set("Length", Obj::Ref(Ref::new(7, 0)));
        let resolved = dict.get_resolved("Length").unwrap();
        assert_eq!(resolved, Some(Obj::Ref(Ref::new(7, 0))));
    }

    #[test]
    fn type_errors_name_both_sides() {
        let err = Obj::Int(1).as_name().unwrap_err();
        assert!(matches!(
            err,
            PdfError::TypeError {
                expected: "name",
                got: "int"
            }
        ));
    }

    #[test]
    fn names_from_bytes_map_each_byte() {
        let name = Name::from_bytes(b"A\xe9");
        assert_eq!(name.as_str(), "A\u{e9}");
        assert_eq!(name.to_string(), "/A\u{e9}");
    }
}

//! quiredump - inspect the objects of a PDF file.
//!
//! Objects are located by scanning the file for `N G obj` headers instead of
//! reading the cross-reference table, so damaged files can be inspected too.
//! Objects packed into object streams are indexed after the scan.

use bytes::Bytes;
use clap::{ArgAction, Parser as CommandLine};
use memmap2::Mmap;
use quire_core::document::{CipherTransformFactory, XRef};
use quire_core::parser::{Lexer, Parser, ParserOptions};
use quire_core::stream::Stream;
use quire_core::{Dict, Obj, PdfError, Ref};
use regex::bytes::Regex;
use serde::Serialize;
use std::cell::{Cell, OnceCell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::{Rc, Weak};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

type CliResult<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Where an object lives in the file.
#[derive(Debug, Clone, Copy)]
enum Location {
    Offset(usize),
    /// Byte offset inside the decoded data of an object stream.
    Compressed { container: Ref, offset: usize },
}

/// Object table built by scanning the file.
struct ScannedXRef {
    data: Bytes,
    locations: RefCell<HashMap<Ref, Location>>,
    cache: RefCell<HashMap<Ref, Obj>>,
    factory: OnceCell<CipherTransformFactory>,
    encrypt_ref: Cell<Option<Ref>>,
    this: Weak<Self>,
}

impl ScannedXRef {
    fn scan(data: Bytes) -> CliResult<Rc<Self>> {
        let header = Regex::new(r"(\d+)\s+(\d+)\s+obj\b")?;
        let mut locations = HashMap::new();
        for cap in header.captures_iter(&data) {
            let (Some(num), Some(generation), Some(whole)) = (
                parse_number::<u32>(&cap[1]),
                parse_number::<u16>(&cap[2]),
                cap.get(0),
            ) else {
                continue;
            };
            // later definitions win, as with incremental updates
            locations.insert(Ref::new(num, generation), Location::Offset(whole.start()));
        }
        info!(objects = locations.len(), "scanned object headers");
        Ok(Rc::new_cyclic(|this| Self {
            data,
            locations: RefCell::new(locations),
            cache: RefCell::new(HashMap::new()),
            factory: OnceCell::new(),
            encrypt_ref: Cell::new(None),
            this: this.clone(),
        }))
    }

    fn as_xref(&self) -> Option<Rc<dyn XRef>> {
        self.this.upgrade().map(|xref| xref as Rc<dyn XRef>)
    }

    fn refs(&self) -> Vec<Ref> {
        let mut refs: Vec<Ref> = self.locations.borrow().keys().copied().collect();
        refs.sort();
        refs
    }

    fn location(&self, r: Ref) -> Option<Location> {
        self.locations.borrow().get(&r).copied()
    }

    /// Parse `r` from the file with `options`, bypassing the cache.
    fn load(&self, r: Ref, options: ParserOptions) -> quire_core::Result<Obj> {
        match self.location(r) {
            Some(Location::Offset(offset)) => {
                let stream = Stream::new(self.data.clone(), offset, None, None);
                let lexer = Lexer::new(Box::new(stream), None)?;
                let mut parser = Parser::new(lexer, self.as_xref(), options)?;
                let factory = match self.encrypt_ref.get() {
                    // the encryption dictionary itself is never encrypted
                    Some(encrypt) if encrypt == r => None,
                    _ => self.factory.get(),
                };
                let (_, obj) = parser.parse_indirect_object(Some(r), factory)?;
                Ok(obj)
            }
            Some(Location::Compressed { container, offset }) => {
                let decoded = self.fetch(container)?.as_stream()?.get_all_bytes()?;
                let stream = Stream::new(decoded, offset, None, None);
                let lexer = Lexer::new(Box::new(stream), None)?;
                let mut parser = Parser::new(lexer, self.as_xref(), ParserOptions::default())?;
                parser.get_obj(None)
            }
            None => Err(PdfError::ObjectNotFound(r)),
        }
    }

    /// Register the objects stored in object streams.
    ///
    /// Direct definitions found by the scan take precedence.
    fn index_object_streams(&self) {
        for r in self.refs() {
            let stream = match self.fetch(r) {
                Ok(Obj::Stream(stream)) => stream,
                Ok(_) => continue,
                Err(e) => {
                    debug!(object = %r, error = %e, "skipping unreadable object");
                    continue;
                }
            };
            let Some(dict) = stream.dict() else { continue };
            if !dict.is_type("ObjStm") {
                continue;
            }
            let entries = stream
                .get_all_bytes()
                .and_then(|data| read_object_stream_header(&dict, data));
            match entries {
                Ok(entries) => {
                    let mut locations = self.locations.borrow_mut();
                    for (num, offset) in entries {
                        let compressed = Location::Compressed {
                            container: r,
                            offset,
                        };
                        locations.entry(Ref::new(num, 0)).or_insert(compressed);
                    }
                }
                Err(e) => warn!(object = %r, error = %e, "bad object stream"),
            }
        }
    }

    fn set_factory(&self, factory: CipherTransformFactory) {
        if self.factory.set(factory).is_err() {
            warn!("encryption was already set up");
        }
        // anything read so far was read without decryption
        self.cache.borrow_mut().clear();
    }
}

impl XRef for ScannedXRef {
    fn fetch(&self, r: Ref) -> quire_core::Result<Obj> {
        if let Some(obj) = self.cache.borrow().get(&r) {
            return Ok(obj.clone());
        }
        let obj = self.load(r, ParserOptions::default().allow_streams(true))?;
        self.cache.borrow_mut().insert(r, obj.clone());
        Ok(obj)
    }
}

fn parse_number<T: std::str::FromStr>(digits: &[u8]) -> Option<T> {
    std::str::from_utf8(digits).ok()?.parse().ok()
}

/// `(object number, offset)` pairs of an object stream, offsets made
/// relative to the start of the decoded data.
fn read_object_stream_header(dict: &Dict, data: Vec<u8>) -> quire_core::Result<Vec<(u32, usize)>> {
    let count = dict.get_resolved("N")?.map_or(Ok(0), |n| n.as_int())?;
    let first = dict.get_resolved("First")?.map_or(Ok(0), |n| n.as_int())?;
    let first = usize::try_from(first)
        .map_err(|_| PdfError::SyntaxError(format!("bad /First in object stream: {first}")))?;
    let mut parser = Parser::from_bytes(data, None, ParserOptions::default())?;
    let mut entries = Vec::new();
    for _ in 0..count {
        let (Obj::Int(num), Obj::Int(offset)) = (parser.get_obj(None)?, parser.get_obj(None)?)
        else {
            return Err(PdfError::SyntaxError("bad object stream header".into()));
        };
        match (u32::try_from(num), usize::try_from(offset)) {
            (Ok(num), Ok(offset)) => entries.push((num, first + offset)),
            _ => return Err(PdfError::SyntaxError(format!("bad entry {num} {offset}"))),
        }
    }
    Ok(entries)
}

/// The last `trailer` dictionary, or the dictionary of the last
/// cross-reference stream when the file has no trailer keyword.
fn find_trailer(xref: &ScannedXRef) -> CliResult<Option<Dict>> {
    let keyword = Regex::new(r"trailer\s*<<")?;
    if let Some(found) = keyword.find_iter(&xref.data).last() {
        let start = found.start() + "trailer".len();
        let stream = Stream::new(xref.data.clone(), start, None, None);
        let lexer = Lexer::new(Box::new(stream), None)?;
        let mut parser = Parser::new(lexer, xref.as_xref(), ParserOptions::default())?;
        if let Obj::Dict(dict) = parser.get_obj(None)? {
            return Ok(Some(dict));
        }
    }
    let mut candidates: Vec<(usize, Ref)> = xref
        .refs()
        .into_iter()
        .filter_map(|r| match xref.location(r) {
            Some(Location::Offset(offset)) => Some((offset, r)),
            _ => None,
        })
        .collect();
    candidates.sort();
    for (_, r) in candidates.into_iter().rev() {
        if let Ok(Obj::Stream(stream)) = xref.fetch(r) {
            if let Some(dict) = stream.dict().filter(|dict| dict.is_type("XRef")) {
                info!(object = %r, "using cross-reference stream dictionary as trailer");
                return Ok(Some(dict));
            }
        }
    }
    Ok(None)
}

/// Authenticate and install the decryption for an encrypted file.
fn setup_encryption(
    xref: &ScannedXRef,
    trailer: &Dict,
    password: Option<&str>,
) -> quire_core::Result<()> {
    let Some(encrypt) = trailer.get("Encrypt") else {
        return Ok(());
    };
    if let Obj::Ref(r) = encrypt {
        xref.encrypt_ref.set(Some(*r));
    }
    let dict = match xref.fetch_if_ref(encrypt)? {
        Obj::Dict(dict) => dict,
        other => {
            return Err(PdfError::EncryptionError(format!(
                "bad /Encrypt entry: {}",
                other.type_name()
            )));
        }
    };
    let file_id = match trailer.get_resolved("ID")? {
        Some(Obj::Array(ids)) => match ids.first() {
            Some(Obj::String(id)) => id.clone(),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };
    let factory = CipherTransformFactory::new(&dict, &file_id, password)?;
    info!(
        algorithm = factory.algorithm(),
        revision = factory.revision(),
        authenticated_as = ?factory.authenticated_as(),
        "document is encrypted"
    );
    xref.set_factory(factory);
    Ok(())
}

/// PDF syntax for `obj`. Streams show their dictionary only.
fn write_pdf(out: &mut String, obj: &Obj) {
    match obj {
        Obj::Null => out.push_str("null"),
        Obj::Bool(b) => {
            let _ = write!(out, "{b}");
        }
        Obj::Int(n) => {
            let _ = write!(out, "{n}");
        }
        Obj::Real(n) => {
            let _ = write!(out, "{n}");
        }
        Obj::String(s) if is_printable(s) => {
            out.push('(');
            for &b in s {
                if matches!(b, b'(' | b')' | b'\\') {
                    out.push('\\');
                }
                out.push(char::from(b));
            }
            out.push(')');
        }
        Obj::String(s) => {
            let _ = write!(out, "<{}>", to_hex(s));
        }
        Obj::Name(name) => write_name(out, name.as_str()),
        Obj::Ref(r) => {
            let _ = write!(out, "{r}");
        }
        Obj::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                write_pdf(out, item);
            }
            out.push(']');
        }
        Obj::Dict(dict) => write_dict(out, dict),
        Obj::Stream(stream) => match stream.dict() {
            Some(dict) => {
                write_dict(out, &dict);
                out.push_str(" stream");
            }
            None => out.push_str("<< >> stream"),
        },
        Obj::Cmd(cmd) => out.push_str(cmd.as_str()),
    }
}

fn write_dict(out: &mut String, dict: &Dict) {
    out.push_str("<<");
    for (key, value) in dict.iter() {
        out.push(' ');
        write_name(out, key.as_str());
        out.push(' ');
        write_pdf(out, value);
    }
    out.push_str(" >>");
}

fn write_name(out: &mut String, name: &str) {
    out.push('/');
    for ch in name.chars() {
        let code = u32::from(ch);
        if (0x21..0x7f).contains(&code) && !"()<>[]{}/%#".contains(ch) {
            out.push(ch);
        } else {
            let _ = write!(out, "#{code:02X}");
        }
    }
}

fn is_printable(s: &[u8]) -> bool {
    s.iter()
        .all(|&b| (0x20..0x7f).contains(&b) || matches!(b, b'\n' | b'\r' | b'\t'))
}

fn to_hex(data: &[u8]) -> String {
    data.iter().fold(String::with_capacity(data.len() * 2), |mut s, b| {
        let _ = write!(s, "{b:02x}");
        s
    })
}

/// JSON shape of an object.
#[derive(Serialize)]
#[serde(rename_all = "lowercase")]
enum JsonObj {
    Null,
    Bool(bool),
    Int(i64),
    Real(f64),
    String(String),
    Hex(String),
    Name(String),
    Ref { num: u32, generation: u16 },
    Array(Vec<JsonObj>),
    Dict(BTreeMap<String, JsonObj>),
    Stream { dict: BTreeMap<String, JsonObj> },
    Cmd(String),
}

impl JsonObj {
    fn from_obj(obj: &Obj) -> Self {
        match obj {
            Obj::Null => Self::Null,
            Obj::Bool(b) => Self::Bool(*b),
            Obj::Int(n) => Self::Int(*n),
            Obj::Real(n) => Self::Real(*n),
            Obj::String(s) if is_printable(s) => {
                Self::String(s.iter().map(|&b| char::from(b)).collect())
            }
            Obj::String(s) => Self::Hex(to_hex(s)),
            Obj::Name(name) => Self::Name(name.as_str().to_owned()),
            Obj::Ref(r) => Self::Ref {
                num: r.num,
                generation: r.generation,
            },
            Obj::Array(items) => Self::Array(items.iter().map(Self::from_obj).collect()),
            Obj::Dict(dict) => Self::Dict(Self::entries(dict)),
            Obj::Stream(stream) => Self::Stream {
                dict: stream.dict().as_ref().map(Self::entries).unwrap_or_default(),
            },
            Obj::Cmd(cmd) => Self::Cmd(cmd.as_str().to_owned()),
        }
    }

    fn entries(dict: &Dict) -> BTreeMap<String, Self> {
        dict.iter()
            .map(|(key, value)| (key.as_str().to_owned(), Self::from_obj(value)))
            .collect()
    }
}

#[derive(Serialize)]
struct ObjectDump {
    num: u32,
    generation: u16,
    object: JsonObj,
    /// Hex of the stream data, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<String>,
}

#[derive(Serialize)]
struct Listing {
    trailer: Option<JsonObj>,
    objects: Vec<ListingEntry>,
}

#[derive(Serialize)]
struct ListingEntry {
    num: u32,
    generation: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    container: Option<u32>,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    subtype: Option<String>,
}

/// Inspect the objects of a PDF file.
#[derive(CommandLine, Debug)]
#[command(name = "quiredump")]
#[command(author, version, about = "Dump PDF objects, streams and encryption details", long_about = None)]
struct Args {
    /// Path to the PDF file
    file: PathBuf,

    /// Object numbers to dump, e.g. --object 4,7
    #[arg(short = 'i', long = "object", value_delimiter = ',')]
    objects: Vec<u32>,

    /// Generation number of the dumped objects
    #[arg(short = 'g', long, default_value_t = 0)]
    generation: u16,

    /// Write the decoded data of stream objects
    #[arg(short = 'd', long, action = ArgAction::SetTrue, conflicts_with = "raw")]
    decode: bool,

    /// Write stream data as stored in the file
    #[arg(short = 'r', long, action = ArgAction::SetTrue)]
    raw: bool,

    /// Emit JSON instead of PDF syntax
    #[arg(short = 'j', long, action = ArgAction::SetTrue)]
    json: bool,

    /// Password for encrypted files, tried as owner then user password
    #[arg(short = 'P', long)]
    password: Option<String>,

    /// Path to file where output is written, or "-" for stdout
    #[arg(short = 'o', long, default_value = "-")]
    outfile: String,

    /// More logging: -v for info, -vv for debug. RUST_LOG overrides.
    #[arg(short = 'v', long, action = ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn dump_objects<W: Write>(out: &mut W, xref: &ScannedXRef, args: &Args) -> CliResult<()> {
    let raw_options = ParserOptions::default()
        .allow_streams(true)
        .decode_streams(false);
    for &num in &args.objects {
        let r = Ref::new(num, args.generation);
        let obj = if args.raw {
            xref.load(r, raw_options)
        } else {
            xref.fetch(r)
        };
        let obj = match obj {
            Ok(obj) => obj,
            Err(e) => {
                warn!(object = %r, error = %e, "cannot read object");
                continue;
            }
        };
        let data = match &obj {
            Obj::Stream(stream) if args.decode || args.raw => Some(stream.get_all_bytes()?),
            _ => None,
        };

        if args.json {
            let dump = ObjectDump {
                num,
                generation: args.generation,
                object: JsonObj::from_obj(&obj),
                data: data.as_deref().map(to_hex),
            };
            serde_json::to_writer_pretty(&mut *out, &dump)?;
            writeln!(out)?;
            continue;
        }
        if let Some(data) = data {
            // binary output, as with `dumppdf -b`
            out.write_all(&data)?;
            continue;
        }
        let mut text = String::new();
        write_pdf(&mut text, &obj);
        writeln!(out, "{} {} obj\n{text}\nendobj", r.num, r.generation)?;
    }
    Ok(())
}

fn dump_listing<W: Write>(
    out: &mut W,
    xref: &ScannedXRef,
    trailer: Option<&Dict>,
    json: bool,
) -> CliResult<()> {
    let mut entries = Vec::new();
    for r in xref.refs() {
        let (offset, container) = match xref.location(r) {
            Some(Location::Offset(offset)) => (Some(offset), None),
            Some(Location::Compressed { container, .. }) => (None, Some(container.num)),
            None => continue,
        };
        let (kind, subtype) = match xref.fetch(r) {
            Ok(obj) => {
                let dict = match &obj {
                    Obj::Dict(dict) => Some(dict.clone()),
                    Obj::Stream(stream) => stream.dict(),
                    _ => None,
                };
                let subtype = dict.and_then(|dict| dict.get_name("Type").map(str::to_owned));
                (obj.type_name(), subtype)
            }
            Err(e) => {
                debug!(object = %r, error = %e, "unreadable object");
                ("error", None)
            }
        };
        entries.push(ListingEntry {
            num: r.num,
            generation: r.generation,
            offset,
            container,
            kind,
            subtype,
        });
    }

    if json {
        let listing = Listing {
            trailer: trailer.map(|dict| JsonObj::from_obj(&Obj::Dict(dict.clone()))),
            objects: entries,
        };
        serde_json::to_writer_pretty(&mut *out, &listing)?;
        writeln!(out)?;
        return Ok(());
    }

    if let Some(trailer) = trailer {
        let mut text = String::new();
        write_dict(&mut text, trailer);
        writeln!(out, "trailer\n{text}\n")?;
    }
    for entry in entries {
        let place = match (entry.offset, entry.container) {
            (Some(offset), _) => format!("@{offset}"),
            (None, Some(container)) => format!("in {container}"),
            (None, None) => String::new(),
        };
        let subtype = entry.subtype.map(|s| format!(" /{s}")).unwrap_or_default();
        writeln!(
            out,
            "{:>6} {:<3} {:<12} {}{}",
            entry.num, entry.generation, place, entry.kind, subtype
        )?;
    }
    Ok(())
}

fn run(args: &Args) -> CliResult<()> {
    let file = File::open(&args.file)?;
    // SAFETY: the mapping is copied before anything else can see it
    let mmap = unsafe { Mmap::map(&file) }?;
    let xref = ScannedXRef::scan(Bytes::copy_from_slice(&mmap))?;
    drop(mmap);

    let trailer = find_trailer(&xref)?;
    match &trailer {
        Some(trailer) => setup_encryption(&xref, trailer, args.password.as_deref())?,
        None => warn!("no trailer found"),
    }
    xref.index_object_streams();

    let mut out: Box<dyn Write> = if args.outfile == "-" {
        Box::new(BufWriter::new(io::stdout()))
    } else {
        Box::new(BufWriter::new(File::create(&args.outfile)?))
    };
    if args.objects.is_empty() {
        dump_listing(&mut out, &xref, trailer.as_ref(), args.json)?;
    } else {
        dump_objects(&mut out, &xref, args)?;
    }
    out.flush()?;
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<PdfError>() {
                Some(PdfError::Password(response)) => {
                    eprintln!("quiredump: {}: {response}", args.file.display());
                    ExitCode::from(2)
                }
                _ => {
                    eprintln!("quiredump: {}: {e}", args.file.display());
                    ExitCode::FAILURE
                }
            }
        }
    }
}

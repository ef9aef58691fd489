//! Content stream operations.

use super::lexer::Lexer;
use super::operators::{KNOWN_COMMANDS, op_spec};
use super::params::ParserOptions;
use super::parser::Parser;
use crate::document::xref::XRef;
use crate::error::{PdfError, Result};
use crate::model::objects::{Cmd, Obj};
use crate::stream::{BaseStream, Stream};
use std::rc::Rc;
use tracing::{info, warn};

const MAX_OPERANDS: usize = 33;

/// One operator with its operands. Inline images appear as the single
/// stream operand of `EI`.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub operator: Cmd,
    pub operands: Vec<Obj>,
}

/// Reads `Operation`s from a content stream.
///
/// Operators with too many operands keep the last ones; the extras are held
/// back and handed to a following operator that is short of operands.
pub struct ContentStreamParser {
    parser: Parser,
    spilled: Vec<Obj>,
}

impl ContentStreamParser {
    pub fn new(stream: Box<dyn BaseStream>, xref: Option<Rc<dyn XRef>>) -> Result<Self> {
        let lexer = Lexer::new(stream, Some(&KNOWN_COMMANDS))?;
        Ok(Self {
            parser: Parser::new(lexer, xref, ParserOptions::default())?,
            spilled: Vec::new(),
        })
    }

    pub fn from_bytes(data: impl Into<bytes::Bytes>) -> Result<Self> {
        Self::new(Box::new(Stream::from_bytes(data)), None)
    }

    /// The next operation, `None` at the end of the stream.
    pub fn read_operation(&mut self) -> Result<Option<Operation>> {
        let mut operands: Vec<Obj> = Vec::new();
        loop {
            if self.parser.at_eof() {
                if !operands.is_empty() {
                    info!(count = operands.len(), "operands without operator at end of stream");
                }
                return Ok(None);
            }
            let obj = self.parser.get_obj(None)?;
            let cmd = match obj {
                Obj::Cmd(cmd) => cmd,
                Obj::Null => continue,
                obj => {
                    operands.push(obj);
                    if operands.len() > MAX_OPERANDS {
                        return Err(PdfError::SyntaxError("too many operands".into()));
                    }
                    continue;
                }
            };

            let Some(spec) = op_spec(cmd.as_str()) else {
                warn!(operator = %cmd, "unknown command");
                continue;
            };
            if !spec.variable_args {
                while operands.len() > spec.num_args {
                    self.spilled.push(operands.remove(0));
                }
                if self.spilled.len() > MAX_OPERANDS {
                    // only the most recent extras can still be claimed
                    let excess = self.spilled.len() - MAX_OPERANDS;
                    self.spilled.drain(..excess);
                }
                while operands.len() < spec.num_args {
                    match self.spilled.pop() {
                        Some(obj) => operands.insert(0, obj),
                        None => break,
                    }
                }
                if operands.len() < spec.num_args {
                    warn!(
                        operator = %cmd,
                        expected = spec.num_args,
                        received = operands.len(),
                        "skipping command with missing operands"
                    );
                    operands.clear();
                    continue;
                }
            } else if operands.len() > spec.num_args {
                info!(
                    operator = %cmd,
                    expected = spec.num_args,
                    received = operands.len(),
                    "command has too many operands"
                );
            }
            return Ok(Some(Operation {
                operator: cmd,
                operands,
            }));
        }
    }
}

impl Iterator for ContentStreamParser {
    type Item = Result<Operation>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_operation().transpose()
    }
}

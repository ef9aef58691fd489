//! TIFF and PNG predictors applied after `/FlateDecode` or `/LZWDecode`.
//!
//! Rows are undone one at a time, so a reader pulling a prefix of the
//! image only decodes the rows it covers.

use crate::error::{PdfError, Result};
use crate::model::objects::{Dict, Obj};
use crate::stream::{BaseStream, BlockDecoder, DecodeBuffer, DecodeStream, SourceRange};

/// Largest predictor row accepted; the row buffers are allocated up front.
pub const MAX_ROW_BYTES: usize = 1 << 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PredictorKind {
    Tiff,
    Png,
}

/// Decoder reversing `/Predictor` differencing.
pub struct PredictorDecoder {
    source: Box<dyn BaseStream>,
    kind: PredictorKind,
    colors: usize,
    bits: usize,
    pix_bytes: usize,
    row_bytes: usize,
    columns: usize,
    prev_row: Vec<u8>,
}

/// Stream undoing a predictor.
pub type PredictorStream = DecodeStream<PredictorDecoder>;

fn int_param(params: &Dict, keys: &[&str], default: i64) -> Result<i64> {
    match params.get_resolved_any(keys)? {
        Some(Obj::Int(n)) => Ok(n),
        Some(Obj::Real(n)) => Ok(n as i64),
        _ => Ok(default),
    }
}

/// Wrap `source` with the predictor described by `params`.
///
/// Without parameters, or with `/Predictor` 1 or less, `source` is returned
/// as is.
pub fn make_predictor(
    source: Box<dyn BaseStream>,
    maybe_length: Option<usize>,
    params: Option<&Dict>,
) -> Result<Box<dyn BaseStream>> {
    let Some(params) = params else {
        return Ok(source);
    };
    let predictor = int_param(params, &["Predictor"], 1)?;
    if predictor <= 1 {
        return Ok(source);
    }
    let kind = match predictor {
        2 => PredictorKind::Tiff,
        10..=15 => PredictorKind::Png,
        _ => {
            return Err(PdfError::DecodeError(format!(
                "unsupported predictor: {predictor}"
            )));
        }
    };
    let colors = int_param(params, &["Colors"], 1)?;
    let bits = int_param(params, &["BitsPerComponent", "BPC"], 8)?;
    let columns = int_param(params, &["Columns"], 1)?;
    if !(1..=32).contains(&colors) || !matches!(bits, 1 | 2 | 4 | 8 | 16) || columns < 1 {
        return Err(PdfError::DecodeError(format!(
            "bad predictor parameters: colors={colors} bits={bits} columns={columns}"
        )));
    }
    let (colors, bits) = (colors as usize, bits as usize);
    let row_bytes = usize::try_from(columns)
        .ok()
        .and_then(|columns| columns.checked_mul(colors * bits))
        .map(|row_bits| row_bits.div_ceil(8))
        .filter(|&row_bytes| row_bytes <= MAX_ROW_BYTES)
        .ok_or_else(|| {
            PdfError::DecodeError(format!(
                "predictor row too large: columns={columns} colors={colors} bits={bits}"
            ))
        })?;
    let columns = columns as usize;
    let decoder = PredictorDecoder {
        kind,
        colors,
        bits,
        pix_bytes: (colors * bits).div_ceil(8),
        row_bytes,
        columns,
        prev_row: vec![0; row_bytes],
        source,
    };
    let dict = decoder.source.dict().cloned();
    Ok(Box::new(DecodeStream::new(decoder, maybe_length).with_dict(dict)))
}

/// Paeth predictor from the PNG specification.
const fn paeth(left: u8, above: u8, upper_left: u8) -> u8 {
    let a = left as i16;
    let b = above as i16;
    let c = upper_left as i16;
    let p = a + b - c;
    let pa = (p - a).abs();
    let pb = (p - b).abs();
    let pc = (p - c).abs();
    if pa <= pb && pa <= pc {
        left
    } else if pb <= pc {
        above
    } else {
        upper_left
    }
}

impl PredictorDecoder {
    /// Read one row, zero padding a short final row. `None` at end of data.
    fn read_row(&mut self) -> Result<Option<Vec<u8>>> {
        let mut raw = self.source.get_bytes(Some(self.row_bytes))?;
        if raw.is_empty() {
            return Ok(None);
        }
        raw.resize(self.row_bytes, 0);
        Ok(Some(raw))
    }

    fn read_block_tiff(&mut self, out: &mut DecodeBuffer) -> Result<()> {
        let Some(raw) = self.read_row()? else {
            out.set_eof();
            return Ok(());
        };
        let mut row = vec![0u8; self.row_bytes];
        match self.bits {
            8 => {
                row.copy_from_slice(&raw);
                for i in self.pix_bytes..self.row_bytes {
                    row[i] = row[i].wrapping_add(row[i - self.pix_bytes]);
                }
            }
            16 => {
                row.copy_from_slice(&raw);
                let step = self.pix_bytes;
                let mut i = step;
                while i + 1 < self.row_bytes {
                    let left = u16::from_be_bytes([row[i - step], row[i - step + 1]]);
                    let cur = u16::from_be_bytes([row[i], row[i + 1]]);
                    let [hi, lo] = cur.wrapping_add(left).to_be_bytes();
                    row[i] = hi;
                    row[i + 1] = lo;
                    i += 2;
                }
            }
            bits => {
                // components narrower than a byte are summed per color
                let mask = (1u32 << bits) - 1;
                let mut components = vec![0u32; self.colors];
                let (mut inbuf, mut inbits) = (0u32, 0usize);
                let (mut outbuf, mut outbits) = (0u32, 0usize);
                let mut k = 0;
                let mut j = 0;
                for _ in 0..self.columns {
                    for component in components.iter_mut() {
                        if inbits < bits {
                            inbuf = (inbuf << 8) | u32::from(raw[k]);
                            k += 1;
                            inbits += 8;
                        }
                        *component = (*component + (inbuf >> (inbits - bits))) & mask;
                        inbits -= bits;
                        inbuf &= (1 << inbits) - 1;
                        outbuf = (outbuf << bits) | *component;
                        outbits += bits;
                        if outbits >= 8 {
                            row[j] = (outbuf >> (outbits - 8)) as u8;
                            j += 1;
                            outbits -= 8;
                            outbuf &= (1 << outbits) - 1;
                        }
                    }
                }
                if outbits > 0 && j < row.len() {
                    row[j] = (outbuf << (8 - outbits)) as u8;
                }
            }
        }
        out.extend_from_slice(&row);
        Ok(())
    }

    fn read_block_png(&mut self, out: &mut DecodeBuffer) -> Result<()> {
        let Some(filter_type) = self.source.get_byte()? else {
            out.set_eof();
            return Ok(());
        };
        let Some(raw) = self.read_row()? else {
            out.set_eof();
            return Ok(());
        };
        let pix = self.pix_bytes;
        let prev = &self.prev_row;
        let mut row = vec![0u8; self.row_bytes];
        match filter_type {
            0 => row.copy_from_slice(&raw),
            1 => {
                for i in 0..self.row_bytes {
                    let left = if i >= pix { row[i - pix] } else { 0 };
                    row[i] = raw[i].wrapping_add(left);
                }
            }
            2 => {
                for i in 0..self.row_bytes {
                    row[i] = raw[i].wrapping_add(prev[i]);
                }
            }
            3 => {
                for i in 0..self.row_bytes {
                    let left = if i >= pix { u16::from(row[i - pix]) } else { 0 };
                    let avg = ((left + u16::from(prev[i])) >> 1) as u8;
                    row[i] = raw[i].wrapping_add(avg);
                }
            }
            4 => {
                for i in 0..self.row_bytes {
                    let (left, upper_left) = if i >= pix {
                        (row[i - pix], prev[i - pix])
                    } else {
                        (0, 0)
                    };
                    row[i] = raw[i].wrapping_add(paeth(left, prev[i], upper_left));
                }
            }
            other => {
                return Err(PdfError::DecodeError(format!(
                    "unsupported PNG row filter: {other}"
                )));
            }
        }
        out.extend_from_slice(&row);
        self.prev_row = row;
        Ok(())
    }
}

impl BlockDecoder for PredictorDecoder {
    fn read_block(&mut self, out: &mut DecodeBuffer) -> Result<()> {
        match self.kind {
            PredictorKind::Tiff => self.read_block_tiff(out),
            PredictorKind::Png => self.read_block_png(out),
        }
    }

    fn base_streams(&self) -> Option<Vec<SourceRange>> {
        self.source.get_base_streams()
    }
}

//! Record payload decoding and encoding.
//!
//! Decoding normalizes every encoding to the canonical little-endian layout
//! held by [`Element`]; encoding walks that layout scalar by scalar.

use super::header::DeclaredElement;
use super::{Element, PlyEncoding, PropertyKind, ScalarType};
use crate::error::{CoreError, CoreResult};
use byteorder::{ByteOrder, LittleEndian};
use std::str::SplitAsciiWhitespace;

/// One step of a walk over canonical record bytes.
pub(super) enum Token<'a> {
    /// A scalar value. List counts and list items carry their list's
    /// property index.
    Scalar {
        property: usize,
        ty: ScalarType,
        bytes: &'a [u8],
    },
    EndOfRecord,
}

/// Decodes one little-endian scalar.
pub(super) fn read_scalar_le(ty: ScalarType, bytes: &[u8]) -> f64 {
    match ty {
        ScalarType::Char => f64::from(bytes[0] as i8),
        ScalarType::UChar => f64::from(bytes[0]),
        ScalarType::Short => f64::from(LittleEndian::read_i16(bytes)),
        ScalarType::UShort => f64::from(LittleEndian::read_u16(bytes)),
        ScalarType::Int => f64::from(LittleEndian::read_i32(bytes)),
        ScalarType::UInt => f64::from(LittleEndian::read_u32(bytes)),
        ScalarType::Float => f64::from(LittleEndian::read_f32(bytes)),
        ScalarType::Double => LittleEndian::read_f64(bytes),
    }
}

fn list_length(ty: ScalarType, bytes: &[u8], element: &str) -> CoreResult<usize> {
    let value = read_scalar_le(ty, bytes);
    if value < 0.0 || value.fract() != 0.0 {
        return Err(CoreError::PlyFormat(format!(
            "invalid list length {value} in element '{element}'"
        )));
    }
    Ok(value as usize)
}

/// Calls `visit` for every scalar of every record of `element`, in order.
pub(super) fn visit_scalars<'a, F>(element: &'a Element, mut visit: F) -> CoreResult<()>
where
    F: FnMut(Token<'a>) -> CoreResult<()>,
{
    let data = element.data();
    let mut pos = 0;
    let mut take = |size: usize| -> CoreResult<&'a [u8]> {
        let bytes = data.get(pos..pos + size).ok_or_else(|| {
            CoreError::PlyFormat(format!("element '{}' data is truncated", element.name))
        })?;
        pos += size;
        Ok(bytes)
    };

    for _ in 0..element.count() {
        for (property, prop) in element.properties.iter().enumerate() {
            match prop.kind {
                PropertyKind::Scalar(ty) => {
                    let bytes = take(ty.size())?;
                    visit(Token::Scalar { property, ty, bytes })?;
                }
                PropertyKind::List { count, item } => {
                    let bytes = take(count.size())?;
                    let len = list_length(count, bytes, &element.name)?;
                    visit(Token::Scalar {
                        property,
                        ty: count,
                        bytes,
                    })?;
                    for _ in 0..len {
                        let bytes = take(item.size())?;
                        visit(Token::Scalar {
                            property,
                            ty: item,
                            bytes,
                        })?;
                    }
                }
            }
        }
        visit(Token::EndOfRecord)?;
    }
    Ok(())
}

/// Appends the payload of `element` in `encoding`.
pub(super) fn encode_element(
    element: &Element,
    encoding: PlyEncoding,
    out: &mut Vec<u8>,
) -> CoreResult<()> {
    match encoding {
        PlyEncoding::BinaryLittleEndian => {
            // Walk once so inconsistent data is caught before it is copied.
            visit_scalars(element, |_| Ok(()))?;
            out.extend_from_slice(element.data());
        }
        PlyEncoding::BinaryBigEndian => visit_scalars(element, |token| {
            if let Token::Scalar { bytes, .. } = token {
                out.extend(bytes.iter().rev());
            }
            Ok(())
        })?,
        PlyEncoding::Ascii => {
            let mut line_start = true;
            visit_scalars(element, |token| {
                match token {
                    Token::Scalar { ty, bytes, .. } => {
                        if !line_start {
                            out.push(b' ');
                        }
                        out.extend_from_slice(format_ascii(ty, bytes).as_bytes());
                        line_start = false;
                    }
                    Token::EndOfRecord => {
                        out.push(b'\n');
                        line_start = true;
                    }
                }
                Ok(())
            })?;
        }
    }
    Ok(())
}

/// Shortest text that parses back to the same value.
fn format_ascii(ty: ScalarType, bytes: &[u8]) -> String {
    match ty {
        ScalarType::Float => LittleEndian::read_f32(bytes).to_string(),
        ScalarType::Double => LittleEndian::read_f64(bytes).to_string(),
        _ => format!("{}", read_scalar_le(ty, bytes) as i64),
    }
}

enum Source<'a> {
    Binary {
        bytes: &'a [u8],
        pos: usize,
        big_endian: bool,
    },
    Ascii(SplitAsciiWhitespace<'a>),
}

/// Sequential reader over the payload that follows a header.
pub(super) struct PayloadReader<'a> {
    source: Source<'a>,
}

impl<'a> PayloadReader<'a> {
    pub fn new(bytes: &'a [u8], encoding: PlyEncoding) -> CoreResult<Self> {
        let source = match encoding {
            PlyEncoding::Ascii => {
                let text = std::str::from_utf8(bytes).map_err(|e| {
                    CoreError::PlyFormat(format!("ascii payload is not valid text: {e}"))
                })?;
                Source::Ascii(text.split_ascii_whitespace())
            }
            PlyEncoding::BinaryLittleEndian => Source::Binary {
                bytes,
                pos: 0,
                big_endian: false,
            },
            PlyEncoding::BinaryBigEndian => Source::Binary {
                bytes,
                pos: 0,
                big_endian: true,
            },
        };
        Ok(Self { source })
    }

    /// Decodes all records of the next declared element.
    pub fn read_element(&mut self, declared: DeclaredElement) -> CoreResult<Element> {
        self.check_declared_count(&declared)?;
        let mut data = Vec::new();
        for record in 0..declared.count {
            for property in &declared.properties {
                let context = || format!("{}[{record}].{}", declared.name, property.name);
                match property.kind {
                    PropertyKind::Scalar(ty) => self.read_scalar(ty, &mut data, context)?,
                    PropertyKind::List { count, item } => {
                        let start = data.len();
                        self.read_scalar(count, &mut data, context)?;
                        let len = list_length(count, &data[start..], &declared.name)?;
                        for _ in 0..len {
                            self.read_scalar(item, &mut data, context)?;
                        }
                    }
                }
            }
        }
        Ok(Element::from_parts(
            declared.name,
            declared.properties,
            declared.count,
            data,
        ))
    }

    /// Rejects counts the remaining payload cannot hold before reading any record.
    fn check_declared_count(&self, declared: &DeclaredElement) -> CoreResult<()> {
        if declared.count == 0 {
            return Ok(());
        }
        if declared.properties.is_empty() {
            return Err(CoreError::PlyFormat(format!(
                "element '{}' declares {} records but no properties",
                declared.name, declared.count
            )));
        }
        if let Source::Binary { bytes, pos, .. } = &self.source {
            // Lists contribute at least their length prefix.
            let min_record: usize = declared
                .properties
                .iter()
                .map(|p| match p.kind {
                    PropertyKind::Scalar(ty) => ty.size(),
                    PropertyKind::List { count, .. } => count.size(),
                })
                .sum();
            let remaining = bytes.len().saturating_sub(*pos);
            let fits = declared
                .count
                .checked_mul(min_record)
                .is_some_and(|needed| needed <= remaining);
            if !fits {
                return Err(CoreError::PlyFormat(format!(
                    "element '{}' declares {} records but only {remaining} payload bytes remain",
                    declared.name, declared.count
                )));
            }
        }
        Ok(())
    }

    /// Reads one scalar and appends it to `data` in little-endian order.
    fn read_scalar(
        &mut self,
        ty: ScalarType,
        data: &mut Vec<u8>,
        context: impl Fn() -> String,
    ) -> CoreResult<()> {
        match &mut self.source {
            Source::Binary {
                bytes,
                pos,
                big_endian,
            } => {
                let raw = bytes.get(*pos..*pos + ty.size()).ok_or_else(|| {
                    CoreError::PlyFormat(format!("payload ends inside {}", context()))
                })?;
                *pos += ty.size();
                if *big_endian {
                    data.extend(raw.iter().rev());
                } else {
                    data.extend_from_slice(raw);
                }
            }
            Source::Ascii(tokens) => {
                let token = tokens.next().ok_or_else(|| {
                    CoreError::PlyFormat(format!("payload ends inside {}", context()))
                })?;
                let invalid =
                    || CoreError::PlyFormat(format!("invalid value '{token}' for {}", context()));
                match ty {
                    ScalarType::Float => {
                        let v: f32 = token.parse().map_err(|_| invalid())?;
                        data.extend_from_slice(&v.to_le_bytes());
                    }
                    ScalarType::Double => {
                        let v: f64 = token.parse().map_err(|_| invalid())?;
                        data.extend_from_slice(&v.to_le_bytes());
                    }
                    _ => {
                        let v: i64 = token.parse().map_err(|_| invalid())?;
                        super::write_scalar_le(data, ty, v as f64)?;
                    }
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// splatseq-core/src/ply/mod.rs
// ============================================================================
//
// PLY CODEC: Reading, Writing and Down-converting PLY Files
//
// Elements keep their records as canonical little-endian bytes regardless of
// the file encoding they were read from, so copying an element between files
// is bit-exact and re-encoding is a pure byte transformation.
//
// KEY COMPONENTS:
// - PlyFile / Element / Property: in-memory model of a PLY file
// - downconvert: extended -> standard (vertex-only) conversion
// - write_extended: Gaussian sets -> extended splat PLY files

pub mod convert;
mod header;
mod payload;
pub mod splat;

pub use convert::{ConversionSummary, downconvert, standard_subset};
pub use splat::{extended_ply, write_extended};

use crate::error::{CoreError, CoreResult, write_error};
use byteorder::{LittleEndian, WriteBytesExt};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

/// Name of the element holding per-point data.
pub const VERTEX_ELEMENT: &str = "vertex";

/// Payload encoding declared in the `format` header line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlyEncoding {
    Ascii,
    #[default]
    BinaryLittleEndian,
    BinaryBigEndian,
}

impl PlyEncoding {
    pub const fn as_str(self) -> &'static str {
        match self {
            PlyEncoding::Ascii => "ascii",
            PlyEncoding::BinaryLittleEndian => "binary_little_endian",
            PlyEncoding::BinaryBigEndian => "binary_big_endian",
        }
    }
}

impl fmt::Display for PlyEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlyEncoding {
    type Err = CoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "ascii" => Ok(PlyEncoding::Ascii),
            "binary_little_endian" => Ok(PlyEncoding::BinaryLittleEndian),
            "binary_big_endian" => Ok(PlyEncoding::BinaryBigEndian),
            other => Err(CoreError::PlyFormat(format!("unknown format '{other}'"))),
        }
    }
}

/// Scalar property types, with their canonical header names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    Char,
    UChar,
    Short,
    UShort,
    Int,
    UInt,
    Float,
    Double,
}

impl ScalarType {
    /// Accepts both the classic names and the sized aliases (`float32`, `uint8`, ...).
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "char" | "int8" => ScalarType::Char,
            "uchar" | "uint8" => ScalarType::UChar,
            "short" | "int16" => ScalarType::Short,
            "ushort" | "uint16" => ScalarType::UShort,
            "int" | "int32" => ScalarType::Int,
            "uint" | "uint32" => ScalarType::UInt,
            "float" | "float32" => ScalarType::Float,
            "double" | "float64" => ScalarType::Double,
            _ => return None,
        })
    }

    pub const fn name(self) -> &'static str {
        match self {
            ScalarType::Char => "char",
            ScalarType::UChar => "uchar",
            ScalarType::Short => "short",
            ScalarType::UShort => "ushort",
            ScalarType::Int => "int",
            ScalarType::UInt => "uint",
            ScalarType::Float => "float",
            ScalarType::Double => "double",
        }
    }

    /// Encoded size in bytes.
    pub const fn size(self) -> usize {
        match self {
            ScalarType::Char | ScalarType::UChar => 1,
            ScalarType::Short | ScalarType::UShort => 2,
            ScalarType::Int | ScalarType::UInt | ScalarType::Float => 4,
            ScalarType::Double => 8,
        }
    }

    pub const fn is_float(self) -> bool {
        matches!(self, ScalarType::Float | ScalarType::Double)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Scalar(ScalarType),
    List { count: ScalarType, item: ScalarType },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub name: String,
    pub kind: PropertyKind,
}

impl Property {
    pub fn scalar(name: impl Into<String>, ty: ScalarType) -> Self {
        Self {
            name: name.into(),
            kind: PropertyKind::Scalar(ty),
        }
    }
}

/// One element declaration plus its records.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    pub properties: Vec<Property>,
    count: usize,
    /// Records in declaration order, every scalar little-endian.
    data: Vec<u8>,
}

impl Element {
    pub fn new(name: impl Into<String>, properties: Vec<Property>) -> Self {
        Self {
            name: name.into(),
            properties,
            count: 0,
            data: Vec::new(),
        }
    }

    /// Number of records.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Raw canonical (little-endian) record bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn property_index(&self, name: &str) -> Option<usize> {
        self.properties.iter().position(|p| p.name == name)
    }

    /// Appends one record to an element made only of scalar properties.
    ///
    /// Values are converted to each property's type with `as` semantics.
    pub fn push_record(&mut self, values: &[f64]) -> CoreResult<()> {
        if values.len() != self.properties.len() {
            return Err(CoreError::PlyFormat(format!(
                "element '{}' expects {} values per record, got {}",
                self.name,
                self.properties.len(),
                values.len()
            )));
        }
        for (property, value) in self.properties.iter().zip(values) {
            let PropertyKind::Scalar(ty) = property.kind else {
                return Err(CoreError::PlyFormat(format!(
                    "list property '{}' cannot be filled from scalars",
                    property.name
                )));
            };
            write_scalar_le(&mut self.data, ty, *value)?;
        }
        self.count += 1;
        Ok(())
    }

    /// Decoded values of one scalar property across all records.
    pub fn scalar_values(&self, name: &str) -> CoreResult<Vec<f64>> {
        let index = self.property_index(name).ok_or_else(|| {
            CoreError::PlyFormat(format!("element '{}' has no property '{}'", self.name, name))
        })?;
        let PropertyKind::Scalar(ty) = self.properties[index].kind else {
            return Err(CoreError::PlyFormat(format!("property '{name}' is a list")));
        };

        let mut values = Vec::with_capacity(self.count);
        payload::visit_scalars(self, |token| {
            if let payload::Token::Scalar { property, bytes, .. } = token {
                if property == index {
                    values.push(payload::read_scalar_le(ty, bytes));
                }
            }
            Ok(())
        })?;
        Ok(values)
    }

    pub(crate) fn from_parts(
        name: String,
        properties: Vec<Property>,
        count: usize,
        data: Vec<u8>,
    ) -> Self {
        Self {
            name,
            properties,
            count,
            data,
        }
    }
}

fn write_scalar_le(out: &mut Vec<u8>, ty: ScalarType, value: f64) -> CoreResult<()> {
    match ty {
        ScalarType::Char => out.write_i8(value as i8)?,
        ScalarType::UChar => out.write_u8(value as u8)?,
        ScalarType::Short => out.write_i16::<LittleEndian>(value as i16)?,
        ScalarType::UShort => out.write_u16::<LittleEndian>(value as u16)?,
        ScalarType::Int => out.write_i32::<LittleEndian>(value as i32)?,
        ScalarType::UInt => out.write_u32::<LittleEndian>(value as u32)?,
        ScalarType::Float => out.write_f32::<LittleEndian>(value as f32)?,
        ScalarType::Double => out.write_f64::<LittleEndian>(value)?,
    }
    Ok(())
}

/// An in-memory PLY file.
#[derive(Debug, Clone, PartialEq)]
pub struct PlyFile {
    pub encoding: PlyEncoding,
    pub comments: Vec<String>,
    pub obj_info: Vec<String>,
    pub elements: Vec<Element>,
}

impl PlyFile {
    pub fn new(encoding: PlyEncoding) -> Self {
        Self {
            encoding,
            comments: Vec::new(),
            obj_info: Vec::new(),
            elements: Vec::new(),
        }
    }

    /// Reads and fully decodes a file.
    pub fn read(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::NotFound(path.to_path_buf()));
        }
        let bytes = std::fs::read(path).map_err(|e| CoreError::Unreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let file = Self::from_bytes(&bytes)?;
        debug!(
            "Read {} ({}, {} elements)",
            path.display(),
            file.encoding,
            file.elements.len()
        );
        Ok(file)
    }

    pub fn from_bytes(bytes: &[u8]) -> CoreResult<Self> {
        let (header, payload_start) = header::parse_header(bytes)?;
        let mut elements = Vec::with_capacity(header.elements.len());
        let mut cursor = payload::PayloadReader::new(&bytes[payload_start..], header.encoding)?;
        for declared in header.elements {
            elements.push(cursor.read_element(declared)?);
        }
        Ok(Self {
            encoding: header.encoding,
            comments: header.comments,
            obj_info: header.obj_info,
            elements,
        })
    }

    pub fn element(&self, name: &str) -> Option<&Element> {
        self.elements.iter().find(|e| e.name == name)
    }

    pub fn vertex(&self) -> Option<&Element> {
        self.element(VERTEX_ELEMENT)
    }

    /// Serializes header and payload in `self.encoding`.
    pub fn to_bytes(&self) -> CoreResult<Vec<u8>> {
        let mut out = Vec::new();
        header::write_header(&mut out, self)?;
        for element in &self.elements {
            payload::encode_element(element, self.encoding, &mut out)?;
        }
        Ok(out)
    }

    /// Writes the file atomically: the destination only appears once the
    /// whole file has been written, and is left untouched on failure.
    /// Returns the number of bytes written.
    pub fn save(&self, path: &Path) -> CoreResult<u64> {
        let bytes = self.to_bytes()?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut staged = tempfile::Builder::new()
            .prefix(".splatseq-")
            .suffix(".ply.part")
            .tempfile_in(dir)
            .map_err(|e| write_error(path, e))?;
        staged
            .write_all(&bytes)
            .and_then(|()| staged.flush())
            .map_err(|e| write_error(path, e))?;
        staged.persist(path).map_err(|e| write_error(path, e.error))?;

        Ok(bytes.len() as u64)
    }
}

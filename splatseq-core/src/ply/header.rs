//! PLY header parsing and writing.

use super::{Element, PlyEncoding, PlyFile, Property, PropertyKind, ScalarType};
use crate::error::{CoreError, CoreResult};
use std::io::Write;

/// Element declaration read from a header, before its records are decoded.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct DeclaredElement {
    pub name: String,
    pub count: usize,
    pub properties: Vec<Property>,
}

#[derive(Debug, Clone, PartialEq)]
pub(super) struct Header {
    pub encoding: PlyEncoding,
    pub comments: Vec<String>,
    pub obj_info: Vec<String>,
    pub elements: Vec<DeclaredElement>,
}

fn malformed(line_no: usize, message: impl std::fmt::Display) -> CoreError {
    CoreError::PlyFormat(format!("header line {line_no}: {message}"))
}

/// Parses the header at the start of `bytes`.
///
/// Returns the header and the offset of the first payload byte.
pub(super) fn parse_header(bytes: &[u8]) -> CoreResult<(Header, usize)> {
    let mut offset = 0;
    let mut line_no = 0;
    let mut encoding = None;
    let mut comments = Vec::new();
    let mut obj_info = Vec::new();
    let mut elements: Vec<DeclaredElement> = Vec::new();

    loop {
        let Some(newline) = bytes[offset..].iter().position(|b| *b == b'\n') else {
            return Err(CoreError::PlyFormat(
                "header is not terminated by end_header".to_string(),
            ));
        };
        let raw = &bytes[offset..offset + newline];
        offset += newline + 1;
        line_no += 1;

        let line = std::str::from_utf8(raw)
            .map_err(|_| malformed(line_no, "header is not valid text"))?
            .trim_end_matches('\r');

        if line_no == 1 {
            if line.trim() != "ply" {
                return Err(CoreError::PlyFormat("missing 'ply' magic line".to_string()));
            }
            continue;
        }

        let (keyword, rest) = line
            .trim_start()
            .split_once(' ')
            .unwrap_or((line.trim(), ""));
        match keyword {
            "format" => {
                let mut parts = rest.split_whitespace();
                let name = parts
                    .next()
                    .ok_or_else(|| malformed(line_no, "format without encoding"))?;
                encoding = Some(name.parse::<PlyEncoding>()?);
            }
            "comment" => comments.push(rest.to_string()),
            "obj_info" => obj_info.push(rest.to_string()),
            "element" => {
                let parts: Vec<&str> = rest.split_whitespace().collect();
                let [name, count] = parts[..] else {
                    return Err(malformed(line_no, "expected 'element <name> <count>'"));
                };
                let count = count
                    .parse::<usize>()
                    .map_err(|_| malformed(line_no, format!("invalid element count '{count}'")))?;
                elements.push(DeclaredElement {
                    name: name.to_string(),
                    count,
                    properties: Vec::new(),
                });
            }
            "property" => {
                let current = elements
                    .last_mut()
                    .ok_or_else(|| malformed(line_no, "property before any element"))?;
                current.properties.push(parse_property(line_no, rest)?);
            }
            "end_header" => break,
            "" => {}
            other => return Err(malformed(line_no, format!("unknown keyword '{other}'"))),
        }
    }

    let encoding =
        encoding.ok_or_else(|| CoreError::PlyFormat("header has no format line".to_string()))?;
    Ok((
        Header {
            encoding,
            comments,
            obj_info,
            elements,
        },
        offset,
    ))
}

fn parse_property(line_no: usize, rest: &str) -> CoreResult<Property> {
    let parts: Vec<&str> = rest.split_whitespace().collect();
    let scalar = |name: &str| {
        ScalarType::parse(name).ok_or_else(|| malformed(line_no, format!("unknown type '{name}'")))
    };
    match parts[..] {
        ["list", count, item, name] => Ok(Property {
            name: name.to_string(),
            kind: PropertyKind::List {
                count: scalar(count)?,
                item: scalar(item)?,
            },
        }),
        [ty, name] => Ok(Property::scalar(name, scalar(ty)?)),
        _ => Err(malformed(line_no, "expected 'property <type> <name>'")),
    }
}

/// Writes the header of `file`, including the trailing `end_header` line.
pub(super) fn write_header<W: Write>(out: &mut W, file: &PlyFile) -> CoreResult<()> {
    writeln!(out, "ply")?;
    writeln!(out, "format {} 1.0", file.encoding)?;
    for comment in &file.comments {
        writeln!(out, "comment {comment}")?;
    }
    for info in &file.obj_info {
        writeln!(out, "obj_info {info}")?;
    }
    for element in &file.elements {
        write_element_header(out, element)?;
    }
    writeln!(out, "end_header")?;
    Ok(())
}

fn write_element_header<W: Write>(out: &mut W, element: &Element) -> CoreResult<()> {
    writeln!(out, "element {} {}", element.name, element.count())?;
    for property in &element.properties {
        match property.kind {
            PropertyKind::Scalar(ty) => writeln!(out, "property {} {}", ty.name(), property.name)?,
            PropertyKind::List { count, item } => writeln!(
                out,
                "property list {} {} {}",
                count.name(),
                item.name(),
                property.name
            )?,
        }
    }
    Ok(())
}

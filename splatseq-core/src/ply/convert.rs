//! Extended-to-standard PLY downconversion.

use super::{PlyEncoding, PlyFile, VERTEX_ELEMENT};
use crate::error::{CoreError, CoreResult};
use log::{debug, info};
use std::path::{Path, PathBuf};

/// Outcome of one [`downconvert`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionSummary {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub vertex_count: usize,
    pub bytes_written: u64,
    /// Names of the elements that were left out.
    pub dropped_elements: Vec<String>,
}

/// The vertex element of `file` alone, re-targeted to `encoding`.
///
/// Property names, types, order and values are preserved exactly. Comments
/// and `obj_info` lines are not carried over. Returns `None` when `file`
/// has no vertex element.
pub fn standard_subset(file: &PlyFile, encoding: PlyEncoding) -> Option<PlyFile> {
    let vertex = file.vertex()?.clone();
    let mut standard = PlyFile::new(encoding);
    standard.elements.push(vertex);
    Some(standard)
}

/// Writes the vertex-only form of the extended file at `source` to
/// `destination`.
///
/// The destination is replaced atomically and left untouched on failure.
pub fn downconvert(
    source: &Path,
    destination: &Path,
    encoding: PlyEncoding,
) -> CoreResult<ConversionSummary> {
    let extended = PlyFile::read(source)?;
    let standard = standard_subset(&extended, encoding)
        .ok_or_else(|| CoreError::MissingVertexElement(source.to_path_buf()))?;

    let dropped_elements: Vec<String> = extended
        .elements
        .iter()
        .filter(|e| e.name != VERTEX_ELEMENT)
        .map(|e| e.name.clone())
        .collect();
    let vertex_count = standard.vertex().map_or(0, |v| v.count());

    debug!(
        "Downconverting {} -> {} (dropping {:?})",
        source.display(),
        destination.display(),
        dropped_elements
    );
    let bytes_written = standard.save(destination)?;
    info!(
        "Wrote {} ({} vertices, {} bytes)",
        destination.display(),
        vertex_count,
        bytes_written
    );

    Ok(ConversionSummary {
        source: source.to_path_buf(),
        destination: destination.to_path_buf(),
        vertex_count,
        bytes_written,
        dropped_elements,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ply::{Element, Property, ScalarType};
    use tempfile::tempdir;

    fn extended() -> PlyFile {
        let mut vertex = Element::new(
            VERTEX_ELEMENT,
            vec![
                Property::scalar("x", ScalarType::Float),
                Property::scalar("opacity", ScalarType::Float),
            ],
        );
        vertex.push_record(&[1.25, -0.3]).unwrap();
        vertex.push_record(&[f64::from(f32::MIN_POSITIVE), 7.0]).unwrap();
        let mut version = Element::new("version", vec![Property::scalar("version", ScalarType::UChar)]);
        for v in [1.0, 5.0, 0.0] {
            version.push_record(&[v]).unwrap();
        }
        let mut file = PlyFile::new(PlyEncoding::BinaryLittleEndian);
        file.comments.push("extended".into());
        file.elements = vec![vertex, version];
        file
    }

    #[test]
    fn keeps_vertex_data_bit_identical() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("frame.ply");
        let dst = dir.path().join("frame_standard.ply");
        extended().save(&src).unwrap();

        let summary = downconvert(&src, &dst, PlyEncoding::BinaryLittleEndian).unwrap();
        assert_eq!(summary.vertex_count, 2);
        assert_eq!(summary.dropped_elements, vec!["version".to_string()]);
        assert_eq!(summary.bytes_written, std::fs::metadata(&dst).unwrap().len());

        let standard = PlyFile::read(&dst).unwrap();
        assert_eq!(standard.elements.len(), 1);
        assert!(standard.comments.is_empty());
        assert_eq!(standard.vertex(), extended().vertex());
    }

    #[test]
    fn ascii_output_preserves_values() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("frame.ply");
        let dst = dir.path().join("frame_standard.ply");
        extended().save(&src).unwrap();

        downconvert(&src, &dst, PlyEncoding::Ascii).unwrap();
        let standard = PlyFile::read(&dst).unwrap();
        assert_eq!(standard.encoding, PlyEncoding::Ascii);
        assert_eq!(standard.vertex(), extended().vertex());
    }

    #[test]
    fn converting_a_standard_file_is_idempotent() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("frame.ply");
        let once = dir.path().join("once.ply");
        let twice = dir.path().join("twice.ply");
        extended().save(&src).unwrap();

        downconvert(&src, &once, PlyEncoding::BinaryLittleEndian).unwrap();
        let summary = downconvert(&once, &twice, PlyEncoding::BinaryLittleEndian).unwrap();
        assert!(summary.dropped_elements.is_empty());
        assert_eq!(std::fs::read(&once).unwrap(), std::fs::read(&twice).unwrap());
    }

    #[test]
    fn missing_vertex_element_leaves_no_output() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("no_vertex.ply");
        let dst = dir.path().join("out.ply");
        let mut file = extended();
        file.elements.remove(0);
        file.save(&src).unwrap();

        assert!(matches!(
            downconvert(&src, &dst, PlyEncoding::BinaryLittleEndian),
            Err(CoreError::MissingVertexElement(_))
        ));
        assert!(!dst.exists());
    }

    #[test]
    fn missing_source_is_not_found() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            downconvert(
                &dir.path().join("absent.ply"),
                &dir.path().join("out.ply"),
                PlyEncoding::Ascii
            ),
            Err(CoreError::NotFound(_))
        ));
    }
}

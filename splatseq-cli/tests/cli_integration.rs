use assert_cmd::Command;
use predicates::str::contains;
use splatseq_core::PlyEncoding;
use splatseq_core::ply::{Element, PlyFile, Property, ScalarType};
use std::error::Error;
use std::path::Path;
use tempfile::tempdir;

fn splatseq_cmd() -> Command {
    Command::cargo_bin("splatseq").expect("Failed to find splatseq binary")
}

fn convert_cmd() -> Command {
    Command::cargo_bin("splat-convert").expect("Failed to find splat-convert binary")
}

/// Writes a two-vertex extended file with one auxiliary element.
fn write_extended(path: &Path) -> Result<(), Box<dyn Error>> {
    let mut file = PlyFile::new(PlyEncoding::BinaryLittleEndian);
    let mut vertex = Element::new(
        "vertex",
        vec![
            Property::scalar("x", ScalarType::Float),
            Property::scalar("y", ScalarType::Float),
            Property::scalar("z", ScalarType::Float),
        ],
    );
    vertex.push_record(&[0.0, 1.0, 2.0])?;
    vertex.push_record(&[3.0, 4.0, 5.0])?;
    let mut version = Element::new(
        "version",
        vec![Property::scalar("version", ScalarType::UChar)],
    );
    for part in [1.0, 5.0, 0.0] {
        version.push_record(&[part])?;
    }
    file.elements.push(vertex);
    file.elements.push(version);
    file.save(path)?;
    Ok(())
}

#[test]
fn splat_convert_writes_standard_file() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("frame_000000.ply");
    write_extended(&input)?;

    convert_cmd()
        .arg(&input)
        .assert()
        .success()
        .stdout(contains("Number of Gaussian elements: 2"));

    let converted = PlyFile::read(&dir.path().join("frame_000000_standard.ply"))?;
    assert_eq!(converted.elements.len(), 1);
    assert_eq!(converted.vertex().map(|v| v.count()), Some(2));
    Ok(())
}

#[test]
fn splat_convert_honors_explicit_output() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("scene.ply");
    let output = dir.path().join("nested_name.ply");
    write_extended(&input)?;

    convert_cmd().arg(&input).arg(&output).assert().success();
    assert!(output.exists());
    assert!(!dir.path().join("scene_standard.ply").exists());
    Ok(())
}

#[test]
fn splat_convert_missing_input_fails() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    convert_cmd()
        .arg(dir.path().join("absent.ply"))
        .assert()
        .failure()
        .stderr(contains("Path not found"));
    Ok(())
}

#[test]
fn splat_convert_without_vertex_element_fails() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("no_vertex.ply");
    let mut file = PlyFile::new(PlyEncoding::Ascii);
    let mut frame = Element::new("frame", vec![Property::scalar("frame", ScalarType::Int)]);
    frame.push_record(&[1.0])?;
    file.elements.push(frame);
    file.save(&input)?;

    convert_cmd()
        .arg(&input)
        .assert()
        .failure()
        .stderr(contains("No 'vertex' element"));
    assert!(!dir.path().join("no_vertex_standard.ply").exists());
    Ok(())
}

#[test]
fn splat_convert_without_arguments_prints_usage() {
    convert_cmd().assert().failure().stderr(contains("Usage"));
}

#[test]
fn splat_convert_help_is_not_an_input_path() {
    convert_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("Usage"))
        .stdout(contains("[OUTPUT]"));
}

#[test]
fn splat_convert_rejects_extra_arguments() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("scene.ply");
    write_extended(&input)?;
    convert_cmd()
        .arg(&input)
        .arg(dir.path().join("a.ply"))
        .arg(dir.path().join("b.ply"))
        .assert()
        .failure();
    assert!(!dir.path().join("a.ply").exists());
    Ok(())
}

#[test]
fn convert_subcommand_writes_ascii() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("scene.ply");
    let output = dir.path().join("scene_ascii.ply");
    write_extended(&input)?;

    splatseq_cmd()
        .arg("convert")
        .arg(&input)
        .arg(&output)
        .arg("--ascii")
        .assert()
        .success();

    let bytes = std::fs::read(&output)?;
    let text = String::from_utf8(bytes)?;
    assert!(text.starts_with("ply\nformat ascii 1.0\n"));
    assert!(!text.contains("element version"));
    Ok(())
}

#[test]
fn settings_set_then_show() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let settings = dir.path().join("settings.json");

    splatseq_cmd()
        .args(["settings", "--settings"])
        .arg(&settings)
        .args(["set", "processing_resolution", "768"])
        .assert()
        .success()
        .stdout(contains("processing_resolution = 768"));

    splatseq_cmd()
        .args(["settings", "--settings"])
        .arg(&settings)
        .arg("show")
        .assert()
        .success()
        .stdout(contains("\"processing_resolution\": 768"));
    Ok(())
}

#[test]
fn settings_set_rejects_unknown_key() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    splatseq_cmd()
        .args(["settings", "--settings"])
        .arg(dir.path().join("settings.json"))
        .args(["set", "not_a_setting", "1"])
        .assert()
        .failure();
    Ok(())
}

#[test]
fn info_on_missing_video_fails() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    splatseq_cmd()
        .arg("info")
        .arg(dir.path().join("missing.mp4"))
        .assert()
        .failure()
        .stderr(contains("Path not found"));
    Ok(())
}

#[test]
fn generate_on_missing_video_fails() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    splatseq_cmd()
        .arg("generate")
        .arg(dir.path().join("missing.mp4"))
        .arg("-o")
        .arg(dir.path().join("out"))
        .args(["--no-log", "--settings"])
        .arg(dir.path().join("settings.json"))
        .assert()
        .failure();
    Ok(())
}

#[test]
fn generate_rejects_focal_with_fov() {
    splatseq_cmd()
        .args(["generate", "clip.mp4", "--focal", "100", "--fov", "60"])
        .assert()
        .failure()
        .stderr(contains("cannot be used with"));
}

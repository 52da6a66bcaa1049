use std::fs;

use bioimageio_core::RdfError;
use bioimageio_core::config::{CacheConfig, Config};
use bioimageio_core::package::PackageOptions;
use bioimageio_core::pipeline::Pipeline;
use bioimageio_core::rdf::DescriptionParser;
use bioimageio_core::source::{BaseLocation, SourceRef};

use crate::common::{DescriptionFixture, zip_members, zip_text};

fn pipeline() -> Pipeline {
    let config = Config {
        cache: CacheConfig {
            enabled: false,
            dir: None,
        },
        ..Config::default()
    };
    Pipeline::from_config(&config).unwrap()
}

const MINIMAL: &str = r#"format_version: "0.4.0"
type: model
name: minimal
inputs:
  - name: raw
    axes: bcyx
    data_type: float32
    shape: [1, 1, 32, 32]
outputs:
  - name: out
    axes: bcyx
    data_type: float32
    shape: [1, 1, 32, 32]
weights:
  torchscript:
    source: weights.pt
"#;

#[test]
fn minimal_package_holds_description_and_weights() {
    let fixture = DescriptionFixture::new();
    fixture.write_description(MINIMAL);
    fixture.create_file("weights.pt", b"torchscript weights");

    let pipeline = pipeline();
    let rd = pipeline
        .read_description(&SourceRef::from(fixture.path()))
        .unwrap();

    let target = fixture.path().join("minimal.zip");
    let manifest = pipeline.write_package(&rd, &target).unwrap();

    assert_eq!(
        manifest.archive_paths().collect::<Vec<_>>(),
        ["rdf.yaml", "weights/weights.pt"]
    );
    assert_eq!(zip_members(&target), ["rdf.yaml", "weights/weights.pt"]);
    let weights = manifest.find("weights/weights.pt").unwrap();
    assert_eq!(weights.size, 19);
    assert!(zip_text(&target, "rdf.yaml").contains("source: weights/weights.pt"));
}

#[test]
fn requiring_validity_refuses_incomplete_descriptions() {
    let fixture = DescriptionFixture::new();
    fixture.write_description(MINIMAL);
    fixture.create_file("weights.pt", b"torchscript weights");

    let pipeline = pipeline();
    let rd = pipeline
        .read_description(&SourceRef::from(fixture.path()))
        .unwrap();
    let target = fixture.path().join("minimal.zip");
    let err = pipeline
        .write_package_with(&rd, &target, PackageOptions::new().require_valid(true))
        .unwrap_err();
    assert!(matches!(err, RdfError::ValidationFailed { .. }));
    assert!(!target.exists());
}

#[test]
fn package_reads_back_as_the_same_description() {
    let fixture = DescriptionFixture::model_v05();
    let pipeline = pipeline();
    let rd = pipeline.load_description(&SourceRef::from(fixture.path())).unwrap();

    let target = fixture.path().join("unet.zip");
    pipeline.write_package(&rd, &target).unwrap();

    let (packaged, report) = pipeline
        .read_description_and_validate(&SourceRef::from(target.as_path()))
        .unwrap();
    assert!(report.passed, "{:?}", report.findings);
    assert!(matches!(packaged.root, BaseLocation::Archive(_)));
    assert_eq!(packaged.name, rd.name);
    assert_eq!(packaged.inputs.value().unwrap().len(), 1);

    // every reference of the packaged description opens from inside the archive
    for site in packaged.file_references() {
        pipeline.resolver().open(&site.reference, &packaged.root).unwrap();
    }
}

#[test]
fn every_reference_is_packaged() {
    let fixture = DescriptionFixture::model_v04();
    let pipeline = pipeline();
    let rd = pipeline.load_description(&SourceRef::from(fixture.path())).unwrap();
    let target = fixture.path().join("unet.zip");
    let manifest = pipeline.write_package(&rd, &target).unwrap();

    let members = zip_members(&target);
    let packaged = DescriptionParser::default()
        .parse(
            zip_text(&target, "rdf.yaml").as_bytes(),
            BaseLocation::Directory(fixture.path().to_path_buf()),
            "rdf.yaml",
        )
        .unwrap();
    for site in packaged.file_references() {
        let path = site.reference.to_string();
        assert!(members.contains(&path), "{path} not in {members:?}");
    }
    assert_eq!(manifest.entries.len(), members.len());
}

#[test]
fn failed_packaging_leaves_nothing_behind() {
    let fixture = DescriptionFixture::model_v04();
    fixture.remove_file("weights.pt");
    let pipeline = pipeline();
    let rd = pipeline.read_description(&SourceRef::from(fixture.path())).unwrap();

    let target = fixture.path().join("unet.zip");
    let err = pipeline.write_package(&rd, &target).unwrap_err();
    assert!(matches!(err, RdfError::MissingReferencedFiles(_)));
    assert!(!target.exists());

    let leftovers: Vec<_> = fs::read_dir(fixture.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty(), "{leftovers:?}");
}

#[test]
fn packages_are_byte_identical_across_runs() {
    let fixture = DescriptionFixture::model_v05();
    let pipeline = pipeline();
    let rd = pipeline.load_description(&SourceRef::from(fixture.path())).unwrap();

    let first = fixture.path().join("first.zip");
    let second = fixture.path().join("second.zip");
    pipeline.write_package(&rd, &first).unwrap();
    pipeline.write_package(&rd, &second).unwrap();
    assert_eq!(fs::read(first).unwrap(), fs::read(second).unwrap());
}

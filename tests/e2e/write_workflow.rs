use std::fs;

use bioimageio_core::source::SourceRef;
use bioimageio_core::{RdfError, read_description, write_description};

use crate::common::DescriptionFixture;

#[test]
fn written_descriptions_read_back_equal() {
    let fixture = DescriptionFixture::model_v05();
    let rd = read_description(fixture.path()).unwrap();

    let out = tempfile::tempdir().unwrap();
    let written = write_description(&rd, out.path()).unwrap();
    let back = read_description(written.as_path()).unwrap();
    assert_eq!(back.name, rd.name);
    assert_eq!(back.format_version, rd.format_version);
    assert_eq!(back.inputs.value().unwrap().len(), 1);

    // references were rewritten, so the files still open from the new place
    let text = fs::read_to_string(&written).unwrap();
    assert!(!text.contains("source: weights.pt"), "{text}");
    for site in back.file_references() {
        let located = bioimageio_core::source::locate(&site.reference, &back.root).unwrap();
        assert!(located.to_string().ends_with(&site.reference.file_name().unwrap()));
        let bioimageio_core::source::Located::Local(path) = located else {
            panic!("expected a local file");
        };
        assert!(path.exists(), "{}", path.display());
    }
}

#[test]
fn writing_in_place_keeps_references() {
    let fixture = DescriptionFixture::model_v04();
    let rd = read_description(fixture.path()).unwrap();
    let written = write_description(&rd, fixture.path()).unwrap();

    let text = fs::read_to_string(written).unwrap();
    assert!(text.contains("source: weights.pt"), "{text}");
    assert!(text.contains("- test_input.npy"), "{text}");
}

#[test]
fn unknown_fields_survive_a_rewrite() {
    let fixture = DescriptionFixture::new();
    fixture.write_description(
        "format_version: 0.5.3\ntype: dataset\nname: cells\nx_lab_notes: keep me\nbadges: []\n",
    );
    let rd = read_description(SourceRef::from(fixture.path())).unwrap();
    let written = write_description(&rd, fixture.path()).unwrap();
    let text = fs::read_to_string(written).unwrap();
    assert!(text.contains("x_lab_notes: keep me"));
    assert!(text.contains("badges: []"));
}

#[test]
fn missing_target_parent_is_unwritable() {
    let fixture = DescriptionFixture::model_v04();
    let rd = read_description(fixture.path()).unwrap();
    let err = write_description(&rd, fixture.path().join("no/such/dir/rdf.yaml")).unwrap_err();
    assert!(matches!(err, RdfError::UnwritableTarget { .. }));
}

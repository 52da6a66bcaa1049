//! Property tests over parsing, writing and validation.

mod determinism_tests;
mod roundtrip_tests;
mod version_tests;

use bioimageio_core::rdf::{DescriptionParser, ResourceDescription};
use bioimageio_core::source::BaseLocation;
use proptest::prelude::*;
use serde_yaml::{Mapping, Value};

pub fn parse(text: &str) -> bioimageio_core::Result<ResourceDescription> {
    DescriptionParser::default().parse(
        text.as_bytes(),
        BaseLocation::Directory("/models/prop".into()),
        "<prop>",
    )
}

pub fn arb_format_version() -> impl Strategy<Value = String> {
    prop_oneof![
        (0u64..=10).prop_map(|patch| format!("0.4.{patch}")),
        (0u64..=3).prop_map(|patch| format!("0.5.{patch}")),
    ]
}

fn arb_tensor(v05: bool) -> impl Strategy<Value = Value> {
    (
        "[a-z][a-z0-9_]{0,8}",
        prop::sample::subsequence(vec!['b', 'c', 'z', 'y', 'x'], 2..=5),
        prop::collection::vec(1i64..512, 2..=5),
    )
        .prop_map(move |(name, letters, shape)| {
            let mut tensor = Mapping::new();
            if v05 {
                tensor.insert("id".into(), name.into());
                let axes: Vec<Value> = letters
                    .iter()
                    .map(|letter| {
                        let mut axis = Mapping::new();
                        let kind = match *letter {
                            'b' => "batch",
                            'c' => "channel",
                            _ => "space",
                        };
                        axis.insert("type".into(), kind.into());
                        if kind == "space" {
                            axis.insert("id".into(), letter.to_string().into());
                        }
                        Value::Mapping(axis)
                    })
                    .collect();
                tensor.insert("axes".into(), Value::Sequence(axes));
            } else {
                tensor.insert("name".into(), name.into());
                tensor.insert("axes".into(), letters.iter().collect::<String>().into());
                tensor.insert(
                    "shape".into(),
                    Value::Sequence(shape.into_iter().map(Value::from).collect()),
                );
            }
            tensor.insert("data_type".into(), "float32".into());
            Value::Mapping(tensor)
        })
}

/// Description documents of any resource type, with tensors for models and
/// a few unrecognized keys.
pub fn arb_document() -> impl Strategy<Value = String> {
    (
        arb_format_version(),
        prop::sample::select(vec!["model", "dataset", "application", "notebook"]),
        "[A-Za-z][A-Za-z0-9 _.-]{0,30}",
        prop::collection::vec("[a-z]{1,10}", 0..4),
        prop::collection::btree_map("x_[a-z]{1,8}", "[a-z ]{0,12}", 0..3),
        prop::collection::vec("[a-z]{1,8}\\.png", 0..3),
        any::<bool>(),
    )
        .prop_flat_map(|(version, kind, name, tags, extra, covers, with_tensors)| {
            let v05 = version.starts_with("0.5");
            (
                Just((version, kind, name, tags, extra, covers, with_tensors)),
                prop::collection::vec(arb_tensor(v05), 0..3),
                prop::collection::vec(arb_tensor(v05), 0..3),
            )
        })
        .prop_map(|((version, kind, name, tags, extra, covers, with_tensors), inputs, outputs)| {
            let mut doc = Mapping::new();
            doc.insert("format_version".into(), version.into());
            doc.insert("type".into(), kind.into());
            doc.insert("name".into(), name.into());
            if !tags.is_empty() {
                doc.insert(
                    "tags".into(),
                    Value::Sequence(tags.into_iter().map(Value::from).collect()),
                );
            }
            if !covers.is_empty() {
                doc.insert(
                    "covers".into(),
                    Value::Sequence(covers.into_iter().map(Value::from).collect()),
                );
            }
            if with_tensors {
                doc.insert("inputs".into(), Value::Sequence(inputs));
                doc.insert("outputs".into(), Value::Sequence(outputs));
            }
            for (key, value) in extra {
                doc.insert(key.into(), value.into());
            }
            serde_yaml::to_string(&Value::Mapping(doc)).unwrap()
        })
}

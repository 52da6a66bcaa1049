use proptest::prelude::*;

use bioimageio_core::writer::to_yaml_string;

use crate::{arb_document, parse};

proptest! {
    #[test]
    fn test_write_then_read_is_identity(text in arb_document()) {
        let original = parse(&text).unwrap();
        let written = to_yaml_string(&original).unwrap();
        let reread = parse(&written).unwrap();
        prop_assert_eq!(&reread, &original);
    }

    #[test]
    fn test_canonical_text_is_a_fixed_point(text in arb_document()) {
        let first = to_yaml_string(&parse(&text).unwrap()).unwrap();
        let second = to_yaml_string(&parse(&first).unwrap()).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn test_canonical_text_starts_with_format_version(text in arb_document()) {
        let written = to_yaml_string(&parse(&text).unwrap()).unwrap();
        prop_assert!(written.starts_with("format_version: "));
    }
}

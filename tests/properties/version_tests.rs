use proptest::prelude::*;

use bioimageio_core::RdfError;
use bioimageio_core::max_supported_format_version;

use crate::parse;

fn document(version: &str) -> String {
    format!("format_version: '{version}'\ntype: dataset\nname: v\n")
}

proptest! {
    #[test]
    fn test_versions_above_the_ceiling_are_rejected(
        minor in 5u64..40,
        patch in 0u64..40,
    ) {
        let ceiling = max_supported_format_version();
        let version = semver::Version::new(0, minor, patch);
        prop_assume!(version > ceiling);
        let err = parse(&document(&version.to_string())).unwrap_err();
        let is_unsupported = matches!(err, RdfError::UnsupportedVersion { .. });
        prop_assert!(is_unsupported);
    }

    #[test]
    fn test_versions_in_the_window_are_accepted(text in crate::arb_format_version()) {
        let rd = parse(&document(&text)).unwrap();
        prop_assert_eq!(rd.format_version.to_string(), text);
    }

    #[test]
    fn test_later_majors_are_rejected(major in 1u64..10, minor in 0u64..10) {
        let err = parse(&document(&format!("{major}.{minor}.0"))).unwrap_err();
        let is_unsupported = matches!(err, RdfError::UnsupportedVersion { .. });
        prop_assert!(is_unsupported);
    }
}

use proptest::prelude::*;

use bioimageio_core::lint::{ValidationConfig, ValidationEngine};

use crate::{arb_document, parse};

proptest! {
    #[test]
    fn test_validation_is_deterministic(text in arb_document()) {
        let rd = parse(&text).unwrap();
        let first = ValidationEngine::standard(ValidationConfig::new()).validate(&rd);
        let second = ValidationEngine::standard(ValidationConfig::new()).validate(&rd);
        prop_assert_eq!(&first.findings, &second.findings);
        prop_assert_eq!(first.passed, second.passed);
    }

    #[test]
    fn test_passed_means_no_errors(text in arb_document()) {
        let report = ValidationEngine::standard(ValidationConfig::new()).validate(&parse(&text).unwrap());
        prop_assert_eq!(report.passed, report.error_count() == 0);
    }

    #[test]
    fn test_strict_never_passes_more(text in arb_document()) {
        let rd = parse(&text).unwrap();
        let lenient = ValidationEngine::standard(ValidationConfig::new()).validate(&rd);
        let strict = ValidationEngine::standard(ValidationConfig::new().strict()).validate(&rd);
        prop_assert!(!strict.passed || lenient.passed);
        prop_assert_eq!(strict.total_count(), lenient.total_count());
    }
}

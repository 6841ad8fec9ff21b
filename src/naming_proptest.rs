//! Property-based tests for the artifact naming grammar.

use crate::naming::{encode, fragment, ArtifactIdentity, NamingCodec, GROUP_TOKEN};
use proptest::prelude::*;

fn group_id() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z][a-z0-9]{0,7}", 1..4).prop_map(|segments| segments.join("."))
}

fn artifact_id() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,11}"
}

fn classifier() -> impl Strategy<Value = Option<String>> {
    prop::option::of("[a-z][a-z0-9]{0,7}")
}

proptest! {
    /// Property: every encoded identity decodes to itself, classifier included
    #[test]
    fn encode_then_parse_preserves_identity(
        group in group_id(),
        artifact in artifact_id(),
        classifier in classifier(),
        extension in "(zip|jar|tgz|whl)",
    ) {
        let codec = NamingCodec::new().unwrap();
        let identity = ArtifactIdentity::new(&group, &artifact, classifier.as_deref());

        let parsed = codec.parse_name(&encode(&identity, &extension)).unwrap();
        prop_assert_eq!(&parsed.identity.group_id, &group);
        prop_assert_eq!(&parsed.identity.artifact_id, &artifact);
        prop_assert_eq!(&parsed.identity.classifier, &classifier);
        prop_assert_eq!(parsed.extension, extension);
        prop_assert!(parsed.marker.is_empty());
    }

    /// Property: a leading marker does not change the decoded identity
    #[test]
    fn marker_prefix_is_ignored(
        marker in "[A-Za-z0-9]{1,8}",
        group in group_id(),
        artifact in artifact_id(),
        classifier in classifier(),
    ) {
        let codec = NamingCodec::new().unwrap();
        let identity = ArtifactIdentity::new(&group, &artifact, classifier.as_deref());
        let file_name = format!("{}{}.zip", marker, fragment(&identity));

        let parsed = codec.parse_name(&file_name).unwrap();
        prop_assert_eq!(&parsed.marker, &marker);
        prop_assert_eq!(&parsed.identity.classifier, &classifier);
        prop_assert_eq!(parsed.identity.key(), identity.key());
    }

    /// Property: names without the group token never decode
    #[test]
    fn names_without_group_token_are_rejected(name in "[A-Za-z0-9_.-]{0,40}") {
        prop_assume!(!name.contains(GROUP_TOKEN));
        let codec = NamingCodec::new().unwrap();
        prop_assert!(codec.parse(&name).is_none());
        prop_assert!(!codec.matches(&name));
    }

    /// Property: identities differing only by classifier compare equal
    #[test]
    fn classifier_does_not_affect_identity_equality(
        group in group_id(),
        artifact in artifact_id(),
        left in classifier(),
        right in classifier(),
    ) {
        let a = ArtifactIdentity::new(&group, &artifact, left.as_deref());
        let b = ArtifactIdentity::new(&group, &artifact, right.as_deref());
        prop_assert_eq!(a, b);
    }
}

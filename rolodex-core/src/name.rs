//! Display-name composition.

/// Display name used when a contact carries no name parts and no nickname.
pub const UNNAMED_CONTACT: &str = "Unnamed Contact";

/// Compose the display name from the structured name parts.
///
/// Parts are joined in the order prefix, given, middle, family, suffix with a
/// single space; blank parts are skipped. Falls back to the nickname and then
/// to [`UNNAMED_CONTACT`].
pub fn compose_full_name(
    prefix: Option<&str>,
    given: Option<&str>,
    middle: Option<&str>,
    family: Option<&str>,
    suffix: Option<&str>,
    nickname: Option<&str>,
) -> String {
    let joined = [prefix, given, middle, family, suffix]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    if !joined.is_empty() {
        return joined;
    }

    match nickname.map(str::trim) {
        Some(nick) if !nick.is_empty() => nick.to_string(),
        _ => UNNAMED_CONTACT.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_full_name_all_parts() {
        let name = compose_full_name(
            Some("Dr."),
            Some("John"),
            None,
            Some("Doe"),
            Some("III"),
            Some("Johnny"),
        );
        assert_eq!(name, "Dr. John Doe III");
    }

    #[test]
    fn test_full_name_falls_back_to_nickname() {
        let name = compose_full_name(None, Some(""), None, Some("  "), None, Some("Jay"));
        assert_eq!(name, "Jay");
    }

    #[test]
    fn test_full_name_unnamed() {
        assert_eq!(
            compose_full_name(None, None, None, None, None, None),
            UNNAMED_CONTACT
        );
        assert_eq!(
            compose_full_name(Some(""), None, None, None, None, Some(" ")),
            UNNAMED_CONTACT
        );
    }

    #[test]
    fn test_full_name_middle_name_included() {
        let name = compose_full_name(None, Some("Ada"), Some("King"), Some("Lovelace"), None, None);
        assert_eq!(name, "Ada King Lovelace");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// The composed name never has leading, trailing, or doubled spaces.
        #[test]
        fn prop_full_name_is_normalized(
            prefix in proptest::option::of("[A-Za-z. ]{0,6}"),
            given in proptest::option::of("[A-Za-z ]{0,8}"),
            family in proptest::option::of("[A-Za-z ]{0,8}"),
            nickname in proptest::option::of("[A-Za-z]{0,5}"),
        ) {
            let name = compose_full_name(
                prefix.as_deref(),
                given.as_deref(),
                None,
                family.as_deref(),
                None,
                nickname.as_deref(),
            );
            prop_assert!(!name.is_empty());
            prop_assert_eq!(name.trim(), name.as_str());
        }
    }
}

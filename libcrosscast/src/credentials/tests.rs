//! Tests for credential resolution

use super::*;

const MESSAGING: &[SchemeSpec] = &[
    SchemeSpec::new("bot", &["BOT_TOKEN", "CHANNEL_ID"]),
    SchemeSpec::new("user_session", &["API_ID", "API_HASH", "PHONE", "CHAT"])
        .with_numeric(&["API_ID"]),
];

const MICROBLOG: &[SchemeSpec] = &[
    SchemeSpec::new(
        "oauth2",
        &["CLIENT_ID", "CLIENT_SECRET", "ACCESS_TOKEN", "ACCESS_SECRET"],
    )
    .distinguished_by(&["CLIENT_ID", "CLIENT_SECRET"]),
    SchemeSpec::new(
        "oauth1",
        &["API_KEY", "API_SECRET", "ACCESS_TOKEN", "ACCESS_SECRET"],
    )
    .distinguished_by(&["API_KEY", "API_SECRET"]),
    SchemeSpec::new("bearer", &["BEARER"]),
];

fn resolver(schemes: &'static [SchemeSpec], pairs: &[(&str, &str)]) -> CredentialResolver {
    CredentialResolver::new(PlatformId::Twitter, schemes, CredentialSet::from_pairs(pairs))
}

mod credential_set {
    use super::*;

    #[test]
    fn test_resolve_records_missing_keys_as_empty() {
        let set = CredentialSet::resolve(&["PRESENT", "ABSENT"], |key| {
            (key == "PRESENT").then(|| "value".to_string())
        });

        assert_eq!(set.get("PRESENT"), "value");
        assert_eq!(set.get("ABSENT"), "");
        assert!(!set.is_present("ABSENT"));
        assert_eq!(set.get("NEVER_ASKED"), "");
    }

    #[test]
    fn test_whitespace_values_count_as_missing() {
        let set = CredentialSet::resolve(&["TOKEN"], |_| Some("   \n".to_string()));
        assert!(!set.is_present("TOKEN"));
    }

    #[test]
    fn test_values_are_trimmed() {
        let set = CredentialSet::from_pairs(&[("TOKEN", "  abc123\n")]);
        assert_eq!(set.get("TOKEN"), "abc123");
    }

    #[test]
    fn test_debug_output_redacts_values() {
        let set = CredentialSet::from_pairs(&[("TOKEN", "super-secret"), ("EMPTY", "")]);
        let debug = format!("{:?}", set);

        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<set>"));
        assert!(debug.contains("<empty>"));
    }

    #[test]
    fn test_present_keys() {
        let set = CredentialSet::from_pairs(&[("A", "1"), ("B", ""), ("C", "3")]);
        let keys: Vec<&str> = set.present_keys().collect();
        assert_eq!(keys, vec!["A", "C"]);
    }
}

mod scheme_detection {
    use super::*;

    #[test]
    fn test_has_scheme_requires_every_field() {
        let r = resolver(MESSAGING, &[("BOT_TOKEN", "123:abc")]);
        assert!(!r.has_scheme("bot"));

        let r = resolver(MESSAGING, &[("BOT_TOKEN", "123:abc"), ("CHANNEL_ID", "@news")]);
        assert!(r.has_scheme("bot"));
        assert!(!r.has_scheme("user_session"));
    }

    #[test]
    fn test_unknown_scheme_name_is_never_available() {
        let r = resolver(MESSAGING, &[("BOT_TOKEN", "t"), ("CHANNEL_ID", "c")]);
        assert!(!r.has_scheme("carrier_pigeon"));
    }

    #[test]
    fn test_active_scheme_follows_priority() {
        let r = resolver(
            MESSAGING,
            &[
                ("BOT_TOKEN", "t"),
                ("CHANNEL_ID", "c"),
                ("API_ID", "12345"),
                ("API_HASH", "h"),
                ("PHONE", "+100"),
                ("CHAT", "@chat"),
            ],
        );

        assert_eq!(r.complete_schemes().len(), 2);
        assert_eq!(r.active_scheme().unwrap().name, "bot");
        assert!(r.validate().is_valid());
    }

    #[test]
    fn test_lower_priority_scheme_used_when_higher_absent() {
        let r = resolver(
            MESSAGING,
            &[
                ("API_ID", "12345"),
                ("API_HASH", "h"),
                ("PHONE", "+100"),
                ("CHAT", "@chat"),
            ],
        );

        assert_eq!(r.active_scheme().unwrap().name, "user_session");
        assert!(r.validate().is_valid());
    }

    #[test]
    fn test_shared_fields_do_not_make_sibling_partial() {
        // Complete oauth1 shares the access pair with oauth2, which is untouched.
        let r = resolver(
            MICROBLOG,
            &[
                ("API_KEY", "k"),
                ("API_SECRET", "s"),
                ("ACCESS_TOKEN", "t"),
                ("ACCESS_SECRET", "ts"),
            ],
        );

        assert!(!MICROBLOG[0].is_partial(r.credentials()));
        assert_eq!(r.active_scheme().unwrap().name, "oauth1");
        assert!(r.validate().is_valid());
    }

    #[test]
    fn test_bearer_only() {
        let r = resolver(MICROBLOG, &[("BEARER", "AAAA")]);
        assert_eq!(r.active_scheme().unwrap().name, "bearer");
        assert!(r.validate().is_valid());
    }
}

mod validation {
    use super::*;

    #[test]
    fn test_nothing_configured_is_an_error() {
        let r = resolver(MESSAGING, &[]);
        let result = r.validate();

        assert!(!result.is_valid());
        assert_eq!(result.errors().len(), 1);
        assert!(result.errors()[0].contains("not configured"));
        assert!(result.errors()[0].contains("BOT_TOKEN"));
        assert!(result.errors()[0].contains("API_HASH"));
    }

    #[test]
    fn test_partial_scheme_reports_each_missing_field() {
        let r = resolver(MESSAGING, &[("API_ID", "12345"), ("PHONE", "+100")]);
        let errors = r.validate().into_errors();

        assert!(errors.iter().any(|e| e.contains("API_HASH is not set")));
        assert!(errors.iter().any(|e| e.contains("CHAT is not set")));
        assert!(!errors.iter().any(|e| e.contains("API_ID is not set")));
        assert!(!errors.iter().any(|e| e.contains("PHONE is not set")));
    }

    #[test]
    fn test_dangling_partial_scheme_fails_even_with_complete_sibling() {
        let r = resolver(
            MICROBLOG,
            &[
                ("CLIENT_ID", "cid"),
                ("API_KEY", "k"),
                ("API_SECRET", "s"),
                ("ACCESS_TOKEN", "t"),
                ("ACCESS_SECRET", "ts"),
            ],
        );

        assert!(r.has_scheme("oauth1"));
        let result = r.validate();
        assert!(!result.is_valid());
        assert_eq!(result.errors().len(), 1);
        assert!(result.errors()[0].contains("oauth2"));
        assert!(result.errors()[0].contains("CLIENT_SECRET is not set"));
    }

    #[test]
    fn test_consumer_pair_without_access_pair_is_partial() {
        let r = resolver(MICROBLOG, &[("CLIENT_ID", "cid"), ("CLIENT_SECRET", "cs")]);
        let errors = r.validate().into_errors();

        assert!(errors.iter().any(|e| e.contains("not configured")));
        assert!(errors.iter().any(|e| e.contains("ACCESS_TOKEN is not set")));
        assert!(errors.iter().any(|e| e.contains("ACCESS_SECRET is not set")));
    }

    #[test]
    fn test_half_set_shared_pair_is_partial() {
        let r = resolver(MICROBLOG, &[("ACCESS_TOKEN", "t"), ("BEARER", "AAAA")]);

        assert!(r.has_scheme("bearer"));
        let errors = r.validate().into_errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("ACCESS_SECRET is not set"));
        assert!(errors[0].contains("needed with ACCESS_TOKEN"));
    }

    #[test]
    fn test_shared_pair_reported_once() {
        // oauth2 already names the missing secret; the shared check adds nothing
        let r = resolver(
            MICROBLOG,
            &[("CLIENT_ID", "cid"), ("CLIENT_SECRET", "cs"), ("ACCESS_SECRET", "ts")],
        );
        let errors = r.validate().into_errors();

        let mentions = errors
            .iter()
            .filter(|e| e.contains("ACCESS_TOKEN is not set"))
            .count();
        assert_eq!(mentions, 1);
    }

    #[test]
    fn test_shared_keys() {
        let shared: Vec<_> = MICROBLOG[0].shared_keys().collect();
        assert_eq!(shared, vec!["ACCESS_TOKEN", "ACCESS_SECRET"]);
        assert_eq!(MICROBLOG[2].shared_keys().count(), 0);
    }

    #[test]
    fn test_numeric_field_must_parse() {
        let r = resolver(
            MESSAGING,
            &[
                ("API_ID", "not-a-number"),
                ("API_HASH", "h"),
                ("PHONE", "+100"),
                ("CHAT", "@chat"),
            ],
        );

        let errors = r.validate().into_errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("API_ID must be an integer"));
    }

    #[test]
    fn test_validate_is_idempotent() {
        let r = resolver(MICROBLOG, &[("CLIENT_ID", "cid")]);
        assert_eq!(r.validate(), r.validate());
    }
}

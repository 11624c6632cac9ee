//! Property-based tests for post URL canonicalization

use outpost::document::PostUrl;
use proptest::prelude::*;

/// Canonicalization is idempotent: feeding a canonical URL back in yields
/// the same identifier.
#[test]
fn test_canonicalization_idempotent_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner.run(
        &("[a-z0-9_]{1,12}", "[a-z0-9]{1,8}", "[a-zA-Z0-9_%&=.-]{0,32}"),
        |(subreddit, post_id, suffix)| {
            let raw = format!(
                "https://www.reddit.com/r/{}/comments/{}/title/?{}",
                subreddit, post_id, suffix
            );
            let first = PostUrl::canonicalize(&raw).unwrap();
            let second = PostUrl::canonicalize(first.as_str()).unwrap();
            assert_eq!(first, second);

            Ok(())
        },
    ).unwrap();
}

/// Query strings and fragments never survive canonicalization, so the same
/// post reached through different tracking parameters maps to one identifier.
#[test]
fn test_query_and_fragment_variants_collapse_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner.run(
        &("[a-zA-Z0-9_%&=.-]{0,32}", "[a-zA-Z0-9_-]{0,16}"),
        |(query, fragment)| {
            let base = "https://www.reddit.com/r/rust/comments/abc123/title/";
            let with_query = format!("{}?{}", base, query);
            let with_fragment = format!("{}#{}", base, fragment);
            let with_both = format!("{}?{}#{}", base, query, fragment);

            let canonical = PostUrl::canonicalize(base).unwrap();
            assert_eq!(PostUrl::canonicalize(&with_query).unwrap(), canonical);
            assert_eq!(PostUrl::canonicalize(&with_fragment).unwrap(), canonical);
            assert_eq!(PostUrl::canonicalize(&with_both).unwrap(), canonical);
            assert!(!canonical.as_str().contains('?'));
            assert!(!canonical.as_str().contains('#'));

            Ok(())
        },
    ).unwrap();
}

/// Surrounding whitespace is noise from markup extraction and never changes
/// the identifier.
#[test]
fn test_whitespace_padding_ignored_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner.run(&"[ \t\r\n]{0,8}", |padding| {
        let base = "https://www.reddit.com/r/rust/comments/abc123/title/";
        let padded = format!("{}{}{}", padding, base, padding);
        assert_eq!(
            PostUrl::canonicalize(&padded).unwrap(),
            PostUrl::canonicalize(base).unwrap()
        );

        Ok(())
    }).unwrap();
}

/// Anything without a comments path segment is not a post permalink and is
/// rejected outright.
#[test]
fn test_non_permalink_rejected_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner.run(&any::<String>(), |raw| {
        let before_query = raw.trim().split(['?', '#']).next().unwrap_or("");
        if !before_query.contains("/comments/") {
            assert!(PostUrl::canonicalize(&raw).is_none());
        }

        Ok(())
    }).unwrap();
}

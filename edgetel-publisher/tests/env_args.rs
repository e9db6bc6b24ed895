//! Environment-provided flags.
//!
//! Kept in its own test binary with a single test, since it mutates the
//! process environment.

use clap::Parser;

use edgetel_publisher::PublisherArgs;

fn debug_from_env(value: &str) -> Result<bool, clap::Error> {
    // SAFETY: this binary runs a single test, nothing else reads the environment concurrently.
    unsafe { std::env::set_var("DEBUG", value) };
    let parsed = PublisherArgs::try_parse_from(["edgetel-publisher"]).map(|args| args.debug);
    unsafe { std::env::remove_var("DEBUG") };
    parsed
}

#[test]
fn debug_env_accepts_common_spellings() {
    for value in ["1", "true", "True", "TRUE", "yes", "on"] {
        assert!(debug_from_env(value).unwrap(), "DEBUG={value}");
    }
    for value in ["0", "false", "False", "no", "off"] {
        assert!(!debug_from_env(value).unwrap(), "DEBUG={value}");
    }
    assert!(debug_from_env("maybe").is_err());

    let args = PublisherArgs::try_parse_from(["edgetel-publisher", "--debug"]).unwrap();
    assert!(args.debug);
    let args = PublisherArgs::try_parse_from(["edgetel-publisher"]).unwrap();
    assert!(!args.debug);
}

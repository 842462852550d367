use assetdag::cli::{CliArgs, LogLevel};
use assetdag::logging::parse_level_str;
use assetdag::types::PlanKind;
use clap::Parser;

#[test]
fn no_arguments_runs_the_watch_plan() {
    let args = CliArgs::try_parse_from(["assetdag"]).unwrap();
    assert_eq!(args.plan, PlanKind::Watch);
    assert!(args.config.is_none());
    assert!(args.log_level.is_none());
    assert!(!args.dry_run);
}

#[test]
fn named_plans_and_stages() {
    let args = CliArgs::try_parse_from(["assetdag", "build"]).unwrap();
    assert_eq!(args.plan, PlanKind::Build);

    let args = CliArgs::try_parse_from(["assetdag", "otf2ttf", "--dry-run"]).unwrap();
    assert_eq!(args.plan, PlanKind::Stage("otf2ttf".into()));
    assert!(args.dry_run);
}

#[test]
fn config_and_log_level_flags() {
    let args = CliArgs::try_parse_from([
        "assetdag",
        "clean",
        "--config",
        "site/Assetdag.toml",
        "--log-level",
        "debug",
    ])
    .unwrap();
    assert_eq!(args.plan, PlanKind::Clean);
    assert_eq!(args.config.as_deref(), Some("site/Assetdag.toml"));
    assert!(matches!(args.log_level, Some(LogLevel::Debug)));

    assert!(CliArgs::try_parse_from(["assetdag", "--log-level", "loud"]).is_err());
}

#[test]
fn env_log_levels_parse_loosely() {
    assert_eq!(parse_level_str(" WARNING "), Some(tracing::Level::WARN));
    assert_eq!(parse_level_str("trace"), Some(tracing::Level::TRACE));
    assert_eq!(parse_level_str("verbose"), None);
}

use std::path::Path;
use std::sync::Arc;

use assetdag::config::ConfigFile;
use assetdag::errors::AssetdagError;
use assetdag::fs::mock::MockFileSystem;
use assetdag::plan::{build_plan, Pipeline};
use assetdag::transform::TransformRegistry;
use assetdag::types::PlanKind;
use assetdag_test_utils::builders::{ConfigFileBuilder, StageConfigBuilder};
use assetdag_test_utils::fakes::{FailingTransform, RecordingReloader, UppercaseTransform};
use assetdag_test_utils::{init_tracing, with_timeout};

fn project() -> ConfigFile {
    ConfigFileBuilder::new()
        .with_transform("upper", "unused")
        .with_transform("lint", "unused")
        .with_stage(
            "markup",
            StageConfigBuilder::new("*.html")
                .exclude("_*.html")
                .watch("**/*.html")
                .chain("include")
                .chain("lint")
                .build(),
        )
        .with_stage(
            "styles",
            StageConfigBuilder::new("scss/style.scss")
                .watch("scss/**/*.scss")
                .out("css")
                .chain("upper")
                .artifact(Some("css"), &[])
                .build(),
        )
        .with_stage(
            "images",
            StageConfigBuilder::new("img/**/*.png")
                .watch("img/**/*.png")
                .out("assets/img")
                .build(),
        )
        .with_stage(
            "otf2ttf",
            StageConfigBuilder::new("fonts/*.otf")
                .out("fonts")
                .target(assetdag::types::StageTarget::Source)
                .artifact(Some("ttf"), &[])
                .in_build(false)
                .build(),
        )
        .build()
}

fn sources() -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.add_file("./src/index.html", "@@include('_head.html')<main/>");
    fs.add_file("./src/_head.html", "<head/>");
    fs.add_file("./src/scss/style.scss", "body{}");
    fs.add_file("./src/img/logo.png", "PNG");
    fs.add_file("./src/fonts/Inter.otf", "OTF");
    fs
}

fn pipeline(fs: &MockFileSystem) -> Pipeline {
    let cfg = project();
    let mut registry = TransformRegistry::from_config(&cfg).unwrap();
    registry.register(Arc::new(UppercaseTransform::new("upper")));
    registry.register(Arc::new(FailingTransform::new("lint", "<broken")));
    Pipeline::from_config(cfg, Path::new("."), &registry, Arc::new(fs.clone())).unwrap()
}

fn text(fs: &MockFileSystem, path: &str) -> String {
    String::from_utf8(fs.contents(path).unwrap_or_default()).unwrap()
}

#[tokio::test]
async fn build_cleans_then_writes_every_stage() {
    init_tracing();

    let fs = sources();
    fs.add_file("./dist/stale.html", "old");
    let pipeline = pipeline(&fs);
    let plan = build_plan(pipeline.config(), PlanKind::Build).unwrap();
    let reloader = RecordingReloader::new();

    let report = with_timeout(pipeline.execute(&plan, Arc::new(reloader.clone())))
        .await
        .unwrap();

    assert!(report.is_success());
    assert_eq!(report.succeeded(), vec!["images", "markup", "styles"]);

    assert!(fs.contents("./dist/stale.html").is_none());
    assert_eq!(text(&fs, "./dist/index.html"), "<head/><main/>");
    assert_eq!(text(&fs, "./dist/css/style.css"), "BODY{}");
    assert_eq!(text(&fs, "./dist/assets/img/logo.png"), "PNG");

    // Utility stages are not part of build.
    assert!(fs.contents("./src/fonts/Inter.ttf").is_none());

    let mut stages = reloader.stages();
    stages.sort();
    assert_eq!(stages, vec!["images", "markup", "styles"]);
}

#[tokio::test]
async fn failing_stage_does_not_block_the_rest() {
    init_tracing();

    let fs = sources();
    fs.add_file("./src/about.html", "<broken");
    let pipeline = pipeline(&fs);
    let plan = build_plan(pipeline.config(), PlanKind::Build).unwrap();
    let reloader = RecordingReloader::new();

    let err = with_timeout(pipeline.execute(&plan, Arc::new(reloader.clone())))
        .await
        .unwrap_err();

    match err {
        AssetdagError::BuildFailed(failed) => assert_eq!(failed, vec!["markup"]),
        other => panic!("expected BuildFailed, got {other:?}"),
    }

    assert_eq!(text(&fs, "./dist/css/style.css"), "BODY{}");
    assert_eq!(text(&fs, "./dist/assets/img/logo.png"), "PNG");
    assert!(!reloader.stages().contains(&"markup".to_string()));
}

#[tokio::test]
async fn clean_failure_aborts_before_any_stage() {
    let fs = sources();
    fs.add_file("./dist/fonts/a.woff", "woff");
    fs.lock_path("./dist/fonts/a.woff");
    let pipeline = pipeline(&fs);
    let plan = build_plan(pipeline.config(), PlanKind::Build).unwrap();
    let reloader = RecordingReloader::new();

    let err = with_timeout(pipeline.execute(&plan, Arc::new(reloader.clone())))
        .await
        .unwrap_err();

    assert!(matches!(err, AssetdagError::CleanFailure { .. }), "{err:?}");
    assert!(fs.contents("./dist/index.html").is_none());
    assert!(reloader.events().is_empty());
}

#[tokio::test]
async fn clean_plan_only_removes_output() {
    let fs = sources();
    fs.add_file("./dist/index.html", "old");
    let pipeline = pipeline(&fs);
    let plan = build_plan(pipeline.config(), PlanKind::Clean).unwrap();

    let report = with_timeout(pipeline.execute(&plan, Arc::new(RecordingReloader::new())))
        .await
        .unwrap();

    assert!(report.succeeded().is_empty());
    assert!(fs.contents("./dist/index.html").is_none());
    assert!(fs.contents("./src/index.html").is_some());
}

#[tokio::test]
async fn single_stage_plan_keeps_existing_output() {
    let fs = sources();
    fs.add_file("./dist/index.html", "kept");
    let pipeline = pipeline(&fs);
    let plan = build_plan(pipeline.config(), PlanKind::Stage("otf2ttf".into())).unwrap();

    let report = with_timeout(pipeline.execute(&plan, Arc::new(RecordingReloader::new())))
        .await
        .unwrap();

    assert_eq!(report.succeeded(), vec!["otf2ttf"]);
    assert_eq!(text(&fs, "./dist/index.html"), "kept");
    assert_eq!(text(&fs, "./src/fonts/Inter.ttf"), "OTF");
}

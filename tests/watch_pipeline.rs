use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use assetdag::config::ConfigFile;
use assetdag::fs::RealFileSystem;
use assetdag::plan::{build_plan, Pipeline};
use assetdag::transform::TransformRegistry;
use assetdag::types::PlanKind;
use assetdag_test_utils::builders::{ConfigFileBuilder, StageConfigBuilder};
use assetdag_test_utils::fakes::{RecordingReloader, UppercaseTransform};
use assetdag_test_utils::{init_tracing, with_timeout};
use tokio::time::sleep;

fn project() -> ConfigFile {
    ConfigFileBuilder::new()
        .with_transform("upper", "unused")
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
            "scripts",
            StageConfigBuilder::new("js/index.js")
                .watch("js/**/*.js")
                .out("js")
                .build(),
        )
        .with_stage(
            "images",
            StageConfigBuilder::new("img/**/*.png")
                .watch("img/**/*.png")
                .out("assets/img")
                .build(),
        )
        .build()
}

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

fn read(root: &Path, rel: &str) -> Option<String> {
    std::fs::read_to_string(root.join(rel)).ok()
}

/// Poll `cond` every 20ms; panics after the shared test timeout.
async fn wait_until(mut cond: impl FnMut() -> bool) {
    with_timeout(async {
        while !cond() {
            sleep(Duration::from_millis(20)).await;
        }
    })
    .await
}

#[tokio::test]
async fn image_edit_rebuilds_only_images_and_reloads() {
    init_tracing();

    let temp_dir = tempfile::tempdir().unwrap();
    let root = temp_dir.path().to_path_buf();
    write(&root, "src/scss/style.scss", "body{}");
    write(&root, "src/js/index.js", "run();");
    write(&root, "src/img/logo.png", "PNG-1");

    let cfg = project();
    let mut registry = TransformRegistry::from_config(&cfg).unwrap();
    registry.register(Arc::new(UppercaseTransform::new("upper")));
    let plan = build_plan(&cfg, PlanKind::Watch).unwrap();
    let pipeline = Pipeline::from_config(cfg, &root, &registry, Arc::new(RealFileSystem)).unwrap();

    let reloader = RecordingReloader::new();
    let sink = Arc::new(reloader.clone());
    let handle = tokio::spawn(async move { pipeline.execute(&plan, sink).await });

    // Initial build: every stage runs once.
    wait_until(|| reloader.stages().len() >= 3).await;
    assert_eq!(read(&root, "dist/css/style.css").as_deref(), Some("BODY{}"));
    assert_eq!(read(&root, "dist/js/index.js").as_deref(), Some("run();"));
    assert_eq!(read(&root, "dist/assets/img/logo.png").as_deref(), Some("PNG-1"));

    // Give the OS watcher a brief moment to settle.
    sleep(Duration::from_millis(100)).await;

    // Mark the other stages' outputs; a rebuild of them would overwrite these.
    write(&root, "dist/css/style.css", "untouched-css");
    write(&root, "dist/js/index.js", "untouched-js");
    let initial_events = reloader.events().len();

    write(&root, "src/img/logo.png", "PNG-2");

    wait_until(|| read(&root, "dist/assets/img/logo.png").as_deref() == Some("PNG-2")).await;
    wait_until(|| reloader.events().len() > initial_events).await;

    // Let any trailing notify events for the same edit drain.
    sleep(Duration::from_millis(200)).await;

    let later: Vec<String> = reloader.stages().split_off(initial_events);
    assert!(!later.is_empty());
    assert!(later.iter().all(|s| s == "images"), "{later:?}");
    let events = reloader.events();
    let image_event = &events[initial_events];
    assert!(
        image_event
            .paths
            .iter()
            .any(|p| p.ends_with("assets/img/logo.png")),
        "{image_event:?}"
    );

    assert_eq!(read(&root, "dist/css/style.css").as_deref(), Some("untouched-css"));
    assert_eq!(read(&root, "dist/js/index.js").as_deref(), Some("untouched-js"));

    assert!(!handle.is_finished(), "watch plan must keep running");
    handle.abort();
}

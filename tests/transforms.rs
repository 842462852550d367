use std::path::Path;
use std::sync::Arc;

use assetdag::fs::mock::MockFileSystem;
use assetdag::fs::RealFileSystem;
use assetdag::transform::{
    apply_chain, CommandTransform, IncludeTransform, Transform, TransformContext, TransformRegistry,
};
use assetdag_test_utils::builders::{ConfigFileBuilder, StageConfigBuilder};
use assetdag_test_utils::fakes::{FailingTransform, SuffixTransform};

fn ctx<'a>(fs: &'a dyn assetdag::fs::FileSystem, source: &'a Path) -> TransformContext<'a> {
    TransformContext {
        stage: "test",
        source,
        fs,
    }
}

async fn include(fs: &MockFileSystem, source: &str, input: &str) -> anyhow::Result<String> {
    let transform = IncludeTransform::new()?;
    let out = transform
        .apply(ctx(fs, Path::new(source)), input.as_bytes().to_vec())
        .await?;
    Ok(String::from_utf8(out)?)
}

#[tokio::test]
async fn include_accepts_both_quote_styles_and_ignores_context() {
    let fs = MockFileSystem::new();
    fs.add_file("./src/_a.html", "A");
    fs.add_file("./src/_b.html", "B");

    let out = include(
        &fs,
        "./src/index.html",
        r#"[@@include('_a.html')|@@include( "_b.html", {"title": "Home"} )]"#,
    )
    .await
    .unwrap();

    assert_eq!(out, "[A|B]");
}

#[tokio::test]
async fn include_without_directives_is_identity() {
    let fs = MockFileSystem::new();
    let input = "const a = 1; // no includes here @@ include";
    let out = include(&fs, "./src/js/index.js", input).await.unwrap();
    assert_eq!(out, input);
}

#[tokio::test]
async fn include_paths_are_relative_to_the_including_file() {
    let fs = MockFileSystem::new();
    fs.add_file("./src/js/modules/menu.js", "menu();@@include('../lib/util.js')");
    fs.add_file("./src/js/lib/util.js", "util();");

    let out = include(&fs, "./src/js/index.js", "@@include('modules/menu.js')")
        .await
        .unwrap();
    assert_eq!(out, "menu();util();");
}

#[tokio::test]
async fn include_cycle_is_an_error() {
    let fs = MockFileSystem::new();
    fs.add_file("./src/_a.html", "@@include('_b.html')");
    fs.add_file("./src/_b.html", "@@include('_a.html')");

    let err = include(&fs, "./src/index.html", "@@include('_a.html')")
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("cycle"), "{err:#}");
}

#[tokio::test]
async fn self_include_is_an_error() {
    let fs = MockFileSystem::new();
    fs.add_file("./src/index.html", "@@include('index.html')");

    let err = include(&fs, "./src/index.html", "@@include('index.html')")
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("cycle"));
}

#[tokio::test]
async fn include_rejects_non_utf8_input() {
    let fs = MockFileSystem::new();
    let transform = IncludeTransform::new().unwrap();
    let err = transform
        .apply(ctx(&fs, Path::new("./src/a.js")), vec![0xff, 0xfe, 0x00])
        .await
        .unwrap_err();
    assert!(err.to_string().contains("UTF-8"));
}

#[tokio::test]
async fn apply_chain_stops_at_first_failure() {
    let fs = MockFileSystem::new();
    let chain: Vec<Arc<dyn Transform>> = vec![
        Arc::new(SuffixTransform::new("first", "!")),
        Arc::new(FailingTransform::new("check", "!")),
        Arc::new(SuffixTransform::new("never", "?")),
    ];

    let err = apply_chain(&chain, ctx(&fs, Path::new("a.css")), b"x".to_vec())
        .await
        .unwrap_err();
    assert!(format!("{err:#}").starts_with("transform 'check'"));
}

#[tokio::test]
async fn empty_chain_is_identity() {
    let fs = MockFileSystem::new();
    let out = apply_chain(&[], ctx(&fs, Path::new("a.png")), b"PNG".to_vec())
        .await
        .unwrap();
    assert_eq!(out, b"PNG");
}

#[test]
fn registry_resolves_configured_and_builtin_transforms() {
    let cfg = ConfigFileBuilder::new()
        .with_transform("sass", "npx sass --stdin")
        .with_stage(
            "styles",
            StageConfigBuilder::new("*.scss").chain("sass").build(),
        )
        .build();

    let registry = TransformRegistry::from_config(&cfg).unwrap();
    assert!(registry.contains("include"));
    assert!(registry.contains("sass"));

    let chain = registry
        .resolve_chain(&["include".to_string(), "sass".to_string()])
        .unwrap();
    let names: Vec<&str> = chain.iter().map(|t| t.name()).collect();
    assert_eq!(names, vec!["include", "sass"]);

    assert!(registry.resolve_chain(&["nope".to_string()]).is_err());
}

#[cfg(unix)]
mod command {
    use super::*;

    async fn run(cmd: &str, source: &Path, input: &[u8]) -> anyhow::Result<Vec<u8>> {
        let fs = RealFileSystem;
        CommandTransform::new("cmd", cmd, None)
            .apply(ctx(&fs, source), input.to_vec())
            .await
    }

    #[tokio::test]
    async fn pipes_stdin_to_stdout() {
        let out = run("tr a-z A-Z", Path::new("style.scss"), b"body{}")
            .await
            .unwrap();
        assert_eq!(out, b"BODY{}");
    }

    #[tokio::test]
    async fn input_and_output_placeholders_use_temp_files() {
        let out = run(
            "test -f {input} && tr a-z A-Z < {input} > {output}",
            Path::new("font.ttf"),
            b"glyphs",
        )
        .await
        .unwrap();
        assert_eq!(out, b"GLYPHS");
    }

    #[tokio::test]
    async fn source_placeholders_point_at_the_original_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("main.scss");
        std::fs::write(&source, "from-disk").unwrap();

        let out = run("cat {source} && test -d {source_dir}", &source, b"ignored")
            .await
            .unwrap();
        assert_eq!(out, b"from-disk");
    }

    #[tokio::test]
    async fn non_zero_exit_reports_code_and_stderr() {
        let err = run("echo 'unexpected token' >&2; exit 3", Path::new("a.js"), b"")
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("code 3"), "{msg}");
        assert!(msg.contains("unexpected token"), "{msg}");
    }

    #[tokio::test]
    async fn large_input_does_not_deadlock() {
        let input = vec![b'a'; 1 << 20];
        let out = assetdag_test_utils::with_timeout(run("cat", Path::new("big.js"), &input))
            .await
            .unwrap();
        assert_eq!(out.len(), input.len());
    }
}

// End-to-end acquisition tests against a fake release server and a real
// temporary data directory.


use kdev::commands;
use kdev::download::Downloader;
use kdev::http::HttpClient;
use kdev::config::Settings;
use kdev::fs::OsFs;
use std::ffi::OsString;
use std::sync::Arc;
use test_helpers::{FakeTool, PLATFORM, TestEnvironment, publish, registry_of, tar_gz};
use wiremock::MockServer;

#[tokio::test]
async fn test_demo_download_is_executable() {
    let env = TestEnvironment::new();
    let server = MockServer::start().await;
    let demo = FakeTool::new("demo", &server);
    publish(&server, &demo, "v2.0.0", b"payload", 1).await;

    let prepared = env
        .launcher()
        .prepare(&demo, vec![OsString::from("--version")])
        .await
        .unwrap();

    let expected = env.data_dir.join("kdev/demo/v2.0.0/demo");
    assert_eq!(prepared.binary, expected);
    assert_eq!(prepared.argv, vec![OsString::from("demo"), OsString::from("--version")]);
    assert_eq!(std::fs::read(&expected).unwrap(), b"payload");

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&expected).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }
    assert_eq!(env.files(), vec![expected]);
}

#[tokio::test]
async fn test_second_launch_downloads_nothing() {
    let env = TestEnvironment::new();
    let server = MockServer::start().await;
    let demo = FakeTool::new("demo", &server);
    // Artifact and checksum are each fetched exactly once
    publish(&server, &demo, "v2.0.0", b"payload", 1).await;

    let launcher = env.launcher();
    let first = launcher.prepare(&demo, Vec::new()).await.unwrap();
    let second = launcher.prepare(&demo, Vec::new()).await.unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_new_release_lands_beside_old_one() {
    let env = TestEnvironment::new();
    env.seed("demo", "v1.9.0", b"old");
    let server = MockServer::start().await;
    let demo = FakeTool::new("demo", &server);
    publish(&server, &demo, "v2.0.0", b"new", 1).await;

    let acquired = env.launcher().ensure_latest(&demo).await.unwrap();

    assert!(acquired.downloaded);
    assert_eq!(acquired.version, "v2.0.0");
    let versions: Vec<String> = env
        .cache()
        .list_cached("demo")
        .unwrap()
        .into_iter()
        .map(|entry| entry.version)
        .collect();
    assert_eq!(versions, ["v2.0.0", "v1.9.0"]);
}

#[tokio::test]
async fn test_incomplete_version_dir_is_redownloaded() {
    let env = TestEnvironment::new();
    let version_dir = env.layout.version_dir("demo", "v2.0.0");
    std::fs::create_dir_all(&version_dir).unwrap();
    std::fs::write(version_dir.join("demo.999.0.tmp"), b"partial").unwrap();

    let server = MockServer::start().await;
    let demo = FakeTool::new("demo", &server);
    publish(&server, &demo, "v2.0.0", b"payload", 1).await;

    let acquired = env.launcher().ensure_latest(&demo).await.unwrap();
    assert!(acquired.downloaded);
    assert_eq!(std::fs::read(&acquired.path).unwrap(), b"payload");
}

#[tokio::test]
async fn test_archived_tool_extracts_binary() {
    let env = TestEnvironment::new();
    let server = MockServer::start().await;
    let tool = FakeTool::new("demo", &server).archived();
    let archive = tar_gz(&[
        ("LICENSE", &b"Apache-2.0"[..]),
        ("demo", &b"from archive"[..]),
    ]);
    publish(&server, &tool, "v2.0.0", &archive, 1).await;

    let acquired = env.launcher().ensure_latest(&tool).await.unwrap();

    assert_eq!(std::fs::read(&acquired.path).unwrap(), b"from archive");
    assert_eq!(env.files(), vec![acquired.path]);
}

#[tokio::test]
async fn test_downloader_on_real_fs_verifies() {
    let env = TestEnvironment::new();
    let server = MockServer::start().await;
    let demo = FakeTool::new("demo", &server);
    publish(&server, &demo, "v2.0.0", b"payload", 1).await;

    let dest = env.layout.binary_path("demo", "v2.0.0");
    Downloader::new(
        HttpClient::new(Settings::without_retries()).unwrap(),
        Arc::new(OsFs),
    )
    .with_platform(PLATFORM)
    .download(&demo, &dest, "v2.0.0")
    .await
    .unwrap();

    assert_eq!(std::fs::read(&dest).unwrap(), b"payload");
}

#[tokio::test]
async fn test_update_command() {
    colored::control::set_override(false);
    let env = TestEnvironment::new();
    let server = MockServer::start().await;
    publish(&server, &FakeTool::new("demo", &server), "v2.0.0", b"payload", 1).await;
    let registry = registry_of(vec![FakeTool::new("demo", &server)]);
    let launcher = env.launcher();

    let mut out = Vec::new();
    commands::update(&launcher, &registry, &[], &mut out).await.unwrap();
    assert!(out.is_empty());

    commands::update(&launcher, &registry, &["demo".to_string()], &mut out)
        .await
        .unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "demo v2.0.0 already cached\n");
}

#[tokio::test]
async fn test_update_unknown_tool() {
    let env = TestEnvironment::new();
    let server = MockServer::start().await;
    let registry = registry_of(vec![FakeTool::new("demo", &server)]);

    let err = commands::update(&env.launcher(), &registry, &["dmeo".to_string()], &mut Vec::new())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "unknown tool: dmeo (did you mean demo?)");
}

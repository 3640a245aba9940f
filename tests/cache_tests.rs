// Cache index and `tools info` / `tools clean` against a real directory tree.


use kdev::commands;
use test_helpers::{FakeTool, TestEnvironment, registry_of};
use wiremock::MockServer;

fn versions(env: &TestEnvironment, tool: &str) -> Vec<String> {
    env.cache()
        .list_cached(tool)
        .unwrap()
        .into_iter()
        .map(|entry| entry.version)
        .collect()
}

#[test]
fn test_semantic_version_order() {
    let env = TestEnvironment::new();
    for v in ["v1.2.2", "v1.2.10", "v1.2.3"] {
        env.seed("kind", v, b"bin");
    }
    assert_eq!(versions(&env, "kind"), ["v1.2.10", "v1.2.3", "v1.2.2"]);
}

#[test]
fn test_non_semver_order() {
    let env = TestEnvironment::new();
    env.seed("kind", "latest", b"bin");
    env.seed("kind", "dev", b"bin");
    assert_eq!(versions(&env, "kind"), ["latest", "dev"]);
}

#[test]
fn test_sizes_and_paths() {
    let env = TestEnvironment::new();
    let path = env.seed("kubectl", "v1.31.2", &[0u8; 2048]);

    let entries = env.cache().list_cached("kubectl").unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].path, path);
    assert_eq!(entries[0].size, 2048);
}

#[test]
fn test_absent_paths_are_not_errors() {
    let env = TestEnvironment::new();
    let cache = env.cache();
    assert!(cache.list_cached("kind").unwrap().is_empty());
    cache.remove_version("kind", "v0.1.0").unwrap();
    cache.remove_all("kind").unwrap();
}

#[test]
fn test_malformed_entries_ignored() {
    let env = TestEnvironment::new();
    env.seed("kind", "v0.24.0", b"bin");
    std::fs::create_dir_all(env.layout.version_dir("kind", "v0.25.0")).unwrap();
    std::fs::write(env.layout.tool_dir("kind").join("notes.txt"), b"hi").unwrap();

    assert_eq!(versions(&env, "kind"), ["v0.24.0"]);
}

#[test]
fn test_remove_version_then_all() {
    let env = TestEnvironment::new();
    env.seed("kind", "v0.23.0", b"bin");
    env.seed("kind", "v0.24.0", b"bin");
    let cache = env.cache();

    cache.remove_version("kind", "v0.23.0").unwrap();
    assert_eq!(versions(&env, "kind"), ["v0.24.0"]);

    cache.remove_all("kind").unwrap();
    assert!(!env.layout.tool_dir("kind").exists());
}

#[tokio::test]
async fn test_info_output() {
    colored::control::set_override(false);
    let env = TestEnvironment::new();
    let server = MockServer::start().await;
    let registry = registry_of(vec![
        FakeTool::new("alpha", &server),
        FakeTool::new("beta", &server),
    ]);
    let newest = env.seed("alpha", "v1.10.0", &[0u8; 1536]);
    let older = env.seed("alpha", "v1.9.0", &[0u8; 512]);

    let mut out = Vec::new();
    commands::info(&registry, &env.cache(), &[], &mut out).unwrap();
    let out = String::from_utf8(out).unwrap();

    let expected = format!(
        "alpha\n  v1.10.0         1.5 KiB  {}\n  v1.9.0            512 B  {}\nbeta (not cached)\n\ncache size: 2.0 KiB\n",
        newest.display(),
        older.display()
    );
    assert_eq!(out, expected);
}

#[tokio::test]
async fn test_info_single_tool_has_no_total() {
    colored::control::set_override(false);
    let env = TestEnvironment::new();
    let server = MockServer::start().await;
    let registry = registry_of(vec![
        FakeTool::new("alpha", &server),
        FakeTool::new("beta", &server),
    ]);

    let mut out = Vec::new();
    commands::info(&registry, &env.cache(), &["beta".to_string()], &mut out).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "beta (not cached)\n");
}

#[tokio::test]
async fn test_clean_old_keeps_newest() {
    colored::control::set_override(false);
    let env = TestEnvironment::new();
    let server = MockServer::start().await;
    let registry = registry_of(vec![FakeTool::new("alpha", &server)]);
    env.seed("alpha", "v1.10.0", &[0u8; 100]);
    env.seed("alpha", "v1.9.0", &[0u8; 1024]);
    env.seed("alpha", "v1.2.0", &[0u8; 1024]);

    let mut out = Vec::new();
    commands::clean(&registry, &env.cache(), &[], true, &mut out).unwrap();

    assert_eq!(versions(&env, "alpha"), ["v1.10.0"]);
    let out = String::from_utf8(out).unwrap();
    assert!(out.contains("alpha v1.9.0"));
    assert!(out.contains("alpha v1.2.0"));
    assert!(out.ends_with("Reclaimed 2.0 KiB\n"), "{out}");
}

#[tokio::test]
async fn test_clean_all_removes_tool_dir() {
    colored::control::set_override(false);
    let env = TestEnvironment::new();
    let server = MockServer::start().await;
    let registry = registry_of(vec![FakeTool::new("alpha", &server)]);
    env.seed("alpha", "v1.0.0", b"bin");
    std::fs::create_dir_all(env.layout.version_dir("alpha", "v2.0.0")).unwrap();

    let mut out = Vec::new();
    commands::clean(&registry, &env.cache(), &["alpha".to_string()], false, &mut out).unwrap();

    assert!(!env.layout.tool_dir("alpha").exists());
    assert!(String::from_utf8(out).unwrap().ends_with("Reclaimed 3 B\n"));
}

#[tokio::test]
async fn test_clean_old_sweeps_partial_downloads() {
    colored::control::set_override(false);
    let env = TestEnvironment::new();
    let server = MockServer::start().await;
    let registry = registry_of(vec![FakeTool::new("alpha", &server)]);
    let binary = env.seed("alpha", "v1.0.0", b"bin");
    let partial = binary.with_file_name("alpha.999999.0.tmp");
    std::fs::write(&partial, [0u8; 1024]).unwrap();

    let mut out = Vec::new();
    commands::clean(&registry, &env.cache(), &[], true, &mut out).unwrap();

    assert!(!partial.exists());
    assert_eq!(env.files(), vec![binary]);
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "  ✓ alpha partial downloads\nReclaimed 1.0 KiB\n"
    );
}

#[tokio::test]
async fn test_clean_nothing() {
    colored::control::set_override(false);
    let env = TestEnvironment::new();
    let server = MockServer::start().await;
    let registry = registry_of(vec![FakeTool::new("alpha", &server)]);

    let mut out = Vec::new();
    commands::clean(&registry, &env.cache(), &[], true, &mut out).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "Nothing to clean\n");
}

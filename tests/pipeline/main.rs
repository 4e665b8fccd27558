//! Integration tests for the update pipeline
//!
//! A filesystem-backed branch is configured through a real configuration
//! document, its archives are listed, fetched and extracted with a small
//! shell script standing in for 7-Zip (`tool x <archive> -o<dir>` unpacking a
//! tar file).

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;

use futures::StreamExt;
use nx_tools::app::{
    Environment, ProjectKey, TaskResult, TaskScheduler, TaskStatus, UpdateSettings, Updater,
};
use nx_tools::cli::{handle_check, AppContext};
use nx_tools::config::AppPaths;
use nx_tools::constants::exit_codes;
use serde_json::json;
use tempfile::TempDir;

struct Fixture {
    _temp: TempDir,
    remote: PathBuf,
    local: PathBuf,
    patches: PathBuf,
    config: PathBuf,
}

fn stub_extractor(dir: &Path) -> PathBuf {
    let tool = dir.join("fake-7z");
    std::fs::write(
        &tool,
        "#!/bin/sh\nout=\"${3#-o}\"\nmkdir -p \"$out\" && tar -xf \"$2\" -C \"$out\"\n",
    )
    .unwrap();
    std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();
    tool
}

/// Pack `files` into a tar archive named `name` in `remote`
fn make_archive(remote: &Path, name: &str, files: &[(&str, &str)]) {
    let staging = TempDir::new().unwrap();
    for (file, content) in files {
        std::fs::write(staging.path().join(file), content).unwrap();
    }
    let status = Command::new("tar")
        .arg("-cf")
        .arg(remote.join(name))
        .arg("-C")
        .arg(staging.path())
        .args(files.iter().map(|(file, _)| *file))
        .status()
        .unwrap();
    assert!(status.success());
}

fn fixture(delete_zip: bool) -> Fixture {
    let temp = TempDir::new().unwrap();
    let remote = temp.path().join("share").join("nx11");
    let local = temp.path().join("builds").join("nx11");
    let patches = temp.path().join("patches").join("nx11");
    std::fs::create_dir_all(&remote).unwrap();

    let tool = stub_extractor(temp.path());
    let config = temp.path().join("nx_tools.json");
    let document = json!({
        "SHARE": temp.path().join("share").display().to_string(),
        "delete_zip": delete_zip,
        "extract_exe": tool.display().to_string(),
        "nx": {
            "nx11": ["{SHARE}/{version}", local.display().to_string()],
        },
        "tmg": {
            "nx11": [null, patches.display().to_string()],
        },
    });
    std::fs::write(&config, serde_json::to_string_pretty(&document).unwrap()).unwrap();

    Fixture {
        _temp: temp,
        remote,
        local,
        patches,
        config,
    }
}

async fn build_updater(fixture: &Fixture) -> Updater {
    let env = Environment::load(&[&fixture.config]).await.unwrap();
    let settings = UpdateSettings::from_environment(&env).unwrap();
    let branch = env.get_branch(ProjectKey::Nx, "nx1102").unwrap();
    assert!(branch.is_tracked());
    Updater::for_branch(ProjectKey::Nx, branch, &settings).unwrap()
}

#[tokio::test]
async fn test_fetch_extract_and_delete() {
    let fixture = fixture(true);
    let payload = "ugraf build 1102\n";
    make_archive(&fixture.remote, "sample.7z", &[("payload.txt", payload)]);

    let mut updater = build_updater(&fixture).await;
    assert_eq!(updater.list_new().await.unwrap(), ["sample.7z".to_string()]);

    let tasks = updater.make_tasks(&[0]).await.unwrap();
    let results: Vec<TaskResult> = TaskScheduler::default().submit(tasks).collect().await;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, "nx-0");
    assert_eq!(results[0].status, TaskStatus::Success, "{:?}", results[0].reason);

    let extracted = fixture.local.join("sample").join("payload.txt");
    assert_eq!(std::fs::read_to_string(extracted).unwrap(), payload);
    assert!(!fixture.local.join("sample.7z").exists());
    assert!(fixture.remote.join("sample.7z").exists());

    // extracted directory now marks the item as handled
    assert!(updater.list_new().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_archive_kept_without_delete_zip() {
    let fixture = fixture(false);
    make_archive(&fixture.remote, "sample.7z", &[("payload.txt", "x")]);

    let mut updater = build_updater(&fixture).await;
    updater.list_new().await.unwrap();
    let tasks = updater.make_tasks(&[0]).await.unwrap();
    let results: Vec<TaskResult> = TaskScheduler::default().submit(tasks).collect().await;

    assert!(results[0].is_success());
    assert!(fixture.local.join("sample.7z").is_file());
    assert!(fixture.local.join("sample").is_dir());
}

#[tokio::test]
async fn test_broken_archive_does_not_affect_sibling() {
    let fixture = fixture(false);
    make_archive(&fixture.remote, "good.7z", &[("payload.txt", "good")]);
    std::fs::write(fixture.remote.join("broken.7z"), b"not an archive").unwrap();

    let mut updater = build_updater(&fixture).await;
    let listed = updater.list_new().await.unwrap().to_vec();
    assert_eq!(listed, vec!["broken.7z", "good.7z"]);

    let tasks = updater.make_tasks(&[0, 1]).await.unwrap();
    let mut results: Vec<TaskResult> = TaskScheduler::default().submit(tasks).collect().await;
    results.sort_by(|a, b| a.id.cmp(&b.id));

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].id, "nx-0");
    assert_eq!(results[0].status, TaskStatus::Failure);
    assert!(results[0]
        .reason
        .as_deref()
        .unwrap()
        .starts_with("Could not extract"));
    assert_eq!(results[1].id, "nx-1");
    assert_eq!(results[1].status, TaskStatus::Success);
    assert_eq!(
        std::fs::read_to_string(fixture.local.join("good").join("payload.txt")).unwrap(),
        "good"
    );
}

#[tokio::test]
async fn test_check_exit_code_follows_new_builds() {
    let fixture = fixture(false);
    let state = TempDir::new().unwrap();
    let paths = AppPaths::new(state.path());

    let ctx = AppContext::load(paths.clone(), Some(&fixture.config), true)
        .await
        .unwrap();
    assert_eq!(handle_check(&ctx, "nx11").await, exit_codes::NOTHING_NEW);

    make_archive(&fixture.remote, "nx1102_b1.7z", &[("payload.txt", "x")]);
    assert_eq!(handle_check(&ctx, "nx11").await, exit_codes::NEW_BUILD);

    std::fs::create_dir_all(fixture.local.join("nx1102_b1")).unwrap();
    assert_eq!(handle_check(&ctx, "nx11").await, exit_codes::NOTHING_NEW);
    assert!(!fixture.patches.exists());
}

//! Docker 통합 테스트 - 실제 Docker daemon 필요
//!
//! `cargo test -p dockashell-task --test docker_integration -- --ignored --nocapture`

use bollard::container::RemoveContainerOptions;
use bollard::Docker;
use dockashell_foundation::{GlobalConfig, ProjectConfig, ProjectStore};
use dockashell_task::{
    container_name, DockerRuntime, ExecOptions, ProjectManager, StartStatus, StopStatus,
};
use std::sync::Arc;
use std::time::Duration;

const IMAGE: &str = "alpine:3.20";

struct Project {
    name: String,
    _home: tempfile::TempDir,
    manager: ProjectManager,
}

impl Project {
    fn new(suffix: &str) -> Self {
        let name = format!("it-{}-{}", std::process::id(), suffix);
        let home = tempfile::tempdir().expect("temp dir");
        let projects = ProjectStore::new(home.path());
        projects
            .save_project(
                &ProjectConfig::new(&name)
                    .with_image(IMAGE)
                    .with_shell("/bin/sh")
                    .with_working_dir("/tmp"),
            )
            .expect("save project");

        let runtime = DockerRuntime::connect().expect("docker connect");
        let manager = ProjectManager::new(projects, Arc::new(runtime), &GlobalConfig::default());
        Self {
            name,
            _home: home,
            manager,
        }
    }

    async fn cleanup(&self) {
        let docker = Docker::connect_with_local_defaults().expect("docker connect");
        let _ = docker
            .remove_container(
                &container_name(&self.name),
                Some(RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await;
    }
}

#[tokio::test]
#[ignore]
async fn test_start_is_idempotent() {
    let p = Project::new("start");

    let first = p.manager.start_project(&p.name).await.expect("first start");
    let second = p.manager.start_project(&p.name).await.expect("second start");
    println!("first: {:?}\nsecond: {:?}", first, second);

    assert_eq!(first.status, StartStatus::Started);
    assert_eq!(second.status, StartStatus::AlreadyRunning);
    assert_eq!(first.container_id, second.container_id);

    p.cleanup().await;
}

#[tokio::test]
#[ignore]
async fn test_command_timeout_keeps_partial_output() {
    let p = Project::new("timeout");
    p.manager.start_project(&p.name).await.expect("start");

    let result = p
        .manager
        .run_command(
            &p.name,
            "echo partial; sleep 30",
            ExecOptions::with_timeout(Duration::from_secs(2)),
        )
        .await
        .expect("run_command");
    println!("result: {:?}", result);

    assert!(result.timed_out);
    assert_eq!(result.exit_code, -1);
    assert!(result.stdout.contains("partial"));
    assert_eq!(result.stderr, "Command timed out");

    p.cleanup().await;
}

#[tokio::test]
#[ignore]
async fn test_write_file_overwrite_guard() {
    let p = Project::new("write");
    p.manager.start_project(&p.name).await.expect("start");
    let opts = ExecOptions::default();

    let created = p
        .manager
        .write_file(&p.name, "out/hello.txt", "one\n", false, opts)
        .await
        .expect("first write");
    assert!(created.success, "first write: {:?}", created);

    let refused = p
        .manager
        .write_file(&p.name, "out/hello.txt", "two\n", false, opts)
        .await
        .expect("second write");
    assert!(!refused.success);
    assert!(!refused.stderr.is_empty());

    let unchanged = p
        .manager
        .run_command(&p.name, "cat out/hello.txt", opts)
        .await
        .expect("cat");
    assert_eq!(unchanged.stdout, "one\n");

    let replaced = p
        .manager
        .write_file(&p.name, "out/hello.txt", "two\n", true, opts)
        .await
        .expect("overwrite");
    assert!(replaced.success);

    let current = p
        .manager
        .run_command(&p.name, "cat out/hello.txt", opts)
        .await
        .expect("cat");
    assert_eq!(current.stdout, "two\n");

    p.cleanup().await;
}

#[tokio::test]
#[ignore]
async fn test_stop_lifecycle() {
    let p = Project::new("stop");

    let absent = p.manager.stop_project(&p.name).await.expect("stop absent");
    assert_eq!(absent.status, StopStatus::NotFound);

    p.manager.start_project(&p.name).await.expect("start");
    let stopped = p.manager.stop_project(&p.name).await.expect("stop");
    assert_eq!(stopped.status, StopStatus::Stopped);

    let again = p.manager.stop_project(&p.name).await.expect("stop again");
    assert_eq!(again.status, StopStatus::Stopped);

    p.cleanup().await;
}

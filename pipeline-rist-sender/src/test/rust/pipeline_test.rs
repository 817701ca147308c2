#![cfg(unix)]

use pipeline_rist_sender::{
    routes, CommandBuilder, ConfigStore, DomainError, OsProcessLauncher, PipelineController,
    ProcessRole, ProcessState, ProcessSupervisor,
};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;

const LONG_RUNNING: &str = "#!/bin/sh\necho \"started $0 $*\"\nexec sleep 30\n";
const IGNORES_SIGTERM: &str = "#!/bin/sh\ntrap '' TERM\necho \"started $0\"\nexec sleep 30\n";

struct Fixture {
    dir: TempDir,
    controller: Arc<PipelineController>,
}

impl Fixture {
    fn log_dir(&self) -> PathBuf {
        self.dir.path().join("logs")
    }

    fn pid(&self, role: ProcessRole) -> Option<u32> {
        self.controller
            .status()
            .into_iter()
            .find(|s| s.role == role)
            .and_then(|s| s.pid)
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        self.controller.shutdown();
    }
}

fn write_script(dir: &Path, name: &str, body: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path.to_string_lossy().into_owned()
}

fn create_fixture(encoder_script: &str, grace: Duration) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let bin = dir.path().join("bin");
    fs::create_dir_all(&bin).unwrap();

    let relay = write_script(&bin, "mediamtx", LONG_RUNNING);
    let encoder = write_script(&bin, "ffmpeg", encoder_script);
    let sender = write_script(&bin, "ristsender", LONG_RUNNING);

    let store = ConfigStore::new(dir.path().join("config.yml"));
    store
        .write_raw(&format!(
            "logging:\n  dir: {}\n",
            dir.path().join("logs").display()
        ))
        .unwrap();

    let supervisor =
        ProcessSupervisor::new(Arc::new(OsProcessLauncher::new())).with_grace_period(grace);
    let controller = PipelineController::new(
        store,
        CommandBuilder::new(encoder, sender),
        CommandBuilder::build_relay_command(&relay, "mediamtx.yml"),
        supervisor,
    );

    Fixture {
        dir,
        controller: Arc::new(controller),
    }
}

fn process_exists(pid: u32) -> bool {
    nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid as i32), None).is_ok()
}

fn wait_for_log(path: &Path, needle: &str) -> String {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let content = fs::read_to_string(path).unwrap_or_default();
        if content.contains(needle) || Instant::now() > deadline {
            return content;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}

#[test]
fn test_startup_spawns_all_three_processes() {
    let fixture = create_fixture(LONG_RUNNING, Duration::from_secs(5));

    fixture.controller.startup().unwrap();

    for role in ProcessRole::ALL {
        let pid = fixture.pid(role).unwrap();
        assert!(process_exists(pid), "{} is not running", role);
    }

    let encoder_log = wait_for_log(&fixture.log_dir().join("ffmpeg.log"), "udp://127.0.0.1:10000");
    assert!(encoder_log.contains("-nostdin"));
    assert!(encoder_log.contains("testsrc2=size=1280x720:rate=25,format=yuv420p"));

    let sender_log = wait_for_log(&fixture.log_dir().join("ristsender.log"), "started");
    assert!(sender_log.contains("-i udp://127.0.0.1:10000"));

    let relay_log = wait_for_log(&fixture.log_dir().join("mediamtx.log"), "started");
    assert!(relay_log.contains("mediamtx.yml"));
}

#[test]
fn test_apply_replaces_pipeline_and_keeps_relay() {
    let fixture = create_fixture(LONG_RUNNING, Duration::from_secs(5));
    fixture.controller.startup().unwrap();

    let relay = fixture.pid(ProcessRole::Relay).unwrap();
    let encoder = fixture.pid(ProcessRole::Encoder).unwrap();
    let sender = fixture.pid(ProcessRole::Sender).unwrap();

    fixture.controller.apply().unwrap();

    assert_eq!(fixture.pid(ProcessRole::Relay), Some(relay));
    assert_ne!(fixture.pid(ProcessRole::Encoder), Some(encoder));
    assert_ne!(fixture.pid(ProcessRole::Sender), Some(sender));
    assert!(!process_exists(encoder));
    assert!(!process_exists(sender));
}

#[test]
fn test_apply_uses_new_port_for_both_sides() {
    let fixture = create_fixture(LONG_RUNNING, Duration::from_secs(5));
    fixture.controller.startup().unwrap();

    let store = fixture.controller.store();
    let raw = store.read_raw().unwrap();
    store
        .write_raw(&format!("{}rist:\n  base_udp_port: 11000\n", raw))
        .unwrap();
    fixture.controller.apply().unwrap();

    let status = fixture.controller.status();
    let argv_of = |role: ProcessRole| {
        status
            .iter()
            .find(|s| s.role == role)
            .map(|s| s.argv.clone())
            .unwrap()
    };
    assert_eq!(argv_of(ProcessRole::Sender)[2], "udp://127.0.0.1:11000");
    assert!(argv_of(ProcessRole::Encoder)
        .last()
        .unwrap()
        .starts_with("udp://127.0.0.1:11000?"));
}

#[test]
fn test_stubborn_encoder_is_killed_after_grace_period() {
    let grace = Duration::from_millis(300);
    let fixture = create_fixture(IGNORES_SIGTERM, grace);
    fixture.controller.startup().unwrap();
    wait_for_log(&fixture.log_dir().join("ffmpeg.log"), "started");
    let encoder = fixture.pid(ProcessRole::Encoder).unwrap();

    let started = Instant::now();
    fixture.controller.apply().unwrap();

    assert!(started.elapsed() >= grace);
    assert!(!process_exists(encoder));
    assert!(fixture.pid(ProcessRole::Encoder).is_some());
}

#[test]
fn test_missing_encoder_binary_leaves_pipeline_stopped() {
    let fixture = create_fixture(LONG_RUNNING, Duration::from_secs(5));
    fs::remove_file(fixture.dir.path().join("bin").join("ffmpeg")).unwrap();

    let result = fixture.controller.startup();

    assert!(matches!(
        result,
        Err(DomainError::ProcessSpawn {
            role: ProcessRole::Encoder,
            ..
        })
    ));
    assert!(fixture.pid(ProcessRole::Sender).is_none());
    assert!(fixture.pid(ProcessRole::Encoder).is_none());
    assert!(fixture.pid(ProcessRole::Relay).is_some());
}

#[test]
fn test_externally_killed_process_reports_stopped() {
    let fixture = create_fixture(LONG_RUNNING, Duration::from_secs(5));
    fixture.controller.startup().unwrap();
    let sender = fixture.pid(ProcessRole::Sender).unwrap();

    nix::sys::signal::kill(
        nix::unistd::Pid::from_raw(sender as i32),
        nix::sys::signal::Signal::SIGKILL,
    )
    .unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while fixture.pid(ProcessRole::Sender).is_some() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(50));
    }
    let status = fixture.controller.status();
    let sender_status = status.iter().find(|s| s.role == ProcessRole::Sender).unwrap();
    assert_eq!(sender_status.state, ProcessState::Stopped);
}

#[tokio::test]
async fn test_http_get_raw_config() {
    let fixture = create_fixture(LONG_RUNNING, Duration::from_secs(5));
    let filter = routes(fixture.controller.clone());

    let response = warp::test::request()
        .method("GET")
        .path("/api/config/raw")
        .reply(&filter)
        .await;

    assert_eq!(response.status(), 200);
    let body = String::from_utf8(response.body().to_vec()).unwrap();
    assert!(body.contains("logging:"));
}

#[tokio::test]
async fn test_http_rejects_invalid_yaml() {
    let fixture = create_fixture(LONG_RUNNING, Duration::from_secs(5));
    let filter = routes(fixture.controller.clone());
    let before = fixture.controller.store().read_raw().unwrap();

    let response = warp::test::request()
        .method("POST")
        .path("/api/config/raw")
        .body("not: [valid")
        .reply(&filter)
        .await;

    assert_eq!(response.status(), 400);
    let body = String::from_utf8(response.body().to_vec()).unwrap();
    assert!(body.starts_with("YAML error:"));
    assert_eq!(fixture.controller.store().read_raw().unwrap(), before);
}

#[tokio::test]
async fn test_http_set_config_then_apply() {
    let fixture = create_fixture(LONG_RUNNING, Duration::from_secs(5));
    let filter = routes(fixture.controller.clone());
    let document = format!(
        "rist:\n  peers: []\nlogging:\n  dir: {}\n",
        fixture.log_dir().display()
    );

    let response = warp::test::request()
        .method("POST")
        .path("/api/config/raw")
        .body(document.clone())
        .reply(&filter)
        .await;
    assert_eq!(response.status(), 200);
    assert_eq!(response.body().as_ref(), b"OK");
    assert_eq!(fixture.controller.store().read_raw().unwrap(), document);

    let response = warp::test::request()
        .method("POST")
        .path("/api/apply")
        .reply(&filter)
        .await;
    assert_eq!(response.status(), 200);
    assert_eq!(response.body().as_ref(), b"reloaded");

    assert!(fixture.pid(ProcessRole::Encoder).is_some());
    assert!(fixture.pid(ProcessRole::Sender).is_none());
    assert!(fixture.pid(ProcessRole::Relay).is_none());
}

#[tokio::test]
async fn test_http_apply_with_bad_values_is_rejected() {
    let fixture = create_fixture(LONG_RUNNING, Duration::from_secs(5));
    let filter = routes(fixture.controller.clone());
    fixture
        .controller
        .store()
        .write_raw("encode:\n  framerate: -5\n")
        .unwrap();

    let response = warp::test::request()
        .method("POST")
        .path("/api/apply")
        .reply(&filter)
        .await;

    assert_eq!(response.status(), 400);
    assert!(fixture.pid(ProcessRole::Encoder).is_none());
}

#[tokio::test]
async fn test_http_status_and_health() {
    let fixture = create_fixture(LONG_RUNNING, Duration::from_secs(5));
    let filter = routes(fixture.controller.clone());

    let response = warp::test::request()
        .method("GET")
        .path("/api/status")
        .reply(&filter)
        .await;
    assert_eq!(response.status(), 200);
    let status: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
    let roles: Vec<&str> = status
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["role"].as_str().unwrap())
        .collect();
    assert_eq!(roles, vec!["relay", "encoder", "sender"]);
    assert_eq!(status[0]["state"], "stopped");

    let response = warp::test::request()
        .method("GET")
        .path("/health")
        .reply(&filter)
        .await;
    assert_eq!(response.status(), 200);
    let health: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
    assert_eq!(health["status"], "healthy");
}

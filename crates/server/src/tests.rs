use super::*;
use crate::session::{Session, SessionState};
use gearspin_manifest::CheckOutcome;
use std::fs;
use std::net::TcpListener as StdTcpListener;

const FULL_INDEX: &str = r#"<!DOCTYPE html>
<html>
<head>
  <title>Steampunk Slot Machine RPG</title>
  <link rel="stylesheet" href="css/style.css">
</head>
<body>
  <div id="game-container"></div>
  <img src="assets/images/slot_gear.png">
  <script src="js/game.js"></script>
</body>
</html>"#;

fn write_game_tree(root: &Path) {
    for entry in gearspin_manifest::manifest() {
        if entry.path.is_empty() {
            continue;
        }
        let path = root.join(&entry.path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, entry.path.as_bytes()).unwrap();
    }
    fs::write(root.join("index.html"), FULL_INDEX).unwrap();
}

fn free_port() -> u16 {
    let listener = StdTcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
    listener.local_addr().unwrap().port()
}

#[test]
fn busy_port_is_never_selected() {
    let guard = StdTcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
    let busy = guard.local_addr().unwrap().port();
    assert_ne!(find_available_port(busy, 1), Some(busy));
}

#[test]
fn scan_returns_none_when_every_candidate_is_busy() {
    let guard = StdTcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
    let busy = guard.local_addr().unwrap().port();
    assert_eq!(find_available_port(busy, 1), None);
}

#[test]
fn scan_returns_first_free_candidate() {
    let port = free_port();
    assert_eq!(find_available_port(port, 1), Some(port));
    // The probe listener must not linger: the port stays bindable.
    let _rebound = StdTcpListener::bind((Ipv4Addr::LOCALHOST, port)).unwrap();
}

#[tokio::test]
async fn serves_game_tree_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    write_game_tree(dir.path());
    let handle = start(dir.path().to_path_buf(), 0).await.unwrap();
    let base = handle.base_url();

    let resp = reqwest::get(format!("{base}/")).await.unwrap();
    assert!(resp.status().is_success());
    assert!(resp.text().await.unwrap().contains("Steampunk Slot Machine RPG"));

    let resp = reqwest::get(format!("{base}/css/style.css")).await.unwrap();
    assert!(resp.status().is_success());
    assert_eq!(resp.text().await.unwrap(), "css/style.css");

    let resp = reqwest::get(format!("{base}/assets/images/missing.png"))
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);

    handle.stop().await;
}

#[tokio::test]
async fn stop_releases_port_for_immediate_rebind() {
    let dir = tempfile::tempdir().unwrap();
    let handle = start(dir.path().to_path_buf(), 0).await.unwrap();
    let port = handle.port();
    handle.stop().await;
    let _rebound = StdTcpListener::bind((Ipv4Addr::LOCALHOST, port)).unwrap();
}

#[tokio::test]
async fn bind_conflict_is_reported_as_port_in_use() {
    let dir = tempfile::tempdir().unwrap();
    let first = start(dir.path().to_path_buf(), 0).await.unwrap();
    let err = start(dir.path().to_path_buf(), first.port())
        .await
        .unwrap_err();
    assert!(matches!(err, BindError::PortInUse(p) if p == first.port()));
    first.stop().await;
}

#[tokio::test]
async fn session_falls_back_once_when_requested_port_is_busy() {
    let dir = tempfile::tempdir().unwrap();
    let guard = StdTcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
    let busy = guard.local_addr().unwrap().port();
    let fallback = free_port();

    let mut session = Session::new(dir.path());
    session.start_with_fallback(busy, fallback).await.unwrap();
    assert_eq!(session.state(), SessionState::Running);
    assert_eq!(session.port(), Some(fallback));
    session.stop().await;
    assert_eq!(session.state(), SessionState::Stopped);
}

#[tokio::test]
async fn session_fails_when_requested_and_fallback_are_busy() {
    let dir = tempfile::tempdir().unwrap();
    let guard_a = StdTcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
    let guard_b = StdTcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
    let busy_a = guard_a.local_addr().unwrap().port();
    let busy_b = guard_b.local_addr().unwrap().port();

    let mut session = Session::new(dir.path());
    assert!(session.start_with_fallback(busy_a, busy_b).await.is_err());
    assert_eq!(session.state(), SessionState::Failed);
}

#[tokio::test]
async fn session_rejects_second_start() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = Session::new(dir.path());
    session.start_with_fallback(0, 0).await.unwrap();
    assert!(session.start_scanning(0).await.is_err());
    session.stop().await;
}

#[tokio::test]
async fn full_tree_verifies_nineteen_of_nineteen() {
    let dir = tempfile::tempdir().unwrap();
    write_game_tree(dir.path());
    let mut session = Session::new(dir.path());
    session.start_with_fallback(0, 0).await.unwrap();

    let report = session.verify().await.unwrap();
    assert!(report.server_ok);
    assert_eq!(report.passed(), 19);
    assert_eq!(report.total(), 19);
    assert!(report.content.iter().all(|c| c.is_passed()));
    assert!(report.is_pass());

    session.stop().await;
}

#[tokio::test]
async fn missing_stylesheet_fails_exactly_that_entry() {
    let dir = tempfile::tempdir().unwrap();
    write_game_tree(dir.path());
    fs::remove_file(dir.path().join("css/style.css")).unwrap();

    let mut session = Session::new(dir.path());
    session.start_with_fallback(0, 0).await.unwrap();
    let report = session.verify().await.unwrap();
    session.stop().await;

    assert!(report.server_ok);
    assert_eq!(report.passed(), 18);
    assert!(!report.assets_ok());
    assert!(!report.is_pass());
    let failed: Vec<_> = report.assets.iter().filter(|c| !c.is_passed()).collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].description, "Game stylesheet");
    match &failed[0].outcome {
        CheckOutcome::Failed { reason } => assert!(reason.contains("404")),
        CheckOutcome::Passed { .. } => unreachable!(),
    }
}

#[tokio::test]
async fn missing_title_keeps_server_check_passing() {
    let dir = tempfile::tempdir().unwrap();
    write_game_tree(dir.path());
    let stripped = FULL_INDEX.replace("Steampunk Slot Machine RPG", "placeholder");
    fs::write(dir.path().join("index.html"), stripped).unwrap();

    let mut session = Session::new(dir.path());
    session.start_with_fallback(0, 0).await.unwrap();
    let report = session.verify().await.unwrap();
    session.stop().await;

    assert!(report.server_ok);
    let title = report
        .content
        .iter()
        .find(|c| c.description == "Game title")
        .unwrap();
    assert!(!title.is_passed());
}

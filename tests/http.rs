use once_cell::sync::Lazy;
use reqwest::{Client, StatusCode, redirect::Policy};
use serde::Deserialize;
use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

#[derive(Debug, Deserialize)]
struct Checklist {
    top: bool,
    tasks: Vec<bool>,
}

#[derive(Debug, Deserialize)]
struct HabitCard {
    habit: String,
    tasks: Vec<String>,
    checklist: Checklist,
    shade: String,
}

#[derive(Debug, Deserialize)]
struct TodaySnapshot {
    date: String,
    habits: Vec<HabitCard>,
}

#[derive(Debug, Deserialize)]
struct Cursor {
    year: i32,
    month: u32,
}

#[derive(Debug, Deserialize)]
struct HabitStat {
    habit: String,
    percentage: u32,
}

#[derive(Debug, Deserialize)]
struct DashboardSnapshot {
    stats: Vec<HabitStat>,
    label: String,
    prev: Cursor,
    next: Cursor,
    cells: Vec<Option<serde_json::Value>>,
}

struct TestServer {
    base_url: String,
    child: Child,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

static TEST_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));
static SERVER: Lazy<Mutex<Option<Arc<TestServer>>>> = Lazy::new(|| Mutex::new(None));

#[cfg(unix)]
mod cleanup {
    use std::sync::Once;
    use std::sync::atomic::{AtomicI32, Ordering};

    static REGISTER: Once = Once::new();
    static PID: AtomicI32 = AtomicI32::new(0);

    pub fn register(pid: u32) {
        REGISTER.call_once(|| {
            PID.store(pid as i32, Ordering::SeqCst);
            unsafe {
                libc::atexit(on_exit);
            }
        });
    }

    extern "C" fn on_exit() {
        let pid = PID.load(Ordering::SeqCst);
        if pid > 0 {
            unsafe {
                libc::kill(pid, libc::SIGTERM);
            }
        }
    }
}

fn pick_free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn unique_temp_path(kind: &str) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!("path_of_five_{kind}_{}_{}", std::process::id(), nanos));
    path.to_string_lossy().to_string()
}

async fn wait_until_ready(base_url: &str) {
    let client = Client::new();
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        if let Ok(resp) = client.get(format!("{base_url}/login")).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        if Instant::now() > deadline {
            panic!("server did not become ready");
        }
        sleep(Duration::from_millis(100)).await;
    }
}

async fn spawn_server() -> TestServer {
    let port = pick_free_port();
    let child = Command::new(env!("CARGO_BIN_EXE_path_of_five"))
        .env("PORT", port.to_string())
        .env("APP_DATA_PATH", unique_temp_path("documents") + ".json")
        .env("APP_CACHE_DIR", unique_temp_path("cache"))
        .env("RUST_LOG", "info")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("failed to spawn server");

    #[cfg(unix)]
    cleanup::register(child.id());

    let base_url = format!("http://127.0.0.1:{port}");
    wait_until_ready(&base_url).await;

    TestServer { base_url, child }
}

async fn shared_server() -> Arc<TestServer> {
    let mut guard = SERVER.lock().await;
    if let Some(server) = guard.as_ref() {
        return Arc::clone(server);
    }
    let server = Arc::new(spawn_server().await);
    *guard = Some(Arc::clone(&server));
    server
}

async fn signed_in_client(base_url: &str, name: &str) -> Client {
    let client = Client::builder().cookie_store(true).build().unwrap();
    let response = client
        .post(format!("{base_url}/login"))
        .form(&[("name", name)])
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    assert!(response.url().path().ends_with("/today"));
    client
}

async fn fetch_today(client: &Client, base_url: &str) -> TodaySnapshot {
    client
        .get(format!("{base_url}/api/today"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn http_protected_routes_require_sign_in() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::builder().redirect(Policy::none()).build().unwrap();

    let api = client
        .get(format!("{}/api/today", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(api.status(), StatusCode::UNAUTHORIZED);

    let page = client
        .get(format!("{}/dashboard", server.base_url))
        .send()
        .await
        .unwrap();
    assert!(page.status().is_redirection());
    assert_eq!(page.headers()["location"], "/login");
}

#[tokio::test]
async fn http_habit_toggle_persists_day_record() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = signed_in_client(&server.base_url, "toggle tester").await;

    let saved = client
        .post(format!("{}/cyourpath", server.base_url))
        .form(&[("text", r#"{ "ring": { "tasks": ["stretch", "breathe"] } }"#)])
        .send()
        .await
        .unwrap();
    assert!(saved.status().is_success());
    assert!(saved.text().await.unwrap().contains("Saved successfully"));

    let before = fetch_today(&client, &server.base_url).await;
    assert!(!before.date.is_empty());
    let ring = before.habits.iter().find(|card| card.habit == "ring").unwrap();
    assert_eq!(ring.tasks.len(), 2);
    assert!(!ring.checklist.top);

    let card: HabitCard = client
        .post(format!("{}/api/today/habit", server.base_url))
        .json(&serde_json::json!({ "habit": "ring", "value": true }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(card.checklist.top);
    assert_eq!(card.checklist.tasks, vec![true, true]);
    assert_eq!(card.shade, "complete");

    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        let today = fetch_today(&client, &server.base_url).await;
        let ring = today.habits.iter().find(|card| card.habit == "ring").unwrap();
        if ring.checklist.top {
            assert_eq!(ring.checklist.tasks, vec![true, true]);
            break;
        }
        if Instant::now() > deadline {
            panic!("completion record was never written");
        }
        sleep(Duration::from_millis(50)).await;
    }

    let card: HabitCard = client
        .post(format!("{}/api/today/task", server.base_url))
        .json(&serde_json::json!({ "habit": "ring", "index": 1, "value": false }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(!card.checklist.top);
    assert_eq!(card.checklist.tasks, vec![true, false]);
}

#[tokio::test]
async fn http_editor_rejects_bad_json() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = signed_in_client(&server.base_url, "editor tester").await;

    let before: serde_json::Value = client
        .get(format!("{}/api/habits", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let response = client
        .post(format!("{}/cyourpath", server.base_url))
        .form(&[("text", "{bad json")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.text().await.unwrap().contains("Invalid JSON. Fix it and try again."));

    let after: serde_json::Value = client
        .get(format!("{}/api/habits", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn http_dashboard_navigates_months() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = signed_in_client(&server.base_url, "dashboard tester").await;

    let january: DashboardSnapshot = client
        .get(format!("{}/api/dashboard?year=2025&month=0", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(january.label, "January 2025");
    assert_eq!((january.prev.year, january.prev.month), (2024, 11));
    assert_eq!((january.next.year, january.next.month), (2025, 1));
    // 1 January 2025 is a Wednesday.
    assert_eq!(january.cells.len(), 3 + 31);
    assert_eq!(january.stats.len(), 5);
    assert!(january.stats.iter().all(|stat| stat.percentage == 0));
    assert!(january.stats.iter().any(|stat| stat.habit == "pinky"));

    let invalid = client
        .get(format!("{}/api/dashboard?year=2025&month=12", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
}

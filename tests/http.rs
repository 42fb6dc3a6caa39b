use once_cell::sync::Lazy;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tribe_site::client::HttpTribeApi;
use tribe_site::widget::{FollowState, FollowWidget, WidgetTimings};

#[derive(Debug, Deserialize)]
struct CountBody {
    count: u64,
}

struct TestServer {
    base_url: String,
    data_dir: TempDir,
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
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Once;

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

async fn wait_until_ready(base_url: &str) {
    let client = Client::new();
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        if let Ok(resp) = client.get(format!("{base_url}/health")).send().await {
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
    let data_dir = tempfile::tempdir().expect("temp data dir");
    let child = Command::new(env!("CARGO_BIN_EXE_tribe_site"))
        .env("PORT", port.to_string())
        .env("APP_DATA_DIR", data_dir.path())
        .env("STATIC_DIR", data_dir.path().join("public"))
        .env_remove("EMAIL_USER")
        .env_remove("EMAIL_PASS")
        .env("RUST_LOG", "info")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("failed to spawn server");

    #[cfg(unix)]
    cleanup::register(child.id());

    let base_url = format!("http://127.0.0.1:{port}");
    wait_until_ready(&base_url).await;

    TestServer {
        base_url,
        data_dir,
        child,
    }
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

async fn tribe_count(client: &Client, base_url: &str) -> u64 {
    let body: CountBody = client
        .get(format!("{base_url}/api/tribe-count"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    body.count
}

async fn post(client: &Client, url: String, body: Value) -> (StatusCode, Value) {
    let response = client.post(url).json(&body).send().await.unwrap();
    let status = response.status();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn http_add_follower_then_duplicate() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let before = tribe_count(&client, &server.base_url).await;

    let (status, body) = post(
        &client,
        format!("{}/api/add-follower", server.base_url),
        json!({ "email": "A@X.com" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["count"], before + 1);

    let (_, check) = post(
        &client,
        format!("{}/api/check-follower", server.base_url),
        json!({ "email": "a@x.com" }),
    )
    .await;
    assert_eq!(check["isFollower"], true);

    let (status, body) = post(
        &client,
        format!("{}/api/add-follower", server.base_url),
        json!({ "email": "A@X.com" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Already a tribe member!");
    assert_eq!(body["count"], before + 1);
    assert_eq!(tribe_count(&client, &server.base_url).await, before + 1);

    let followers: Vec<Value> = serde_json::from_slice(
        &std::fs::read(server.data_dir.path().join("followers.json")).unwrap(),
    )
    .unwrap();
    let matching = followers
        .iter()
        .filter(|f| f["email"].as_str().unwrap().eq_ignore_ascii_case("a@x.com"))
        .count();
    assert_eq!(matching, 1);
}

#[tokio::test]
async fn http_rejects_malformed_input() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let before = tribe_count(&client, &server.base_url).await;

    let (status, body) = post(
        &client,
        format!("{}/api/add-follower", server.base_url),
        json!({ "email": "not-an-email" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, _) = post(
        &client,
        format!("{}/api/follow", server.base_url),
        json!({ "name": "Ann", "email": "ann@x.com" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post(
        &client,
        format!("{}/api/contact", server.base_url),
        json!({ "name": "", "email": "ann@x.com", "message": "hi" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(tribe_count(&client, &server.base_url).await, before);
}

#[tokio::test]
async fn http_contact_and_follow_are_persisted() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let before = tribe_count(&client, &server.base_url).await;

    let (status, body) = post(
        &client,
        format!("{}/api/contact", server.base_url),
        json!({ "name": "Ann", "email": "ann@x.com", "message": "hello" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, body) = post(
        &client,
        format!("{}/api/follow", server.base_url),
        json!({ "name": "Bo", "email": "bo@x.com", "message": "count me in" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["count"], before + 1);

    let contacts: Vec<Value> = serde_json::from_slice(
        &std::fs::read(server.data_dir.path().join("contacts.json")).unwrap(),
    )
    .unwrap();
    assert!(contacts.iter().any(|c| c["message"] == "hello" && c["source"] == "Contact Form"));
    assert!(contacts.iter().any(|c| c["message"] == "count me in"));
}

#[tokio::test]
async fn http_widget_flow_against_server() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let timings = WidgetTimings {
        verify_delay: Duration::ZERO,
        reset_delay: Duration::ZERO,
    };
    let mut widget = FollowWidget::new(HttpTribeApi::new(server.base_url.clone()), timings);
    let before = widget.refresh_count().await.unwrap();

    assert_eq!(widget.verify("widget@x.com").await.unwrap(), FollowState::Verified);
    assert_eq!(widget.submit().await.unwrap(), before + 1);
    widget.finish().await.unwrap();

    assert_eq!(widget.verify("WIDGET@x.com").await.unwrap(), FollowState::AlreadyMember);
    assert!(widget.submit().await.is_err());
}

#[tokio::test]
async fn http_tribe_count_falls_back_when_storage_is_broken() {
    let server = spawn_server().await;
    let client = Client::new();

    let (_, body) = post(
        &client,
        format!("{}/api/add-follower", server.base_url),
        json!({ "email": "first@x.com" }),
    )
    .await;
    assert_eq!(body["count"], 51);

    std::fs::write(server.data_dir.path().join("tribe-count.json"), "{ corrupt").unwrap();

    let response = client
        .get(format!("{}/api/tribe-count", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: CountBody = response.json().await.unwrap();
    assert_eq!(body.count, 50);

    let response = client
        .post(format!("{}/api/add-follower", server.base_url))
        .json(&json!({ "email": "second@x.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn http_null_or_unreadable_bodies_get_json_errors() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let before = tribe_count(&client, &server.base_url).await;

    for (path, body) in [
        ("/api/follow", json!({ "name": null, "email": "n@x.com", "message": "hi" })),
        ("/api/contact", json!({ "name": "Ann", "email": "n@x.com", "message": null })),
        ("/api/add-follower", json!({ "email": null })),
        ("/api/add-follower", json!({ "email": 42 })),
    ] {
        let (status, body) = post(&client, format!("{}{path}", server.base_url), body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{path}");
        assert_eq!(body["success"], false, "{path}");
        assert!(body["error"].is_string(), "{path}");
    }

    let response = client
        .post(format!("{}/api/contact", server.base_url))
        .body("name=Ann")
        .header("content-type", "application/x-www-form-urlencoded")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);

    let (status, body) = post(
        &client,
        format!("{}/api/check-follower", server.base_url),
        json!({ "email": null }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isFollower"], false);

    let response = client
        .post(format!("{}/api/check-follower", server.base_url))
        .body("email=a%40x.com")
        .header("content-type", "application/x-www-form-urlencoded")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["isFollower"], false);

    assert_eq!(tribe_count(&client, &server.base_url).await, before);
}

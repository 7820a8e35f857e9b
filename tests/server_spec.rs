mod common;

use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum_test::TestServer;
use cdvtask::server::{
    livereload_router, notify_on_change, prepare_on_change, static_router, ChangedResponse,
    FileWatcher, LiveReload,
};
use cdvtask::tasks::{standard_tasks, TaskGraph};
use tempfile::TempDir;

use common::{checkout, project, RecordingToolkit};

fn served_tree() -> TempDir {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    fs::create_dir_all(dir.path().join("css")).unwrap();
    fs::write(
        dir.path().join("index.html"),
        "<html><head></head><body><h1>Hello</h1></body></html>",
    )
    .unwrap();
    fs::write(dir.path().join("css").join("index.css"), "body { color: red; }").unwrap();
    dir
}

mod static_files {
    use super::*;

    #[tokio::test]
    async fn injects_livereload_into_html() {
        let dir = served_tree();
        let server = TestServer::new(static_router(dir.path(), 35729)).unwrap();

        let response = server.get("/index.html").await;

        response.assert_status_ok();
        let body = response.text();
        assert!(body.contains("<h1>Hello</h1>"));
        assert!(body.contains(":35729/livereload.js?snipver=1"));
        assert!(body.find("livereload.js").unwrap() < body.find("</body>").unwrap());
    }

    #[tokio::test]
    async fn serves_index_for_the_root() {
        let dir = served_tree();
        let server = TestServer::new(static_router(dir.path(), 35729)).unwrap();

        let response = server.get("/").await;

        response.assert_status_ok();
        assert!(response.text().contains("livereload.js"));
    }

    #[tokio::test]
    async fn leaves_other_files_untouched() {
        let dir = served_tree();
        let server = TestServer::new(static_router(dir.path(), 35729)).unwrap();

        let response = server.get("/css/index.css").await;

        response.assert_status_ok();
        assert_eq!(response.text(), "body { color: red; }");
    }

    #[tokio::test]
    async fn missing_files_are_not_found() {
        let dir = served_tree();
        let server = TestServer::new(static_router(dir.path(), 35729)).unwrap();

        server.get("/nope.html").await.assert_status_not_found();
    }

    #[tokio::test]
    async fn serves_oversized_pages_without_the_snippet() {
        let dir = served_tree();
        let page = format!("<html><body>{}</body></html>", "x".repeat(9 * 1024 * 1024));
        fs::write(dir.path().join("big.html"), &page).unwrap();
        let server = TestServer::new(static_router(dir.path(), 35729)).unwrap();

        let response = server.get("/big.html").await;

        response.assert_status_ok();
        let body = response.as_bytes();
        assert_eq!(body.len(), page.len());
        assert!(!response.text().contains("livereload.js"));
    }

    #[tokio::test]
    async fn passes_non_utf8_pages_through_unchanged() {
        let dir = served_tree();
        // "café" in Latin-1
        let page = b"<html><body>caf\xe9</body></html>".to_vec();
        fs::write(dir.path().join("latin1.html"), &page).unwrap();
        let server = TestServer::new(static_router(dir.path(), 35729)).unwrap();

        let response = server.get("/latin1.html").await;

        response.assert_status_ok();
        assert_eq!(response.as_bytes().to_vec(), page);
    }
}

mod livereload {
    use super::*;

    #[tokio::test]
    async fn welcomes_clients() {
        let server = TestServer::new(livereload_router(LiveReload::new(35729))).unwrap();

        let response = server.get("/").await;

        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["tinylr"], "Welcome");
    }

    #[tokio::test]
    async fn changed_query_notifies_subscribers() {
        let reload = LiveReload::new(35729);
        let mut rx = reload.subscribe();
        let server = TestServer::new(livereload_router(reload)).unwrap();

        let response = server
            .get("/changed")
            .add_query_param("files", "css/index.css, index.html")
            .await;

        response.assert_status_ok();
        let body: ChangedResponse = response.json();
        assert_eq!(body.files, vec!["css/index.css", "index.html"]);
        assert_eq!(body.clients, 1);
        assert_eq!(rx.recv().await.unwrap(), "css/index.css");
        assert_eq!(rx.recv().await.unwrap(), "index.html");
    }

    #[tokio::test]
    async fn changed_body_notifies_subscribers() {
        let reload = LiveReload::new(35729);
        let mut rx = reload.subscribe();
        let server = TestServer::new(livereload_router(reload)).unwrap();

        let response = server
            .post("/changed")
            .json(&serde_json::json!({ "files": ["js/index.js"] }))
            .await;

        response.assert_status_ok();
        assert_eq!(rx.recv().await.unwrap(), "js/index.js");
    }

    #[tokio::test]
    async fn changed_without_clients_reports_zero() {
        let server = TestServer::new(livereload_router(LiveReload::new(35729))).unwrap();

        let body: ChangedResponse = server
            .post("/changed")
            .json(&serde_json::json!({ "files": ["index.html"] }))
            .await
            .json();

        assert_eq!(body.clients, 0);
        assert_eq!(body.files, vec!["index.html"]);
    }

    #[tokio::test]
    async fn serves_the_client_script() {
        let server = TestServer::new(livereload_router(LiveReload::new(4242))).unwrap();

        let response = server.get("/livereload.js").await;

        response.assert_status_ok();
        assert_eq!(response.header("content-type"), "application/javascript");
        assert!(response.text().contains(":4242/livereload"));
    }

    #[tokio::test]
    async fn websocket_clients_get_hello_then_reload() {
        let reload = LiveReload::new(35729);
        let server = TestServer::builder()
            .http_transport()
            .build(livereload_router(reload))
            .unwrap();

        let mut socket = server.get_websocket("/livereload").await.into_websocket().await;
        socket
            .send_json(&serde_json::json!({
                "command": "hello",
                "protocols": ["http://livereload.com/protocols/official-7"],
            }))
            .await;
        let hello: serde_json::Value = socket.receive_json().await;
        assert_eq!(hello["command"], "hello");
        assert_eq!(hello["serverName"], "cdvtask");

        let body: ChangedResponse = server
            .post("/changed")
            .json(&serde_json::json!({ "files": ["css/index.css"] }))
            .await
            .json();
        assert_eq!(body.clients, 1);

        let change: serde_json::Value = socket.receive_json().await;
        assert_eq!(
            change,
            serde_json::json!({
                "command": "reload",
                "path": "css/index.css",
                "liveCSS": true,
                "liveImg": true,
            })
        );
    }
}

mod watching {
    use super::*;

    /// A graph whose `prepare` counts its runs and takes `duration`.
    fn counting_prepare(runs: &Arc<AtomicUsize>, duration: Duration) -> TaskGraph {
        let runs = runs.clone();
        TaskGraph::builder()
            .task("prepare", &[], move |_| {
                let runs = runs.clone();
                async move {
                    runs.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(duration).await;
                    Ok(())
                }
            })
            .build()
    }

    #[tokio::test]
    async fn a_burst_of_source_changes_prepares_at_most_twice() {
        let src = tempfile::tempdir().unwrap();
        let runs = Arc::new(AtomicUsize::new(0));
        let watcher = FileWatcher::new(&[src.path().to_path_buf()]).unwrap();
        let graph = counting_prepare(&runs, Duration::from_millis(500));
        let handle = tokio::spawn(prepare_on_change(watcher, graph));

        for i in 0..20 {
            fs::write(src.path().join(format!("file{i}.js")), "var x = 1;").unwrap();
        }
        tokio::time::sleep(Duration::from_millis(2000)).await;
        handle.abort();

        let runs = runs.load(Ordering::SeqCst);
        assert!((1..=2).contains(&runs), "prepare ran {runs} times");
    }

    #[tokio::test]
    async fn served_changes_reach_clients_as_relative_paths() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("css")).unwrap();
        let reload = LiveReload::new(35729);
        let mut rx = reload.subscribe();
        let watcher = FileWatcher::new(&[root.path().to_path_buf()]).unwrap();
        let handle = tokio::spawn(notify_on_change(watcher, root.path().to_path_buf(), reload));

        fs::write(root.path().join("css").join("app.css"), "body {}").unwrap();

        let seen = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let file = rx.recv().await.unwrap();
                if file == "css/app.css" {
                    return file;
                }
            }
        })
        .await;
        handle.abort();

        assert_eq!(seen.expect("no notification for css/app.css"), "css/app.css");
    }
}

mod server_task {
    use super::*;

    #[tokio::test]
    async fn without_a_build_dir_asks_for_recreate() {
        let dir = checkout();
        let toolkit = Arc::new(RecordingToolkit::new());
        let project = project(&dir, toolkit.clone());
        let graph = standard_tasks(project.clone());

        let err = cdvtask::server::run(project, graph).await.unwrap_err();

        assert!(format!("{err:#}").contains("run `recreate`"), "{err:#}");
        assert!(toolkit.calls().is_empty());
    }

    #[tokio::test]
    async fn prepares_once_before_giving_up_on_a_missing_platform() {
        let dir = checkout();
        fs::create_dir_all(dir.path().join("build")).unwrap();
        let toolkit = Arc::new(RecordingToolkit::new());
        let project = project(&dir, toolkit.clone());
        let graph = standard_tasks(project.clone());

        let err = cdvtask::server::run(project, graph).await.unwrap_err();

        assert!(format!("{err:#}").contains("run `recreate`"), "{err:#}");
        assert_eq!(toolkit.ops(), vec!["prepare"]);
    }
}

//! Integration tests for the backfill pipeline
//!
//! These tests use wiremock to serve images and run full scans against a
//! SQLite store in a temporary directory.

use featured_backfill::backfill::run_scan;
use featured_backfill::config::{
    Config, FetcherConfig, NormalizerConfig, ScanConfig, StorageConfig, TriggerConfig,
    DEFAULT_USER_AGENT,
};
use featured_backfill::output::{LineReporter, Reporter};
use featured_backfill::state::{OutcomeKind, Severity};
use featured_backfill::storage::{
    ContentStore, NewRecord, Record, SqliteStorage, StorageError, StorageResult,
};
use image::{DynamicImage, ImageFormat, RgbImage};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

/// Creates a test configuration rooted in the given directory
fn create_test_config(dir: &Path) -> Config {
    Config {
        fetcher: FetcherConfig {
            timeout_secs: 5,
            ..FetcherConfig::default()
        },
        normalizer: NormalizerConfig::default(),
        scan: ScanConfig {
            record_type: "post".to_string(),
            pacing_ms: 0, // No pause between records in tests
        },
        storage: StorageConfig {
            database_path: dir.join("content.db").display().to_string(),
            media_dir: dir.join("media").display().to_string(),
            temp_dir: Some(dir.join("scratch").display().to_string()),
        },
        trigger: TriggerConfig::default(),
    }
}

fn open_store(config: &Config) -> SqliteStorage {
    SqliteStorage::new(
        Path::new(&config.storage.database_path),
        Path::new(&config.storage.media_dir),
    )
    .expect("Failed to open storage")
}

fn encode_image(format: ImageFormat) -> Vec<u8> {
    // RGB so every encoder under test accepts it
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, image::Rgb([200, 10, 10])));
    let mut bytes = Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, format)
        .expect("Failed to encode test image");
    bytes.into_inner()
}

fn scratch_files(config: &Config) -> Vec<PathBuf> {
    match std::fs::read_dir(config.storage.temp_dir()) {
        Ok(entries) => entries.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
        Err(_) => Vec::new(),
    }
}

/// Collects reporter lines in memory
fn line_reporter() -> LineReporter<Vec<u8>> {
    LineReporter::new(Vec::new())
}

fn report_lines(reporter: LineReporter<Vec<u8>>) -> Vec<String> {
    String::from_utf8(reporter.into_inner())
        .expect("Report is not UTF-8")
        .lines()
        .map(String::from)
        .collect()
}

async fn mount_image(server: &MockServer, route: &str, bytes: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(bytes))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_png_is_converted_and_attached() {
    let mock_server = MockServer::start().await;
    mount_image(&mock_server, "/images/photo.png", encode_image(ImageFormat::Png)).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path());
    let mut store = open_store(&config);

    let body = format!(
        r#"<p>Intro</p><img class="wide" src="{}/images/photo.png" alt="">"#,
        mock_server.uri()
    );
    let id = store
        .insert_record(&NewRecord::published("post", "Hello", &body))
        .unwrap();

    let mut reporter = line_reporter();
    let outcomes = run_scan(&config, &mut store, &mut reporter).await.unwrap();

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].kind, OutcomeKind::Succeeded);
    assert_eq!(outcomes[0].notes.len(), 1);
    assert_eq!(outcomes[0].notes[0].severity, Severity::Info);
    assert!(outcomes[0].notes[0].message.contains("image/png"));

    let asset_id = store.featured_image_of(id).unwrap().expect("No featured image set");
    let asset = store.get_asset(asset_id).unwrap();
    assert_eq!(asset.filename, "photo.jpg");
    assert_eq!(asset.mime_type, "image/jpeg");
    assert_eq!(asset.owner_record_id, id);
    assert!(Path::new(&asset.stored_path).exists());

    let stored = std::fs::read(&asset.stored_path).unwrap();
    assert_eq!(image::guess_format(&stored).unwrap(), ImageFormat::Jpeg);

    assert!(scratch_files(&config).is_empty(), "Scratch files left behind");

    let lines = report_lines(reporter);
    assert_eq!(lines[0], "[INFO] Starting process for 1 records...");
    assert!(lines.contains(&format!(
        "[OK] Success for record #{} (\"Hello\"): Featured image set.",
        id
    )));
    assert_eq!(lines.last().unwrap(), "[OK] Process complete!");
}

#[tokio::test]
async fn test_jpeg_is_uploaded_unchanged() {
    let mock_server = MockServer::start().await;
    let jpeg = encode_image(ImageFormat::Jpeg);
    mount_image(&mock_server, "/a.jpeg", jpeg.clone()).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path());
    let mut store = open_store(&config);

    let body = format!(r#"<IMG SRC='{}/a.jpeg'>"#, mock_server.uri());
    let id = store
        .insert_record(&NewRecord::published("post", "Jpeg", &body))
        .unwrap();

    let outcomes = run_scan(&config, &mut store, &mut line_reporter())
        .await
        .unwrap();

    assert_eq!(outcomes[0].kind, OutcomeKind::Succeeded);
    assert!(outcomes[0].notes.is_empty());

    let asset = store
        .get_asset(store.featured_image_of(id).unwrap().unwrap())
        .unwrap();
    assert_eq!(asset.filename, "a.jpeg");
    assert_eq!(std::fs::read(&asset.stored_path).unwrap(), jpeg);
}

#[tokio::test]
async fn test_skips_make_no_requests() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(encode_image(ImageFormat::Png)))
        .expect(0)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path());
    let mut store = open_store(&config);

    // Give the first record a featured image up front
    let body = format!(r#"<img src="{}/x.png">"#, mock_server.uri());
    let with_image = store
        .insert_record(&NewRecord::published("post", "Done", &body))
        .unwrap();
    let existing = dir.path().join("existing.jpg");
    std::fs::write(&existing, encode_image(ImageFormat::Jpeg)).unwrap();
    let asset_id = store
        .upload_and_attach(&existing, "existing.jpg", with_image)
        .unwrap();
    store.set_featured_image(with_image, asset_id).unwrap();

    store
        .insert_record(&NewRecord::published("post", "Text only", "<p>Nothing to see</p>"))
        .unwrap();

    let outcomes = run_scan(&config, &mut store, &mut line_reporter())
        .await
        .unwrap();

    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].kind, OutcomeKind::SkippedAlreadySet);
    assert_eq!(outcomes[1].kind, OutcomeKind::SkippedNoImageFound);
    assert_eq!(store.featured_image_of(with_image).unwrap(), Some(asset_id));

    mock_server.verify().await;
}

#[tokio::test]
async fn test_not_found_is_fetch_failure() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing.png"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path());
    let mut store = open_store(&config);

    let body = format!(r#"<img src="{}/missing.png">"#, mock_server.uri());
    let id = store
        .insert_record(&NewRecord::published("post", "Broken", &body))
        .unwrap();

    let mut reporter = line_reporter();
    let outcomes = run_scan(&config, &mut store, &mut reporter).await.unwrap();

    assert_eq!(outcomes[0].kind, OutcomeKind::FailedFetch);
    assert!(outcomes[0].message.contains("404"));
    assert_eq!(store.featured_image_of(id).unwrap(), None);
    assert!(scratch_files(&config).is_empty());

    let lines = report_lines(reporter);
    assert!(lines.contains(&format!(
        "[ERROR] Error for record #{}: Could not download image. Server responded with code: 404",
        id
    )));
}

#[tokio::test]
async fn test_first_image_wins() {
    let mock_server = MockServer::start().await;
    mount_image(&mock_server, "/first.jpg", encode_image(ImageFormat::Jpeg)).await;
    Mock::given(method("GET"))
        .and(path("/second.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(encode_image(ImageFormat::Jpeg)))
        .expect(0)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path());
    let mut store = open_store(&config);

    let body = format!(
        "<img src=\"{uri}/first.jpg\">\n<img src=\"{uri}/second.jpg\">",
        uri = mock_server.uri()
    );
    let id = store
        .insert_record(&NewRecord::published("post", "Two", &body))
        .unwrap();

    run_scan(&config, &mut store, &mut line_reporter())
        .await
        .unwrap();

    let asset = store
        .get_asset(store.featured_image_of(id).unwrap().unwrap())
        .unwrap();
    assert_eq!(asset.filename, "first.jpg");

    mock_server.verify().await;
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/once.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(encode_image(ImageFormat::Png)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path());
    let mut store = open_store(&config);

    let body = format!(r#"<img src="{}/once.png">"#, mock_server.uri());
    store
        .insert_record(&NewRecord::published("post", "Once", &body))
        .unwrap();

    let first = run_scan(&config, &mut store, &mut line_reporter())
        .await
        .unwrap();
    let second = run_scan(&config, &mut store, &mut line_reporter())
        .await
        .unwrap();

    assert_eq!(first[0].kind, OutcomeKind::Succeeded);
    assert_eq!(second[0].kind, OutcomeKind::SkippedAlreadySet);
    assert_eq!(store.statistics("post").unwrap().media_assets, 1);

    mock_server.verify().await;
}

#[tokio::test]
async fn test_undecodable_image_uploads_original() {
    let mock_server = MockServer::start().await;
    // PNG signature followed by garbage
    let mut broken = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    broken.extend_from_slice(b"not really a png");
    mount_image(&mock_server, "/broken.png", broken).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path());
    let mut store = open_store(&config);

    let body = format!(r#"<img src="{}/broken.png">"#, mock_server.uri());
    let id = store
        .insert_record(&NewRecord::published("post", "Broken png", &body))
        .unwrap();

    let mut reporter = line_reporter();
    let outcomes = run_scan(&config, &mut store, &mut reporter).await.unwrap();

    assert_eq!(outcomes[0].kind, OutcomeKind::Succeeded);
    assert_eq!(outcomes[0].notes[0].severity, Severity::Warning);

    let asset = store
        .get_asset(store.featured_image_of(id).unwrap().unwrap())
        .unwrap();
    assert_eq!(asset.filename, "broken.png");
    assert!(scratch_files(&config).is_empty());

    let lines = report_lines(reporter);
    assert!(lines
        .iter()
        .any(|l| l.starts_with(&format!("[WARN] Warning for record #{}: Could not convert image", id))));
}

/// A store that rejects every upload and remembers the paths it was given
struct RejectingStore {
    records: Vec<Record>,
    offered: Vec<PathBuf>,
}

impl ContentStore for RejectingStore {
    fn list_records(&self, _record_type: &str) -> StorageResult<Vec<Record>> {
        Ok(self.records.clone())
    }

    fn has_featured_image(&self, _record_id: i64) -> StorageResult<bool> {
        Ok(false)
    }

    fn upload_and_attach(
        &mut self,
        file: &Path,
        _filename: &str,
        _owner_record_id: i64,
    ) -> StorageResult<i64> {
        assert!(file.exists(), "Upload was offered a missing file");
        self.offered.push(file.to_path_buf());
        Err(StorageError::Rejected("Upload quota exceeded.".to_string()))
    }

    fn set_featured_image(&mut self, _record_id: i64, _asset_id: i64) -> StorageResult<()> {
        panic!("set_featured_image called after a failed upload");
    }
}

#[tokio::test]
async fn test_upload_failure_cleans_up() {
    let mock_server = MockServer::start().await;
    mount_image(&mock_server, "/a.gif", encode_image(ImageFormat::Gif)).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path());
    let mut store = RejectingStore {
        records: vec![Record {
            id: 42,
            title: "Rejected".to_string(),
            body: format!(r#"<img src="{}/a.gif">"#, mock_server.uri()),
            has_featured_image: false,
        }],
        offered: Vec::new(),
    };

    let outcomes = run_scan(&config, &mut store, &mut line_reporter())
        .await
        .unwrap();

    assert_eq!(outcomes[0].kind, OutcomeKind::FailedUpload);
    assert_eq!(outcomes[0].message, "Upload quota exceeded.");
    assert_eq!(store.offered.len(), 1);
    assert!(!store.offered[0].exists());
    assert!(scratch_files(&config).is_empty());
}

#[tokio::test]
async fn test_failures_do_not_stop_the_scan() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone.png"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;
    mount_image(&mock_server, "/ok.png", encode_image(ImageFormat::Png)).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path());
    let mut store = open_store(&config);

    for (title, route) in [("A", "gone.png"), ("B", "ok.png")] {
        let body = format!(r#"<img src="{}/{}">"#, mock_server.uri(), route);
        store
            .insert_record(&NewRecord::published("post", title, &body))
            .unwrap();
    }
    // Drafts and other types are never listed
    store
        .insert_record(&NewRecord {
            record_type: "post",
            status: "draft",
            title: "Draft",
            body: "<img src=\"http://127.0.0.1:9/x.png\">",
        })
        .unwrap();
    store
        .insert_record(&NewRecord::published("page", "Page", "<img src=\"http://127.0.0.1:9/y.png\">"))
        .unwrap();

    let outcomes = run_scan(&config, &mut store, &mut line_reporter())
        .await
        .unwrap();

    let kinds: Vec<OutcomeKind> = outcomes.iter().map(|o| o.kind).collect();
    assert_eq!(kinds, vec![OutcomeKind::FailedFetch, OutcomeKind::Succeeded]);
}

#[tokio::test]
async fn test_empty_store_reports_warning() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path());
    let mut store = open_store(&config);

    let mut reporter = line_reporter();
    let outcomes = run_scan(&config, &mut store, &mut reporter).await.unwrap();

    assert!(outcomes.is_empty());
    assert_eq!(
        report_lines(reporter),
        vec!["[WARN] No published records found to process."]
    );
}

#[test]
fn test_reporter_trait_object() {
    let mut reporters: Vec<Box<dyn Reporter>> = vec![Box::new(line_reporter())];
    reporters.no_records();
}

#[tokio::test]
async fn test_jpeg_without_matching_extension_is_renamed() {
    let mock_server = MockServer::start().await;
    mount_image(&mock_server, "/photo", encode_image(ImageFormat::Jpeg)).await;
    mount_image(&mock_server, "/mislabelled.png", encode_image(ImageFormat::Jpeg)).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path());
    let mut store = open_store(&config);

    let mut ids = Vec::new();
    for route in ["photo", "mislabelled.png"] {
        let body = format!(r#"<img src="{}/{}">"#, mock_server.uri(), route);
        ids.push(
            store
                .insert_record(&NewRecord::published("post", route, &body))
                .unwrap(),
        );
    }

    let outcomes = run_scan(&config, &mut store, &mut line_reporter())
        .await
        .unwrap();

    assert!(outcomes.iter().all(|o| o.kind == OutcomeKind::Succeeded));
    assert!(outcomes.iter().all(|o| o.notes.is_empty()));

    let names: Vec<(String, String)> = ids
        .iter()
        .map(|id| {
            let asset = store
                .get_asset(store.featured_image_of(*id).unwrap().unwrap())
                .unwrap();
            (asset.filename, asset.mime_type)
        })
        .collect();
    assert_eq!(
        names,
        vec![
            ("photo.jpg".to_string(), "image/jpeg".to_string()),
            ("mislabelled.jpg".to_string(), "image/jpeg".to_string()),
        ]
    );
}

/// Matches requests whose whole `User-Agent` value is the default browser string
struct BrowserUserAgent;

impl Match for BrowserUserAgent {
    fn matches(&self, request: &Request) -> bool {
        request
            .headers
            .get("user-agent")
            .and_then(|value| value.to_str().ok())
            == Some(DEFAULT_USER_AGENT)
    }
}

#[tokio::test]
async fn test_requests_carry_browser_user_agent() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ua.jpg"))
        .and(BrowserUserAgent)
        .respond_with(ResponseTemplate::new(200).set_body_bytes(encode_image(ImageFormat::Jpeg)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path());
    let mut store = open_store(&config);

    let body = format!(r#"<img src="{}/ua.jpg">"#, mock_server.uri());
    store
        .insert_record(&NewRecord::published("post", "Agent", &body))
        .unwrap();

    let outcomes = run_scan(&config, &mut store, &mut line_reporter())
        .await
        .unwrap();

    assert_eq!(outcomes[0].kind, OutcomeKind::Succeeded);
    mock_server.verify().await;
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow.jpg"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(encode_image(ImageFormat::Jpeg))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(dir.path());
    config.fetcher.timeout_secs = 1;
    let mut store = open_store(&config);

    let body = format!(r#"<img src="{}/slow.jpg">"#, mock_server.uri());
    let id = store
        .insert_record(&NewRecord::published("post", "Slow", &body))
        .unwrap();

    let outcomes = run_scan(&config, &mut store, &mut line_reporter())
        .await
        .unwrap();

    assert_eq!(outcomes[0].kind, OutcomeKind::FailedFetch);
    assert!(
        outcomes[0].message.contains("timed out"),
        "unexpected message: {}",
        outcomes[0].message
    );
    assert_eq!(store.featured_image_of(id).unwrap(), None);
    assert!(scratch_files(&config).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_pause_follows_every_record() {
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(dir.path());
    config.scan.pacing_ms = 250;
    let mut store = open_store(&config);

    for title in ["One", "Two", "Three"] {
        store
            .insert_record(&NewRecord::published("post", title, "<p>No image</p>"))
            .unwrap();
    }

    let start = tokio::time::Instant::now();
    let outcomes = run_scan(&config, &mut store, &mut line_reporter())
        .await
        .unwrap();
    let elapsed = start.elapsed();

    assert_eq!(outcomes.len(), 3);
    assert!(outcomes
        .iter()
        .all(|o| o.kind == OutcomeKind::SkippedNoImageFound));
    assert!(
        elapsed >= Duration::from_millis(750) && elapsed < Duration::from_millis(1000),
        "elapsed {:?}",
        elapsed
    );
}

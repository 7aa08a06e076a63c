//! Progress journal against a real vault directory.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use help_me_fast_lib::models::NewProgressEntry;
use help_me_fast_lib::{FileStore, FsStore, ManualClock, VaultSession};
use tempfile::TempDir;

const PNG_BYTES: &[u8] = &[
    0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D, b'I', b'H', b'D', b'R',
];

async fn open_session(dir: &TempDir) -> Arc<VaultSession> {
    let store: Arc<dyn FileStore> = Arc::new(FsStore::new());
    let session = VaultSession::new(
        dir.path().join("settings.json"),
        store,
        Arc::new(ManualClock::new(1_700_000_000_000)),
    );
    session.open(dir.path().join("vault")).await.unwrap();
    Arc::new(session)
}

fn weigh_in(date: &str, weight: f64) -> NewProgressEntry {
    NewProgressEntry {
        date: date.into(),
        weight: Some(weight),
        ..Default::default()
    }
}

fn photo_files(dir: &TempDir) -> Vec<std::path::PathBuf> {
    match std::fs::read_dir(dir.path().join("vault/photos")) {
        Ok(entries) => entries.map(|entry| entry.unwrap().path()).collect(),
        Err(_) => Vec::new(),
    }
}

#[tokio::test]
async fn entries_come_back_newest_first() {
    let dir = TempDir::new().unwrap();
    let session = open_session(&dir).await;

    session.add_entry(weigh_in("2024-01-01", 80.0)).await.unwrap();
    session.add_entry(weigh_in("2024-02-01", 78.0)).await.unwrap();

    let weights: Vec<_> = session
        .entries()
        .await
        .unwrap()
        .into_iter()
        .map(|view| view.entry.weight.unwrap())
        .collect();
    assert_eq!(weights, vec![78.0, 80.0]);

    let history = session.snapshot().await.history.unwrap();
    assert_eq!(history.progress_entries[0].date, "2024-02-01");
}

#[tokio::test]
async fn mixed_date_formats_sort_by_instant() {
    let dir = TempDir::new().unwrap();
    let session = open_session(&dir).await;

    session.add_entry(weigh_in("2024-03-01T08:00:00Z", 77.0)).await.unwrap();
    session.add_entry(weigh_in("2024-03-01T20:00:00.000", 76.5)).await.unwrap();
    session.add_entry(weigh_in("2024-02-15", 78.0)).await.unwrap();

    let dates: Vec<_> = session
        .entries()
        .await
        .unwrap()
        .into_iter()
        .map(|view| view.entry.date)
        .collect();
    assert_eq!(
        dates,
        vec!["2024-03-01T20:00:00.000", "2024-03-01T08:00:00Z", "2024-02-15"]
    );
}

#[tokio::test]
async fn photo_is_stored_inlined_and_removed_with_entry() {
    let dir = TempDir::new().unwrap();
    let session = open_session(&dir).await;
    let inlined = format!("data:image/png;base64,{}", STANDARD.encode(PNG_BYTES));

    let entry = session
        .add_entry(NewProgressEntry {
            date: "2024-01-01".into(),
            photo_base64: Some(inlined.clone()),
            ..Default::default()
        })
        .await
        .unwrap();

    let photo_path = entry.photo_path.clone().unwrap();
    assert!(photo_path.starts_with("photos/photo_"));
    assert!(photo_path.ends_with(".png"));
    assert_eq!(
        std::fs::read(dir.path().join("vault").join(&photo_path)).unwrap(),
        PNG_BYTES
    );

    let views = session.entries().await.unwrap();
    assert_eq!(views[0].photo_base64.as_deref(), Some(inlined.as_str()));

    assert!(session.delete_entry(&entry.id).await.unwrap());
    assert!(session.entries().await.unwrap().is_empty());
    assert!(photo_files(&dir).is_empty());
}

#[tokio::test]
async fn jpeg_photos_use_jpg_extension() {
    let dir = TempDir::new().unwrap();
    let session = open_session(&dir).await;
    let jpeg = [0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10, b'J', b'F', b'I', b'F', 0];

    let entry = session
        .add_entry(NewProgressEntry {
            date: "2024-01-01".into(),
            photo_base64: Some(format!("data:image/jpeg;base64,{}", STANDARD.encode(jpeg))),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(entry.photo_path.unwrap().ends_with(".jpg"));
}

#[tokio::test]
async fn bad_photo_encoding_keeps_the_rest_of_the_entry() {
    let dir = TempDir::new().unwrap();
    let session = open_session(&dir).await;

    let entry = session
        .add_entry(NewProgressEntry {
            date: "2024-01-01".into(),
            weight: Some(80.0),
            photo_base64: Some("not-a-data-uri".into()),
            notes: None,
        })
        .await
        .unwrap();
    assert_eq!(entry.photo_path, None);
    assert_eq!(entry.weight, Some(80.0));
    assert!(photo_files(&dir).is_empty());
}

#[tokio::test]
async fn missing_photo_file_reads_as_none() {
    let dir = TempDir::new().unwrap();
    let session = open_session(&dir).await;
    let inlined = format!("data:image/png;base64,{}", STANDARD.encode(PNG_BYTES));

    let entry = session
        .add_entry(NewProgressEntry {
            date: "2024-01-01".into(),
            photo_base64: Some(inlined),
            notes: Some("day one".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    std::fs::remove_file(dir.path().join("vault").join(entry.photo_path.unwrap())).unwrap();

    let views = session.entries().await.unwrap();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].photo_base64, None);
}

#[tokio::test]
async fn deleting_unknown_id_changes_nothing() {
    let dir = TempDir::new().unwrap();
    let session = open_session(&dir).await;
    session.add_entry(weigh_in("2024-01-01", 80.0)).await.unwrap();

    let history_path = dir.path().join("vault/history.json");
    let before = std::fs::read_to_string(&history_path).unwrap();
    assert!(!session.delete_entry("entry_missing").await.unwrap());
    assert_eq!(std::fs::read_to_string(&history_path).unwrap(), before);
}

#[tokio::test]
async fn empty_entries_are_rejected() {
    let dir = TempDir::new().unwrap();
    let session = open_session(&dir).await;
    let result = session
        .add_entry(NewProgressEntry {
            date: "2024-01-01".into(),
            ..Default::default()
        })
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn concurrent_adds_all_survive() {
    let dir = TempDir::new().unwrap();
    let session = open_session(&dir).await;

    let mut handles = Vec::new();
    for day in 1..=12 {
        let session = session.clone();
        handles.push(tokio::spawn(async move {
            session
                .add_entry(weigh_in(&format!("2024-01-{day:02}"), 80.0 - day as f64 * 0.1))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let entries = session.entries().await.unwrap();
    assert_eq!(entries.len(), 12);
    assert_eq!(entries[0].entry.date, "2024-01-12");
    assert_eq!(entries[11].entry.date, "2024-01-01");
}

#[tokio::test]
async fn one_odd_fast_does_not_wipe_the_journal() {
    let dir = TempDir::new().unwrap();
    let session = open_session(&dir).await;
    let history_path = dir.path().join("vault/history.json");
    std::fs::write(
        &history_path,
        r#"{
            "fasts": [
                { "id": "f1", "startTime": 1700000000000, "endTime": 1700057600000, "duration": 57600 },
                { "id": "f2", "startTime": "1700100000000" }
            ],
            "progressEntries": [ { "id": "e1", "date": "2024-01-01", "weight": 80 } ]
        }"#,
    )
    .unwrap();

    session.add_entry(weigh_in("2024-02-01", 78.0)).await.unwrap();

    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&history_path).unwrap()).unwrap();
    let fast_ids: Vec<_> = saved["fasts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|fast| fast["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(fast_ids, vec!["f2", "f1"]);
    assert_eq!(saved["fasts"][0]["startTime"], 1_700_100_000_000i64);

    let dates: Vec<_> = session
        .entries()
        .await
        .unwrap()
        .into_iter()
        .map(|view| (view.entry.date, view.entry.weight))
        .collect();
    assert_eq!(
        dates,
        vec![
            ("2024-02-01".to_string(), Some(78.0)),
            ("2024-01-01".to_string(), Some(80.0)),
        ]
    );
}

#[tokio::test]
async fn unparseable_history_is_left_untouched() {
    let dir = TempDir::new().unwrap();
    let session = open_session(&dir).await;
    let history_path = dir.path().join("vault/history.json");
    std::fs::write(&history_path, "{ \"fasts\": [ truncated").unwrap();

    assert!(session.add_entry(weigh_in("2024-02-01", 78.0)).await.is_err());
    assert_eq!(
        std::fs::read_to_string(&history_path).unwrap(),
        "{ \"fasts\": [ truncated"
    );
    assert!(photo_files(&dir).is_empty());
}

#[tokio::test]
async fn deleting_one_photo_entry_keeps_the_others() {
    let dir = TempDir::new().unwrap();
    let session = open_session(&dir).await;
    let inlined = format!("data:image/png;base64,{}", STANDARD.encode(PNG_BYTES));

    let mut added = Vec::new();
    for day in 1..=3 {
        let entry = session
            .add_entry(NewProgressEntry {
                date: format!("2024-01-0{day}"),
                weight: Some(80.0 - day as f64),
                photo_base64: Some(inlined.clone()),
                ..Default::default()
            })
            .await
            .unwrap();
        added.push(entry);
    }
    assert_eq!(photo_files(&dir).len(), 3);

    assert!(session.delete_entry(&added[1].id).await.unwrap());

    let remaining = session.entries().await.unwrap();
    let ids: Vec<_> = remaining.iter().map(|view| view.entry.id.clone()).collect();
    assert_eq!(ids, vec![added[2].id.clone(), added[0].id.clone()]);
    for view in &remaining {
        assert_eq!(view.photo_base64.as_deref(), Some(inlined.as_str()));
    }

    let vault = dir.path().join("vault");
    assert!(!vault.join(added[1].photo_path.as_ref().unwrap()).exists());
    assert!(vault.join(added[0].photo_path.as_ref().unwrap()).exists());
    assert!(vault.join(added[2].photo_path.as_ref().unwrap()).exists());
    assert_eq!(photo_files(&dir).len(), 2);

    let history = session.snapshot().await.history.unwrap();
    assert_eq!(history.progress_entries.len(), 2);
}

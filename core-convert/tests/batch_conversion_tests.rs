//! Integration tests for batch conversion
//!
//! These tests drive full batches through the coordinator with an in-memory
//! document tree, a mocked decoder and a real scratch directory:
//! - Clean conversions and export naming
//! - Every per-file failure class
//! - Delete-source behaviour
//! - Progress reporting, cancellation and scratch hygiene

mod common;

use common::{decode_writes, entry_for, metadata_table, Harness, MemoryTree, MockDecoder};
use core_catalog::SortMode;
use core_convert::{BatchProgress, FailedFile, FailureClass, NoticeKind, UserPreferences};
use core_runtime::events::{ConversionEvent, CoreEvent};

fn prefs(delete_source: bool) -> UserPreferences {
    UserPreferences {
        sort_mode: SortMode::ByTitle,
        delete_source,
    }
}

const ALPHA: &str = r#"{"musicName":"Alpha","artist":[["Bob"]],"album":"X"}"#;

#[tokio::test]
async fn test_single_file_converts_to_destination() {
    let tree = MemoryTree::new();
    let song = tree.add_source_file("song.ncm", b"encrypted", 10);

    let mut decoder = MockDecoder::new();
    metadata_table(&mut decoder, &[("song.ncm", ALPHA)]);
    decoder
        .expect_decode()
        .withf(|request| {
            request.title == "Alpha"
                && request.artist == "Bob"
                && request.album == "X"
                && request.cover.is_none()
        })
        .times(1)
        .returning(|request| {
            std::fs::write(request.output_dir.join("song.mp3"), b"mp3-bytes").unwrap();
            Ok(1)
        });

    let h = Harness::with_tree(decoder, tree);
    let batch = h
        .coordinator
        .start_batch(
            vec![entry_for(&song, "Alpha", "Bob")],
            MemoryTree::destination(),
            prefs(false),
        )
        .await
        .unwrap();
    let report = batch.join().await.unwrap();

    assert_eq!(report.success_count, 1);
    assert!(report.failures.is_empty());
    assert!(!report.cancelled);
    assert_eq!(
        h.tree.destination_files(),
        vec![(
            "song.mp3".to_string(),
            "audio/mpeg".to_string(),
            b"mp3-bytes".to_vec()
        )]
    );
    assert!(h.tree.contains(&song.handle), "source kept without delete flag");
    assert!(h.scratch_files().is_empty());
}

#[tokio::test]
async fn test_empty_metadata_fails_without_decoding() {
    let tree = MemoryTree::new();
    let blank = tree.add_source_file("blank.ncm", b"x", 0);

    let mut decoder = MockDecoder::new();
    metadata_table(&mut decoder, &[("blank.ncm", "{}")]);
    decoder.expect_decode().times(0);

    let h = Harness::with_tree(decoder, tree);
    let report = h
        .coordinator
        .start_batch(
            vec![entry_for(&blank, "blank.ncm", "?")],
            MemoryTree::destination(),
            prefs(false),
        )
        .await
        .unwrap()
        .join()
        .await
        .unwrap();

    assert_eq!(report.success_count, 0);
    assert_eq!(
        report.failures,
        vec![FailedFile {
            original_name: "blank.ncm".to_string(),
            class: FailureClass::MetadataEmpty,
        }]
    );
    assert!(h.scratch_files().is_empty());
    assert!(h.tree.destination_files().is_empty());
}

#[tokio::test]
async fn test_decoder_success_without_output_is_output_not_found() {
    let tree = MemoryTree::new();
    let song = tree.add_source_file("song.ncm", b"x", 0);

    let mut decoder = MockDecoder::new();
    metadata_table(&mut decoder, &[("song.ncm", ALPHA)]);
    decoder.expect_decode().returning(|_| Ok(1));

    let h = Harness::with_tree(decoder, tree);
    let report = h
        .coordinator
        .start_batch(
            vec![entry_for(&song, "Alpha", "Bob")],
            MemoryTree::destination(),
            prefs(true),
        )
        .await
        .unwrap()
        .join()
        .await
        .unwrap();

    assert_eq!(report.failures[0].class, FailureClass::OutputNotFound);
    assert!(h.tree.contains(&song.handle), "failed file keeps its source");
    assert!(h.scratch_files().is_empty());
}

#[tokio::test]
async fn test_non_success_status_is_decode_failed() {
    let tree = MemoryTree::new();
    let song = tree.add_source_file("song.ncm", b"x", 0);

    let mut decoder = MockDecoder::new();
    metadata_table(&mut decoder, &[("song.ncm", ALPHA)]);
    decoder.expect_decode().returning(|request| {
        // Output written but status says failure: status wins
        std::fs::write(request.output_dir.join("song.mp3"), b"junk").unwrap();
        Ok(0)
    });

    let h = Harness::with_tree(decoder, tree);
    let report = h
        .coordinator
        .start_batch(
            vec![entry_for(&song, "Alpha", "Bob")],
            MemoryTree::destination(),
            prefs(false),
        )
        .await
        .unwrap()
        .join()
        .await
        .unwrap();

    assert_eq!(report.failures[0].class, FailureClass::DecodeFailed);
    assert!(h.tree.destination_files().is_empty());
    assert!(h.scratch_files().is_empty());
}

#[tokio::test]
async fn test_missing_source_is_stage_failed() {
    let tree = MemoryTree::new();
    let song = tree.add_source_file("song.ncm", b"x", 0);
    let mut gone = entry_for(&song, "Gone", "Nobody");
    gone.handle = bridge_traits::DocumentHandle::new("doc:missing");

    let mut decoder = MockDecoder::new();
    decoder.expect_get_metadata().times(0);
    decoder.expect_decode().times(0);

    let h = Harness::with_tree(decoder, tree);
    let report = h
        .coordinator
        .start_batch(vec![gone], MemoryTree::destination(), prefs(false))
        .await
        .unwrap()
        .join()
        .await
        .unwrap();

    assert_eq!(report.failures[0].class, FailureClass::StageFailed);
    assert!(h.scratch_files().is_empty());
}

#[tokio::test]
async fn test_second_file_export_failure_keeps_order() {
    let tree = MemoryTree::new();
    let first = tree.add_source_file("a.ncm", b"a", 0);
    let second = tree.add_source_file("b.ncm", b"b", 0);
    tree.fail_create("b.flac");

    let mut decoder = MockDecoder::new();
    metadata_table(&mut decoder, &[("a.ncm", ALPHA), ("b.ncm", ALPHA)]);
    decode_writes(&mut decoder, "flac");

    let h = Harness::with_tree(decoder, tree);
    let report = h
        .coordinator
        .start_batch(
            vec![entry_for(&first, "A", "x"), entry_for(&second, "B", "y")],
            MemoryTree::destination(),
            prefs(false),
        )
        .await
        .unwrap()
        .join()
        .await
        .unwrap();

    assert_eq!(report.success_count, 1);
    assert_eq!(
        report.failures,
        vec![FailedFile {
            original_name: "b.ncm".to_string(),
            class: FailureClass::ExportFailed,
        }]
    );
    let exported = h.tree.destination_files();
    assert_eq!(exported.len(), 1);
    assert_eq!(exported[0].0, "a.flac");
    assert_eq!(exported[0].1, "audio/flac");
    assert!(h.scratch_files().is_empty());
}

#[tokio::test]
async fn test_interrupted_export_removes_partial_document() {
    let tree = MemoryTree::new();
    let song = tree.add_source_file("song.ncm", b"x", 0);
    tree.fail_write("song.mp3");

    let mut decoder = MockDecoder::new();
    metadata_table(&mut decoder, &[("song.ncm", ALPHA)]);
    decode_writes(&mut decoder, "mp3");

    let h = Harness::with_tree(decoder, tree);
    let report = h
        .coordinator
        .start_batch(
            vec![entry_for(&song, "Alpha", "Bob")],
            MemoryTree::destination(),
            prefs(true),
        )
        .await
        .unwrap()
        .join()
        .await
        .unwrap();

    assert_eq!(report.failures[0].class, FailureClass::ExportFailed);
    assert!(h.tree.destination_files().is_empty());
    assert!(h.tree.contains(&song.handle));
}

#[tokio::test]
async fn test_delete_source_on_success() {
    let tree = MemoryTree::new();
    let song = tree.add_source_file("song.ncm", b"x", 0);

    let mut decoder = MockDecoder::new();
    metadata_table(&mut decoder, &[("song.ncm", ALPHA)]);
    decode_writes(&mut decoder, "mp3");

    let h = Harness::with_tree(decoder, tree);
    let report = h
        .coordinator
        .start_batch(
            vec![entry_for(&song, "Alpha", "Bob")],
            MemoryTree::destination(),
            prefs(true),
        )
        .await
        .unwrap()
        .join()
        .await
        .unwrap();

    assert_eq!(report.success_count, 1);
    assert!(!h.tree.contains(&song.handle));
}

#[tokio::test]
async fn test_failed_source_deletion_is_still_success() {
    let tree = MemoryTree::new();
    let song = tree.add_source_file("song.ncm", b"x", 0);
    tree.fail_delete();

    let mut decoder = MockDecoder::new();
    metadata_table(&mut decoder, &[("song.ncm", ALPHA)]);
    decode_writes(&mut decoder, "mp3");

    let h = Harness::with_tree(decoder, tree);
    let report = h
        .coordinator
        .start_batch(
            vec![entry_for(&song, "Alpha", "Bob")],
            MemoryTree::destination(),
            prefs(true),
        )
        .await
        .unwrap()
        .join()
        .await
        .unwrap();

    assert_eq!(report.success_count, 1);
    assert!(report.failures.is_empty());
    assert!(h.tree.contains(&song.handle));
    assert_eq!(report.notice().kind, NoticeKind::Success);
}

#[tokio::test]
async fn test_conversion_falls_back_to_catalog_title_and_artist() {
    let tree = MemoryTree::new();
    let song = tree.add_source_file("song.ncm", b"x", 0);

    let mut decoder = MockDecoder::new();
    metadata_table(&mut decoder, &[("song.ncm", r#"{"format":"mp3"}"#)]);
    decoder
        .expect_decode()
        .withf(|request| {
            request.title == "Shown"
                && request.artist == "Listed Artist"
                && request.album == "Unknown Album"
        })
        .returning(|request| {
            std::fs::write(request.output_dir.join("song.mp3"), b"ok").unwrap();
            Ok(1)
        });

    let h = Harness::with_tree(decoder, tree);
    let report = h
        .coordinator
        .start_batch(
            vec![entry_for(&song, "Shown", "Listed Artist")],
            MemoryTree::destination(),
            prefs(false),
        )
        .await
        .unwrap()
        .join()
        .await
        .unwrap();

    assert_eq!(report.success_count, 1);
}

#[tokio::test]
async fn test_unreachable_cover_is_a_warning_not_a_failure() {
    let tree = MemoryTree::new();
    let song = tree.add_source_file("song.ncm", b"x", 0);

    let mut decoder = MockDecoder::new();
    metadata_table(
        &mut decoder,
        &[(
            "song.ncm",
            r#"{"musicName":"Alpha","albumPic":"https://img.example/cover.jpg"}"#,
        )],
    );
    decoder
        .expect_decode()
        .withf(|request| request.cover.is_none())
        .returning(|request| {
            std::fs::write(request.output_dir.join("song.mp3"), b"ok").unwrap();
            Ok(1)
        });

    // Cover downloads are disabled in the harness
    let h = Harness::with_tree(decoder, tree);
    let report = h
        .coordinator
        .start_batch(
            vec![entry_for(&song, "Alpha", "Bob")],
            MemoryTree::destination(),
            prefs(false),
        )
        .await
        .unwrap()
        .join()
        .await
        .unwrap();

    assert_eq!(report.success_count, 1);
    assert_eq!(report.cover_warnings, vec!["song.ncm"]);
}

#[tokio::test]
async fn test_mixed_batch_accounts_for_every_file() {
    let tree = MemoryTree::new();
    let files = vec![
        tree.add_source_file("ok1.ncm", b"1", 0),
        tree.add_source_file("empty.ncm", b"2", 0),
        tree.add_source_file("ok2.ncm", b"3", 0),
        tree.add_source_file("unknown.ncm", b"4", 0),
    ];

    let mut decoder = MockDecoder::new();
    metadata_table(
        &mut decoder,
        &[("ok1.ncm", ALPHA), ("empty.ncm", ""), ("ok2.ncm", ALPHA)],
    );
    decode_writes(&mut decoder, "mp3");

    let h = Harness::with_tree(decoder, tree);
    let entries: Vec<_> = files.iter().map(|f| entry_for(f, &f.name, "a")).collect();
    let total = entries.len();
    let report = h
        .coordinator
        .start_batch(entries, MemoryTree::destination(), prefs(false))
        .await
        .unwrap()
        .join()
        .await
        .unwrap();

    assert_eq!(report.success_count + report.failures.len(), total);
    assert_eq!(report.failed_names(), vec!["empty.ncm", "unknown.ncm"]);
    assert!(report
        .failures
        .iter()
        .all(|f| f.class == FailureClass::MetadataEmpty));
    assert_eq!(
        report.notice().render(),
        "Succeeded: 2 / Failed: 2\n\nempty.ncm\nunknown.ncm"
    );
    assert!(h.scratch_files().is_empty());
}

#[tokio::test]
async fn test_progress_and_events_follow_input_order() {
    let tree = MemoryTree::new();
    let first = tree.add_source_file("a.ncm", b"a", 0);
    let second = tree.add_source_file("b.ncm", b"b", 0);

    let mut decoder = MockDecoder::new();
    metadata_table(&mut decoder, &[("a.ncm", ALPHA), ("b.ncm", ALPHA)]);
    decode_writes(&mut decoder, "mp3");

    let h = Harness::with_tree(decoder, tree);
    let mut events = h.event_bus.subscribe();

    let mut batch = h
        .coordinator
        .start_batch(
            vec![entry_for(&first, "First", "x"), entry_for(&second, "Second", "y")],
            MemoryTree::destination(),
            prefs(false),
        )
        .await
        .unwrap();
    let mut progress = batch.take_progress().unwrap();
    assert!(batch.take_progress().is_none());
    let batch_id = batch.batch_id().to_string();
    let report = batch.join().await.unwrap();
    assert_eq!(report.success_count, 2);

    // The watch slot keeps the last file; the sender is gone once the batch ends
    assert_eq!(
        *progress.borrow_and_update(),
        Some(BatchProgress {
            index: 2,
            total: 2,
            title: "Second".to_string()
        })
    );
    assert!(progress.changed().await.is_err());

    let mut received = Vec::new();
    while let Ok(event) = events.try_recv() {
        received.push(event);
    }
    assert_eq!(
        received.first(),
        Some(&CoreEvent::Conversion(ConversionEvent::Started {
            batch_id: batch_id.clone(),
            total: 2
        }))
    );
    let progress_events: Vec<(usize, usize, String)> = received
        .iter()
        .filter_map(|event| match event {
            CoreEvent::Conversion(ConversionEvent::Progress {
                index,
                total,
                title,
                ..
            }) => Some((*index, *total, title.clone())),
            _ => None,
        })
        .collect();
    assert_eq!(
        progress_events,
        vec![(1, 2, "First".to_string()), (2, 2, "Second".to_string())]
    );
    match received.last() {
        Some(CoreEvent::Conversion(ConversionEvent::Completed {
            batch_id: id,
            success_count,
            failed_names,
            ..
        })) => {
            assert_eq!(id, &batch_id);
            assert_eq!(*success_count, 2);
            assert!(failed_names.is_empty());
        }
        other => panic!("unexpected last event: {:?}", other),
    }
}

#[tokio::test]
async fn test_batch_persists_preferences() {
    let mut decoder = MockDecoder::new();
    decoder.expect_decode().times(0);
    let h = Harness::new(decoder);

    let chosen = UserPreferences {
        sort_mode: SortMode::ByDate,
        delete_source: true,
    };
    h.coordinator
        .start_batch(Vec::new(), MemoryTree::destination(), chosen)
        .await
        .unwrap()
        .join()
        .await
        .unwrap();

    assert_eq!(h.coordinator.preferences().await, chosen);
}

#[tokio::test]
async fn test_scratch_is_swept_after_batch() {
    let mut decoder = MockDecoder::new();
    decoder.expect_decode().times(0);
    let h = Harness::new(decoder);

    std::fs::create_dir_all(&h.scratch).unwrap();
    std::fs::write(h.scratch.join("leftover.mp3"), b"stale").unwrap();

    let report = h
        .coordinator
        .start_batch(Vec::new(), MemoryTree::destination(), prefs(false))
        .await
        .unwrap()
        .join()
        .await
        .unwrap();

    assert_eq!(report.processed(), 0);
    assert!(h.scratch_files().is_empty());
}

use std::sync::Arc;
use std::time::Duration;

use image::{DynamicImage, Rgb, RgbImage};
use sheetanim_common::clock::{Clock, ManualClock};
use sheetanim_common::error::SheetError;
use sheetanim_model::artifact::{Artifact, ArtifactId};
use sheetanim_model::frames::FrameSet;
use sheetanim_store::{ArtifactStore, DiskStore, MemoryStore, Reaper};

fn id(raw: &str) -> ArtifactId {
    ArtifactId::parse(raw).unwrap()
}

fn memory(clock: &ManualClock) -> Arc<dyn ArtifactStore> {
    Arc::new(MemoryStore::new(Arc::new(clock.clone())))
}

fn disk(clock: &ManualClock, dir: &tempfile::TempDir) -> Arc<dyn ArtifactStore> {
    Arc::new(DiskStore::open(dir.path(), Arc::new(clock.clone())).unwrap())
}

fn both_backends(test: impl Fn(Arc<dyn ArtifactStore>, ManualClock)) {
    let clock = ManualClock::starting_now();
    test(memory(&clock), clock);

    let dir = tempfile::tempdir().unwrap();
    let clock = ManualClock::starting_now();
    test(disk(&clock, &dir), clock);
}

#[test]
fn round_trips_every_artifact_kind() {
    both_backends(|store, _| {
        let frames = FrameSet::new(vec![
            DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 3, Rgb([1, 2, 3])));
            3
        ]);
        store.put(&id("up"), Artifact::Upload(vec![7; 100])).unwrap();
        store.put(&id("fr"), Artifact::Frames(frames)).unwrap();
        store.put(&id("an"), Artifact::Animation(b"GIF89a".to_vec())).unwrap();

        match &store.get(&id("up")).unwrap().artifact {
            Artifact::Upload(bytes) => assert_eq!(bytes, &vec![7; 100]),
            other => panic!("wrong kind: {:?}", other.kind()),
        }
        match &store.get(&id("fr")).unwrap().artifact {
            Artifact::Frames(frames) => {
                assert_eq!(frames.len(), 3);
                assert_eq!(frames.frame_size(), Some((4, 3)));
                assert_eq!(frames.frame(2).unwrap().to_rgb8().get_pixel(0, 0), &Rgb([1, 2, 3]));
            }
            other => panic!("wrong kind: {:?}", other.kind()),
        }
        match &store.get(&id("an")).unwrap().artifact {
            Artifact::Animation(bytes) => assert_eq!(bytes.as_slice(), b"GIF89a"),
            other => panic!("wrong kind: {:?}", other.kind()),
        }
    });
}

#[test]
fn missing_and_deleted_keys_are_not_found() {
    both_backends(|store, _| {
        assert!(store.get(&id("nope")).unwrap_err().is_not_found());
        store.put(&id("gone"), Artifact::Upload(vec![1])).unwrap();
        assert!(store.delete(&id("gone")).unwrap());
        assert!(!store.delete(&id("gone")).unwrap());
        assert!(store.get(&id("gone")).unwrap_err().is_not_found());
    });
}

#[test]
fn second_writer_for_a_key_is_rejected() {
    both_backends(|store, _| {
        store.put(&id("once"), Artifact::Upload(vec![1])).unwrap();
        let err = store.put(&id("once"), Artifact::Upload(vec![2])).unwrap_err();
        assert!(matches!(err, SheetError::AlreadyExists { .. }));
        match &store.get(&id("once")).unwrap().artifact {
            Artifact::Upload(bytes) => assert_eq!(bytes, &vec![1]),
            other => panic!("wrong kind: {:?}", other.kind()),
        }
    });
}

#[test]
fn concurrent_puts_under_distinct_keys() {
    both_backends(|store, _| {
        std::thread::scope(|s| {
            for t in 0..8u8 {
                let store = store.clone();
                s.spawn(move || {
                    for i in 0..16u8 {
                        let key = id(&format!("t{t}-i{i}"));
                        store.put(&key, Artifact::Upload(vec![t, i])).unwrap();
                    }
                });
            }
        });

        for t in 0..8u8 {
            for i in 0..16u8 {
                match &store.get(&id(&format!("t{t}-i{i}"))).unwrap().artifact {
                    Artifact::Upload(bytes) => assert_eq!(bytes, &vec![t, i]),
                    other => panic!("wrong kind: {:?}", other.kind()),
                }
            }
        }
    });
}

#[test]
fn reads_racing_a_delete_see_all_or_nothing() {
    both_backends(|store, _| {
        let payload = vec![42u8; 64 * 1024];
        store.put(&id("race"), Artifact::Animation(payload.clone())).unwrap();

        std::thread::scope(|s| {
            for _ in 0..4 {
                let store = store.clone();
                let payload = payload.clone();
                s.spawn(move || {
                    for _ in 0..50 {
                        match store.get(&id("race")) {
                            Ok(entry) => match &entry.artifact {
                                Artifact::Animation(bytes) => assert_eq!(bytes, &payload),
                                other => panic!("wrong kind: {:?}", other.kind()),
                            },
                            Err(e) => assert!(e.is_not_found(), "unexpected error: {e}"),
                        }
                    }
                });
            }
            let store = store.clone();
            s.spawn(move || {
                store.delete(&id("race")).unwrap();
            });
        });

        assert!(store.get(&id("race")).unwrap_err().is_not_found());
    });
}

#[test]
fn expired_entries_are_listed_by_creation_time() {
    both_backends(|store, clock| {
        store.put(&id("early"), Artifact::Upload(vec![])).unwrap();
        clock.advance(Duration::from_secs(30));
        let cutoff = clock.now();
        clock.advance(Duration::from_secs(30));
        store.put(&id("late"), Artifact::Upload(vec![])).unwrap();

        assert_eq!(store.list_expired(cutoff).unwrap(), vec![id("early")]);
    });
}

#[test]
fn reaper_removes_only_expired_entries() {
    both_backends(|store, clock| {
        let reaper = Reaper::new(
            store.clone(),
            Arc::new(clock.clone()),
            Duration::from_secs(3600),
        );

        store.put(&id("old"), Artifact::Upload(vec![1])).unwrap();
        clock.advance(Duration::from_secs(3000));
        store.put(&id("young"), Artifact::Upload(vec![2])).unwrap();

        assert_eq!(reaper.sweep().unwrap(), 0);

        clock.advance(Duration::from_secs(601));
        assert_eq!(reaper.sweep().unwrap(), 1);
        assert!(store.get(&id("old")).unwrap_err().is_not_found());
        assert!(store.get(&id("young")).is_ok());

        clock.advance(Duration::from_secs(3600));
        assert_eq!(reaper.sweep().unwrap(), 1);
        assert_eq!(reaper.sweep().unwrap(), 0);
    });
}

#[tokio::test]
async fn spawned_reaper_sweeps_until_shutdown() {
    let clock = ManualClock::starting_now();
    let store = memory(&clock);
    store.put(&id("stale"), Artifact::Upload(vec![1])).unwrap();
    clock.advance(Duration::from_secs(7200));

    let handle = Reaper::new(
        store.clone(),
        Arc::new(clock.clone()),
        Duration::from_secs(3600),
    )
    .spawn(Duration::from_millis(10));

    let mut reaped = false;
    for _ in 0..200 {
        if store.get(&id("stale")).is_err() {
            reaped = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    handle.shutdown().await;
    assert!(reaped, "stale entry was never reaped");

    // Nothing sweeps after shutdown.
    store.put(&id("later"), Artifact::Upload(vec![2])).unwrap();
    clock.advance(Duration::from_secs(7200));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(store.get(&id("later")).is_ok());
}

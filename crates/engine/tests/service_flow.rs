use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use sheetanim_common::clock::ManualClock;
use sheetanim_common::config::AppConfig;
use sheetanim_common::error::{SheetError, ValidationError};
use sheetanim_engine::{ConversionService, ConvertRequest};
use sheetanim_model::artifact::ArtifactId;
use sheetanim_model::grid::GridOverride;
use sheetanim_store::{ArtifactStore, DiskStore, MemoryStore};

/// A 4x4 sheet of 32px cells split by 2px black lines, with a colored
/// square in every cell.
fn sheet_png() -> Vec<u8> {
    let img = RgbaImage::from_fn(128, 128, |x, y| {
        if x % 32 >= 31 || x % 32 == 0 && x > 0 || y % 32 >= 31 || y % 32 == 0 && y > 0 {
            return Rgba([0, 0, 0, 255]);
        }
        let (cx, cy) = (x % 32, y % 32);
        if (12..20).contains(&cx) && (12..20).contains(&cy) {
            let cell = (y / 32 * 4 + x / 32) as u8;
            Rgba([cell * 16, 255 - cell * 16, 128, 255])
        } else {
            Rgba([235, 235, 235, 255])
        }
    });
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(img)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

fn memory_service(clock: &ManualClock) -> ConversionService {
    let store = Arc::new(MemoryStore::new(Arc::new(clock.clone())));
    ConversionService::new(store, Arc::new(clock.clone()), AppConfig::default())
}

fn decoded_frames(bytes: &[u8]) -> Vec<u16> {
    let mut decoder = gif::DecodeOptions::new()
        .read_info(Cursor::new(bytes))
        .unwrap();
    let mut delays = vec![];
    while let Some(frame) = decoder.read_next_frame().unwrap() {
        delays.push(frame.delay);
    }
    delays
}

fn frame_size(bytes: &[u8]) -> (u16, u16) {
    let decoder = gif::DecodeOptions::new()
        .read_info(Cursor::new(bytes))
        .unwrap();
    (decoder.width(), decoder.height())
}

#[test]
fn analyze_then_convert() {
    let clock = ManualClock::starting_now();
    let service = memory_service(&clock);

    let (upload, report) = service.analyze_upload(sheet_png()).unwrap();
    assert_eq!((report.rows, report.cols), (4, 4));
    assert!(report.confidence > 0.8, "confidence {}", report.confidence);

    let animation = service
        .convert(
            &upload,
            ConvertRequest {
                frame_duration_ms: Some(100),
                ..Default::default()
            },
        )
        .unwrap();

    let bytes = service.fetch_animation(&animation).unwrap();
    assert_eq!(decoded_frames(&bytes), vec![10; 16]);

    // The upload is consumed by the conversion.
    assert!(service.fetch(&upload).unwrap_err().is_not_found());
}

#[test]
fn convert_uses_default_duration_and_overrides() {
    let clock = ManualClock::starting_now();
    let service = memory_service(&clock);

    let (upload, _) = service.analyze_upload(sheet_png()).unwrap();
    let animation = service
        .convert(
            &upload,
            ConvertRequest {
                grid: GridOverride {
                    rows: Some(2),
                    cols: Some(2),
                    margin: Some(0),
                },
                frame_duration_ms: None,
            },
        )
        .unwrap();

    let bytes = service.fetch_animation(&animation).unwrap();
    assert_eq!(decoded_frames(&bytes), vec![8; 4]);
}

#[test]
fn convert_trims_the_configured_default_margin() {
    let clock = ManualClock::starting_now();
    let store = Arc::new(MemoryStore::new(Arc::new(clock.clone())));
    let mut config = AppConfig::default();
    config.defaults.margin = 5;
    let service = ConversionService::new(store, Arc::new(clock), config);

    let (upload, report) = service.analyze_upload(sheet_png()).unwrap();
    assert_eq!((report.rows, report.cols), (4, 4));
    assert_ne!(report.margin, 5);

    let animation = service.convert(&upload, ConvertRequest::default()).unwrap();
    let bytes = service.fetch_animation(&animation).unwrap();
    // 32px cells less 5px on each side.
    assert_eq!(frame_size(&bytes), (22, 22));
}

#[test]
fn explicit_margin_beats_the_configured_default() {
    let clock = ManualClock::starting_now();
    let service = memory_service(&clock);

    let (upload, _) = service.analyze_upload(sheet_png()).unwrap();
    let animation = service
        .convert(
            &upload,
            ConvertRequest {
                grid: GridOverride {
                    margin: Some(0),
                    ..Default::default()
                },
                frame_duration_ms: None,
            },
        )
        .unwrap();
    let bytes = service.fetch_animation(&animation).unwrap();
    assert_eq!(frame_size(&bytes), (32, 32));
}

#[test]
fn invalid_override_keeps_the_upload() {
    let clock = ManualClock::starting_now();
    let service = memory_service(&clock);

    let (upload, _) = service.analyze_upload(sheet_png()).unwrap();
    let err = service
        .convert(
            &upload,
            ConvertRequest {
                grid: GridOverride {
                    margin: Some(16),
                    ..Default::default()
                },
                frame_duration_ms: None,
            },
        )
        .unwrap_err();
    assert!(matches!(
        err,
        SheetError::Validation(ValidationError::MarginTooLarge { .. })
    ));
    assert!(service.fetch(&upload).is_ok());
}

#[test]
fn undecodable_upload_is_not_stored() {
    let clock = ManualClock::starting_now();
    let store = Arc::new(MemoryStore::new(Arc::new(clock.clone())));
    let service = ConversionService::new(store.clone(), Arc::new(clock), AppConfig::default());

    let err = service.analyze_upload(b"GIF89a but not really".to_vec()).unwrap_err();
    assert!(matches!(err, SheetError::Decode { .. }));
    assert!(store.is_empty());
}

#[test]
fn expired_artifacts_are_not_found() {
    let clock = ManualClock::starting_now();
    let service = memory_service(&clock);

    let (upload, _) = service.analyze_upload(sheet_png()).unwrap();
    let animation = service.convert(&upload, ConvertRequest::default()).unwrap();
    assert!(service.fetch_animation(&animation).is_ok());

    clock.advance(Duration::from_secs(3601));
    let err = service.fetch_animation(&animation).unwrap_err();
    assert!(err.is_not_found());

    // The reaper then removes it for good.
    assert_eq!(service.reaper().sweep().unwrap(), 1);
    assert!(service.store().get(&animation).unwrap_err().is_not_found());
}

#[test]
fn unknown_or_wrong_kind_ids_are_not_found() {
    let clock = ManualClock::starting_now();
    let service = memory_service(&clock);
    let (upload, _) = service.analyze_upload(sheet_png()).unwrap();

    let missing = ArtifactId::parse("20260101000000000-00000000").unwrap();
    assert!(service.fetch_animation(&missing).unwrap_err().is_not_found());
    assert!(service.fetch_animation(&upload).unwrap_err().is_not_found());
    assert!(service
        .convert(&missing, ConvertRequest::default())
        .unwrap_err()
        .is_not_found());
}

#[test]
fn disk_backed_flow() {
    let dir = tempfile::tempdir().unwrap();
    let clock = ManualClock::starting_now();
    let store: Arc<dyn ArtifactStore> =
        Arc::new(DiskStore::open(dir.path(), Arc::new(clock.clone())).unwrap());
    let service = ConversionService::new(store, Arc::new(clock.clone()), AppConfig::default());

    let (upload, _) = service.analyze_upload(sheet_png()).unwrap();
    let animation = service.convert(&upload, ConvertRequest::default()).unwrap();
    let bytes = service.fetch_animation(&animation).unwrap();
    assert_eq!(decoded_frames(&bytes).len(), 16);

    clock.advance(Duration::from_secs(7200));
    assert!(service.fetch_animation(&animation).unwrap_err().is_not_found());
}

#[tokio::test]
async fn concurrent_conversions_do_not_interfere() {
    let clock = ManualClock::starting_now();
    let service = Arc::new(memory_service(&clock));
    let png = sheet_png();

    let mut tasks = vec![];
    for i in 0..4u32 {
        let service = service.clone();
        let png = png.clone();
        tasks.push(tokio::task::spawn_blocking(move || {
            let (upload, _) = service.analyze_upload(png)?;
            let duration = 50 + i * 10;
            let id = service.convert(
                &upload,
                ConvertRequest {
                    frame_duration_ms: Some(duration),
                    ..Default::default()
                },
            )?;
            Ok::<_, SheetError>((id, duration))
        }));
    }

    for task in tasks {
        let (id, duration) = task.await.unwrap().unwrap();
        let bytes = service.fetch_animation(&id).unwrap();
        let delays = decoded_frames(&bytes);
        assert_eq!(delays.len(), 16);
        assert!(delays.iter().all(|&d| u32::from(d) * 10 == duration));
    }
}

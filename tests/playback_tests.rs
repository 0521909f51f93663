// Integration tests for the playback controller

mod support;

use anyhow::Result;
use practice_capture::playback::{
    MediaEvent, PlaybackController, PlaybackSource, VirtualMediaElement,
};
use practice_capture::recorder::{Blob, ObjectUrlRegistry};
use std::io::Cursor;
use std::time::Duration;
use support::{fake_element, ElementCall};

fn local(uri: &str) -> PlaybackSource {
    PlaybackSource::Local {
        uri: uri.to_string(),
    }
}

fn last_seek(calls: &[ElementCall]) -> Option<f64> {
    calls.iter().rev().find_map(|c| match c {
        ElementCall::Seek(s) => Some(*s),
        _ => None,
    })
}

#[test]
fn test_relative_seek_clamps_to_duration() {
    let (element, events, tx, calls) = fake_element();
    let mut controller = PlaybackController::new(Box::new(element), events);

    controller.load(local("blob:practice-capture/a"), Some(10.0));
    assert_eq!(controller.duration(), 10.0);

    controller.seek_relative(-5.0);
    assert_eq!(last_seek(&calls.lock()), Some(0.0));

    tx.send(MediaEvent::TimeUpdate { current_time: 8.0 }).unwrap();
    controller.seek_relative(5.0);
    assert_eq!(last_seek(&calls.lock()), Some(10.0));
    assert_eq!(controller.current_time(), 10.0);

    tx.send(MediaEvent::TimeUpdate { current_time: 4.0 }).unwrap();
    controller.seek_relative(-5.0);
    assert_eq!(last_seek(&calls.lock()), Some(0.0));
}

#[test]
fn test_fraction_seek_uses_duration() {
    let (element, events, _tx, calls) = fake_element();
    let mut controller = PlaybackController::new(Box::new(element), events);

    controller.load(local("blob:practice-capture/a"), Some(8.0));

    controller.seek_to_fraction(0.25);
    assert_eq!(last_seek(&calls.lock()), Some(2.0));

    controller.seek_to_fraction(1.7);
    assert_eq!(last_seek(&calls.lock()), Some(8.0));

    let view = controller.view();
    assert_eq!(view.position, "0:08");
    assert_eq!(view.length, "0:08");
    assert_eq!(view.progress, 1.0);
}

#[test]
fn test_unknown_duration_falls_back_to_recorded_length() {
    let (element, events, tx, _calls) = fake_element();
    let mut controller = PlaybackController::new(Box::new(element), events);

    controller.load(local("blob:practice-capture/a"), Some(42.0));
    tx.send(MediaEvent::LoadedMetadata {
        duration: f64::INFINITY,
    })
    .unwrap();

    assert_eq!(controller.view().duration, 42.0);

    tx.send(MediaEvent::DurationChange { duration: 41.5 }).unwrap();
    assert_eq!(controller.view().duration, 41.5);
}

#[test]
fn test_unknown_duration_without_fallback() {
    let (element, events, tx, calls) = fake_element();
    let mut controller = PlaybackController::new(Box::new(element), events);

    controller.load(local("blob:practice-capture/a"), None);
    tx.send(MediaEvent::LoadedMetadata {
        duration: f64::NAN,
    })
    .unwrap();

    let view = controller.view();
    assert_eq!(view.duration, 0.0);
    assert_eq!(view.length, "0:00");
    assert_eq!(view.progress, 0.0);

    controller.seek_to_fraction(0.5);
    assert_eq!(last_seek(&calls.lock()), None);

    controller.seek_relative(3.0);
    assert_eq!(last_seek(&calls.lock()), Some(3.0));
}

#[test]
fn test_events_drive_transport_state() -> Result<()> {
    let (element, events, tx, calls) = fake_element();
    let mut controller = PlaybackController::new(Box::new(element), events);

    controller.load(local("blob:practice-capture/a"), Some(5.0));

    controller.toggle_play()?;
    assert!(controller.is_playing());

    tx.send(MediaEvent::TimeUpdate { current_time: 2.0 }).unwrap();
    tx.send(MediaEvent::Ended).unwrap();

    let view = controller.view();
    assert!(!view.is_playing);
    assert_eq!(view.current_time, 5.0);

    // A native pause from outside the controller is reflected too
    controller.toggle_play()?;
    tx.send(MediaEvent::Pause).unwrap();
    assert!(!controller.view().is_playing);

    assert_eq!(
        calls.lock().first(),
        Some(&ElementCall::Load("blob:practice-capture/a".to_string()))
    );

    Ok(())
}

#[test]
fn test_toggle_without_source_fails() {
    let (element, events, _tx, calls) = fake_element();
    let mut controller = PlaybackController::new(Box::new(element), events);

    assert!(controller.toggle_play().is_err());
    assert!(calls.lock().is_empty());
}

#[test]
fn test_unload_discards_pending_events() {
    let (element, events, tx, calls) = fake_element();
    let mut controller = PlaybackController::new(Box::new(element), events);

    controller.load(local("blob:practice-capture/a"), Some(5.0));
    tx.send(MediaEvent::Play).unwrap();
    tx.send(MediaEvent::TimeUpdate { current_time: 3.0 }).unwrap();

    controller.unload();

    let view = controller.view();
    assert!(!view.loaded);
    assert!(!view.is_playing);
    assert_eq!(view.current_time, 0.0);
    assert_eq!(view.duration, 0.0);
    assert_eq!(calls.lock().last(), Some(&ElementCall::Unload));
}

fn one_second_wav() -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 8000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for i in 0..8000 {
            writer.write_sample((i % 100) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

#[tokio::test(start_paused = true)]
async fn test_virtual_element_plays_wav_to_end() -> Result<()> {
    let urls = ObjectUrlRegistry::new();
    let uri = urls.create(&Blob::new(one_second_wav(), "audio/wav"));

    let (element, events) = VirtualMediaElement::new(urls.clone());
    let mut controller = PlaybackController::new(Box::new(element), events);

    controller.load(local(&uri), None);
    assert_eq!(controller.view().duration, 1.0);

    controller.toggle_play()?;
    tokio::time::sleep(Duration::from_millis(600)).await;

    let midway = controller.view();
    assert!(midway.is_playing);
    assert!(midway.current_time > 0.0 && midway.current_time < 1.0);

    tokio::time::sleep(Duration::from_millis(1000)).await;

    let done = controller.view();
    assert!(!done.is_playing);
    assert_eq!(done.current_time, 1.0);
    assert_eq!(done.progress, 1.0);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_virtual_element_reports_unknown_duration_for_streams() -> Result<()> {
    let urls = ObjectUrlRegistry::new();
    let uri = urls.create(&Blob::new(vec![1u8, 2, 3], "video/webm;codecs=vp8,opus"));

    let (element, events) = VirtualMediaElement::new(urls);
    let mut controller = PlaybackController::new(Box::new(element), events);

    controller.load(local(&uri), Some(3.2));

    let view = controller.view();
    assert_eq!(view.duration, 3.2);
    assert_eq!(view.length, "0:03");

    Ok(())
}

#[test]
fn test_time_updates_never_pass_known_duration() {
    let (element, events, tx, _calls) = fake_element();
    let mut controller = PlaybackController::new(Box::new(element), events);

    controller.load(local("blob:practice-capture/a"), Some(4.0));
    tx.send(MediaEvent::TimeUpdate { current_time: 9.5 }).unwrap();

    let view = controller.view();
    assert_eq!(view.current_time, 4.0);
    assert_eq!(view.position, "0:04");
    assert_eq!(view.progress, 1.0);
}

#[tokio::test(start_paused = true)]
async fn test_stream_blob_ends_at_recorded_length() -> Result<()> {
    let urls = ObjectUrlRegistry::new();
    let uri = urls.create(&Blob::new(vec![7u8; 64], "audio/webm;codecs=opus"));

    let (element, events) = VirtualMediaElement::new(urls);
    let mut controller = PlaybackController::new(Box::new(element), events);

    controller.load(local(&uri), Some(2.0));
    controller.toggle_play()?;

    tokio::time::sleep(Duration::from_secs(10)).await;

    let view = controller.view();
    assert!(!view.is_playing);
    assert_eq!(view.duration, 2.0);
    assert_eq!(view.current_time, 2.0);
    assert_eq!(view.position, "0:02");
    assert_eq!(view.length, "0:02");

    // Playing again after the end starts over
    controller.toggle_play()?;
    tokio::time::sleep(Duration::from_millis(600)).await;
    let restarted = controller.view();
    assert!(restarted.is_playing);
    assert!(restarted.current_time < 1.0);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_stream_blob_seek_clamps_to_recorded_length() -> Result<()> {
    let urls = ObjectUrlRegistry::new();
    let uri = urls.create(&Blob::new(vec![7u8; 64], "video/webm;codecs=vp8,opus"));

    let (element, events) = VirtualMediaElement::new(urls);
    let mut controller = PlaybackController::new(Box::new(element), events);

    controller.load(local(&uri), Some(6.0));
    controller.seek_relative(10.0);

    let view = controller.view();
    assert_eq!(view.current_time, 6.0);
    assert_eq!(view.progress, 1.0);

    Ok(())
}

use super::*;
use crate::encode::sink::InMemorySink;
use crate::foundation::error::LoomError;
use crate::foundation::events::NoticeLog;
use crate::render::surface::{PixmapSurfaceProvider, Surface};

fn cfg(frames: u64) -> ExportConfig {
    ExportConfig::new(4, 4, 10, frames, ExportFormat::Archive)
}

#[test]
fn renders_every_frame_in_order_with_sampled_params() {
    let mut timeline = Timeline::new();
    timeline.add_keyframe("level", 0.0, ParamValue::Number(0.0));
    timeline.add_keyframe("level", 1.0, ParamValue::Number(90.0));
    let defaults = BTreeMap::from([
        ("level".to_owned(), ParamValue::Number(-1.0)),
        ("label".to_owned(), ParamValue::from("x")),
    ]);

    let mut seen = Vec::new();
    let mut renderer = |ctx: &FrameCtx<'_>, _s: &mut dyn Surface| -> LoomResult<()> {
        seen.push((ctx.frame.0, ctx.number("level", f64::NAN).round(), ctx.params.len()));
        Ok(())
    };
    let mut progress = Vec::new();
    let mut sink = InMemorySink::new();

    let outcome = Exporter::new(&timeline, &defaults)
        .export_with_sink(
            &cfg(4),
            &mut PixmapSurfaceProvider::new(),
            &mut renderer,
            &mut sink,
            &mut |p| progress.push(p),
        )
        .unwrap();

    let result = outcome.into_result().unwrap();
    assert!(result.filename.starts_with("frameloom-"));
    assert!(result.filename.ends_with(".rgba"));
    assert_eq!(result.payload.len(), 4 * 4 * 4 * 4);

    assert_eq!(
        seen,
        vec![(0, 0.0, 2), (1, 30.0, 2), (2, 60.0, 2), (3, 90.0, 2)]
    );
    let frames: Vec<_> = sink.frames().iter().map(|(i, _)| i.0).collect();
    assert_eq!(frames, vec![0, 1, 2, 3]);
    assert_eq!(sink.finish_calls(), 1);
    assert_eq!(sink.release_calls(), 1);

    assert_eq!(progress.len(), 5);
    for (i, p) in progress[..4].iter().enumerate() {
        assert_eq!(
            *p,
            ExportProgress::Frame {
                done: i as u64 + 1,
                total: 4
            }
        );
    }
    assert!(matches!(
        progress[4],
        ExportProgress::Finalizing { percent, .. } if percent == 100.0
    ));
}

#[test]
fn surface_is_cleared_to_background_each_frame() {
    let timeline = Timeline::new();
    let defaults = BTreeMap::new();
    let mut config = cfg(2);
    config.background = [10, 20, 30, 255];

    let mut renderer = |ctx: &FrameCtx<'_>, s: &mut dyn Surface| -> LoomResult<()> {
        assert_eq!(&s.pixels()[..4], &[10, 20, 30, 255]);
        if ctx.frame.0 == 0 {
            s.clear([255, 255, 255, 255]);
        }
        Ok(())
    };
    let mut sink = InMemorySink::new();
    Exporter::new(&timeline, &defaults)
        .export_with_sink(
            &config,
            &mut PixmapSurfaceProvider::new(),
            &mut renderer,
            &mut sink,
            &mut |_| {},
        )
        .unwrap();
    assert_eq!(&sink.frames()[1].1[..4], &[10, 20, 30, 255]);
}

#[test]
fn invalid_config_fails_before_anything_is_allocated() {
    let timeline = Timeline::new();
    let defaults = BTreeMap::new();
    let provider = PixmapSurfaceProvider::new();
    let mut calls = 0;
    let mut renderer = |_: &FrameCtx<'_>, _: &mut dyn Surface| -> LoomResult<()> {
        calls += 1;
        Ok(())
    };
    let mut sink = InMemorySink::new();

    let err = Exporter::new(&timeline, &defaults)
        .export_with_sink(
            &cfg(0),
            &mut provider.clone(),
            &mut renderer,
            &mut sink,
            &mut |_| {},
        )
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Validation);
    assert!(err.to_string().starts_with("export failed ["));
    assert_eq!(calls, 0);
    assert!(sink.config().is_none());
    assert_eq!(provider.live_surfaces(), 0);
}

#[test]
fn render_failure_is_wrapped_and_cleans_up() {
    let timeline = Timeline::new();
    let defaults = BTreeMap::new();
    let provider = PixmapSurfaceProvider::new();
    let mut renderer = |ctx: &FrameCtx<'_>, _: &mut dyn Surface| -> LoomResult<()> {
        if ctx.frame.0 == 1 {
            return Err(LoomError::encode("shader exploded"));
        }
        Ok(())
    };
    let mut sink = InMemorySink::new();

    let err = Exporter::new(&timeline, &defaults)
        .export_with_sink(
            &cfg(5),
            &mut provider.clone(),
            &mut renderer,
            &mut sink,
            &mut |_| {},
        )
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Encode);
    assert!(err.is_retryable());
    let msg = err.to_string();
    assert!(msg.contains("render_frame"), "{msg}");
    assert!(msg.contains("frame=1"), "{msg}");
    assert_eq!(sink.frames().len(), 1);
    assert_eq!(sink.finish_calls(), 0);
    assert_eq!(sink.release_calls(), 1);
    assert_eq!(provider.live_surfaces(), 0);
}

#[test]
fn cancellation_stops_the_loop_and_releases() {
    let timeline = Timeline::new();
    let defaults = BTreeMap::new();
    let provider = PixmapSurfaceProvider::new();
    let exporter = Exporter::new(&timeline, &defaults);
    let token = exporter.token().clone();

    let mut rendered = Vec::new();
    let mut renderer = |ctx: &FrameCtx<'_>, _: &mut dyn Surface| -> LoomResult<()> {
        rendered.push(ctx.frame.0);
        Ok(())
    };
    let mut sink = InMemorySink::new();
    let outcome = exporter
        .export_with_sink(
            &cfg(10),
            &mut provider.clone(),
            &mut renderer,
            &mut sink,
            &mut |p| {
                if p == (ExportProgress::Frame { done: 3, total: 10 }) {
                    token.cancel();
                }
            },
        )
        .unwrap();

    assert!(outcome.is_cancelled());
    assert_eq!(rendered, vec![0, 1, 2]);
    assert_eq!(sink.finish_calls(), 0);
    assert_eq!(sink.release_calls(), 1);
    assert_eq!(provider.live_surfaces(), 0);
}

#[test]
fn heavy_exports_raise_an_advisory_first() {
    let timeline = Timeline::new();
    let defaults = BTreeMap::new();
    let log = Arc::new(NoticeLog::new());
    let exporter = Exporter::new(&timeline, &defaults).events(log.clone());
    exporter.token().cancel();

    let mut config = ExportConfig::new(2048, 2048, 60, 500, ExportFormat::Archive);
    config.frame_yield = Some(Duration::ZERO);
    let outcome = exporter
        .export_with_sink(
            &config,
            &mut PixmapSurfaceProvider::new(),
            &mut |_: &FrameCtx<'_>, _: &mut dyn Surface| -> LoomResult<()> { Ok(()) },
            &mut InMemorySink::new(),
            &mut |_| {},
        )
        .unwrap();
    assert!(outcome.is_cancelled());
    let warnings = log.at_least(Severity::Warning);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].message.contains("pixel-frames"));
}

#[test]
fn default_sinks_match_formats() {
    for (format, ext) in [
        (ExportFormat::Archive, "flar"),
        (ExportFormat::Gif, "gif"),
        (ExportFormat::Video, "webm"),
    ] {
        let sink = sink_for(&ExportConfig::new(8, 8, 10, 1, format));
        assert_eq!(sink.file_type().ext, ext);
    }
}

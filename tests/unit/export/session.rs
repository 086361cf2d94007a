use std::collections::BTreeMap;

use super::*;
use crate::animation::timeline::Timeline;
use crate::export::config::ExportFormat;
use crate::foundation::error::ErrorCategory;
use crate::render::frame::FrameCtx;
use crate::render::surface::{PixmapSurfaceProvider, Surface};

fn noop(_: &FrameCtx<'_>, _: &mut dyn Surface) -> LoomResult<()> {
    Ok(())
}

#[test]
fn completed_export_is_retrievable_once() {
    let session = ExportSession::new();
    let timeline = Timeline::new();
    let defaults = BTreeMap::new();
    assert_eq!(session.status(), ExportStatus::Idle);

    let mut statuses = Vec::new();
    session
        .run(
            Exporter::new(&timeline, &defaults),
            &ExportConfig::new(4, 4, 10, 3, ExportFormat::Archive),
            &mut PixmapSurfaceProvider::new(),
            &mut noop,
            &mut |_| statuses.push(session.status()),
        )
        .unwrap();

    assert_eq!(statuses[0], ExportStatus::Exporting { done: 1, total: 3 });
    assert_eq!(statuses[2], ExportStatus::Exporting { done: 3, total: 3 });
    assert!(session.status().is_terminal());
    assert!(!session.is_exporting());

    let result = session.take_result().unwrap();
    assert_eq!(result.mime_type, "application/x-frameloom-archive");
    assert_eq!(session.status(), ExportStatus::Idle);
    assert!(session.take_result().is_none());
}

#[test]
fn second_export_is_rejected_while_one_runs() {
    let session = ExportSession::new();
    let timeline = Timeline::new();
    let defaults = BTreeMap::new();
    let cfg = ExportConfig::new(4, 4, 10, 2, ExportFormat::Archive);

    let mut nested = None;
    let mut renderer = |ctx: &FrameCtx<'_>, _: &mut dyn Surface| -> LoomResult<()> {
        if ctx.frame.0 == 0 {
            assert!(session.is_exporting());
            nested = Some(session.run(
                Exporter::new(&timeline, &defaults),
                &cfg,
                &mut PixmapSurfaceProvider::new(),
                &mut noop,
                &mut |_| {},
            ));
        }
        Ok(())
    };
    session
        .run(
            Exporter::new(&timeline, &defaults),
            &cfg,
            &mut PixmapSurfaceProvider::new(),
            &mut renderer,
            &mut |_| {},
        )
        .unwrap();

    let err = nested.unwrap().unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Validation);
    assert!(matches!(session.status(), ExportStatus::Done(_)));
}

#[test]
fn cancel_moves_to_cancelled_state() {
    let session = ExportSession::new();
    session.cancel();
    let timeline = Timeline::new();
    let defaults = BTreeMap::new();

    let mut renderer = |ctx: &FrameCtx<'_>, _: &mut dyn Surface| -> LoomResult<()> {
        if ctx.frame.0 == 1 {
            session.cancel();
        }
        Ok(())
    };
    session
        .run(
            Exporter::new(&timeline, &defaults),
            &ExportConfig::new(4, 4, 10, 5, ExportFormat::Archive),
            &mut PixmapSurfaceProvider::new(),
            &mut renderer,
            &mut |_| {},
        )
        .unwrap();
    assert_eq!(session.status(), ExportStatus::Cancelled);
    assert!(session.take_result().is_none());
}

#[test]
fn failures_surface_as_error_state() {
    let session = ExportSession::new();
    let timeline = Timeline::new();
    let defaults = BTreeMap::new();
    let err = session
        .run(
            Exporter::new(&timeline, &defaults),
            &ExportConfig::new(0, 4, 10, 5, ExportFormat::Archive),
            &mut PixmapSurfaceProvider::new(),
            &mut noop,
            &mut |_| {},
        )
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Validation);
    match session.status() {
        ExportStatus::Error(msg) => assert!(msg.contains("validation error")),
        other => panic!("unexpected status {other:?}"),
    }
    assert!(!session.is_exporting());
}

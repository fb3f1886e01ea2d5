//! Translation of engine fault callbacks into [`BitmapError::DecoderFault`].
//!
//! The engine reports faults through one process-wide callback. The
//! callback only records the message for the current thread; the bridge
//! collects it after the engine call returns, so a fault never unwinds
//! through engine code.

use std::cell::RefCell;
use std::path::Path;

use tracing::debug;

use crate::engine::{Engine, FileType};
use crate::error::BitmapError;

thread_local! {
    static PENDING: RefCell<Option<(Option<FileType>, String)>> = const { RefCell::new(None) };
}

/// The callback installed into engines.
///
/// Keeps the first message reported since the last [`clear`].
pub(crate) fn record(format: Option<FileType>, message: &str) {
    debug!(?format, message, "engine reported a fault");
    PENDING.with(|p| {
        let mut p = p.borrow_mut();
        if p.is_none() {
            *p = Some((format, message.to_owned()));
        }
    });
}

/// Install [`record`] into `engine`. Engines ignore repeated installs.
pub(crate) fn install<E: Engine>(engine: &E) {
    engine.set_output_message(record);
}

/// Forget any fault left over from an earlier call on this thread.
pub(crate) fn clear() {
    PENDING.with(|p| p.borrow_mut().take());
}

/// Take the pending fault of this thread, if any, blaming `path`.
pub(crate) fn take(path: Option<&Path>) -> Option<BitmapError> {
    PENDING
        .with(|p| p.borrow_mut().take())
        .map(|(format, message)| BitmapError::DecoderFault {
            path: path.map(Path::to_path_buf),
            format,
            message,
        })
}

/// Run an engine call on the file at `path` that yields `None` on failure.
///
/// On `None` the pending fault becomes the error, or `on_null()` if the
/// engine reported nothing.
pub(crate) fn guarded<T>(
    path: Option<&Path>,
    call: impl FnOnce() -> Option<T>,
    on_null: impl FnOnce() -> BitmapError,
) -> Result<T, BitmapError> {
    clear();
    match call() {
        Some(value) => {
            if let Some(stray) = take(path) {
                debug!(%stray, "engine reported a fault but still returned a result");
            }
            Ok(value)
        }
        None => Err(take(path).unwrap_or_else(on_null)),
    }
}

/// Run an engine call that yields `false` on failure.
pub(crate) fn guarded_bool(
    path: Option<&Path>,
    call: impl FnOnce() -> bool,
    on_false: impl FnOnce() -> BitmapError,
) -> Result<(), BitmapError> {
    guarded(path, || call().then_some(()), on_false)
}

/// Run an engine call with no result of its own; a reported fault fails it.
pub(crate) fn checked(path: Option<&Path>, call: impl FnOnce()) -> Result<(), BitmapError> {
    clear();
    call();
    take(path).map_or(Ok(()), Err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_message_wins() {
        clear();
        record(Some(FileType::Bmp), "first");
        record(None, "second");
        match take(Some(Path::new("a.bmp"))) {
            Some(BitmapError::DecoderFault { path, format, message }) => {
                assert_eq!(path.as_deref(), Some(Path::new("a.bmp")));
                assert_eq!(format, Some(FileType::Bmp));
                assert_eq!(message, "first");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(take(None).is_none());
    }

    #[test]
    fn null_without_fault_uses_fallback() {
        let err = guarded::<()>(None, || None, || BitmapError::AllocationError("x".into())).unwrap_err();
        assert!(matches!(err, BitmapError::AllocationError(_)));
    }

    #[test]
    fn null_with_fault_reports_the_fault() {
        let err = guarded::<()>(
            Some(Path::new("scans/page.tif")),
            || {
                record(Some(FileType::Tiff), "bad strip");
                None
            },
            || BitmapError::AllocationError("x".into()),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "decoder error in scans/page.tif (Some(Tiff)): bad strip");
        assert!(matches!(err, BitmapError::DecoderFault { message, .. } if message == "bad strip"));
    }

    #[test]
    fn checked_call_fails_on_fault() {
        assert!(checked(None, || ()).is_ok());
        assert!(checked(None, || record(None, "refused")).is_err());
    }

    #[test]
    fn stale_faults_are_cleared() {
        record(None, "stale");
        assert!(guarded(None, || Some(1), || BitmapError::AllocationError("x".into())).is_ok());
        assert!(take(None).is_none());
    }
}

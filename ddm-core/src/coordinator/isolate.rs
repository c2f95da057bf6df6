//! Error-isolating invocation of user handlers.
//!
//! Every dispatch path calls handlers through [`isolate`]. A handler that
//! returns an error or panics is logged and reported as `Err`; the caller
//! moves on to the next handler.

use ddm_sdk::HandlerError;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use tracing::error;

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Run `f`, turning a returned error or a panic into a logged `Err`.
///
/// `kind` is the callback kind (or `"adapter"`) and `subject` the key path
/// or event name the handler ran for. Both only feed the log record.
pub(crate) fn isolate<T>(
    kind: impl fmt::Display,
    subject: &str,
    f: impl FnOnce() -> Result<T, HandlerError>,
) -> Result<T, HandlerError> {
    let outcome = match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(anyhow::anyhow!(
            "handler panicked: {}",
            panic_message(payload.as_ref())
        )),
    };
    if let Err(e) = &outcome {
        error!(%kind, subject, error = %e, "Callback handler failed");
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use ddm_sdk::CallbackKind;

    #[test]
    fn test_success_passes_through() {
        let out = isolate(CallbackKind::Event, "x", || Ok(3));
        assert_eq!(out.unwrap(), 3);
    }

    #[test]
    fn test_error_is_returned() {
        let out: Result<(), _> = isolate(CallbackKind::Define, "user", || {
            Err(anyhow::anyhow!("boom"))
        });
        assert_eq!(out.unwrap_err().to_string(), "boom");
    }

    #[test]
    fn test_panic_becomes_error() {
        let out: Result<(), _> = isolate(CallbackKind::Change, "", || panic!("kaboom"));
        let err = out.unwrap_err().to_string();
        assert!(err.contains("kaboom"), "{err}");
    }
}

//! Interrupt-safe iteration over a closeable resource.
//!
//! Breaking out of a loop over a progress-bar-decorated iterator (via
//! Ctrl+C or an error) without closing the bar leaves the display in a
//! broken state that leaks into later output. [`safe_iterate`] runs a
//! per-item function inside a scope that guarantees the iterator's
//! `close` is invoked on interrupt or error, and that the process-wide
//! interrupt registration is restored on every exit path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::warn;
use signal_hook::consts::SIGINT;
use signal_hook::SigId;

/// A sequence-producing resource that must be closed to release whatever
/// it holds (e.g. a progress-bar display line).
///
/// `close` is invoked at most once by the guard, and only on the
/// interrupt or error paths; an iterator that runs to completion is
/// assumed to have wound itself down.
pub trait Closeable: Iterator {
    type CloseError: std::fmt::Display;

    fn close(&mut self) -> Result<(), Self::CloseError>;
}

/// Errors from a guarded iteration
#[derive(Debug, thiserror::Error)]
pub enum GuardError<E> {
    /// An interrupt arrived mid-iteration; the iterator was closed before
    /// returning.
    #[error("iteration interrupted")]
    Interrupted,
    /// The iterator produced no items, so there is no last result.
    #[error("iterator produced no items")]
    Empty,
    /// The per-item function failed; the iterator was closed before the
    /// error was passed back unchanged.
    #[error(transparent)]
    Apply(E),
    #[error("failed to install interrupt handler: {0}")]
    Signal(std::io::Error),
}

/// Scoped registration of an interrupt flag.
///
/// Construction registers a SIGINT action that sets the flag; dropping
/// the scope unregisters it. Registrations are additive, so whatever
/// interrupt behavior was installed before the scope stays in effect
/// while it is live and is exactly what remains after it drops.
pub struct InterruptScope {
    flag: Arc<AtomicBool>,
    id: SigId,
}

impl InterruptScope {
    pub fn install() -> std::io::Result<Self> {
        let flag = Arc::new(AtomicBool::new(false));
        let id = signal_hook::flag::register(SIGINT, Arc::clone(&flag))?;
        Ok(Self { flag, id })
    }

    /// The flag the registered action sets on interrupt.
    pub fn interrupted(&self) -> &AtomicBool {
        &self.flag
    }
}

impl Drop for InterruptScope {
    fn drop(&mut self) {
        signal_hook::low_level::unregister(self.id);
    }
}

/// Call `f` for each item of `iter`, returning the last result.
///
/// An interrupt (Ctrl+C) observed between items closes the iterator and
/// returns [`GuardError::Interrupted`]; an error from `f` closes the
/// iterator and propagates unchanged; either way remaining items are
/// never pulled. The interrupt registration installed for the duration
/// of the call is removed on every exit path.
pub fn safe_iterate<I, F, T, E>(iter: I, f: F) -> Result<T, GuardError<E>>
where
    I: Closeable,
    F: FnMut(I::Item) -> Result<T, E>,
{
    let scope = InterruptScope::install().map_err(GuardError::Signal)?;
    run_guarded(iter, f, scope.interrupted())
    // scope drops here, restoring the prior interrupt disposition
}

/// The guarded loop itself, driven by a caller-supplied interrupt flag.
///
/// Useful when the application already maintains its own cancellation
/// flag (and for tests). [`safe_iterate`] is this plus an
/// [`InterruptScope`].
pub fn run_guarded<I, F, T, E>(
    mut iter: I,
    mut f: F,
    interrupted: &AtomicBool,
) -> Result<T, GuardError<E>>
where
    I: Closeable,
    F: FnMut(I::Item) -> Result<T, E>,
{
    let mut last = None;
    loop {
        if interrupted.load(Ordering::SeqCst) {
            close_quietly(&mut iter);
            return Err(GuardError::Interrupted);
        }
        let Some(item) = iter.next() else {
            break;
        };
        match f(item) {
            Ok(result) => last = Some(result),
            Err(err) => {
                close_quietly(&mut iter);
                return Err(GuardError::Apply(err));
            }
        }
    }
    last.ok_or(GuardError::Empty)
}

/// A close failure must never mask the outcome that triggered it.
fn close_quietly<I: Closeable>(iter: &mut I) {
    if let Err(err) = iter.close() {
        warn!("failed to close guarded iterator: {}", err);
    }
}

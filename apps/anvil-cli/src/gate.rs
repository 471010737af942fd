//! # App-Open Lock
//!
//! When the shop has the biometric lock on, the app asks an
//! [`Authenticator`] before running anything.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  biometric_enabled = false ──────────────────────────────► Proceed      │
//! │                                                                         │
//! │  biometric_enabled = true ──► authenticate()                            │
//! │        Success ──────────────────────────────────────────► Proceed      │
//! │        Cancelled ────────────────────────────────────────► Terminate    │
//! │        Error(reason) ──► fail_open ? ────────────────────► Proceed      │
//! │                                   : ─────────────────────► Terminate    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A failed match counts as an error. With `fail_open` (the default) an
//! error lets the user in, as the shop's app always has.

use std::io::{BufRead, Write};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// What the sensor (or its stand-in) reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthOutcome {
    Success,
    /// The user backed out of the prompt.
    Cancelled,
    /// No hardware, nothing enrolled, no match, or any other failure.
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateDecision {
    Proceed,
    Terminate,
}

pub trait Authenticator {
    fn authenticate(&self) -> AuthOutcome;
}

/// Maps an outcome to a decision.
pub fn decide(outcome: &AuthOutcome, fail_open: bool) -> GateDecision {
    match outcome {
        AuthOutcome::Success => GateDecision::Proceed,
        AuthOutcome::Cancelled => GateDecision::Terminate,
        AuthOutcome::Error(_) if fail_open => GateDecision::Proceed,
        AuthOutcome::Error(_) => GateDecision::Terminate,
    }
}

/// Runs the lock. The authenticator is only asked when `enabled`.
pub fn check(enabled: bool, auth: &dyn Authenticator, fail_open: bool) -> GateDecision {
    if !enabled {
        return GateDecision::Proceed;
    }

    let outcome = auth.authenticate();
    let decision = decide(&outcome, fail_open);
    match &outcome {
        AuthOutcome::Error(reason) => {
            warn!(reason = %reason, fail_open, ?decision, "Unlock failed")
        }
        _ => info!(?outcome, ?decision, "Unlock attempted"),
    }
    decision
}

/// Terminal stand-in for a fingerprint prompt: asks the operator to confirm.
///
/// `y` unlocks, anything else cancels, and an unreadable terminal is an
/// error.
pub struct ConsoleAuthenticator<R, W> {
    input: std::cell::RefCell<R>,
    output: std::cell::RefCell<W>,
}

impl<R: BufRead, W: Write> ConsoleAuthenticator<R, W> {
    pub fn new(input: R, output: W) -> Self {
        ConsoleAuthenticator {
            input: std::cell::RefCell::new(input),
            output: std::cell::RefCell::new(output),
        }
    }
}

impl<R: BufRead, W: Write> Authenticator for ConsoleAuthenticator<R, W> {
    fn authenticate(&self) -> AuthOutcome {
        {
            let mut out = self.output.borrow_mut();
            if let Err(e) = write!(out, "Shop is locked. Unlock? [y/N] ").and_then(|_| out.flush()) {
                return AuthOutcome::Error(e.to_string());
            }
        }

        let mut answer = String::new();
        match self.input.borrow_mut().read_line(&mut answer) {
            Ok(0) => AuthOutcome::Error("no terminal input".to_string()),
            Ok(_) if answer.trim().eq_ignore_ascii_case("y") => AuthOutcome::Success,
            Ok(_) => AuthOutcome::Cancelled,
            Err(e) => AuthOutcome::Error(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::io::Cursor;

    struct Fixed {
        outcome: AuthOutcome,
        calls: Cell<u32>,
    }

    impl Fixed {
        fn new(outcome: AuthOutcome) -> Self {
            Fixed {
                outcome,
                calls: Cell::new(0),
            }
        }
    }

    impl Authenticator for Fixed {
        fn authenticate(&self) -> AuthOutcome {
            self.calls.set(self.calls.get() + 1);
            self.outcome.clone()
        }
    }

    #[test]
    fn test_decision_table() {
        let err = AuthOutcome::Error("no hardware".to_string());
        assert_eq!(decide(&AuthOutcome::Success, false), GateDecision::Proceed);
        assert_eq!(decide(&AuthOutcome::Cancelled, true), GateDecision::Terminate);
        assert_eq!(decide(&err, true), GateDecision::Proceed);
        assert_eq!(decide(&err, false), GateDecision::Terminate);
    }

    #[test]
    fn test_disabled_lock_never_prompts() {
        let auth = Fixed::new(AuthOutcome::Cancelled);
        assert_eq!(check(false, &auth, false), GateDecision::Proceed);
        assert_eq!(auth.calls.get(), 0);

        assert_eq!(check(true, &auth, false), GateDecision::Terminate);
        assert_eq!(auth.calls.get(), 1);
    }

    #[test]
    fn test_console_authenticator() {
        let yes = ConsoleAuthenticator::new(Cursor::new("y\n"), Vec::new());
        assert_eq!(yes.authenticate(), AuthOutcome::Success);

        let no = ConsoleAuthenticator::new(Cursor::new("\n"), Vec::new());
        assert_eq!(no.authenticate(), AuthOutcome::Cancelled);

        let closed = ConsoleAuthenticator::new(Cursor::new(""), Vec::new());
        assert!(matches!(closed.authenticate(), AuthOutcome::Error(_)));
    }
}

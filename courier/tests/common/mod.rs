#![allow(dead_code)]

use courier::{DispatchError, testing::CallLog};
use std::time::Duration;

pub const WAIT: Duration = Duration::from_secs(5);

/// Install a subscriber honouring `RUST_LOG`, once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Test Interfaces
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum UiError {
    #[error("refused: {0}")]
    Refused(String),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

#[courier::listener]
pub trait Click {
    fn on_click(&self, x: i32);

    fn on_submit(&self, form: String) -> Result<(), UiError>;

    #[courier(ignore)]
    fn describe(&self) -> String;

    #[courier(ignore)]
    fn reset(&self) -> Result<(), UiError>;
}

#[courier::listener]
pub trait Scroll {
    fn on_scroll(&self, delta: i64);

    #[courier(deliver = "deferred")]
    fn on_fling(&self, velocity: i64);
}

#[courier::listener(explicit, name = "Lifecycle")]
pub trait Lifecycle: Send + Sync {
    #[courier(dispatch)]
    fn on_start(&self);

    #[courier(dispatch, deliver = "sync")]
    fn on_stop(&self, reason: String);

    fn generation(&self) -> Result<u32, UiError>;
}

// ============================================================================
// Test Listeners
// ============================================================================

/// Records every call as `"{label}:{method} {arg}"`.
#[derive(courier::Listener)]
#[listener(implements(Click, Scroll), name = "spy")]
pub struct Spy {
    pub label: &'static str,
    pub log: CallLog,
    pub fail_submit: bool,
}

impl Spy {
    pub fn new(label: &'static str, log: &CallLog) -> Self {
        Self {
            label,
            log: log.clone(),
            fail_submit: false,
        }
    }

    pub fn failing(label: &'static str, log: &CallLog) -> Self {
        Self {
            fail_submit: true,
            ..Self::new(label, log)
        }
    }
}

impl Click for Spy {
    fn on_click(&self, x: i32) {
        self.log.record(format!("{}:on_click {x}", self.label));
    }

    fn on_submit(&self, form: String) -> Result<(), UiError> {
        self.log.record(format!("{}:on_submit {form}", self.label));
        if self.fail_submit {
            return Err(UiError::Refused(form));
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("spy {}", self.label)
    }

    fn reset(&self) -> Result<(), UiError> {
        self.log.record(format!("{}:reset", self.label));
        Ok(())
    }
}

impl Scroll for Spy {
    fn on_scroll(&self, delta: i64) {
        self.log.record(format!("{}:on_scroll {delta}", self.label));
    }

    fn on_fling(&self, velocity: i64) {
        self.log.record(format!("{}:on_fling {velocity}", self.label));
    }
}

/// Like [`Spy`] but delivered on the hub's executor.
#[derive(courier::Listener)]
#[listener(implements(Click), deferred, name = "deferred-spy")]
pub struct DeferredSpy {
    pub label: &'static str,
    pub log: CallLog,
    pub fail_submit: bool,
}

impl DeferredSpy {
    pub fn new(label: &'static str, log: &CallLog) -> Self {
        Self {
            label,
            log: log.clone(),
            fail_submit: false,
        }
    }

    pub fn failing(label: &'static str, log: &CallLog) -> Self {
        Self {
            fail_submit: true,
            ..Self::new(label, log)
        }
    }
}

impl Click for DeferredSpy {
    fn on_click(&self, x: i32) {
        self.log.record(format!("{}:on_click {x}", self.label));
    }

    fn on_submit(&self, form: String) -> Result<(), UiError> {
        self.log.record(format!("{}:on_submit {form}", self.label));
        if self.fail_submit {
            return Err(UiError::Refused(form));
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("deferred spy {}", self.label)
    }

    fn reset(&self) -> Result<(), UiError> {
        Ok(())
    }
}

/// Panics on every click.
#[derive(courier::Listener)]
#[listener(implements(Click), sync, name = "bomb")]
pub struct Bomb;

impl Click for Bomb {
    fn on_click(&self, x: i32) {
        panic!("bomb went off at {x}");
    }

    fn on_submit(&self, _form: String) -> Result<(), UiError> {
        panic!("bomb went off on submit");
    }

    fn describe(&self) -> String {
        "bomb".to_owned()
    }

    fn reset(&self) -> Result<(), UiError> {
        Ok(())
    }
}

#[derive(courier::Listener)]
#[listener(implements(Lifecycle), name = "service")]
pub struct Service {
    pub log: CallLog,
}

impl Lifecycle for Service {
    fn on_start(&self) {
        self.log.record("service:on_start");
    }

    fn on_stop(&self, reason: String) {
        self.log.record(format!("service:on_stop {reason}"));
    }

    fn generation(&self) -> Result<u32, UiError> {
        Ok(1)
    }
}

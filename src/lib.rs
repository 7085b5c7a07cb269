#![doc(test(attr(deny(warnings))))]

//! Claim Wizard is the core of a multi-section warranty-claim form: a field
//! registry, derived values, section navigation, completion tracking, saved
//! sessions and the submission lifecycle, plus a shell to drive them.

pub mod cli;
pub mod config;
pub mod errors;
pub mod form;
pub mod storage;
pub mod submission;
pub mod time;
pub mod utils;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Claim Wizard tracing initialized.");
    });
}

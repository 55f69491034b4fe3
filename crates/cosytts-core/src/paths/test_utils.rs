//! Serialises tests that touch process-global state (env vars, cwd).

use std::sync::Mutex;

pub static ENV_LOCK: Mutex<()> = Mutex::new(());

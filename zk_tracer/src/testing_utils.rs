//! A set of utility functions to be used by `zk_tracer` unit and integration
//! tests.

use env_logger::{try_init_from_env, Env, DEFAULT_FILTER_ENV};

pub fn init_logger() {
    let _ = try_init_from_env(Env::default().filter_or(DEFAULT_FILTER_ENV, "info"));
}

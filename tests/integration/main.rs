//! Integration tests against an in-process mock of the push API

mod config_test;
mod feed_test;
mod run_test;
mod support;
mod transport_test;

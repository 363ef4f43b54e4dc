#[path = "support/harness.rs"]
mod harness;

#[path = "gateway/api.rs"]
mod api;

#[path = "support/harness.rs"]
mod harness;

#[path = "workflow/engine_properties.rs"]
mod engine_properties;
#[path = "workflow/routing.rs"]
mod routing;

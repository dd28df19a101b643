// The app is wasm32-only; the host build gets an empty entry point so the
// bin target links and integration tests can build.
#[cfg(target_arch = "wasm32")]
include!("app.rs");

#[cfg(not(target_arch = "wasm32"))]
fn main() {}

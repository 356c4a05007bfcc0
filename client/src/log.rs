//! Console logging that also works in native test builds, so engine
//! code exercised by host tests goes through the same diagnostics
//! path as the wasm build.

#[cfg(target_arch = "wasm32")]
pub fn warn(message: &str) {
    web_sys::console::warn_1(&message.into());
}

#[cfg(not(target_arch = "wasm32"))]
pub fn warn(message: &str) {
    eprintln!("warn: {message}");
}

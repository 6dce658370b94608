//! satchel browser bridge
//!
//! Exposes the satchel record store to JavaScript through wasm-bindgen.
//! Registration is explicit and opt-in: nothing touches global state until
//! the host calls [`browser::init_store`], and every storage export goes
//! through the store registered by that call.
//!
//! Records cross the boundary as JSON strings; ids as JS numbers.
//!
//! Built with the `browser` feature:
//!
//! ```sh
//! wasm-pack build --features browser
//! ```

#[cfg(feature = "browser")]
pub mod browser;

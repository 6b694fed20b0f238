//! Thin `wasm-bindgen` shim over [`transmitwave_core::Decoder`], exposing exactly the
//! host-binding surface named in the core crate's external-interface table: construct,
//! `feed`, `process`, `fetch`, and an implicit `destroy` via `Drop`/JS garbage collection.

use transmitwave_core::{Decoder, MESG_BYTES};
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub struct WasmDecoder {
    inner: Decoder,
}

#[wasm_bindgen]
impl WasmDecoder {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Result<WasmDecoder, JsValue> {
        Decoder::new()
            .map(|inner| WasmDecoder { inner })
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Admits up to `EXTENDED_LENGTH` audio samples. Returns `true` once a full
    /// extended-symbol period has accumulated and `process` should be called.
    #[wasm_bindgen]
    pub fn feed(&mut self, samples: &[f32]) -> bool {
        self.inner.feed(samples)
    }

    /// Advances the decoder by one symbol period. Returns `true` once a full payload
    /// codeword is ready for `fetch`.
    #[wasm_bindgen]
    pub fn process(&mut self) -> bool {
        self.inner.process()
    }

    /// Decodes and descrambles the assembled codeword. Returns `None` if the Polar
    /// decode wasn't consistent enough to be trusted; otherwise the decoded bytes.
    #[wasm_bindgen]
    pub fn fetch(&mut self) -> Option<Vec<u8>> {
        let mut payload = [0_u8; MESG_BYTES];
        if self.inner.fetch(&mut payload) {
            Some(payload.to_vec())
        } else {
            None
        }
    }
}

#[wasm_bindgen(start)]
pub fn init() {
    // Optional panic hook setup
}

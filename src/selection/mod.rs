//! Selection capture for PopAsk
//!
//! - `events`: the selection event and the subscription-based event bus
//! - `ocr`: text recognition for screen captures
//! - `window`: the window control port
//! - `binder`: turns selection events into staged or dispatched chat input

pub mod binder;
pub mod events;
pub mod ocr;
pub mod window;

pub use binder::{SelectionBinder, SelectionOutcome, OCR_TIMEOUT_NOTICE};
pub use events::{EventBus, SelectionEvent, Subscription, GET_SELECTION};
pub use ocr::{OcrEngine, OcrResult, TesseractOcr};
pub use window::{HeadlessWindow, WindowPort};

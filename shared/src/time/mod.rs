mod clock_translator;
mod error;

pub use clock_translator::{Breakpoint, ClockTranslator, ClockUpdate};
pub use error::TranslateError;

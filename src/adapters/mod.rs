// Adapters layer: concrete readers for inputs that arrive outside HTTP.

pub mod input;

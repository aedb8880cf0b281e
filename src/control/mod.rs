//! Control core: smoothing window, learning functions, and the
//! per-quantity controller that ties them to the FSM.

pub mod learn;
pub mod quantity;
pub mod window;

pub use quantity::QuantityController;
pub use window::SampleWindow;

pub mod controller;
pub mod model;


pub use controller::{ControllerError, DocumentController, GenerationEvent};
pub use model::{Document, ForkDescriptor, PendingState, Snapshot};

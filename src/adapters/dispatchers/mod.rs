pub mod mock;

pub use mock::{MockDispatcher, MockOutcome};

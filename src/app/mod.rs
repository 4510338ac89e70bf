// Application layer - Use case interactors

pub mod container;
pub mod convert_interactor;
pub mod inspect_interactor;
pub mod verify_interactor;

// Re-export interactors
pub use container::{AppContainer, DefaultAppContainer};
pub use convert_interactor::{CancelHandle, CancelToken, ConvertInteractor, ConvertSettings};
pub use inspect_interactor::InspectInteractor;
pub use verify_interactor::VerifyInteractor;

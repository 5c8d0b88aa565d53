// This is free and unencumbered software released into the public domain.

mod config;
pub use config::*;

mod driver;
pub use driver::*;

pub mod drivers {
    pub mod ffmpeg;
    pub mod synthetic;
}

mod error;
pub use error::*;

mod feedback;
pub use feedback::*;

mod frame;
pub use frame::*;

mod open;
pub use open::*;

mod permission;
pub use permission::*;

mod provider;
pub use provider::*;

mod rotation;
pub use rotation::*;

mod storage;
pub use storage::*;

mod surface;
pub use surface::*;

mod use_case;
pub use use_case::*;

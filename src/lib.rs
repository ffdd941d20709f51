pub mod config;
pub mod deploy;
pub mod device;
pub mod uf2;

pub use config::Config;
pub use deploy::{convert_or_flash, deploy, Error, IoError, Outcome, Request};
pub use device::{FlashTarget, Locator};
pub use uf2::{ContainerImage, FormatError, RawImage};

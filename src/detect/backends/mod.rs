pub mod script;
pub mod stub;

#[cfg(feature = "backend-tract")]
pub mod tract;

pub use script::ScriptedBackend;
pub use stub::StubBackend;

#[cfg(feature = "backend-tract")]
pub use tract::TractBackend;

// Download registry services
// Stateless helpers and supporting engines used by the managers.

pub mod broadcaster;
pub mod file_mover;
pub mod mime;
pub mod settings_engine;

//! Admin authoring flows behind the editor forms.

pub mod form;
pub mod posts;
pub mod site;

pub use form::FormPayload;

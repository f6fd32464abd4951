//! Script model, validation and templates.
//!
//! A script arrives as loosely-typed JSON and leaves [`validate_script`] as an immutable
//! [`Script`] whose scenes are contiguous, 0-based and non-empty.

pub(crate) mod model;
pub(crate) mod template;
pub(crate) mod validate;

pub use model::{Scene, Script};
pub use template::{PromptPreset, create_script_template, load_script, prompt_preset, save_script};
pub use validate::{
    DurationMismatchError, FieldError, PathElem, ScriptError, ValidationConfig, ValidationError,
    parse_script, validate_script,
};

pub mod edit_state;
pub mod fields;
pub mod list_editor;
pub mod model;
pub mod transform;

pub use edit_state::{parse_numeric_input, EditState, InputEvent, InputKind, Section};
pub use fields::{FieldSpec, Widget, APPEARANCE_FIELDS, SYSTEM_FIELDS};
pub use list_editor::ListEditor;
pub use model::{ListSection, LoadedSettings, SettingsAggregate, SettingsSection};
pub use transform::{
    unwrap_option, unwrap_options_list, wrap_list_as_options, wrap_scalar_as_option, FieldKind,
    FieldValue, OptionPair,
};

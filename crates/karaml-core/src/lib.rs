// Karaml Core Library
// Compiles karaml keymap documents into Karabiner-Elements rules

pub mod alias;
pub mod compiler;
pub mod config;
pub mod error;
pub mod event;
pub mod expression;
pub mod key_codes;
pub mod layer;
pub mod literal;
pub mod mapping;
pub mod modifier;
pub mod registry;
pub mod resolver;
pub mod rule;
pub mod template;

pub use alias::{Alias, AliasTable, AliasTarget};
pub use compiler::{chatter_safeguard, Compiler};
pub use config::{
    ConfigStats, DocumentFormat, KaramlConfig, LayerDefinition, LayerRules, RuleSet,
};
pub use error::{ConfigError, Result};
pub use event::{EventAction, EventKind, HoldFlavor, KeyEvent, StickyState, ToVariant};
pub use layer::LayerKey;
pub use mapping::{MappingDefinition, MappingEntry};
pub use modifier::{ModifierSpec, ModifierTable};
pub use registry::{Registry, RegistryBuilder};
pub use resolver::Resolver;
pub use rule::{CompiledRule, Condition, FromEvent, LayerToggle, ToEvent, ToOpts};
pub use template::{BuiltinTemplate, Expansion, Template, UserTemplate};

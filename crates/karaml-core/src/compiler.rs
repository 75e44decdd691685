// Karaml Core - Mapping Compiler
// Assembles tap/hold/after outputs into basic rules and layer toggles

use indexmap::IndexMap;
use log::{debug, trace};

use crate::error::{ConfigError, Result};
use crate::event::{EventAction, HoldFlavor, KeyEvent, ToVariant};
use crate::layer::{layer_variable, LayerKey};
use crate::mapping::{self, MappingDefinition, MappingEntry};
use crate::registry::Registry;
use crate::resolver::Resolver;
use crate::rule::{CompiledRule, Condition, LayerToggle, ToEvent, ToOpts};

/// Which position of a mapping an expression came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Tap(ToVariant),
    Hold,
    After,
}

/// Rule under construction
#[derive(Debug, Default)]
struct Assembly {
    conditions: Vec<Condition>,
    to: IndexMap<ToVariant, Vec<ToEvent>>,
    toggles: Vec<LayerToggle>,
}

impl Assembly {
    fn add(&mut self, variant: ToVariant, events: Vec<ToEvent>) {
        if events.is_empty() {
            return;
        }
        self.to.entry(variant).or_default().extend(events);
    }

    /// Move everything from one variant to another, keeping order
    fn reassign(&mut self, from: ToVariant, to: ToVariant) {
        if let Some(events) = self.to.shift_remove(&from) {
            trace!("moving {} event(s) from {} to {}", events.len(), from, to);
            self.add(to, events);
        }
    }
}

/// Reclassify a `to` output as `to_if_held_down` when the mapping also has
/// a hold output and any of the events would fire on every key-down.
///
/// # Arguments
/// * `hold_defined` - Whether the mapping has a hold output
/// * `variant` - The variant the events would otherwise go to
/// * `events` - The resolved events of that output, before layer references
///   are turned into variable changes
pub fn chatter_safeguard(hold_defined: bool, variant: ToVariant, events: &[KeyEvent]) -> ToVariant {
    if hold_defined && variant == ToVariant::To && events.iter().any(KeyEvent::is_chatty) {
        ToVariant::ToIfHeldDown
    } else {
        variant
    }
}

/// Compiles mappings against a frozen [`Registry`]
#[derive(Debug, Clone)]
pub struct Compiler {
    registry: Registry,
    hold_flavor: HoldFlavor,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new(Registry::builtin(), HoldFlavor::default())
    }
}

impl Compiler {
    pub fn new(registry: Registry, hold_flavor: HoldFlavor) -> Self {
        Self {
            registry,
            hold_flavor,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn hold_flavor(&self) -> HoldFlavor {
        self.hold_flavor
    }

    /// Compile one `from: value` entry of a layer.
    ///
    /// Errors are reported with the layer and from-expression they came from.
    pub fn compile_mapping(
        &self,
        layer: &LayerKey,
        from: &str,
        value: &serde_json::Value,
    ) -> Result<Vec<CompiledRule>> {
        let entries =
            mapping::mapping_entries(from, value).map_err(|e| e.in_mapping(&layer.key, from))?;
        let preconditions = layer.conditions();

        let mut rules = Vec::new();
        for entry in &entries {
            let compiled = self
                .compile_entry(&preconditions, entry)
                .map_err(|e| e.in_mapping(&layer.key, from))?;
            rules.extend(compiled);
        }
        Ok(rules)
    }

    /// Compile a mapping limited to a frontmost application, if any
    pub fn compile_entry(
        &self,
        preconditions: &[Condition],
        entry: &MappingEntry,
    ) -> Result<Vec<CompiledRule>> {
        let mut rules = self.compile(&entry.definition, preconditions)?;
        if let Some(app) = &entry.app_condition {
            for rule in &mut rules {
                rule.conditions.push(app.clone());
            }
        }
        Ok(rules)
    }

    /// Compile one mapping into its rule, followed by the rule turning a
    /// tapped layer back off when the tap output toggles one.
    ///
    /// Outputs are assembled in the order after, hold, tap. A tap goes to
    /// `to_if_alone` when the mapping has a hold output and to `to`
    /// otherwise; a hold goes to the compiler's [`HoldFlavor`] variant.
    pub fn compile(
        &self,
        definition: &MappingDefinition,
        preconditions: &[Condition],
    ) -> Result<Vec<CompiledRule>> {
        let resolver = Resolver::new(&self.registry);
        let from = resolver.from_event(&definition.from)?;
        let hold_defined = definition.hold.is_some();

        let mut assembly = Assembly {
            conditions: preconditions.to_vec(),
            ..Assembly::default()
        };

        if let Some(expr) = &definition.after {
            let resolved = resolver.to_events(expr)?;
            let events = layer_events(resolved, Slot::After, &mut assembly);
            assembly.add(ToVariant::ToAfterKeyUp, events);
        }

        if let Some(expr) = &definition.hold {
            let initial = self.hold_flavor.variant();
            let resolved = resolver.to_events(expr)?;
            let variant = chatter_safeguard(hold_defined, initial, &resolved);
            let mut events = layer_events(resolved, Slot::Hold, &mut assembly);
            if initial == ToVariant::To {
                apply_opts(&mut events, &definition.opts);
            }
            if variant != initial {
                debug!(
                    "'{}': hold output '{}' moved to {}",
                    definition.from, expr, variant
                );
            }
            assembly.add(variant, events);
        }

        if let Some(expr) = &definition.tap {
            let initial = if hold_defined {
                ToVariant::ToIfAlone
            } else {
                ToVariant::To
            };
            let resolved = resolver.to_events(expr)?;
            let variant = chatter_safeguard(hold_defined, initial, &resolved);
            let mut events = layer_events(resolved, Slot::Tap(variant), &mut assembly);
            if initial == ToVariant::To {
                apply_opts(&mut events, &definition.opts);
            }
            assembly.add(variant, events);

            // A tapped layer must not fire the hold output on key-down
            if hold_defined && !assembly.toggles.is_empty() {
                assembly.reassign(ToVariant::To, ToVariant::ToIfHeldDown);
            }
        }

        if assembly.to.is_empty() {
            return Err(ConfigError::MissingTo(definition.from.clone()));
        }

        let Assembly {
            conditions,
            to,
            toggles,
        } = assembly;
        let rule = CompiledRule {
            conditions,
            from,
            to,
            parameters: definition.params.clone(),
        };

        let companion = (!toggles.is_empty())
            .then(|| toggles.iter().fold(rule.clone(), |off, toggle| toggle.companion(&off)));

        let mut rules = vec![rule];
        if let Some(companion) = companion {
            trace!("'{}': emitting layer toggle-off rule", definition.from);
            rules.push(companion);
        }
        Ok(rules)
    }
}

/// Turn layer references into variable events according to the slot they
/// appear in; every other event passes through.
fn layer_events(resolved: Vec<KeyEvent>, slot: Slot, assembly: &mut Assembly) -> Vec<ToEvent> {
    let mut events = Vec::with_capacity(resolved.len());
    for event in resolved {
        let name = match &event.action {
            EventAction::Layer(name) => layer_variable(name),
            _ => {
                events.push(ToEvent::new(event));
                continue;
            }
        };
        match slot {
            Slot::After => events.push(ToEvent::set_variable(&name, 1)),
            Slot::Hold => {
                events.push(ToEvent::set_variable(&name, 1));
                assembly.add(
                    ToVariant::ToAfterKeyUp,
                    vec![ToEvent::set_variable(&name, 0)],
                );
            }
            Slot::Tap(variant) => {
                let toggle = LayerToggle::new(name, variant);
                assembly.conditions.push(toggle.guard());
                events.push(toggle.switch_on());
                assembly.toggles.push(toggle);
            }
        }
    }
    events
}

fn apply_opts(events: &mut [ToEvent], opts: &ToOpts) {
    if opts.is_empty() {
        return;
    }
    for event in events {
        event.opts = opts.clone();
    }
}

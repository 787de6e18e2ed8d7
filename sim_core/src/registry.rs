//! Plug-in registry
//!
//! Spec factories and item effects are registered on an explicit
//! [`Registry`] that the caller builds once and passes to the driver.
//! Nothing registers itself.

use crate::agent::Agent;
use crate::character::{Character, UnitId};
use crate::error::SimError;
use crate::request::{PlayerConfig, SpecOptions};
use serde::de::DeserializeOwned;
use serde::Serialize;
use stats_core::Stats;
use std::collections::HashMap;
use std::sync::Arc;

type SpecFactory =
    Arc<dyn Fn(&mut UnitSetup<'_>, &toml::Value) -> Result<Box<dyn Agent>, SimError> + Send + Sync>;
type ItemEffect = Arc<dyn Fn(&mut Character) + Send + Sync>;

/// A player under construction, handed to its spec factory
///
/// The character is not finalized yet: the factory may still add stats,
/// dependencies, permanent auras and pets.
pub struct UnitSetup<'a> {
    pub character: Character,
    pub talents: &'a toml::Value,
    pub consumables: &'a [String],
    pets: Vec<PetSetup>,
}

/// A pet added during setup, with its own agent
pub(crate) struct PetSetup {
    pub character: Character,
    pub agent: Box<dyn Agent>,
}

impl<'a> UnitSetup<'a> {
    pub(crate) fn new(character: Character, player: &'a PlayerConfig) -> Self {
        UnitSetup {
            character,
            talents: &player.talents,
            consumables: &player.consumables,
            pets: Vec::new(),
        }
    }

    pub fn unit(&self) -> UnitId {
        self.character.id
    }

    /// Add a pet owned by this unit; returns the pet's id
    pub fn add_pet(
        &mut self,
        name: impl Into<String>,
        base: Stats,
        agent: impl FnOnce(UnitId) -> Box<dyn Agent>,
    ) -> UnitId {
        let id = UnitId(self.character.id.0 + 1 + self.pets.len());
        let mut character = Character::new(id, name, base);
        character.owner = Some(self.character.id);
        self.pets.push(PetSetup {
            character,
            agent: agent(id),
        });
        id
    }

    pub fn pet_mut(&mut self, id: UnitId) -> Option<&mut Character> {
        self.pets
            .iter_mut()
            .map(|p| &mut p.character)
            .find(|c| c.id == id)
    }

    pub(crate) fn into_parts(self) -> (Character, Vec<PetSetup>) {
        (self.character, self.pets)
    }
}

/// Spec factories keyed by tag and item effects keyed by item id
#[derive(Clone, Default)]
pub struct Registry {
    specs: HashMap<String, SpecFactory>,
    item_effects: HashMap<i32, ItemEffect>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the factory for a spec tag
    ///
    /// The factory receives the player's options deserialized into `O`.
    /// Registering a tag twice is a programming error and panics.
    pub fn register_spec<O, F>(&mut self, tag: &str, factory: F)
    where
        O: DeserializeOwned + 'static,
        F: Fn(&mut UnitSetup<'_>, O) -> Box<dyn Agent> + Send + Sync + 'static,
    {
        if self.specs.contains_key(tag) {
            panic!("Spec '{}' registered twice", tag);
        }
        let owned_tag = tag.to_string();
        let spec: SpecFactory = Arc::new(move |setup: &mut UnitSetup<'_>, value: &toml::Value| {
            let options: O = value.clone().try_into().map_err(|e: toml::de::Error| SimError::SpecOptions {
                tag: owned_tag.clone(),
                message: e.to_string(),
            })?;
            Ok(factory(setup, options))
        });
        self.specs.insert(tag.to_string(), spec);
    }

    /// Register the effect of an item, gem or enchant id
    pub fn register_item_effect(&mut self, id: i32, effect: impl Fn(&mut Character) + Send + Sync + 'static) {
        if self.item_effects.contains_key(&id) {
            panic!("Item effect {} registered twice", id);
        }
        self.item_effects.insert(id, Arc::new(effect));
    }

    pub fn has_spec(&self, tag: &str) -> bool {
        self.specs.contains_key(tag)
    }

    pub fn has_item_effect(&self, id: i32) -> bool {
        self.item_effects.contains_key(&id)
    }

    /// Install typed spec options on a player
    pub fn set_spec_options<O: Serialize>(
        &self,
        player: &mut PlayerConfig,
        tag: &str,
        options: &O,
    ) -> Result<(), SimError> {
        if !self.has_spec(tag) {
            return Err(SimError::UnknownSpec(tag.to_string()));
        }
        let value = toml::Value::try_from(options).map_err(|e| SimError::SpecOptions {
            tag: tag.to_string(),
            message: e.to_string(),
        })?;
        player.spec = SpecOptions {
            tag: tag.to_string(),
            options: value,
        };
        Ok(())
    }

    pub(crate) fn build_agent(&self, spec: &SpecOptions, setup: &mut UnitSetup<'_>) -> Result<Box<dyn Agent>, SimError> {
        let factory = self
            .specs
            .get(&spec.tag)
            .ok_or_else(|| SimError::UnknownSpec(spec.tag.clone()))?;
        factory(setup, &spec.options)
    }

    /// Run the effect registered for `id`, if any; returns whether one ran
    pub(crate) fn apply_item_effect(&self, id: i32, character: &mut Character) -> bool {
        match self.item_effects.get(&id) {
            Some(effect) => {
                effect(character);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::Sim;
    use serde::Deserialize;

    struct Idle(UnitId);

    impl Agent for Idle {
        fn unit(&self) -> UnitId {
            self.0
        }
        fn on_gcd_ready(&mut self, _sim: &mut Sim) {}
    }

    #[derive(Serialize, Deserialize)]
    struct IdleOptions {
        #[serde(default)]
        pets: u32,
    }

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry.register_spec("idle", |setup: &mut UnitSetup<'_>, options: IdleOptions| {
            for n in 0..options.pets {
                setup.add_pet(format!("Pet {}", n), Stats::new(), |id| Box::new(Idle(id)) as Box<dyn Agent>);
            }
            Box::new(Idle(setup.unit())) as Box<dyn Agent>
        });
        registry
    }

    #[test]
    fn test_unknown_spec_is_error() {
        let registry = registry();
        let player = PlayerConfig::new("P", SpecOptions::new("missing"));
        let mut setup = UnitSetup::new(Character::new(UnitId(0), "P", Stats::new()), &player);
        let err = registry.build_agent(&player.spec, &mut setup).err().unwrap();
        assert!(matches!(err, SimError::UnknownSpec(tag) if tag == "missing"));
    }

    #[test]
    fn test_options_round_trip_through_setter() {
        let registry = registry();
        let mut player = PlayerConfig::new("P", SpecOptions::new("idle"));
        registry
            .set_spec_options(&mut player, "idle", &IdleOptions { pets: 2 })
            .unwrap();

        let mut setup = UnitSetup::new(Character::new(UnitId(4), "P", Stats::new()), &player);
        let agent = registry.build_agent(&player.spec, &mut setup).unwrap();
        assert_eq!(agent.unit(), UnitId(4));

        let (_, pets) = setup.into_parts();
        let ids: Vec<UnitId> = pets.iter().map(|p| p.character.id).collect();
        assert_eq!(ids, vec![UnitId(5), UnitId(6)]);
        assert_eq!(pets[0].character.owner, Some(UnitId(4)));
        assert_eq!(pets[1].agent.unit(), UnitId(6));
    }

    #[test]
    fn test_bad_options_are_reported() {
        let registry = registry();
        let mut player = PlayerConfig::new("P", SpecOptions::new("idle"));
        player.spec.options = toml::Value::String("not a table".to_string());
        let mut setup = UnitSetup::new(Character::new(UnitId(0), "P", Stats::new()), &player);
        let err = registry.build_agent(&player.spec, &mut setup).err().unwrap();
        assert!(matches!(err, SimError::SpecOptions { .. }));
    }

    #[test]
    fn test_item_effect_runs_once_per_call() {
        let mut registry = Registry::new();
        registry.register_item_effect(1001, |c: &mut Character| {
            c.pseudo.damage_dealt_multiplier *= 1.02;
        });

        let mut character = Character::new(UnitId(0), "P", Stats::new());
        assert!(registry.apply_item_effect(1001, &mut character));
        assert!(!registry.apply_item_effect(2002, &mut character));
        assert!((character.pseudo.damage_dealt_multiplier - 1.02).abs() < 1e-12);
    }

    #[test]
    #[should_panic(expected = "registered twice")]
    fn test_duplicate_spec_panics() {
        let mut registry = registry();
        registry.register_spec("idle", |setup: &mut UnitSetup<'_>, _: IdleOptions| {
            Box::new(Idle(setup.unit())) as Box<dyn Agent>
        });
    }
}

//! Scripted caster used by the end-to-end tests

use crate::agent::Agent;
use crate::character::UnitId;
use crate::aura::ReapplyPolicy;
use crate::combat::{Cast, CastAttempt, DamageInput, Debuff, DotInput, DotRefresh};
use crate::registry::{Registry, UnitSetup};
use crate::request::{EncounterConfig, PlayerConfig, SimOptions, SimRequest, SpecOptions};
use crate::sim::Sim;
use crate::target::{TargetConfig, TargetId};
use serde::{Deserialize, Serialize};
use stats_core::{ActionId, SpellSchool, Stats};
use std::time::Duration;

pub const TEST_SPEC: &str = "test_caster";
pub const BOLT: ActionId = ActionId::spell(1);
pub const COOLDOWN: ActionId = ActionId::spell(2);
pub const VULNERABILITY: ActionId = ActionId::spell(3);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DotOptions {
    pub ticks: u32,
    pub tick_secs: f64,
    pub damage: f64,
    pub restart: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CasterOptions {
    pub damage: f64,
    pub gcd_secs: f64,
    pub cost: f64,
    pub cast_time_secs: f64,
    pub area: bool,
    pub aoe_cap: Option<f64>,
    pub dot: Option<DotOptions>,
    /// Cast only at these times instead of on every GCD
    pub cast_at: Vec<f64>,
    /// Damage per cast of a pet running the same rotation
    pub pet_damage: Option<f64>,
    /// Off-GCD major cooldown dealing this much, on a 30s cooldown
    pub major_cooldown: Option<f64>,
    /// Refreshing damage-taken debuff of this length left on every hit target
    pub debuff_secs: Option<f64>,
    /// Cycle through the targets one cast at a time instead of hitting the first
    pub rotate_targets: bool,
}

impl Default for CasterOptions {
    fn default() -> Self {
        CasterOptions {
            damage: 100.0,
            gcd_secs: 1.0,
            cost: 0.0,
            cast_time_secs: 0.0,
            area: false,
            aoe_cap: None,
            dot: None,
            cast_at: Vec::new(),
            pet_damage: None,
            major_cooldown: None,
            debuff_secs: None,
            rotate_targets: false,
        }
    }
}

impl CasterOptions {
    fn cast(&self) -> Cast {
        let mut cast = Cast::spell(BOLT, SpellSchool::Fire)
            .with_gcd(Duration::from_secs_f64(self.gcd_secs))
            .with_cost(self.cost)
            .with_cast_time(Duration::from_secs_f64(self.cast_time_secs));
        if self.damage > 0.0 {
            cast = cast.with_damage(DamageInput::fixed(self.damage));
        }
        if self.area {
            cast = cast.area(self.aoe_cap);
        }
        if let Some(dot) = &self.dot {
            let refresh = if dot.restart {
                DotRefresh::Restart
            } else {
                DotRefresh::Extend
            };
            let input = DotInput::new(
                dot.ticks,
                Duration::from_secs_f64(dot.tick_secs),
                DamageInput::fixed(dot.damage),
            );
            cast = cast.with_dot(input.with_refresh(refresh));
        }
        if let Some(secs) = self.debuff_secs {
            cast = cast.with_debuff(Debuff {
                action: VULNERABILITY,
                label: "Vulnerability".to_string(),
                duration: Duration::from_secs_f64(secs),
                policy: ReapplyPolicy::Refresh,
                damage_taken_per_stack: 0.1,
            });
        }
        cast
    }
}

pub struct TestCaster {
    unit: UnitId,
    cast: Cast,
    cast_at: Vec<Duration>,
    next: usize,
    rotate_targets: bool,
    casts: usize,
}

impl TestCaster {
    pub fn new(unit: UnitId, options: &CasterOptions) -> Self {
        TestCaster {
            unit,
            cast: options.cast(),
            cast_at: options.cast_at.iter().map(|&s| Duration::from_secs_f64(s)).collect(),
            next: 0,
            rotate_targets: options.rotate_targets,
            casts: 0,
        }
    }
}

impl Agent for TestCaster {
    fn unit(&self) -> UnitId {
        self.unit
    }

    fn reset(&mut self, _sim: &mut Sim) {
        self.next = 0;
        self.casts = 0;
    }

    fn on_gcd_ready(&mut self, sim: &mut Sim) {
        if !self.cast_at.is_empty() {
            match self.cast_at.get(self.next) {
                Some(&at) if at > sim.now() => {
                    sim.wait_until(self.unit, at);
                    return;
                }
                Some(_) => self.next += 1,
                None => {
                    let end = sim.duration();
                    sim.wait_until(self.unit, end);
                    return;
                }
            }
        }

        let target = if self.rotate_targets {
            TargetId(self.casts % sim.target_count().max(1))
        } else {
            TargetId(0)
        };
        match sim.cast(self.unit, &self.cast, target) {
            CastAttempt::Started | CastAttempt::Completed => self.casts += 1,
            CastAttempt::InsufficientResource { needed } => sim.wait_for_resource(self.unit, needed),
            CastAttempt::OnCooldown { ready_at } => sim.wait_until(self.unit, ready_at),
            CastAttempt::NoTarget => {
                let end = sim.duration();
                sim.wait_until(self.unit, end);
            }
        }
    }
}

/// Registry with the scripted caster installed
pub fn registry() -> Registry {
    let mut registry = Registry::new();
    registry.register_spec(TEST_SPEC, |setup: &mut UnitSetup<'_>, options: CasterOptions| {
        if let Some(damage) = options.pet_damage {
            let pet_options = CasterOptions {
                damage,
                pet_damage: None,
                major_cooldown: None,
                ..options.clone()
            };
            setup.add_pet("Pet", Stats::new(), |id| {
                Box::new(TestCaster::new(id, &pet_options)) as Box<dyn Agent>
            });
        }
        if let Some(damage) = options.major_cooldown {
            let cast = Cast::spell(COOLDOWN, SpellSchool::Arcane)
                .off_gcd()
                .with_cooldown(Duration::from_secs(30))
                .with_damage(DamageInput::fixed(damage));
            setup.character.add_major_cooldown(cast, TargetId(0));
        }
        Box::new(TestCaster::new(setup.unit(), &options)) as Box<dyn Agent>
    });
    registry
}

/// One scripted caster against a training dummy
pub fn request(options: &CasterOptions, duration_secs: f64, iterations: u32) -> SimRequest {
    let registry = registry();
    let mut player = PlayerConfig::new("Caster", SpecOptions::new(TEST_SPEC));
    registry
        .set_spec_options(&mut player, TEST_SPEC, options)
        .expect("test caster is registered");

    SimRequest {
        players: vec![player],
        encounter: EncounterConfig {
            duration_secs,
            targets: vec![TargetConfig::training_dummy()],
            target_count: 0,
        },
        options: SimOptions {
            iterations,
            ..SimOptions::default()
        },
    }
}

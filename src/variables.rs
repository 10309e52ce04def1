//! Decision variables for a capacity expansion plan.
//!
//! Variables are stored in dense arenas indexed by integer keys, rather than in maps keyed by IDs.
//! The index of a technology, zone, material or component is its position in the corresponding
//! map of the [`ConstraintConfiguration`] the variables were created for. Only investments are
//! decided directly: every other variable is derived from them by [`DecisionVariables::refresh`].
use crate::configuration::ConstraintConfiguration;
use crate::units::{
    Area, Capacity, ComponentCount, ComponentsPerCapacity, Dimensionless, Mass, MassPerCapacity,
    MassPerComponent,
};
use itertools::iproduct;
use std::hash::{DefaultHasher, Hash, Hasher};

/// Investments smaller than this are treated as zero
pub const MIN_INVESTMENT: Capacity = Capacity(1e-6);

/// Resolution used when fingerprinting investments (MW)
const FINGERPRINT_RESOLUTION: f64 = 1e-3;

/// Identifies a (technology, zone, year) entry in the plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlanKey {
    /// Index of the technology
    pub technology: usize,
    /// Index of the zone
    pub zone: usize,
    /// Index of the year in the planning horizon
    pub year: usize,
}

impl PlanKey {
    /// Create a new key
    pub fn new(technology: usize, zone: usize, year: usize) -> Self {
        Self {
            technology,
            zone,
            year,
        }
    }
}

/// The dimensions of a set of decision variables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape {
    /// Number of technologies
    pub technologies: usize,
    /// Number of zones
    pub zones: usize,
    /// Number of materials
    pub materials: usize,
    /// Number of components
    pub components: usize,
    /// Number of years in the planning horizon
    pub years: usize,
}

impl Shape {
    /// The shape of variables for the given configuration
    pub fn of(config: &ConstraintConfiguration) -> Self {
        Self {
            technologies: config.technologies.len(),
            zones: config.zones.len(),
            materials: config.materials.len(),
            components: config.components.len(),
            years: config.horizon.len(),
        }
    }

    fn plan_len(&self) -> usize {
        self.technologies * self.zones * self.years
    }
}

/// The decision variables for one plan
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionVariables {
    shape: Shape,
    // Indexed by (technology, zone, year)
    investment: Vec<Capacity>,
    operational: Vec<Capacity>,
    retired: Vec<Capacity>,
    land: Vec<Area>,
    // Indexed by (material, year)
    utilisation: Vec<Mass>,
    stock: Vec<Mass>,
    recovered: Vec<Mass>,
    // Indexed by (component, year)
    production: Vec<ComponentCount>,
    // Indexed by (zone, year)
    load_shedding: Vec<Capacity>,
    reserve_shortfall: Vec<Capacity>,
    rps_shortfall: Vec<Capacity>,
}

/// Per-technology supply chain coefficients, gathered once per refresh
struct Coefficients {
    /// Units of each component needed per MW, indexed by (technology, component)
    component_units: Vec<ComponentsPerCapacity>,
    /// Tonnes of each material per component unit, indexed by (component, material)
    component_materials: Vec<MassPerComponent>,
    /// Tonnes of each material used directly per MW, indexed by (technology, material)
    direct_materials: Vec<MassPerCapacity>,
    /// Total tonnes of each material embodied per MW, indexed by (technology, material)
    embodied_materials: Vec<MassPerCapacity>,
}

impl Coefficients {
    fn new(config: &ConstraintConfiguration) -> Self {
        let technologies = config.technologies.values();
        let component_units = technologies
            .clone()
            .flat_map(|technology| {
                config.components.keys().map(|id| {
                    technology
                        .component_demand
                        .get(id)
                        .copied()
                        .unwrap_or_default()
                })
            })
            .collect();
        let component_materials = config
            .components
            .values()
            .flat_map(|component| {
                config.materials.keys().map(|id| {
                    component
                        .material_demand
                        .get(id)
                        .copied()
                        .unwrap_or_default()
                })
            })
            .collect();
        let direct_materials = technologies
            .clone()
            .flat_map(|technology| {
                config.materials.keys().map(|id| {
                    technology
                        .material_intensity
                        .get(id)
                        .copied()
                        .unwrap_or_default()
                })
            })
            .collect();
        let embodied_materials = technologies
            .flat_map(|technology| {
                technology.embodied_materials(&config.materials, &config.components)
            })
            .collect();

        Self {
            component_units,
            component_materials,
            direct_materials,
            embodied_materials,
        }
    }
}

impl DecisionVariables {
    /// Create a plan with no investment for the given configuration.
    ///
    /// Stock starts at each material's stock level and every technology is allocated all of its
    /// zone's land.
    pub fn new(config: &ConstraintConfiguration) -> Self {
        let shape = Shape::of(config);
        let plan_len = shape.plan_len();
        let material_len = shape.materials * shape.years;
        let zone_len = shape.zones * shape.years;

        let mut variables = Self {
            shape,
            investment: vec![Capacity(0.0); plan_len],
            operational: vec![Capacity(0.0); plan_len],
            retired: vec![Capacity(0.0); plan_len],
            land: vec![Area(0.0); plan_len],
            utilisation: vec![Mass(0.0); material_len],
            stock: vec![Mass(0.0); material_len],
            recovered: vec![Mass(0.0); material_len],
            production: vec![ComponentCount(0.0); shape.components * shape.years],
            load_shedding: vec![Capacity(0.0); zone_len],
            reserve_shortfall: vec![Capacity(0.0); zone_len],
            rps_shortfall: vec![Capacity(0.0); zone_len],
        };
        variables.reset_land(config);
        variables.refresh(config);

        variables
    }

    /// The dimensions of these variables
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Whether these variables have the right dimensions for the given configuration
    pub fn matches(&self, config: &ConstraintConfiguration) -> bool {
        self.shape == Shape::of(config)
    }

    fn plan_index(&self, key: PlanKey) -> usize {
        debug_assert!(key.technology < self.shape.technologies);
        debug_assert!(key.zone < self.shape.zones);
        debug_assert!(key.year < self.shape.years);
        (key.technology * self.shape.zones + key.zone) * self.shape.years + key.year
    }

    fn year_index(&self, outer: usize, year: usize) -> usize {
        debug_assert!(year < self.shape.years);
        outer * self.shape.years + year
    }

    /// Iterate over every key in the plan
    pub fn keys(&self) -> impl Iterator<Item = PlanKey> + use<> {
        let Shape {
            technologies,
            zones,
            years,
            ..
        } = self.shape;
        iproduct!(0..technologies, 0..zones, 0..years)
            .map(|(technology, zone, year)| PlanKey::new(technology, zone, year))
    }

    /// Iterate over every non-zero investment
    pub fn investments(&self) -> impl Iterator<Item = (PlanKey, Capacity)> + '_ {
        self.keys()
            .map(|key| (key, self.investment(key)))
            .filter(|(_, investment)| *investment > Capacity(0.0))
    }

    /// Total new capacity across the whole plan
    pub fn total_investment(&self) -> Capacity {
        self.investment.iter().copied().sum()
    }

    /// New capacity built for the given key
    pub fn investment(&self, key: PlanKey) -> Capacity {
        self.investment[self.plan_index(key)]
    }

    /// Set the new capacity built for the given key.
    ///
    /// Negative values are clamped to zero and values below [`MIN_INVESTMENT`] snap to zero.
    /// Derived variables are stale until [`DecisionVariables::refresh`] is called.
    pub fn set_investment(&mut self, key: PlanKey, investment: Capacity) {
        let idx = self.plan_index(key);
        self.investment[idx] = if investment < MIN_INVESTMENT {
            Capacity(0.0)
        } else {
            investment
        };
    }

    /// Multiply an investment by the given factor
    pub fn scale_investment(&mut self, key: PlanKey, factor: Dimensionless) {
        self.set_investment(key, self.investment(key) * factor);
    }

    /// Whether any capacity is built for the given key
    pub fn is_built(&self, key: PlanKey) -> bool {
        self.investment(key) > Capacity(0.0)
    }

    /// Capacity in operation, including existing capacity
    pub fn operational(&self, key: PlanKey) -> Capacity {
        self.operational[self.plan_index(key)]
    }

    /// Whether any capacity is in operation
    pub fn is_operational(&self, key: PlanKey) -> bool {
        self.operational(key) > Capacity(0.0)
    }

    /// Capacity reaching the end of its lifetime in this year
    pub fn retired(&self, key: PlanKey) -> Capacity {
        self.retired[self.plan_index(key)]
    }

    /// Whether any capacity retires in this year
    pub fn is_retiring(&self, key: PlanKey) -> bool {
        self.retired(key) > Capacity(0.0)
    }

    /// Land allocated to the given key
    pub fn land(&self, key: PlanKey) -> Area {
        self.land[self.plan_index(key)]
    }

    /// Set the land allocated to the given key
    pub fn set_land(&mut self, key: PlanKey, land: Area) {
        let idx = self.plan_index(key);
        self.land[idx] = land;
    }

    /// Allocate each zone's available land to every technology in every year
    pub fn reset_land(&mut self, config: &ConstraintConfiguration) {
        for key in self.keys() {
            let zone = &config.zones[key.zone];
            self.set_land(key, zone.available_land);
        }
    }

    /// Tonnes of a material used in a year
    pub fn utilisation(&self, material: usize, year: usize) -> Mass {
        self.utilisation[self.year_index(material, year)]
    }

    /// Tonnes of a material in stock at the start of a year
    pub fn stock(&self, material: usize, year: usize) -> Mass {
        self.stock[self.year_index(material, year)]
    }

    /// Tonnes of a material recovered from retiring capacity in a year
    pub fn recovered(&self, material: usize, year: usize) -> Mass {
        self.recovered[self.year_index(material, year)]
    }

    /// Units of a component produced in a year
    pub fn production(&self, component: usize, year: usize) -> ComponentCount {
        self.production[self.year_index(component, year)]
    }

    /// Peak demand which cannot be met in a zone and year
    pub fn load_shedding(&self, zone: usize, year: usize) -> Capacity {
        self.load_shedding[self.year_index(zone, year)]
    }

    /// Shortfall of firm capacity against the reserve margin in a zone and year
    pub fn reserve_shortfall(&self, zone: usize, year: usize) -> Capacity {
        self.reserve_shortfall[self.year_index(zone, year)]
    }

    /// Shortfall of renewable capacity against the RPS target in a zone and year
    pub fn rps_shortfall(&self, zone: usize, year: usize) -> Capacity {
        self.rps_shortfall[self.year_index(zone, year)]
    }

    /// Recompute every derived variable from the investments
    pub fn refresh(&mut self, config: &ConstraintConfiguration) {
        let coefficients = Coefficients::new(config);
        self.refresh_capacity(config);
        self.refresh_supply_chain(config, &coefficients);
        self.refresh_penalties(config);
    }

    /// Operational and retired capacity
    fn refresh_capacity(&mut self, config: &ConstraintConfiguration) {
        let years = self.shape.years;
        for (t, technology) in config.technologies.values().enumerate() {
            let lifetime = technology.lifetime as usize;
            for (z, zone) in config.zones.values().enumerate() {
                let existing = zone.existing_capacity_for(&technology.id);
                let mut operational = existing;
                for y in 0..years {
                    operational += self.investment(PlanKey::new(t, z, y));
                    let retired = if y >= lifetime {
                        self.investment(PlanKey::new(t, z, y - lifetime))
                    } else {
                        Capacity(0.0)
                    };
                    operational -= retired;

                    let idx = self.plan_index(PlanKey::new(t, z, y));
                    self.operational[idx] = operational.max(Capacity(0.0));
                    self.retired[idx] = retired;
                }
            }
        }
    }

    /// Component production, material use, recovery and stock
    fn refresh_supply_chain(
        &mut self,
        config: &ConstraintConfiguration,
        coefficients: &Coefficients,
    ) {
        let Shape {
            technologies,
            zones,
            materials,
            components,
            years,
        } = self.shape;

        for y in 0..years {
            // New and retiring capacity of each technology, summed over zones
            let built: Vec<Capacity> = (0..technologies)
                .map(|t| {
                    (0..zones)
                        .map(|z| self.investment(PlanKey::new(t, z, y)))
                        .sum()
                })
                .collect();
            let retired: Vec<Capacity> = (0..technologies)
                .map(|t| {
                    (0..zones)
                        .map(|z| self.retired(PlanKey::new(t, z, y)))
                        .sum()
                })
                .collect();

            for c in 0..components {
                let production: ComponentCount = built
                    .iter()
                    .enumerate()
                    .map(|(t, capacity)| {
                        coefficients.component_units[t * components + c] * *capacity
                    })
                    .sum();
                let idx = self.year_index(c, y);
                self.production[idx] = production;
            }

            for (m, material) in config.materials.values().enumerate() {
                let in_components: Mass = (0..components)
                    .map(|c| {
                        coefficients.component_materials[c * materials + m]
                            * self.production(c, y)
                    })
                    .sum();
                let direct: Mass = built
                    .iter()
                    .enumerate()
                    .map(|(t, capacity)| {
                        coefficients.direct_materials[t * materials + m] * *capacity
                    })
                    .sum();
                let embodied_in_retired: Mass = retired
                    .iter()
                    .enumerate()
                    .map(|(t, capacity)| {
                        coefficients.embodied_materials[t * materials + m] * *capacity
                    })
                    .sum();

                let idx = self.year_index(m, y);
                self.utilisation[idx] = in_components + direct;
                self.recovered[idx] = embodied_in_retired * material.recovery_rate;
                self.stock[idx] = if y == 0 {
                    material.stock
                } else {
                    let prev = self.year_index(m, y - 1);
                    (self.stock[prev] + material.primary_supply + self.recovered[prev]
                        - self.utilisation[prev])
                        .max(Mass(0.0))
                };
            }
        }
    }

    /// Load shedding, reserve margin and RPS shortfalls
    fn refresh_penalties(&mut self, config: &ConstraintConfiguration) {
        let reserve_factor = Dimensionless(1.0) + config.reserve_margin;
        for (z, zone) in config.zones.values().enumerate() {
            for y in 0..self.shape.years {
                let mut nameplate = Capacity(0.0);
                let mut firm = Capacity(0.0);
                let mut renewable = Capacity(0.0);
                for (t, technology) in config.technologies.values().enumerate() {
                    let operational = self.operational(PlanKey::new(t, z, y));
                    nameplate += operational;
                    firm += operational * technology.elcc;
                    if technology.is_renewable() {
                        renewable += operational;
                    }
                }

                let demand = zone.projected_demand(y);
                let target = config.rps_target(zone.rps_target, y);
                let idx = self.year_index(z, y);
                self.load_shedding[idx] =
                    (demand - nameplate - zone.transmission_capacity).max(Capacity(0.0));
                self.reserve_shortfall[idx] = (demand * reserve_factor - firm).max(Capacity(0.0));
                self.rps_shortfall[idx] = (nameplate * target - renewable).max(Capacity(0.0));
            }
        }
    }

    /// A hash of the investments, quantised so that negligible differences are ignored
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.shape.technologies.hash(&mut hasher);
        self.shape.zones.hash(&mut hasher);
        self.shape.years.hash(&mut hasher);
        for investment in &self.investment {
            ((investment.value() / FINGERPRINT_RESOLUTION).round() as i64).hash(&mut hasher);
        }

        hasher.finish()
    }
}

/// A set of changes to the investments of a plan.
///
/// Neighbouring plans are represented as a perturbation of the current plan, which is applied into
/// a reusable scratch buffer rather than building a new plan from scratch.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Perturbation {
    changes: Vec<(PlanKey, Capacity)>,
}

impl Perturbation {
    /// Create an empty perturbation
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the investment for `key` to `investment`
    pub fn push(&mut self, key: PlanKey, investment: Capacity) {
        self.changes.push((key, investment));
    }

    /// Whether the perturbation changes nothing
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// The number of investments changed
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Iterate over the changed keys and their new investments
    pub fn iter(&self) -> impl Iterator<Item = &(PlanKey, Capacity)> {
        self.changes.iter()
    }

    /// Write `base` with this perturbation applied into `scratch`, then refresh derived variables
    pub fn apply_into(
        &self,
        base: &DecisionVariables,
        scratch: &mut DecisionVariables,
        config: &ConstraintConfiguration,
    ) {
        scratch.clone_from(base);
        for (key, investment) in &self.changes {
            scratch.set_investment(*key, *investment);
        }
        scratch.refresh(config);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{configuration, supply_chain_configuration};
    use float_cmp::approx_eq;
    use rstest::rstest;

    #[rstest]
    fn test_new(supply_chain_configuration: ConstraintConfiguration) {
        let vars = DecisionVariables::new(&supply_chain_configuration);
        let shape = vars.shape();
        assert_eq!(shape.technologies, 2);
        assert_eq!(shape.zones, 1);
        assert_eq!(shape.materials, 2);
        assert_eq!(shape.components, 1);
        assert_eq!(shape.years, 5);
        assert!(vars.matches(&supply_chain_configuration));
        assert_eq!(vars.total_investment(), Capacity(0.0));
        assert_eq!(vars.investments().count(), 0);

        // Land is allocated up to the zone's limit
        for key in vars.keys() {
            assert_eq!(vars.land(key), Area(10_000.0));
        }

        // Unused silicon supply accumulates in stock
        for y in 0..5 {
            assert_eq!(vars.utilisation(0, y), Mass(0.0));
            assert_eq!(vars.stock(0, y), Mass(1000.0 * y as f64));
        }
    }

    #[rstest]
    fn test_existing_capacity_is_operational(configuration: ConstraintConfiguration) {
        let vars = DecisionVariables::new(&configuration);
        let key = PlanKey::new(0, 0, 4);
        assert_eq!(vars.operational(key), Capacity(2000.0));
        assert!(vars.is_operational(key));
        assert!(!vars.is_built(key));
    }

    #[rstest]
    fn test_set_investment_snaps_to_zero(configuration: ConstraintConfiguration) {
        let mut vars = DecisionVariables::new(&configuration);
        let key = PlanKey::new(0, 0, 3);
        vars.set_investment(key, Capacity(1e-9));
        assert_eq!(vars.investment(key), Capacity(0.0));
        vars.set_investment(key, Capacity(-5.0));
        assert_eq!(vars.investment(key), Capacity(0.0));
        vars.set_investment(key, Capacity(10.0));
        vars.scale_investment(key, Dimensionless(0.5));
        assert_eq!(vars.investment(key), Capacity(5.0));
        assert!(vars.is_built(key));
    }

    #[rstest]
    fn test_refresh_capacity_and_retirement(mut configuration: ConstraintConfiguration) {
        configuration.technologies["gas_ccgt"].lifetime = 2;
        let mut vars = DecisionVariables::new(&configuration);
        vars.set_investment(PlanKey::new(0, 0, 1), Capacity(100.0));
        vars.refresh(&configuration);

        let operational: Vec<_> = (0..5)
            .map(|y| vars.operational(PlanKey::new(0, 0, y)).value())
            .collect();
        assert_eq!(operational, vec![2000.0, 2100.0, 2100.0, 2000.0, 2000.0]);
        assert_eq!(vars.retired(PlanKey::new(0, 0, 3)), Capacity(100.0));
        assert!(vars.is_retiring(PlanKey::new(0, 0, 3)));
        assert!(!vars.is_retiring(PlanKey::new(0, 0, 2)));
    }

    #[rstest]
    fn test_refresh_supply_chain(supply_chain_configuration: ConstraintConfiguration) {
        let config = supply_chain_configuration;
        let mut vars = DecisionVariables::new(&config);

        // Build 100 MW of solar (technology 1) in year 3
        vars.set_investment(PlanKey::new(1, 0, 3), Capacity(100.0));
        vars.refresh(&config);

        // 2 modules/MW
        assert_eq!(vars.production(0, 3), ComponentCount(200.0));
        assert_eq!(vars.production(0, 2), ComponentCount(0.0));

        // 200 modules * 0.5 t + 100 MW * 0.25 t
        assert_eq!(vars.utilisation(0, 3), Mass(125.0));

        // Silicon: no stock, 1000 t/yr primary supply
        assert_eq!(vars.stock(0, 3), Mass(3000.0));
        assert_eq!(vars.stock(0, 4), Mass(3875.0));
    }

    #[rstest]
    fn test_refresh_recovery(supply_chain_configuration: ConstraintConfiguration) {
        let mut config = supply_chain_configuration;
        config.technologies["solar_pv"].lifetime = 1;
        let mut vars = DecisionVariables::new(&config);
        vars.set_investment(PlanKey::new(1, 0, 3), Capacity(100.0));
        vars.refresh(&config);

        // Half of the 125 t embodied in the retiring plant is recovered
        assert_eq!(vars.recovered(0, 4), Mass(62.5));
        assert_eq!(vars.recovered(0, 3), Mass(0.0));
    }

    #[rstest]
    fn test_refresh_penalties(mut configuration: ConstraintConfiguration) {
        let zone = &mut configuration.zones["north"];
        zone.existing_capacity["gas_ccgt"] = Capacity(1000.0);
        zone.rps_target = Dimensionless(0.1);
        let vars = DecisionVariables::new(&configuration);

        // Year 2: demand 1102.5 MW against 1000 MW of gas with an ELCC of 0.9
        assert!(approx_eq!(
            f64,
            vars.load_shedding(0, 2).value(),
            102.5,
            epsilon = 1e-9
        ));
        assert!(approx_eq!(
            f64,
            vars.reserve_shortfall(0, 2).value(),
            1102.5 * 1.15 - 900.0,
            epsilon = 1e-9
        ));
        assert_eq!(vars.load_shedding(0, 0), Capacity(0.0));
        // Target of 0.1 against no renewable capacity
        assert!(approx_eq!(
            f64,
            vars.rps_shortfall(0, 0).value(),
            100.0,
            epsilon = 1e-9
        ));
    }

    #[rstest]
    fn test_fingerprint(configuration: ConstraintConfiguration) {
        let mut a = DecisionVariables::new(&configuration);
        let mut b = a.clone();
        assert_eq!(a.fingerprint(), b.fingerprint());

        a.set_investment(PlanKey::new(0, 0, 2), Capacity(10.0));
        b.set_investment(PlanKey::new(0, 0, 2), Capacity(10.000_000_1));
        assert_eq!(a.fingerprint(), b.fingerprint());

        b.set_investment(PlanKey::new(0, 0, 2), Capacity(11.0));
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[rstest]
    fn test_perturbation_apply_into(configuration: ConstraintConfiguration) {
        let base = DecisionVariables::new(&configuration);
        let mut scratch = base.clone();
        let key = PlanKey::new(0, 0, 3);

        let mut perturbation = Perturbation::new();
        assert!(perturbation.is_empty());
        perturbation.push(key, Capacity(50.0));
        assert_eq!(perturbation.len(), 1);
        perturbation.apply_into(&base, &mut scratch, &configuration);

        assert_eq!(scratch.investment(key), Capacity(50.0));
        assert_eq!(scratch.operational(key), Capacity(2050.0));
        // The base plan is untouched
        assert_eq!(base.investment(key), Capacity(0.0));
    }
}

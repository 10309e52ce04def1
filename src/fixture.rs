//! Fixtures for tests

use crate::component::{Component, ComponentMap};
use crate::configuration::{ConstraintConfiguration, PlanningHorizon, SolverParameters};
use crate::material::{Material, MaterialMap, MaterialType};
use crate::scenario::{Scenario, ScenarioMap};
use crate::technology::{Technology, TechnologyMap, TechnologyType};
use crate::units::{
    Area, Capacity, CapacityPerArea, ComponentCount, ComponentsPerCapacity, Dimensionless, Mass,
    MassPerCapacity, MassPerComponent, MoneyPerCapacity, MoneyPerEnergy, MoneyPerMass,
};
use crate::zone::{Zone, ZoneMap};
use indexmap::{IndexMap, indexmap};
use rstest::fixture;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

#[fixture]
pub fn materials() -> MaterialMap {
    let silicon = Material {
        id: "silicon".into(),
        kind: MaterialType::Critical,
        primary_supply: Mass(1000.0),
        recovery_rate: Dimensionless(0.5),
        stock: Mass(0.0),
        cost_per_tonne: MoneyPerMass(2000.0),
        geopolitical_risk: Dimensionless(0.3),
        domestic_availability: Dimensionless(0.2),
    };
    let lithium = Material {
        id: "lithium".into(),
        kind: MaterialType::Critical,
        primary_supply: Mass(500.0),
        recovery_rate: Dimensionless(0.0),
        stock: Mass(100.0),
        cost_per_tonne: MoneyPerMass(15_000.0),
        geopolitical_risk: Dimensionless(0.6),
        domestic_availability: Dimensionless(0.1),
    };

    indexmap! {
        silicon.id.clone() => silicon,
        lithium.id.clone() => lithium,
    }
}

#[fixture]
pub fn components() -> ComponentMap {
    let pv_module = Component {
        id: "pv_module".into(),
        material_demand: indexmap! {"silicon".into() => MassPerComponent(0.5)},
        production_capacity: ComponentCount(1_000_000.0),
        lead_time: 3,
    };

    indexmap! {pv_module.id.clone() => pv_module}
}

/// A gas plant with no supply chain dependencies
#[fixture]
pub fn technology() -> Technology {
    Technology {
        id: "gas_ccgt".into(),
        kind: TechnologyType::Gas,
        component_demand: IndexMap::new(),
        capacity_density: CapacityPerArea(100.0),
        lead_time: 2,
        lifetime: 30,
        capital_cost: MoneyPerCapacity(1_000_000.0),
        variable_cost: MoneyPerEnergy(0.0),
        elcc: Dimensionless(0.9),
        material_intensity: IndexMap::new(),
        manufacturing_capacity: Capacity(10_000.0),
    }
}

/// Solar PV, which needs PV modules and silicon
#[fixture]
pub fn solar() -> Technology {
    Technology {
        id: "solar_pv".into(),
        kind: TechnologyType::Solar,
        component_demand: indexmap! {"pv_module".into() => ComponentsPerCapacity(2.0)},
        capacity_density: CapacityPerArea(50.0),
        lead_time: 1,
        lifetime: 25,
        capital_cost: MoneyPerCapacity(800_000.0),
        variable_cost: MoneyPerEnergy(0.0),
        elcc: Dimensionless(0.3),
        material_intensity: indexmap! {"silicon".into() => MassPerCapacity(0.25)},
        manufacturing_capacity: Capacity(10_000.0),
    }
}

#[fixture]
pub fn zone() -> Zone {
    Zone {
        id: "north".into(),
        available_land: Area(10_000.0),
        peak_load: Capacity(1000.0),
        demand_growth: Dimensionless(0.05),
        existing_capacity: indexmap! {"gas_ccgt".into() => Capacity(2000.0)},
        transmission_capacity: Capacity(0.0),
        rps_target: Dimensionless(0.0),
    }
}

#[fixture]
pub fn scenarios() -> ScenarioMap {
    let high_demand = Scenario {
        description: "Faster demand growth".into(),
        demand_scale: Dimensionless(1.2),
        ..Scenario::identity("high_demand")
    };
    let silicon_shock = Scenario {
        description: "Silicon export restrictions".into(),
        material_supply: indexmap! {"silicon".into() => Dimensionless(0.1)},
        ..Scenario::identity("silicon_shock")
    };

    indexmap! {
        high_demand.id.clone() => high_demand,
        silicon_shock.id.clone() => silicon_shock,
    }
}

/// One zone with one gas technology and no supply chain.
///
/// The zone's existing gas fleet covers demand and reserves over the whole horizon, so no penalty
/// is ever incurred.
#[fixture]
pub fn configuration(technology: Technology, zone: Zone) -> ConstraintConfiguration {
    let technologies: TechnologyMap = indexmap! {technology.id.clone() => technology};
    let zones: ZoneMap = indexmap! {zone.id.clone() => zone};

    ConstraintConfiguration {
        materials: MaterialMap::new(),
        components: ComponentMap::new(),
        technologies,
        zones,
        horizon: PlanningHorizon {
            start_year: 2025,
            years: 5,
        },
        reserve_margin: Dimensionless(0.15),
        rps_targets: Vec::new(),
        parameters: SolverParameters::default(),
        scenarios: ScenarioMap::new(),
    }
}

/// [`configuration`] extended with solar PV, its supply chain and some scenarios
#[fixture]
pub fn supply_chain_configuration(
    mut configuration: ConstraintConfiguration,
    materials: MaterialMap,
    components: ComponentMap,
    solar: Technology,
    scenarios: ScenarioMap,
) -> ConstraintConfiguration {
    configuration.materials = materials;
    configuration.components = components;
    configuration
        .technologies
        .insert(solar.id.clone(), solar);
    configuration.scenarios = scenarios;

    configuration
}

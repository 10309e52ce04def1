//! Technologies are the kinds of generating plant which can be built. The data structures in this
//! module describe what each technology needs from the supply chain and what it costs.
use crate::component::{ComponentID, ComponentMap};
use crate::id::{define_id_getter, define_id_type};
use crate::material::{MaterialID, MaterialMap};
use crate::units::{
    Capacity, CapacityPerArea, ComponentsPerCapacity, Dimensionless, MassPerCapacity,
    MoneyPerCapacity, MoneyPerEnergy,
};
use indexmap::IndexMap;
use serde_string_enum::DeserializeLabeledStringEnum;

define_id_type! {TechnologyID}

/// A map of [`Technology`]s, keyed by technology ID
pub type TechnologyMap = IndexMap<TechnologyID, Technology>;

/// Represents a generation technology
#[derive(PartialEq, Debug, Clone)]
pub struct Technology {
    /// A unique identifier for the technology (e.g. "solar_pv")
    pub id: TechnologyID,
    /// The kind of technology
    pub kind: TechnologyType,
    /// Components needed per MW built
    pub component_demand: IndexMap<ComponentID, ComponentsPerCapacity>,
    /// MW which can be installed on one km² of land
    pub capacity_density: CapacityPerArea,
    /// Minimum number of years between the start of the horizon and the first build
    pub lead_time: u32,
    /// Years a newly built unit operates before it retires
    pub lifetime: u32,
    /// Overnight capital cost per MW
    pub capital_cost: MoneyPerCapacity,
    /// Variable operating cost per MWh
    pub variable_cost: MoneyPerEnergy,
    /// Effective load carrying capability: the fraction of nameplate counted towards reserves
    pub elcc: Dimensionless,
    /// Tonnes of material used directly per MW, on top of what the components contain
    pub material_intensity: IndexMap<MaterialID, MassPerCapacity>,
    /// MW which can be manufactured and installed per year, across all zones
    pub manufacturing_capacity: Capacity,
}
define_id_getter! {Technology, TechnologyID}

impl Technology {
    /// Whether this technology counts towards renewable portfolio standards
    pub fn is_renewable(&self) -> bool {
        self.kind.is_renewable()
    }

    /// The first year index in which this technology can be built.
    ///
    /// This is the later of the technology's own lead time and that of the slowest component it
    /// needs.
    pub fn earliest_build_index(&self, components: &ComponentMap) -> usize {
        let component_lead_time = self
            .component_demand
            .keys()
            .filter_map(|id| components.get(id))
            .map(|component| component.lead_time)
            .max()
            .unwrap_or(0);

        self.lead_time.max(component_lead_time) as usize
    }

    /// Tonnes of the given material embodied in one MW of this technology.
    ///
    /// Includes the material in its components as well as any used directly.
    pub fn embodied_material(
        &self,
        material_id: &MaterialID,
        components: &ComponentMap,
    ) -> MassPerCapacity {
        let in_components = self
            .component_demand
            .iter()
            .filter_map(|(id, per_mw)| {
                let per_unit = components.get(id)?.material_demand.get(material_id)?;
                Some(*per_mw * *per_unit)
            })
            .sum::<MassPerCapacity>();
        let direct = self
            .material_intensity
            .get(material_id)
            .copied()
            .unwrap_or_default();

        in_components + direct
    }

    /// Tonnes of every material embodied in one MW of this technology, in the order of `materials`
    pub fn embodied_materials(
        &self,
        materials: &MaterialMap,
        components: &ComponentMap,
    ) -> Vec<MassPerCapacity> {
        materials
            .keys()
            .map(|id| self.embodied_material(id, components))
            .collect()
    }

    /// Whether building this technology draws on the given material
    pub fn uses_material(&self, material_id: &MaterialID, components: &ComponentMap) -> bool {
        self.embodied_material(material_id, components).value() > 0.0
    }
}

/// The kind of a [`Technology`]
#[allow(missing_docs)]
#[derive(PartialEq, Eq, Debug, Clone, Copy, DeserializeLabeledStringEnum, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum TechnologyType {
    #[string = "solar"]
    Solar,
    #[string = "wind"]
    Wind,
    #[string = "hydro"]
    Hydro,
    #[string = "geothermal"]
    Geothermal,
    #[string = "biomass"]
    Biomass,
    #[string = "battery"]
    Battery,
    #[string = "nuclear"]
    Nuclear,
    #[string = "gas"]
    Gas,
    #[string = "coal"]
    Coal,
}

impl TechnologyType {
    /// Whether output from this kind of technology is renewable
    pub fn is_renewable(self) -> bool {
        matches!(
            self,
            Self::Solar | Self::Wind | Self::Hydro | Self::Geothermal | Self::Biomass
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{components, solar, technology};
    use rstest::rstest;

    #[rstest]
    fn test_earliest_build_index_uses_component_lead_time(
        solar: Technology,
        components: ComponentMap,
    ) {
        // Solar needs PV modules, which take three years to deliver
        assert_eq!(solar.lead_time, 1);
        assert_eq!(solar.earliest_build_index(&components), 3);
    }

    #[rstest]
    fn test_earliest_build_index_no_components(technology: Technology, components: ComponentMap) {
        assert_eq!(technology.earliest_build_index(&components), 2);
    }

    #[rstest]
    fn test_embodied_material(solar: Technology, components: ComponentMap) {
        // 2 modules/MW * 0.5 t/module + 0.25 t/MW direct
        assert_eq!(
            solar.embodied_material(&"silicon".into(), &components),
            MassPerCapacity(1.25)
        );
        assert_eq!(
            solar.embodied_material(&"lithium".into(), &components),
            MassPerCapacity(0.0)
        );
        assert!(solar.uses_material(&"silicon".into(), &components));
        assert!(!solar.uses_material(&"lithium".into(), &components));
    }

    #[rstest]
    #[case(TechnologyType::Solar, true)]
    #[case(TechnologyType::Wind, true)]
    #[case(TechnologyType::Battery, false)]
    #[case(TechnologyType::Gas, false)]
    fn test_is_renewable(#[case] kind: TechnologyType, #[case] expected: bool) {
        assert_eq!(kind.is_renewable(), expected);
    }
}

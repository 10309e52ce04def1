//! Components are manufactured parts (cells, magnets, turbines, panels) built from materials and
//! consumed when new generating capacity is built.
use crate::id::{define_id_getter, define_id_type};
use crate::material::MaterialID;
use crate::units::{ComponentCount, MassPerComponent};
use indexmap::IndexMap;

define_id_type! {ComponentID}

/// A map of [`Component`]s, keyed by component ID
pub type ComponentMap = IndexMap<ComponentID, Component>;

/// Represents a manufactured component
#[derive(PartialEq, Debug, Clone)]
pub struct Component {
    /// A unique identifier for the component (e.g. "pv_module")
    pub id: ComponentID,
    /// Tonnes of each material needed per unit
    pub material_demand: IndexMap<MaterialID, MassPerComponent>,
    /// Units which can be produced each year
    pub production_capacity: ComponentCount,
    /// Years between ordering and delivery
    pub lead_time: u32,
}
define_id_getter! {Component, ComponentID}

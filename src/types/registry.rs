use std::collections::HashMap;
use tracing::{info, warn};

use crate::types::bus::CanBus;

/// Named collection of buses. Owns every bus exclusively; buses are added
/// on DBC load and live until the registry is dropped.
#[derive(Default, Debug)]
pub struct BusRegistry {
    buses: HashMap<String, CanBus>,
    order: Vec<String>,
}

impl BusRegistry {
    pub fn new() -> Self {
        BusRegistry::default()
    }

    /// Creates a bus if absent. Returns `false` (and logs) when a bus of
    /// that name already exists.
    pub fn create_bus(&mut self, name: &str) -> bool {
        if self.buses.contains_key(name) {
            info!(bus = name, "bus already exists");
            return false;
        }
        self.buses.insert(name.to_string(), CanBus::new(name));
        self.order.push(name.to_string());
        info!(bus = name, "bus created");
        true
    }

    pub fn get_bus(&self, name: &str) -> Option<&CanBus> {
        let bus = self.buses.get(name);
        if bus.is_none() {
            warn!(bus = name, "bus not found");
        }
        bus
    }

    pub fn get_bus_mut(&mut self, name: &str) -> Option<&mut CanBus> {
        self.buses.get_mut(name)
    }

    /// The bus of that name, created on first use.
    pub fn get_or_create_bus(&mut self, name: &str) -> &mut CanBus {
        self.create_bus(name);
        self.buses
            .entry(name.to_string())
            .or_insert_with(|| CanBus::new(name))
    }

    /// Iterate buses in creation order.
    pub fn iter_buses(&self) -> impl Iterator<Item = &CanBus> + '_ {
        self.order.iter().filter_map(|name| self.buses.get(name))
    }
}

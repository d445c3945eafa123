//! Inventory provider contract.
//!
//! The engine does not know what a domain, entity, sensor, control, MC, or
//! connection is. A provider supplies, per kind, an enumeration entry point
//! (visit every child of a parent) and a display-name accessor.
//!
//! Enumeration must be synchronous: every item is visited before the call
//! returns.

/// Longest display name the walkers will emit, in bytes.
pub const MAX_NAME_LEN: usize = 64;

/// Object inventory consumed by the `for_each_*` walkers.
pub trait Inventory: Send + Sync + 'static {
    type Domain: 'static;
    type Entity: 'static;
    type Sensor: 'static;
    type Control: 'static;
    type Mc: 'static;

    fn iterate_domains(&self, f: &mut dyn FnMut(&Self::Domain));
    fn domain_name(&self, domain: &Self::Domain) -> String;

    fn iterate_entities(&self, domain: &Self::Domain, f: &mut dyn FnMut(&Self::Entity));
    fn entity_name(&self, entity: &Self::Entity) -> String;

    fn iterate_sensors(&self, entity: &Self::Entity, f: &mut dyn FnMut(&Self::Sensor));
    fn sensor_name(&self, sensor: &Self::Sensor) -> String;

    fn iterate_controls(&self, entity: &Self::Entity, f: &mut dyn FnMut(&Self::Control));
    fn control_name(&self, control: &Self::Control) -> String;

    fn iterate_mcs(&self, domain: &Self::Domain, f: &mut dyn FnMut(&Self::Mc));
    fn mc_name(&self, mc: &Self::Mc) -> String;

    /// Connection numbers of a domain.
    fn iterate_connections(&self, domain: &Self::Domain, f: &mut dyn FnMut(u32));
}

/// Cut `name` to at most [`MAX_NAME_LEN`] bytes on a char boundary.
pub fn bounded_name(mut name: String) -> String {
    if name.len() > MAX_NAME_LEN {
        let mut end = MAX_NAME_LEN;
        while !name.is_char_boundary(end) {
            end -= 1;
        }
        name.truncate(end);
    }
    name
}

/*!
In-memory inventory loaded from a fixture file.

Fixture shape (YAML or JSON, picked by file extension):

```yaml
domains:
  - name: lab
    connections:
      - active: true
      - active: false
    mcs:
      - name: "0.20"
        events_enabled: true
    entities:
      - name: "7.1"
        sensors:
          - { name: Temp, value: 41.5, unit: C }
        controls:
          - { name: Fan Speed, values: [3] }
```

Connection numbers are list positions. Every list may be omitted.
*/

use std::path::Path;

use anyhow::{Context, Result};
use cmdlang::Inventory;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub domains: Vec<DomainSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainSpec {
    pub name: String,
    #[serde(default)]
    pub entities: Vec<EntitySpec>,
    #[serde(default)]
    pub mcs: Vec<McSpec>,
    #[serde(default)]
    pub connections: Vec<ConnectionSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySpec {
    pub name: String,
    #[serde(default)]
    pub sensors: Vec<SensorSpec>,
    #[serde(default)]
    pub controls: Vec<ControlSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorSpec {
    pub name: String,
    /// Last reading; absent when the sensor cannot be read.
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlSpec {
    pub name: String,
    #[serde(default)]
    pub values: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McSpec {
    pub name: String,
    #[serde(default)]
    pub events_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionSpec {
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Fixture {
    /// Load a fixture; `.yaml` / `.yml` parse as YAML, anything else as JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read inventory file: {}", path.display()))?;
        let lower = path.to_string_lossy().to_ascii_lowercase();
        let fixture = if lower.ends_with(".yaml") || lower.ends_with(".yml") {
            serde_yaml::from_str(&raw).context("failed to parse YAML inventory")?
        } else {
            serde_json::from_str(&raw).context("failed to parse JSON inventory")?
        };
        Ok(fixture)
    }
}

impl Inventory for Fixture {
    type Domain = DomainSpec;
    type Entity = EntitySpec;
    type Sensor = SensorSpec;
    type Control = ControlSpec;
    type Mc = McSpec;

    fn iterate_domains(&self, f: &mut dyn FnMut(&DomainSpec)) {
        self.domains.iter().for_each(f);
    }

    fn domain_name(&self, domain: &DomainSpec) -> String {
        domain.name.clone()
    }

    fn iterate_entities(&self, domain: &DomainSpec, f: &mut dyn FnMut(&EntitySpec)) {
        domain.entities.iter().for_each(f);
    }

    fn entity_name(&self, entity: &EntitySpec) -> String {
        entity.name.clone()
    }

    fn iterate_sensors(&self, entity: &EntitySpec, f: &mut dyn FnMut(&SensorSpec)) {
        entity.sensors.iter().for_each(f);
    }

    fn sensor_name(&self, sensor: &SensorSpec) -> String {
        sensor.name.clone()
    }

    fn iterate_controls(&self, entity: &EntitySpec, f: &mut dyn FnMut(&ControlSpec)) {
        entity.controls.iter().for_each(f);
    }

    fn control_name(&self, control: &ControlSpec) -> String {
        control.name.clone()
    }

    fn iterate_mcs(&self, domain: &DomainSpec, f: &mut dyn FnMut(&McSpec)) {
        domain.mcs.iter().for_each(f);
    }

    fn mc_name(&self, mc: &McSpec) -> String {
        mc.name.clone()
    }

    fn iterate_connections(&self, domain: &DomainSpec, f: &mut dyn FnMut(u32)) {
        (0..domain.connections.len() as u32).for_each(f);
    }
}

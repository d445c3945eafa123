/*!
Command tree served by the shell.

Layout:
  domain   list | info | refresh   [domain]
  entity   list | info             [domain(entity)]
  sensor   list | get              [domain(entity).sensor]
  control  list | get              [domain(entity).control]
  mc       list | info             [domain(mc)]
  con      list | active           [domain.number]
  general  echo ARGS...

`domain refresh` completes asynchronously: each matching domain gets its own
task on the runtime, and the line finishes when the last task finishes.
*/

use std::sync::Arc;
use std::time::Duration;

use cmdlang::handlers::{
    next_address, register_connection_cmd, register_control_cmd, register_domain_cmd,
    register_entity_cmd, register_mc_cmd, register_sensor_cmd,
};
use cmdlang::iter::for_each_domain;
use cmdlang::{CmdInfo, CommandTree, LangError};
use tokio::runtime::Handle;

use super::inventory::{ControlSpec, DomainSpec, EntitySpec, Fixture, McSpec, SensorSpec};

/// Build the full tree over `inv`. Async work is spawned on `runtime`.
pub fn build(
    inv: Arc<Fixture>,
    runtime: Handle,
    refresh_delay: Duration,
) -> Result<CommandTree, LangError> {
    let mut tree = CommandTree::new();

    /* ---- domain ---- */
    let domain = tree.branch(None, "domain", "domain commands")?;
    register_domain_cmd(&mut tree, Some(domain), "list", "list domains", inv.clone(), |_, _| {})?;
    register_domain_cmd(
        &mut tree,
        Some(domain),
        "info",
        "counts of entities, MCs and connections",
        inv.clone(),
        |info, d: &DomainSpec| {
            info.out_int("Entities", d.entities.len() as i64);
            info.out_int("MCs", d.mcs.len() as i64);
            info.out_int("Connections", d.connections.len() as i64);
        },
    )?;
    let refresh_inv = inv.clone();
    tree.leaf(
        Some(domain),
        "refresh",
        "re-read domains in the background",
        move |info| refresh(info, &refresh_inv, &runtime, refresh_delay),
    )?;

    /* ---- entity ---- */
    let entity = tree.branch(None, "entity", "entity commands")?;
    register_entity_cmd(&mut tree, Some(entity), "list", "list entities", inv.clone(), |_, _| {})?;
    register_entity_cmd(
        &mut tree,
        Some(entity),
        "info",
        "counts of sensors and controls",
        inv.clone(),
        |info, e: &EntitySpec| {
            info.out_int("Sensors", e.sensors.len() as i64);
            info.out_int("Controls", e.controls.len() as i64);
        },
    )?;

    /* ---- sensor ---- */
    let sensor = tree.branch(None, "sensor", "sensor commands")?;
    register_sensor_cmd(&mut tree, Some(sensor), "list", "list sensors", inv.clone(), |_, _| {})?;
    register_sensor_cmd(
        &mut tree,
        Some(sensor),
        "get",
        "read sensor values",
        inv.clone(),
        |info, s: &SensorSpec| match s.value {
            Some(v) => {
                info.out_str("Value", &v.to_string());
                if let Some(unit) = &s.unit {
                    info.out_str("Unit", unit);
                }
            }
            None => info.out("Unavailable", None),
        },
    )?;

    /* ---- control ---- */
    let control = tree.branch(None, "control", "control commands")?;
    register_control_cmd(&mut tree, Some(control), "list", "list controls", inv.clone(), |_, _| {})?;
    register_control_cmd(
        &mut tree,
        Some(control),
        "get",
        "read control values",
        inv.clone(),
        |info, c: &ControlSpec| {
            for v in &c.values {
                info.out_int("Value", *v);
            }
        },
    )?;

    /* ---- mc ---- */
    let mc = tree.branch(None, "mc", "management controller commands")?;
    register_mc_cmd(&mut tree, Some(mc), "list", "list MCs", inv.clone(), |_, _| {})?;
    register_mc_cmd(
        &mut tree,
        Some(mc),
        "info",
        "MC event state",
        inv.clone(),
        |info, m: &McSpec| info.out_bool("Events Enabled", m.events_enabled),
    )?;

    /* ---- con ---- */
    let con = tree.branch(None, "con", "connection commands")?;
    register_connection_cmd(
        &mut tree,
        Some(con),
        "list",
        "list connections",
        inv.clone(),
        |_, _, _| {},
    )?;
    register_connection_cmd(
        &mut tree,
        Some(con),
        "active",
        "whether each connection is active",
        inv,
        |info, d: &DomainSpec, conn| {
            let active = d
                .connections
                .get(conn as usize)
                .is_some_and(|c| c.active);
            info.out_bool("Active", active);
        },
    )?;

    /* ---- general ---- */
    let general = tree.branch(None, "general", "miscellaneous commands")?;
    tree.leaf(Some(general), "echo", "print each argument", |info| {
        while let Some(arg) = info.next_arg() {
            info.out_str("Arg", arg);
        }
    })?;

    Ok(tree)
}

/// Spawn one task per matching domain; each keeps the line open until it
/// reports back.
fn refresh(info: &CmdInfo, inv: &Fixture, runtime: &Handle, delay: Duration) {
    let addr = match next_address(info, "domain") {
        Ok(a) => a,
        Err(e) => return info.fail(e),
    };
    let walked = for_each_domain(info, inv, &addr, &mut |d| {
        let hold = info.hold();
        let name = d.name.clone();
        let entities = d.entities.len() as i64;
        runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if hold.has_error() {
                tracing::debug!(domain = %name, "refresh report dropped after line error");
                return;
            }
            tracing::debug!(domain = %name, "refresh finished");
            hold.out_str("Refreshed", &name);
            if hold.has_error() {
                return;
            }
            hold.down();
            hold.out_int("Entities", entities);
            hold.up();
        });
    });
    if let Err(e) = walked {
        info.fail(e);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::shell::inventory::ConnectionSpec;

    pub fn fixture() -> Fixture {
        Fixture {
            domains: vec![
                DomainSpec {
                    name: "lab".into(),
                    entities: vec![EntitySpec {
                        name: "7.1".into(),
                        sensors: vec![
                            SensorSpec {
                                name: "Temp".into(),
                                value: Some(41.5),
                                unit: Some("C".into()),
                            },
                            SensorSpec {
                                name: "Fan".into(),
                                value: None,
                                unit: None,
                            },
                        ],
                        controls: vec![ControlSpec {
                            name: "Fan Speed".into(),
                            values: vec![3, 4],
                        }],
                    }],
                    mcs: vec![McSpec {
                        name: "0.20".into(),
                        events_enabled: true,
                    }],
                    connections: vec![
                        ConnectionSpec { active: true },
                        ConnectionSpec { active: false },
                    ],
                },
                DomainSpec {
                    name: "spare".into(),
                    entities: Vec::new(),
                    mcs: Vec::new(),
                    connections: Vec::new(),
                },
            ],
        }
    }

    #[tokio::test]
    async fn tree_layout() {
        let tree = build(Arc::new(fixture()), Handle::current(), Duration::ZERO).unwrap();
        let tops: Vec<_> = tree
            .roots()
            .iter()
            .map(|id| tree.get(*id).unwrap().name().to_string())
            .collect();
        assert_eq!(tops, ["domain", "entity", "sensor", "control", "mc", "con", "general"]);
        assert!(tree.find(&["domain", "refresh"]).is_some());
        assert!(tree.find(&["con", "active"]).is_some());
    }
}

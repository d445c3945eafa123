/*!
Nested object walkers.

Each `for_each_*` visits every object of one kind that passes the address
filter, depth first:

  Domain
    Entity
      Sensor | Control
    MC
    Connection

Every level is the same step (`walk_level`): enumerate children, name each
one, skip it unless the filter matches, emit `(Label, name)`, open a scope,
visit, close the scope. Deeper kinds are built by handing the shallower
walker a visit that runs the next level.

Once the line has an error, walkers stop emitting and visiting. The provider's
enumeration still runs to its end; the remaining items are simply ignored.

Filters taken from the address:

  kind        domain   class    obj
  domain      name     -        -
  entity      domain   entity   -
  sensor      domain   entity   sensor
  control     domain   entity   control
  mc          domain   mc       -
  connection  domain   -        number

A `-` field must be absent; a present one is an `Invalid <kind>` error.
*/

use crate::context::CmdInfo;
use crate::error::{LangError, Result};
use crate::iter::inventory::{Inventory, bounded_name};
use crate::objstr::ObjAddr;

/* ---- Generic level step ---- */

fn walk_level<T>(
    info: &CmdInfo,
    label: &str,
    filter: Option<&str>,
    enumerate: impl FnOnce(&mut dyn FnMut(&T)),
    name_of: impl Fn(&T) -> String,
    visit: &mut dyn FnMut(&T),
) {
    enumerate(&mut |item: &T| {
        if info.has_error() {
            return;
        }
        let name = bounded_name(name_of(item));
        if filter.is_some_and(|f| f != name) {
            return;
        }
        tracing::trace!(label, name = %name, "visit");
        info.out_str(label, &name);
        if info.has_error() {
            return;
        }
        info.down();
        visit(item);
        info.up();
    });
}

/* ---- Kinds ---- */

pub fn for_each_domain<I: Inventory>(
    info: &CmdInfo,
    inv: &I,
    addr: &ObjAddr<'_>,
    visit: &mut dyn FnMut(&I::Domain),
) -> Result<()> {
    if addr.class.is_some() || addr.obj.is_some() {
        return Err(LangError::invalid("domain"));
    }
    walk_level(
        info,
        "Domain",
        addr.domain,
        |f| inv.iterate_domains(f),
        |d| inv.domain_name(d),
        visit,
    );
    Ok(())
}

pub fn for_each_entity<I: Inventory>(
    info: &CmdInfo,
    inv: &I,
    addr: &ObjAddr<'_>,
    visit: &mut dyn FnMut(&I::Entity),
) -> Result<()> {
    if addr.obj.is_some() {
        return Err(LangError::invalid("entity"));
    }
    for_each_domain(info, inv, &ObjAddr::domain_only(addr.domain), &mut |domain| {
        walk_level(
            info,
            "Entity",
            addr.class,
            |f| inv.iterate_entities(domain, f),
            |e| inv.entity_name(e),
            &mut *visit,
        );
    })
}

pub fn for_each_sensor<I: Inventory>(
    info: &CmdInfo,
    inv: &I,
    addr: &ObjAddr<'_>,
    visit: &mut dyn FnMut(&I::Sensor),
) -> Result<()> {
    let entities = ObjAddr {
        obj: None,
        ..*addr
    };
    for_each_entity(info, inv, &entities, &mut |entity| {
        walk_level(
            info,
            "Sensor",
            addr.obj,
            |f| inv.iterate_sensors(entity, f),
            |s| inv.sensor_name(s),
            &mut *visit,
        );
    })
}

pub fn for_each_control<I: Inventory>(
    info: &CmdInfo,
    inv: &I,
    addr: &ObjAddr<'_>,
    visit: &mut dyn FnMut(&I::Control),
) -> Result<()> {
    let entities = ObjAddr {
        obj: None,
        ..*addr
    };
    for_each_entity(info, inv, &entities, &mut |entity| {
        walk_level(
            info,
            "Control",
            addr.obj,
            |f| inv.iterate_controls(entity, f),
            |c| inv.control_name(c),
            &mut *visit,
        );
    })
}

pub fn for_each_mc<I: Inventory>(
    info: &CmdInfo,
    inv: &I,
    addr: &ObjAddr<'_>,
    visit: &mut dyn FnMut(&I::Mc),
) -> Result<()> {
    if addr.obj.is_some() {
        return Err(LangError::invalid("MC"));
    }
    for_each_domain(info, inv, &ObjAddr::domain_only(addr.domain), &mut |domain| {
        walk_level(
            info,
            "MC",
            addr.class,
            |f| inv.iterate_mcs(domain, f),
            |m| inv.mc_name(m),
            &mut *visit,
        );
    })
}

/// Visit connections; `visit` gets the owning domain and the connection number.
pub fn for_each_connection<I: Inventory>(
    info: &CmdInfo,
    inv: &I,
    addr: &ObjAddr<'_>,
    visit: &mut dyn FnMut(&I::Domain, u32),
) -> Result<()> {
    if addr.class.is_some() {
        return Err(LangError::invalid("connection"));
    }
    let wanted = addr.obj.map(parse_conn_number).transpose()?;
    let filter = wanted.map(|n| n.to_string());

    for_each_domain(info, inv, &ObjAddr::domain_only(addr.domain), &mut |domain| {
        walk_level(
            info,
            "Connection",
            filter.as_deref(),
            |f| inv.iterate_connections(domain, &mut |conn| f(&conn)),
            |conn: &u32| conn.to_string(),
            &mut |conn: &u32| visit(domain, *conn),
        );
    })
}

/// Connection number: decimal, `0x` hex, or leading-`0` octal. Must start
/// with a digit and be consumed entirely; no sign may follow the prefix.
pub fn parse_conn_number(s: &str) -> Result<u32> {
    if !s.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(LangError::InvalidConnectionNumber);
    }
    let (digits, radix) = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        (hex, 16)
    } else if s.len() > 1 && s.starts_with('0') {
        (&s[1..], 8)
    } else {
        (s, 10)
    };
    // from_str_radix takes a leading sign; strtoul does not after the prefix.
    if digits.starts_with(['+', '-']) {
        return Err(LangError::InvalidConnectionNumber);
    }
    let parsed = u32::from_str_radix(digits, radix);
    parsed.map_err(|_| LangError::InvalidConnectionNumber)
}

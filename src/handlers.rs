/*!
Address-driven command handlers.

Most object commands look the same: take one optional address argument,
walk the matching objects, and run a per-object callback on each. This
module supplies that leaf handler once per object kind, plus a
`register_*_cmd` helper that installs it in a tree.

The registered node's handler data is an [`AddressCommand`]: the inventory to
walk and the per-object callback. The generic handler pulls it back out of
`CmdInfo::handler_data`, so one handler body serves every command of a kind.

Argument handling:
  - no argument left  -> every object of the kind
  - one argument      -> consumed and parsed as an address; a parse failure
                         is `Invalid <kind>`
*/

use std::any::Any;
use std::sync::Arc;

use crate::context::CmdInfo;
use crate::error::{LangError, Result};
use crate::iter::{Inventory, walk};
use crate::objstr::{self, ObjAddr};
use crate::registry::{CommandTree, Handler, HandlerData, NodeId};

/// Per-object callback of an address command.
pub type Visit<T> = dyn Fn(&CmdInfo, &T) + Send + Sync;

/// Per-connection callback: owning domain and connection number.
pub type ConnectionVisit<D> = dyn Fn(&CmdInfo, &D, u32) + Send + Sync;

/// Handler data stored on an address command node.
pub struct AddressCommand<I, V: ?Sized> {
    pub inventory: Arc<I>,
    pub visit: Arc<V>,
}

/// Consume the next argument as an address. No argument means "everything".
pub fn next_address<'a>(info: &'a CmdInfo, kind: &'static str) -> Result<ObjAddr<'a>> {
    match info.next_arg() {
        None => Ok(ObjAddr::ANY),
        Some(arg) => objstr::parse(arg).map_err(|_| LangError::invalid(kind)),
    }
}

fn run_address<C: Any>(
    info: &CmdInfo,
    kind: &'static str,
    walk: impl FnOnce(&C, &ObjAddr<'_>) -> Result<()>,
) {
    let Some(cmd) = info.handler_data::<C>() else {
        info.fail(LangError::MissingHandlerData);
        return;
    };
    let result = next_address(info, kind).and_then(|addr| {
        tracing::trace!(command = %info.command(), address = %addr, all = addr.is_any(), "walk");
        walk(cmd, &addr)
    });
    if let Err(e) = result {
        tracing::debug!(command = %info.command(), error = %e, "address command failed");
        info.fail(e);
    }
}

fn register_with<C: Any + Send + Sync>(
    tree: &mut CommandTree,
    parent: Option<NodeId>,
    name: &str,
    help: &str,
    handler: fn(&CmdInfo),
    data: C,
) -> Result<NodeId> {
    let handler: Handler = Arc::new(handler);
    let data: HandlerData = Arc::new(data);
    tree.register(parent, name, Some(help), Some(handler), Some(data))
}

macro_rules! address_command {
    ($(#[$doc:meta])* $handler:ident, $register:ident, $kind:literal, $item:ident, $walk:path) => {
        $(#[$doc])*
        pub fn $handler<I: Inventory>(info: &CmdInfo) {
            run_address::<AddressCommand<I, Visit<I::$item>>>(info, $kind, |cmd, addr| {
                $walk(info, &*cmd.inventory, addr, &mut |obj| (cmd.visit)(info, obj))
            });
        }

        #[doc = concat!("Register a leaf that runs `visit` on every ", $kind, " matching its address argument.")]
        pub fn $register<I, F>(
            tree: &mut CommandTree,
            parent: Option<NodeId>,
            name: &str,
            help: &str,
            inventory: Arc<I>,
            visit: F,
        ) -> Result<NodeId>
        where
            I: Inventory,
            F: Fn(&CmdInfo, &I::$item) + Send + Sync + 'static,
        {
            let data = AddressCommand::<I, Visit<I::$item>> {
                inventory,
                visit: Arc::new(visit),
            };
            register_with(tree, parent, name, help, $handler::<I>, data)
        }
    };
}

address_command!(
    /// Leaf handler for `<cmd> [domain]`.
    domain_handler, register_domain_cmd, "domain", Domain, walk::for_each_domain
);
address_command!(
    /// Leaf handler for `<cmd> [domain(entity)]`.
    entity_handler, register_entity_cmd, "entity", Entity, walk::for_each_entity
);
address_command!(
    /// Leaf handler for `<cmd> [domain(entity).sensor]`.
    sensor_handler, register_sensor_cmd, "sensor", Sensor, walk::for_each_sensor
);
address_command!(
    /// Leaf handler for `<cmd> [domain(entity).control]`.
    control_handler, register_control_cmd, "control", Control, walk::for_each_control
);
address_command!(
    /// Leaf handler for `<cmd> [domain(mc)]`.
    mc_handler, register_mc_cmd, "MC", Mc, walk::for_each_mc
);

/// Leaf handler for `<cmd> [domain.number]`.
pub fn connection_handler<I: Inventory>(info: &CmdInfo) {
    run_address::<AddressCommand<I, ConnectionVisit<I::Domain>>>(
        info,
        "connection",
        |cmd, addr| {
            walk::for_each_connection(info, &*cmd.inventory, addr, &mut |domain, conn| {
                (cmd.visit)(info, domain, conn)
            })
        },
    );
}

/// Register a leaf that runs `visit` on every connection matching its address argument.
pub fn register_connection_cmd<I, F>(
    tree: &mut CommandTree,
    parent: Option<NodeId>,
    name: &str,
    help: &str,
    inventory: Arc<I>,
    visit: F,
) -> Result<NodeId>
where
    I: Inventory,
    F: Fn(&CmdInfo, &I::Domain, u32) + Send + Sync + 'static,
{
    let data = AddressCommand::<I, ConnectionVisit<I::Domain>> {
        inventory,
        visit: Arc::new(visit),
    };
    register_with(tree, parent, name, help, connection_handler::<I>, data)
}

//! Mapping purchased products onto commands and servers.

use rcon_core::{CommandTemplate, Product, ServerTarget};
use tracing::{debug, warn};

use crate::store::ServerRegistry;

/// Commands configured for a product, in template order.
///
/// Matches on `(type, id)` with the type compared case-insensitively. An
/// empty result means the product has no console commands.
pub fn resolve_commands(product: &Product, templates: &[CommandTemplate]) -> Vec<CommandTemplate> {
    templates
        .iter()
        .filter(|t| t.applies_to(product))
        .cloned()
        .collect()
}

/// Servers a product's commands should run on.
///
/// A product bound to a server (non-zero id) is re-fetched from the
/// registry, since the copy on the product may be stale. If that lookup
/// fails or finds nothing, or the product is unbound, every known server is
/// targeted.
pub async fn resolve_targets(
    product: &Product,
    registry: &dyn ServerRegistry,
    all_servers: &[ServerTarget],
) -> Vec<ServerTarget> {
    if let Some(bound) = product.bound_server.as_ref().filter(|s| s.id != 0) {
        match registry.get_server_by_id(bound.id).await {
            Ok(Some(server)) => {
                debug!("Product {} is bound to server {}", product.label(), server.name);
                return vec![server];
            }
            Ok(None) => {
                warn!(
                    "Assigned server {} for product {} no longer exists, falling back to all servers",
                    bound.id,
                    product.label()
                );
            }
            Err(e) => {
                warn!(
                    "Failed to load assigned server {} for product {}: {}",
                    bound.id,
                    product.label(),
                    e
                );
            }
        }
    }

    all_servers.to_vec()
}

//! Catalog and purchase types used across RCON delivery.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A console command configured for one purchasable product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandTemplate {
    /// Command text; may contain the `%player%` token.
    pub text: String,

    /// Product kind this command belongs to (e.g. "KEY", "RANK").
    pub product_type: String,

    /// Id of the product within its kind.
    pub product_id: i64,
}

impl CommandTemplate {
    /// Create a new command template.
    pub fn new(text: impl Into<String>, product_type: impl Into<String>, product_id: i64) -> Self {
        Self {
            text: text.into(),
            product_type: product_type.into(),
            product_id,
        }
    }

    /// Check whether this template belongs to the given product.
    /// The type tag is compared case-insensitively.
    pub fn applies_to(&self, product: &Product) -> bool {
        self.product_id == product.id && self.product_type.eq_ignore_ascii_case(&product.product_type)
    }
}

/// RCON endpoint of one game server.
///
/// Every field defaults when deserializing, so a binding may carry only an
/// `id`; missing connection details make the target unusable.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerTarget {
    /// Registry id (0 means "not persisted").
    #[serde(default)]
    pub id: i64,

    /// Display name used in logs and debug traces.
    #[serde(default)]
    pub name: String,

    /// Hostname or IP literal.
    #[serde(default)]
    pub host: String,

    /// RCON port.
    #[serde(default)]
    pub port: u16,

    /// RCON password.
    #[serde(default)]
    pub password: String,
}

impl ServerTarget {
    /// Create a new server target.
    pub fn new(
        name: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        password: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            name: name.into(),
            host: host.into(),
            port,
            password: password.into(),
        }
    }

    /// Set the registry id.
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = id;
        self
    }

    /// A target is usable only when host, port and password are all set.
    pub fn is_usable(&self) -> bool {
        self.unusable_reason().is_none()
    }

    /// Describe what is missing from an incomplete configuration.
    pub fn unusable_reason(&self) -> Option<&'static str> {
        if self.host.trim().is_empty() {
            Some("missing host")
        } else if self.port == 0 {
            Some("missing port")
        } else if self.password.trim().is_empty() {
            Some("missing password")
        } else {
            None
        }
    }

    /// `host:port` form for logs.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Copy of this target with the password blanked out.
    pub fn redacted(&self) -> Self {
        Self {
            password: if self.password.is_empty() {
                String::new()
            } else {
                "********".to_string()
            },
            ..self.clone()
        }
    }
}

impl fmt::Debug for ServerTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerTarget")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A purchasable product as seen by the delivery engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Product kind (e.g. "KEY").
    #[serde(rename = "type")]
    pub product_type: String,

    /// Id within the kind.
    pub id: i64,

    /// Display name.
    #[serde(default)]
    pub name: String,

    /// Server this product is scoped to. `None` means every server.
    #[serde(default)]
    pub bound_server: Option<ServerTarget>,
}

impl Product {
    /// Create a new unbound product.
    pub fn new(product_type: impl Into<String>, id: i64) -> Self {
        Self {
            product_type: product_type.into(),
            id,
            name: String::new(),
            bound_server: None,
        }
    }

    /// Set the display name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Scope the product to a single server.
    pub fn bound_to(mut self, server: ServerTarget) -> Self {
        self.bound_server = Some(server);
        self
    }

    /// Copy of this product with the bound server's password blanked out.
    pub fn redacted(&self) -> Self {
        Self {
            bound_server: self.bound_server.as_ref().map(ServerTarget::redacted),
            ..self.clone()
        }
    }

    /// Label used in logs.
    pub fn label(&self) -> String {
        if self.name.is_empty() {
            format!("{}/{}", self.product_type, self.id)
        } else {
            format!("{} ({}/{})", self.name, self.product_type, self.id)
        }
    }
}

/// One purchased product and how many times it was bought.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseLine {
    pub product: Product,

    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

fn default_quantity() -> i64 {
    1
}

impl PurchaseLine {
    /// Create a new purchase line.
    pub fn new(product: Product, quantity: i64) -> Self {
        Self { product, quantity }
    }

    /// Copy of this line safe to store or echo back.
    pub fn redacted(&self) -> Self {
        Self {
            product: self.product.redacted(),
            quantity: self.quantity,
        }
    }

    /// Quantity clamped to at least one: a purchased product always runs.
    pub fn normalized_quantity(&self) -> u32 {
        self.quantity.clamp(1, u32::MAX as i64) as u32
    }
}

//! Read-only catalog view.

use axum::{extract::State, Json};
use rcon_catalog::{CommandStore, ServerRegistry};
use rcon_core::{CommandTemplate, ServerTarget};

use crate::api::ApiError;
use crate::state::AppState;

/// List configured servers with passwords redacted.
pub async fn list_servers(State(state): State<AppState>) -> Result<Json<Vec<ServerTarget>>, ApiError> {
    let servers = state.catalog.list_all_servers().await?;
    Ok(Json(servers.iter().map(ServerTarget::redacted).collect()))
}

/// List configured command templates.
pub async fn list_commands(State(state): State<AppState>) -> Result<Json<Vec<CommandTemplate>>, ApiError> {
    Ok(Json(state.catalog.list_all_command_templates().await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::server_for;
    use rcon_catalog::InMemoryCatalog;

    #[tokio::test]
    async fn test_servers_are_redacted() {
        let catalog = InMemoryCatalog::new();
        catalog
            .upsert_server(ServerTarget::new("survival", "mc.local", 25575, "hunter2"))
            .await;
        catalog
            .add_command(CommandTemplate::new("give %player% diamond 1", "KEY", 1))
            .await;
        let (server, _) = server_for(catalog);

        let response = server.get("/api/v1/servers").await;
        response.assert_status_ok();
        let servers: Vec<ServerTarget> = response.json();
        assert_eq!(servers.len(), 1);
        assert_eq!(servers[0].password, "********");
        assert!(!response.text().contains("hunter2"));

        let commands: Vec<CommandTemplate> = server.get("/api/v1/commands").await.json();
        assert_eq!(commands[0].product_type, "KEY");
    }
}

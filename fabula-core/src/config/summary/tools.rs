//! Tool registry config block for run config summary.
//!
//! Implements [`ConfigSection`](super::ConfigSection).

use super::ConfigSection;

/// Tool registry summary: how many MCP-backed tools are registered for a tenant
/// and whether any plugins are disabled.
pub struct ToolConfigSummary {
    pub registered_tools: usize,
    pub disabled_plugins: usize,
}

impl ConfigSection for ToolConfigSummary {
    fn section_name(&self) -> &str {
        "Tools"
    }

    fn entries(&self) -> Vec<(&'static str, String)> {
        vec![
            ("registered_tools", self.registered_tools.to_string()),
            ("disabled_plugins", self.disabled_plugins.to_string()),
        ]
    }
}

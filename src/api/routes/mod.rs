//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`tasks`]: Task creation, status, download links and deletion
//! - [`system`]: Welcome, health, events, OpenAPI

use crate::types::{GenerationOptions, TaskKind};
use serde::{Deserialize, Serialize};

mod system;
mod tasks;

// Re-export all handlers so `routes::function_name` continues to work
pub use system::*;
pub use tasks::*;

// ============================================================================
// Query/Request Types (shared across handlers)
// ============================================================================

/// Generation options accepted as query parameters on the creation endpoints
///
/// Absent fields take the defaults of the task kind.
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GenerationQuery {
    /// Remote model (default: `meshy-4` single-image, `meshy-5` multi-image)
    pub ai_model: Option<String>,
    /// Mesh topology, `triangle` or `quad` (default: `triangle`)
    pub topology: Option<String>,
    /// Target polygon count (default: 30000)
    pub target_polycount: Option<u32>,
    /// Whether to texture the model (default: true)
    pub should_texture: Option<bool>,
    /// Generate PBR maps, single-image only (default: false)
    pub enable_pbr: Option<bool>,
    /// Texture guidance prompt
    pub texture_prompt: Option<String>,
}

impl GenerationQuery {
    /// Merge the query into the defaults for `kind`
    pub fn into_options(self, kind: TaskKind) -> GenerationOptions {
        let mut options = GenerationOptions::for_kind(kind);
        if let Some(ai_model) = self.ai_model.filter(|m| !m.trim().is_empty()) {
            options.ai_model = ai_model;
        }
        if let Some(topology) = self.topology.filter(|t| !t.trim().is_empty()) {
            options.topology = topology;
        }
        if let Some(target_polycount) = self.target_polycount {
            options.target_polycount = target_polycount;
        }
        if let Some(should_texture) = self.should_texture {
            options.should_texture = should_texture;
        }
        if let Some(enable_pbr) = self.enable_pbr {
            options.enable_pbr = enable_pbr;
        }
        options.texture_prompt = self.texture_prompt;
        options
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_query_keeps_kind_defaults() {
        let single = GenerationQuery::default().into_options(TaskKind::SingleImage);
        assert_eq!(single, GenerationOptions::for_kind(TaskKind::SingleImage));

        let multi = GenerationQuery::default().into_options(TaskKind::MultiImage);
        assert_eq!(multi.ai_model, "meshy-5");
    }

    #[test]
    fn query_overrides_defaults() {
        let query = GenerationQuery {
            topology: Some("quad".into()),
            target_polycount: Some(5000),
            should_texture: Some(false),
            texture_prompt: Some("matte clay".into()),
            ..Default::default()
        };
        let options = query.into_options(TaskKind::SingleImage);
        assert_eq!(options.ai_model, "meshy-4");
        assert_eq!(options.topology, "quad");
        assert_eq!(options.target_polycount, 5000);
        assert!(!options.should_texture);
        assert_eq!(options.texture_prompt.as_deref(), Some("matte clay"));
    }
}

//! Route templates and per-run URLs
//!
//! All three endpoints and the URLs handed to clients derive from one base
//! path, so they are computed in a single place.

/// Route parameter holding the run identifier
pub const RUN_ID_PARAM: &str = "runId";

/// Route parameter holding the asset name
pub const ASSET_NAME_PARAM: &str = "assetName";

/// Derives routes and URLs from a base path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathProvider {
    /// Normalised base path without trailing slash, empty for the root
    base_path: String,

    /// Optional absolute origin such as `http://localhost:3001`
    base_url: Option<String>,
}

impl PathProvider {
    /// Create a provider for the given base path.
    ///
    /// A leading `/` is added and trailing slashes are removed, so `flow/`
    /// and `/flow` are equivalent. `/` mounts the routes at the root.
    pub fn new(base_path: impl AsRef<str>) -> Self {
        let trimmed = base_path.as_ref().trim().trim_matches('/');
        let base_path = if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{}", trimmed)
        };

        Self {
            base_path,
            base_url: None,
        }
    }

    /// Make generated URLs absolute by prefixing them with `base_url`
    pub fn with_base_url(mut self, base_url: impl AsRef<str>) -> Self {
        let base_url = base_url.as_ref().trim().trim_end_matches('/');
        self.base_url = if base_url.is_empty() {
            None
        } else {
            Some(base_url.to_string())
        };
        self
    }

    /// Absolute origin, if configured
    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    /// Route that accepts flow submissions
    pub fn submit_path(&self) -> &str {
        if self.base_path.is_empty() {
            "/"
        } else {
            &self.base_path
        }
    }

    /// Route template for the run status endpoint
    pub fn run_path_template(&self) -> String {
        format!("{}/:{}", self.base_path, RUN_ID_PARAM)
    }

    /// Route template for the event stream endpoint
    pub fn events_path_template(&self) -> String {
        format!("{}/:{}/events", self.base_path, RUN_ID_PARAM)
    }

    /// Route template for the asset endpoint
    pub fn asset_path_template(&self) -> String {
        format!(
            "{}/:{}/assets/:{}",
            self.base_path, RUN_ID_PARAM, ASSET_NAME_PARAM
        )
    }

    /// Event stream path of a run
    pub fn events_path(&self, run_id: &str) -> String {
        format!("{}/{}/events", self.base_path, run_id)
    }

    /// Path of a named asset of a run
    pub fn asset_path(&self, run_id: &str, asset_name: &str) -> String {
        format!("{}/{}/assets/{}", self.base_path, run_id, asset_name)
    }

    /// Event stream URL, absolute when a base URL is configured
    pub fn events_url(&self, run_id: &str) -> String {
        self.absolute(self.events_path(run_id))
    }

    /// Asset URL, absolute when a base URL is configured
    pub fn asset_url(&self, run_id: &str, asset_name: &str) -> String {
        self.absolute(self.asset_path(run_id, asset_name))
    }

    fn absolute(&self, path: String) -> String {
        match &self.base_url {
            Some(base_url) => format!("{}{}", base_url, path),
            None => path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_and_concrete_paths() {
        let paths = PathProvider::new("/generate-story");

        assert_eq!(paths.submit_path(), "/generate-story");
        assert_eq!(paths.run_path_template(), "/generate-story/:runId");
        assert_eq!(paths.events_path_template(), "/generate-story/:runId/events");
        assert_eq!(
            paths.asset_path_template(),
            "/generate-story/:runId/assets/:assetName"
        );
        assert_eq!(paths.events_path("abc"), "/generate-story/abc/events");
        assert_eq!(
            paths.asset_path("abc", "cover"),
            "/generate-story/abc/assets/cover"
        );
        assert_eq!(paths.events_url("abc"), "/generate-story/abc/events");
    }

    #[test]
    fn test_base_path_is_normalised() {
        assert_eq!(PathProvider::new("flow/"), PathProvider::new("/flow"));

        let root = PathProvider::new("/");
        assert_eq!(root.submit_path(), "/");
        assert_eq!(root.events_path_template(), "/:runId/events");
        assert_eq!(root.events_path("r1"), "/r1/events");
    }

    #[test]
    fn test_urls_use_base_url() {
        let paths = PathProvider::new("/flow").with_base_url("http://localhost:3001/");

        assert_eq!(paths.base_url(), Some("http://localhost:3001"));
        assert_eq!(
            paths.events_url("r1"),
            "http://localhost:3001/flow/r1/events"
        );
        assert_eq!(
            paths.asset_url("r1", "report"),
            "http://localhost:3001/flow/r1/assets/report"
        );
        // Paths stay relative
        assert_eq!(paths.events_path("r1"), "/flow/r1/events");
    }
}

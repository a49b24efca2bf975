use serde::Serialize;

use crate::domain::books::CURRENT_SCHEMA_VERSION;

fn embedded(value: Option<&'static str>) -> &'static str {
    value.filter(|v| !v.is_empty()).unwrap_or("unknown")
}

/// What this engine was built from and which books file layout it writes.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct BuildMetadata {
    pub version: &'static str,
    pub schema_version: u8,
    pub git_hash: &'static str,
    pub git_status: &'static str,
    pub built_at: &'static str,
    pub target: &'static str,
    pub profile: &'static str,
    pub rustc: &'static str,
}

impl BuildMetadata {
    pub fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            schema_version: CURRENT_SCHEMA_VERSION,
            git_hash: embedded(option_env!("BOOKS_CORE_BUILD_HASH")),
            git_status: embedded(option_env!("BOOKS_CORE_BUILD_STATUS")),
            built_at: embedded(option_env!("BOOKS_CORE_BUILD_TIMESTAMP")),
            target: embedded(option_env!("BOOKS_CORE_BUILD_TARGET")),
            profile: embedded(option_env!("BOOKS_CORE_BUILD_PROFILE")),
            rustc: embedded(option_env!("BOOKS_CORE_BUILD_RUSTC")),
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.git_status == "dirty"
    }

    /// One-line summary for the startup log.
    pub fn label(&self) -> String {
        let dirty = if self.is_dirty() { "+dirty" } else { "" };
        format!(
            "books_core {} ({}{dirty}, schema v{}, {})",
            self.version, self.git_hash, self.schema_version, self.profile
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_names_version_and_schema() {
        let build = BuildMetadata::current();
        let label = build.label();
        assert!(label.contains(env!("CARGO_PKG_VERSION")));
        assert!(label.contains(&format!("schema v{CURRENT_SCHEMA_VERSION}")));
    }

    #[test]
    fn metadata_serializes_for_the_host() {
        let json = serde_json::to_value(BuildMetadata::current()).expect("serialize");
        assert_eq!(json["schema_version"], CURRENT_SCHEMA_VERSION);
        assert!(json["git_hash"].is_string());
    }
}

use quick_xml::de::from_str;
use serde::Deserialize;

use crate::core::error::LauncherResult;

/// `maven-metadata.xml` of one artifact: only the version listing matters.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MavenMetadata {
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub artifact_id: Option<String>,
    #[serde(default)]
    pub versioning: Option<Versioning>,
}

#[derive(Debug, Deserialize, Default)]
pub struct Versioning {
    #[serde(default)]
    pub latest: Option<String>,
    #[serde(default)]
    pub release: Option<String>,
    #[serde(default)]
    pub versions: Option<VersionList>,
}

#[derive(Debug, Deserialize, Default)]
pub struct VersionList {
    #[serde(default, rename = "version")]
    pub items: Vec<String>,
}

impl MavenMetadata {
    pub fn parse(xml: &str) -> LauncherResult<Self> {
        Ok(from_str(xml)?)
    }

    /// Versions as listed, which Maven orders oldest first.
    pub fn versions(&self) -> &[String] {
        self.versioning
            .as_ref()
            .and_then(|v| v.versions.as_ref())
            .map(|v| v.items.as_slice())
            .unwrap_or(&[])
    }

    pub fn metadata_url(repo_base: &str, group_id: &str, artifact_id: &str) -> String {
        format!(
            "{}/{}/{}/maven-metadata.xml",
            repo_base.trim_end_matches('/'),
            group_id.replace('.', "/"),
            artifact_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_version_listing() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<metadata>
  <groupId>net.minecraftforge</groupId>
  <artifactId>forge</artifactId>
  <versioning>
    <latest>1.20.1-47.2.20</latest>
    <release>1.20.1-47.2.20</release>
    <versions>
      <version>1.12.2-14.23.5.2859</version>
      <version>1.12.2-14.23.5.2864</version>
      <version>1.20.1-47.2.20</version>
    </versions>
    <lastUpdated>20240101000000</lastUpdated>
  </versioning>
</metadata>"#;
        let meta = MavenMetadata::parse(xml).unwrap();
        assert_eq!(meta.artifact_id.as_deref(), Some("forge"));
        assert_eq!(meta.versions().len(), 3);
        assert_eq!(meta.versions()[1], "1.12.2-14.23.5.2864");
    }

    #[test]
    fn empty_metadata_has_no_versions() {
        let meta = MavenMetadata::parse("<metadata></metadata>").unwrap();
        assert!(meta.versions().is_empty());
    }

    #[test]
    fn metadata_url_layout() {
        assert_eq!(
            MavenMetadata::metadata_url("https://maven.neoforged.net/releases/", "net.neoforged", "neoforge"),
            "https://maven.neoforged.net/releases/net/neoforged/neoforge/maven-metadata.xml"
        );
    }
}

//! Base-color image sources.
//!
//! An [`ImageSource`] turns a tile address into the URL (or resource key) of
//! the tile's texture. The globe never fetches through it directly: the URL is
//! handed to a [`TextureLoader`](crate::texture::TextureLoader).

use crate::provider::ProviderError;
use crate::tile::TileAddress;

/// Base URL for ArcGIS World Imagery tiles.
pub const ARCGIS_WORLD_IMAGERY_URL: &str =
    "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}";

/// Resolves texture URLs for tiles.
pub trait ImageSource: Send + Sync {
    /// URL of the base-color texture for `address`.
    fn image_url(&self, address: TileAddress) -> String;

    /// Short name used in logs.
    fn name(&self) -> &str;
}

/// Image source for standard XYZ tile services.
///
/// The template must contain `{z}`, `{y}` and `{x}` placeholders, which are
/// replaced by level, row and column.
#[derive(Debug, Clone)]
pub struct XyzImageSource {
    name: String,
    template: String,
}

impl XyzImageSource {
    /// Creates a source from a URL template.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::InvalidTemplate`] if a placeholder is missing.
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Result<Self, ProviderError> {
        let template = template.into();
        for placeholder in ["{z}", "{y}", "{x}"] {
            if !template.contains(placeholder) {
                return Err(ProviderError::InvalidTemplate(format!(
                    "{} is missing {}",
                    template, placeholder
                )));
            }
        }
        Ok(Self {
            name: name.into(),
            template,
        })
    }

    /// Esri's public World Imagery basemap.
    pub fn arcgis_world_imagery() -> Self {
        Self {
            name: "ArcGIS".to_string(),
            template: ARCGIS_WORLD_IMAGERY_URL.to_string(),
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }
}

impl ImageSource for XyzImageSource {
    fn image_url(&self, address: TileAddress) -> String {
        self.template
            .replace("{z}", &address.level().to_string())
            .replace("{y}", &address.row().to_string())
            .replace("{x}", &address.column().to_string())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arcgis_url_pattern() {
        let source = XyzImageSource::arcgis_world_imagery();
        let url = source.image_url(TileAddress::new(15, 12754, 5279).unwrap());
        assert_eq!(
            url,
            "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/15/12754/5279"
        );
        assert_eq!(source.name(), "ArcGIS");
    }

    #[test]
    fn test_custom_template() {
        let source = XyzImageSource::new("local", "file:///tiles/{z}-{x}-{y}.png").unwrap();
        let url = source.image_url(TileAddress::new(2, 1, 3).unwrap());
        assert_eq!(url, "file:///tiles/2-3-1.png");
    }

    #[test]
    fn test_template_requires_placeholders() {
        let err = XyzImageSource::new("bad", "https://example.com/{z}/{x}").unwrap_err();
        assert!(matches!(err, ProviderError::InvalidTemplate(_)));
    }
}

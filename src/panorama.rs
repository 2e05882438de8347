//! Photo markers and the 360° panorama dialog. The viewer itself is external;
//! this side only knows which scene to load and whether the dialog is open.

use crate::geo::LngLat;

#[derive(Clone, Debug, PartialEq)]
pub struct PhotoMarker {
    pub scene: String,
    pub position: LngLat,
}

/// Panorama scenes placed on the map
pub fn default_photo_markers() -> Vec<PhotoMarker> {
    [
        ("scene_207", (-72.21877924218475, -45.328054249773366)),
        ("scene_76", (-72.22715432323628, -45.33958015428611)),
    ]
    .into_iter()
    .map(|(scene, position)| PhotoMarker {
        scene: scene.to_string(),
        position,
    })
    .collect()
}

/// Viewer command that switches to `scene`
pub fn load_command(scene: &str) -> String {
    format!("loadscene({scene}, null, BLEND(1));")
}

#[derive(Debug)]
pub struct PanoramaDialog {
    tour_xml: String,
    scene: Option<String>,
}

impl PanoramaDialog {
    pub fn new(tour_xml: impl Into<String>) -> Self {
        Self {
            tour_xml: tour_xml.into(),
            scene: None,
        }
    }

    pub fn open(&mut self, scene: String) {
        tracing::info!(%scene, command = %load_command(&scene), "opening panorama");
        self.scene = Some(scene);
    }

    pub fn close(&mut self) {
        if let Some(scene) = self.scene.take() {
            tracing::debug!(%scene, "panorama closed");
        }
    }

    pub fn is_open(&self) -> bool {
        self.scene.is_some()
    }

    pub fn scene(&self) -> Option<&str> {
        self.scene.as_deref()
    }

    pub fn tour_xml(&self) -> &str {
        &self.tour_xml
    }

    /// Command for the viewer while open
    pub fn command(&self) -> Option<String> {
        self.scene.as_deref().map(load_command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_markers() {
        let markers = default_photo_markers();
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].scene, "scene_207");
        assert_eq!(markers[1].position, (-72.22715432323628, -45.33958015428611));
    }

    #[test]
    fn test_load_command() {
        assert_eq!(load_command("scene_76"), "loadscene(scene_76, null, BLEND(1));");
    }

    #[test]
    fn test_dialog_open_close() {
        let mut dialog = PanoramaDialog::new("/krpano/tour.xml");
        assert!(!dialog.is_open());
        assert!(dialog.command().is_none());

        dialog.open("scene_207".into());
        assert_eq!(dialog.scene(), Some("scene_207"));
        assert_eq!(dialog.command().as_deref(), Some("loadscene(scene_207, null, BLEND(1));"));

        dialog.close();
        assert!(!dialog.is_open());
        dialog.close();
    }
}

//! Level groups and the containers markers are drawn into

use crate::capability::{LayerKind, LayerMember, MapCanvas};
use crate::types::{LayerHandle, Level};

/// How markers of a level are held on the map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerContainer {
    /// Markers sit directly in the level's feature group
    Plain(LayerHandle),
    /// Markers sit in a cluster layer nested inside the level's feature group
    Clustered {
        group: LayerHandle,
        cluster: LayerHandle,
    },
}

impl MarkerContainer {
    /// Build the layers for a new level
    pub fn create(canvas: &dyn MapCanvas, level: Level, clustered: bool) -> Self {
        let group = canvas.create_layer(LayerKind::FeatureGroup, level);
        if clustered {
            let cluster = canvas.create_layer(LayerKind::Cluster, level);
            canvas.add_to_layer(group, LayerMember::Layer(cluster));
            MarkerContainer::Clustered { group, cluster }
        } else {
            MarkerContainer::Plain(group)
        }
    }

    /// Layer shown on the map / registered with the layer control
    pub fn group(&self) -> LayerHandle {
        match self {
            MarkerContainer::Plain(group) => *group,
            MarkerContainer::Clustered { group, .. } => *group,
        }
    }

    /// Layer that directly owns the markers
    pub fn marker_layer(&self) -> LayerHandle {
        match self {
            MarkerContainer::Plain(group) => *group,
            MarkerContainer::Clustered { cluster, .. } => *cluster,
        }
    }

    pub fn is_clustered(&self) -> bool {
        matches!(self, MarkerContainer::Clustered { .. })
    }
}

/// Partition of markers sharing one altitude
#[derive(Debug, Clone, PartialEq)]
pub struct LevelGroup {
    pub level: Level,
    pub container: MarkerContainer,
    pub(crate) shown: bool,
    pub(crate) in_control: bool,
}

impl LevelGroup {
    pub fn new(level: Level, container: MarkerContainer) -> Self {
        Self {
            level,
            container,
            shown: false,
            in_control: false,
        }
    }

    pub fn label(&self) -> String {
        self.level.to_string()
    }
}

//! Cluster endpoints

use crate::endpoints::EsCompatState;
use axum::extract::State;
use axum::Json;
use pgelastic::response::{ClusterHealth, CLUSTER_NAME};
use serde::{Deserialize, Serialize};

/// Root info response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EsRootInfo {
    pub name: String,
    pub cluster_name: String,
    pub cluster_uuid: String,
    pub version: EsVersion,
    pub tagline: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EsVersion {
    pub number: String,
    pub build_hash: String,
    pub build_snapshot: bool,
    pub lucene_version: String,
}

impl EsRootInfo {
    pub fn new(cluster_uuid: &str) -> Self {
        Self {
            name: "pgelastic".to_string(),
            cluster_name: CLUSTER_NAME.to_string(),
            cluster_uuid: cluster_uuid.to_string(),
            version: EsVersion {
                // Compatibility target: the last line with mapping types
                number: "5.6.0".to_string(),
                build_hash: env!("CARGO_PKG_VERSION").to_string(),
                build_snapshot: false,
                lucene_version: "6.6.1".to_string(),
            },
            tagline: "You Know, for Search".to_string(),
        }
    }
}

/// GET / - Root info
pub async fn root_handler(State(state): State<EsCompatState>) -> Json<EsRootInfo> {
    Json(EsRootInfo::new(&state.cluster_uuid))
}

/// GET /_cluster/health - Static single-node health
pub async fn cluster_health_handler() -> Json<ClusterHealth> {
    Json(ClusterHealth::default())
}

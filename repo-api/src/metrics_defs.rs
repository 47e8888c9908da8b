//! Metrics definitions for the repository API.

use shared::metrics_defs::{MetricDef, MetricType};

pub const REPO_UPDATE_DURATION: MetricDef = MetricDef {
    name: "repo_update.duration",
    metric_type: MetricType::Histogram,
    description: "Time to handle a repository update request in seconds. Tagged with outcome.",
};

pub const REPO_CREATED: MetricDef = MetricDef {
    name: "repo_update.created",
    metric_type: MetricType::Counter,
    description: "Number of repository configurations created",
};

pub const REPO_UPDATED: MetricDef = MetricDef {
    name: "repo_update.updated",
    metric_type: MetricType::Counter,
    description: "Number of existing repository configurations patched",
};

pub const REPO_UPDATE_REJECTED: MetricDef = MetricDef {
    name: "repo_update.rejected",
    metric_type: MetricType::Counter,
    description: "Number of update requests rejected as malformed or invalid",
};

pub const PERMISSIONS_LIST_DURATION: MetricDef = MetricDef {
    name: "permissions.list.duration",
    metric_type: MetricType::Histogram,
    description: "Time to list repository permissions in seconds",
};

pub const ALL_METRICS: &[MetricDef] = &[
    REPO_UPDATE_DURATION,
    REPO_CREATED,
    REPO_UPDATED,
    REPO_UPDATE_REJECTED,
    PERMISSIONS_LIST_DURATION,
];

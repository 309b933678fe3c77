/// Fixed names shared across the feed parser and the metric publisher

// Custom metric type every data point is written under
pub const WAIT_TIME_METRIC_TYPE: &str = "custom.googleapis.com/ma_rmv_wait_time";

// Public MassDOT branch wait-time feed
pub const WAIT_TIME_FEED_URL: &str = "http://www.massdot.state.ma.us/feeds/qmaticxml/qmaticXML.aspx";

pub const MONITORING_BASE_URL: &str = "https://monitoring.googleapis.com/v3";

// Monitored resource type the points are attached to
pub const GLOBAL_RESOURCE_TYPE: &str = "global";

// Metric label keys
pub const BRANCH_LABEL: &str = "branch";
pub const SERVICE_LABEL: &str = "service";

// Feed attribute names
pub const TOWN_ATTRIBUTE: &str = "town";
pub const LICENSING_SERVICE: &str = "licensing";
pub const REGISTRATION_SERVICE: &str = "registration";

// Feed tokens that stand for "no wait time available"
pub const ERROR_TOKEN: &str = "Error";
pub const CLOSED_TOKEN: &str = "Closed";

pub const DESCRIPTOR_DISPLAY_NAME: &str = "Massachusetts RMV Wait Time";
pub const DESCRIPTOR_DESCRIPTION: &str =
    "The amount of time to wait for a RMV service by service type and branch.";
pub const DESCRIPTOR_UNIT: &str = "min";

pub const DEFAULT_FEED_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_PROPAGATION_SECS: u64 = 5;

// Trailing window used by the verification query
pub const QUERY_WINDOW_SECS: i64 = 60 * 60;

// Branch/service read back after publishing unless disabled
pub const DEFAULT_VERIFY_BRANCH: &str = "Boston";
pub const DEFAULT_VERIFY_SERVICE: &str = REGISTRATION_SERVICE;

/// Resource name of the project, e.g. `projects/my-project`
pub fn project_name(project_id: &str) -> String {
    format!("projects/{}", project_id)
}

/// Resource name of the wait-time metric descriptor within a project
pub fn descriptor_name(project_id: &str) -> String {
    format!(
        "projects/{}/metricDescriptors/{}",
        project_id, WAIT_TIME_METRIC_TYPE
    )
}

/*!
This module contains the definitions of the metrics emitted by the monitor runtime
*/

// Counters, total monitor objects created during the lifetime of the process
pub(crate) static METRIC_TOTAL_HNL_MONITORS: &str = "hnl_monitors_total";
pub(crate) static METRIC_TOTAL_HNL_INSTANCES: &str = "hnl_instances_total";
pub(crate) static METRIC_TOTAL_ATOM_MONITORS: &str = "atom_monitors_total";

// Gauges, currently live instances
pub(crate) static METRIC_ACTIVE_HNL_INSTANCES: &str = "active_hnl_instances";

// Counters, definite verdicts reached
pub(crate) static METRIC_VERDICTS: &str = "verdicts_total";
pub(crate) static METRIC_VERDICT_LABEL: &str = "verdict";

//! Alarm provisioner — binds alarm definitions to a scaling group.
//!
//! Each definition's symbolic actions are resolved to scaling-policy ARNs
//! and the alarm is registered under `<scope>_<name>`, scoped to the
//! scaling group by a single `AutoScalingGroupName` dimension. Creation is
//! not transactional: the first failure stops the run and alarms already
//! created stay in place.

use std::sync::Arc;

use tracing::{debug, info, warn};

use drainwatch_core::{
    ActionResolutionTable, AlarmDefinition, AlarmSpec, Dimension, MetricBackend,
};

use crate::error::{AlarmError, AlarmResult};

/// Dimension binding an alarm to its scaling group.
pub const SCOPE_DIMENSION: &str = "AutoScalingGroupName";

/// Alarms registered by a successful [`AlarmProvisioner::provision_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisionSummary {
    pub created: Vec<String>,
}

pub struct AlarmProvisioner {
    backend: Arc<dyn MetricBackend>,
}

impl AlarmProvisioner {
    pub fn new(backend: Arc<dyn MetricBackend>) -> Self {
        Self { backend }
    }

    /// Register one alarm per definition, in order, for `scope_name`.
    ///
    /// Returns immediately with an empty summary when `definitions` is empty.
    pub async fn provision_all(
        &self,
        scope_name: &str,
        definitions: &[AlarmDefinition],
        actions: &ActionResolutionTable,
    ) -> AlarmResult<ProvisionSummary> {
        let mut summary = ProvisionSummary::default();
        if definitions.is_empty() {
            debug!(scope = %scope_name, "no alarms to provision");
            return Ok(summary);
        }

        for definition in definitions {
            let spec = build_alarm_spec(scope_name, definition, actions)?;

            if let Err(source) = self.backend.put_alarm(&spec).await {
                warn!(
                    alarm = %spec.alarm_name,
                    scope = %scope_name,
                    created = summary.created.len(),
                    error = %source,
                    "alarm creation failed, skipping remaining alarms"
                );
                return Err(AlarmError::Backend {
                    alarm: spec.alarm_name,
                    created: summary.created,
                    source,
                });
            }

            info!(alarm = %definition.name, scope = %scope_name, "new metric alarm created");
            summary.created.push(spec.alarm_name);
        }

        Ok(summary)
    }
}

/// Resolve `definition`'s actions and build the concrete request for `scope_name`.
///
/// Fails on the first action missing from `actions` rather than creating
/// an alarm with a blank target.
pub fn build_alarm_spec(
    scope_name: &str,
    definition: &AlarmDefinition,
    actions: &ActionResolutionTable,
) -> AlarmResult<AlarmSpec> {
    let action_arns = definition
        .actions
        .iter()
        .map(|action| {
            actions
                .get(action)
                .cloned()
                .ok_or_else(|| AlarmError::UnresolvedAction {
                    alarm: definition.name.clone(),
                    action: action.clone(),
                })
        })
        .collect::<AlarmResult<Vec<_>>>()?;

    Ok(AlarmSpec {
        alarm_name: alarm_name(scope_name, &definition.name),
        action_arns,
        metric_name: definition.metric.clone(),
        namespace: definition.namespace.clone(),
        statistic: definition.statistic,
        comparison_operator: definition.comparison_operator,
        threshold: definition.threshold,
        period_secs: definition.period.as_secs(),
        evaluation_periods: definition.evaluation_periods,
        dimension: Dimension::new(SCOPE_DIMENSION, scope_name),
    })
}

fn alarm_name(scope_name: &str, definition_name: &str) -> String {
    format!("{scope_name}_{definition_name}")
}

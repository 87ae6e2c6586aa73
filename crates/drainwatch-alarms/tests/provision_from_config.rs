//! Provision alarms straight from a `drainwatch.toml` alarm section.

use std::sync::{Arc, Once};

use drainwatch_alarms::{AlarmError, AlarmProvisioner};
use drainwatch_core::{ActionResolutionTable, ComparisonOperator, DrainwatchConfig, Statistic};
use drainwatch_metrics::InMemoryBackend;

static TRACING_INIT: Once = Once::new();

fn init_tracing() {
    TRACING_INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init()
            .ok();
    });
}

const CONFIG: &str = r#"
[[alarms]]
name = "requests-high"
metric = "RequestCountPerTarget"
namespace = "AWS/ApplicationELB"
statistic = "Sum"
comparison = "GreaterThanThreshold"
threshold = 1000.0
period = "1m"
evaluation_periods = 3
actions = ["scale_out"]

[[alarms]]
name = "cpu-low"
metric = "CPUUtilization"
namespace = "AWS/EC2"
statistic = "Average"
comparison = "LessThanOrEqualToThreshold"
threshold = 15.0
period = "10m"
evaluation_periods = 6
actions = ["scale_in"]
"#;

fn policy_arns() -> ActionResolutionTable {
    ActionResolutionTable::from([
        (
            "scale_out".to_string(),
            "arn:aws:autoscaling:us-east-1:111122223333:scalingPolicy:1:autoScalingGroupName/web-v7:policyName/scale_out".to_string(),
        ),
        (
            "scale_in".to_string(),
            "arn:aws:autoscaling:us-east-1:111122223333:scalingPolicy:2:autoScalingGroupName/web-v7:policyName/scale_in".to_string(),
        ),
    ])
}

#[tokio::test]
async fn config_alarms_are_created_for_group() {
    init_tracing();
    let definitions = CONFIG
        .parse::<DrainwatchConfig>()
        .unwrap()
        .alarm_definitions()
        .unwrap();
    let backend = Arc::new(InMemoryBackend::new());
    let provisioner = AlarmProvisioner::new(backend.clone());

    let summary = provisioner
        .provision_all("web-v7", &definitions, &policy_arns())
        .await
        .unwrap();
    assert_eq!(summary.created, vec!["web-v7_requests-high", "web-v7_cpu-low"]);

    let alarms = backend.alarms().await;
    assert_eq!(alarms[0].statistic, Statistic::Sum);
    assert_eq!(alarms[0].comparison_operator, ComparisonOperator::GreaterThanThreshold);
    assert_eq!(alarms[0].period_secs, 60);
    assert_eq!(alarms[1].period_secs, 600);
    assert_eq!(alarms[1].evaluation_periods, 6);
    assert!(alarms[1].action_arns[0].ends_with("policyName/scale_in"));
    assert!(alarms.iter().all(|a| a.dimension.value == "web-v7"));
}

#[tokio::test]
async fn missing_policy_is_reported() {
    init_tracing();
    let definitions = CONFIG
        .parse::<DrainwatchConfig>()
        .unwrap()
        .alarm_definitions()
        .unwrap();
    let backend = Arc::new(InMemoryBackend::new());
    let provisioner = AlarmProvisioner::new(backend.clone());

    let mut arns = policy_arns();
    arns.remove("scale_in");

    let err = provisioner
        .provision_all("web-v7", &definitions, &arns)
        .await
        .unwrap_err();

    assert!(matches!(err, AlarmError::UnresolvedAction { ref action, .. } if action == "scale_in"));
    assert_eq!(backend.alarms().await.len(), 1);
}

//! drainwatch-alarms — wires scaling policies to CloudWatch alarms.
//!
//! Given the alarm definitions of a deployment and the ARNs of the scaling
//! policies created for its autoscaling group, registers one metric alarm
//! per definition.
//!
//! # Provisioning
//!
//! ```text
//! for definition in definitions:
//!     arns  = [actions[name] for name in definition.actions]   // unknown → UnresolvedAction
//!     alarm = "<asg>_<definition.name>", dimension AutoScalingGroupName=<asg>
//!     backend.put_alarm(alarm)                                 // failure → stop, no rollback
//! ```

pub mod error;
pub mod provisioner;

pub use error::{AlarmError, AlarmResult};
pub use provisioner::{build_alarm_spec, AlarmProvisioner, ProvisionSummary, SCOPE_DIMENSION};

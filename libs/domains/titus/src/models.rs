use protos::titus::{self as pb, job_descriptor::JobSpec, job_status, task_status};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum::{Display, EnumString};

use crate::descriptor::LABEL_NAME;

/// Job kind
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum JobType {
    /// Long-running, scalable job
    #[default]
    Service,
    /// Run-to-completion job
    Batch,
}

/// Scheduler-reported job state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
pub enum JobState {
    #[default]
    Accepted,
    KillInitiated,
    Finished,
}

impl From<job_status::JobState> for JobState {
    fn from(state: job_status::JobState) -> Self {
        match state {
            job_status::JobState::Accepted => JobState::Accepted,
            job_status::JobState::KillInitiated => JobState::KillInitiated,
            job_status::JobState::Finished => JobState::Finished,
        }
    }
}

/// Scheduler-reported task state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
pub enum TaskState {
    #[default]
    Accepted,
    Launched,
    StartInitiated,
    Started,
    KillInitiated,
    Disconnected,
    Finished,
}

impl From<task_status::TaskState> for TaskState {
    fn from(state: task_status::TaskState) -> Self {
        match state {
            task_status::TaskState::Accepted => TaskState::Accepted,
            task_status::TaskState::Launched => TaskState::Launched,
            task_status::TaskState::StartInitiated => TaskState::StartInitiated,
            task_status::TaskState::Started => TaskState::Started,
            task_status::TaskState::KillInitiated => TaskState::KillInitiated,
            task_status::TaskState::Disconnected => TaskState::Disconnected,
            task_status::TaskState::Finished => TaskState::Finished,
        }
    }
}

/// Submission input, as produced by deployment pipelines (camelCase JSON).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobDescription {
    pub name: String,
    #[serde(rename = "type")]
    pub job_type: Option<JobType>,
    /// Image name
    pub application_name: String,
    /// Image tag, used when no digest is given
    pub version: Option<String>,
    pub digest: Option<String>,
    pub instances_desired: u32,
    pub instances_min: u32,
    pub instances_max: u32,
    pub cpu: f64,
    pub memory: u32,
    pub shared_memory: u32,
    pub disk: u32,
    pub gpu: u32,
    pub network_mbps: u32,
    pub retries: u32,
    pub runtime_limit_secs: u64,
    pub env: HashMap<String, String>,
    pub labels: HashMap<String, String>,
    pub container_attributes: HashMap<String, String>,
    /// Owning (Spinnaker) application
    pub app_name: String,
    pub job_group_stack: Option<String>,
    pub job_group_detail: Option<String>,
    pub job_group_sequence: Option<String>,
    pub user: Option<String>,
    pub soft_constraints: Vec<String>,
    pub hard_constraints: Vec<String>,
    pub security_groups: Vec<String>,
    pub iam_profile: Option<String>,
    pub capacity_group: Option<String>,
    pub in_service: Option<bool>,
    pub entry_point: Option<String>,
    pub cmd: Option<String>,
}

/// A job as reported by the scheduler
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub name: String,
    pub job_type: JobType,
    pub application: String,
    pub stack: Option<String>,
    pub detail: Option<String>,
    pub sequence: Option<String>,
    pub instances_desired: u32,
    pub instances_min: u32,
    pub instances_max: u32,
    /// Service jobs only; batch jobs are always `false`
    pub in_service: bool,
    pub state: JobState,
    pub labels: HashMap<String, String>,
    /// Opaque descriptor passed through from the scheduler
    #[serde(skip)]
    pub descriptor: pb::JobDescriptor,
}

impl From<pb::Job> for Job {
    fn from(job: pb::Job) -> Self {
        let descriptor = job.job_descriptor.unwrap_or_default();
        let group = descriptor.job_group_info.clone().unwrap_or_default();
        let stack = non_empty(group.stack);
        let detail = non_empty(group.detail);
        let sequence = non_empty(group.sequence);

        let (job_type, capacity, in_service) = match descriptor.job_spec {
            Some(JobSpec::Batch(batch)) => (
                JobType::Batch,
                pb::Capacity {
                    min: batch.size,
                    max: batch.size,
                    desired: batch.size,
                },
                false,
            ),
            Some(JobSpec::Service(service)) => (
                JobType::Service,
                service.capacity.unwrap_or_default(),
                service.enabled,
            ),
            None => (JobType::Service, pb::Capacity::default(), false),
        };

        let name = descriptor
            .attributes
            .get(LABEL_NAME)
            .cloned()
            .unwrap_or_else(|| {
                compose_name(
                    &descriptor.application_name,
                    stack.as_deref(),
                    detail.as_deref(),
                    sequence.as_deref(),
                )
            });

        Self {
            id: job.id,
            name,
            job_type,
            application: descriptor.application_name.clone(),
            stack,
            detail,
            sequence,
            instances_desired: capacity.desired,
            instances_min: capacity.min,
            instances_max: capacity.max,
            in_service,
            state: job.status.map(|s| s.state().into()).unwrap_or_default(),
            labels: descriptor.attributes.clone(),
            descriptor,
        }
    }
}

/// A task as reported by the scheduler
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub job_id: String,
    pub state: TaskState,
    pub reason_code: String,
    pub reason_message: String,
    pub context: HashMap<String, String>,
}

impl From<pb::Task> for Task {
    fn from(task: pb::Task) -> Self {
        let status = task.status.unwrap_or_default();
        Self {
            id: task.id,
            job_id: task.job_id,
            state: status.state().into(),
            reason_code: status.reason_code,
            reason_message: status.reason_message,
            context: task.task_context,
        }
    }
}

/// `app[-stack[-detail]][-sequence]`
pub fn compose_name(
    application: &str,
    stack: Option<&str>,
    detail: Option<&str>,
    sequence: Option<&str>,
) -> String {
    let mut name = application.to_string();
    if stack.is_some() || detail.is_some() {
        name.push('-');
        name.push_str(stack.unwrap_or_default());
    }
    if let Some(detail) = detail {
        name.push('-');
        name.push_str(detail);
    }
    if let Some(sequence) = sequence {
        name.push('-');
        name.push_str(sequence);
    }
    name
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

use protos::titus::{self as pb, job_descriptor::JobSpec, retry_policy};
use std::collections::HashMap;

use crate::models::{JobDescription, JobType};

/// Label carrying the job's display name
pub const LABEL_NAME: &str = "name";
/// Label marking jobs submitted through this client
pub const LABEL_SOURCE: &str = "source";
pub const SOURCE_SPINNAKER: &str = "spinnaker";
/// Label carrying the destination account
pub const LABEL_ACCOUNT: &str = "spinnakerAccount";

const SERVICE_RETRY_INITIAL_DELAY_MS: u32 = 5_000;
const SERVICE_RETRY_MAX_DELAY_MS: u32 = 300_000;

/// Write the three provenance labels, overwriting any existing values.
pub fn apply_provenance_labels(labels: &mut HashMap<String, String>, name: &str, account: &str) {
    labels.insert(LABEL_NAME.to_string(), name.to_string());
    labels.insert(LABEL_SOURCE.to_string(), SOURCE_SPINNAKER.to_string());
    labels.insert(LABEL_ACCOUNT.to_string(), account.to_string());
}

impl JobDescription {
    /// Build the wire descriptor submitted to `CreateJob`.
    ///
    /// A missing job type is treated as `service`.
    pub fn to_descriptor(&self) -> pb::JobDescriptor {
        let capacity = pb::Capacity {
            min: self.instances_min,
            max: self.instances_max,
            desired: self.instances_desired,
        };

        let job_spec = match self.job_type.unwrap_or_default() {
            JobType::Service => JobSpec::Service(pb::ServiceJobSpec {
                capacity: Some(capacity),
                enabled: self.in_service.unwrap_or(true),
                retry_policy: Some(pb::RetryPolicy {
                    policy: Some(retry_policy::Policy::ExponentialBackOff(
                        retry_policy::ExponentialBackOff {
                            initial_delay_ms: SERVICE_RETRY_INITIAL_DELAY_MS,
                            max_delay_interval_ms: SERVICE_RETRY_MAX_DELAY_MS,
                            retries: 0,
                        },
                    )),
                }),
            }),
            JobType::Batch => JobSpec::Batch(pb::BatchJobSpec {
                size: self.instances_desired,
                runtime_limit_sec: self.runtime_limit_secs,
                retry_policy: Some(pb::RetryPolicy {
                    policy: Some(retry_policy::Policy::Immediate(retry_policy::Immediate {
                        retries: self.retries,
                    })),
                }),
                retry_on_runtime_limit: false,
            }),
        };

        let capacity_group = match self.capacity_group.as_deref() {
            Some(group) if !group.is_empty() => group.to_string(),
            _ => self.app_name.clone(),
        };

        pb::JobDescriptor {
            owner: Some(pb::Owner {
                team_email: self.user.clone().unwrap_or_default(),
            }),
            application_name: self.app_name.clone(),
            capacity_group,
            job_group_info: Some(pb::JobGroupInfo {
                stack: self.job_group_stack.clone().unwrap_or_default(),
                detail: self.job_group_detail.clone().unwrap_or_default(),
                sequence: self.job_group_sequence.clone().unwrap_or_default(),
            }),
            attributes: self.labels.clone(),
            container: Some(self.container()),
            job_spec: Some(job_spec),
        }
    }

    fn container(&self) -> pb::Container {
        // Zero means "scheduler default" and is left off the wire
        let resources = pb::ContainerResources {
            cpu: self.cpu,
            gpu: self.gpu,
            memory_mb: self.memory,
            disk_mb: self.disk,
            network_mbps: self.network_mbps,
            allocate_ip: true,
            shm_size_mb: self.shared_memory,
        };

        let image = match &self.digest {
            Some(digest) => pb::Image {
                name: self.application_name.clone(),
                digest: digest.clone(),
                ..Default::default()
            },
            None => pb::Image {
                name: self.application_name.clone(),
                tag: self.version.clone().unwrap_or_default(),
                ..Default::default()
            },
        };

        pb::Container {
            resources: Some(resources),
            security_profile: Some(pb::SecurityProfile {
                security_groups: self.security_groups.clone(),
                iam_role: self.iam_profile.clone().unwrap_or_default(),
                attributes: HashMap::new(),
            }),
            image: Some(image),
            attributes: self.container_attributes.clone(),
            entry_point: self.entry_point.iter().cloned().collect(),
            command: self.cmd.iter().filter(|c| !c.is_empty()).cloned().collect(),
            env: self.env.clone(),
            soft_constraints: constraints(&self.soft_constraints),
            hard_constraints: constraints(&self.hard_constraints),
        }
    }
}

fn constraints(names: &[String]) -> Option<pb::Constraints> {
    if names.is_empty() {
        return None;
    }
    Some(pb::Constraints {
        constraints: names
            .iter()
            .map(|name| (name.clone(), "true".to_string()))
            .collect(),
        expression: String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn description(job_type: JobType) -> JobDescription {
        JobDescription {
            name: "myapp-main-v003".into(),
            job_type: Some(job_type),
            application_name: "registry/myapp".into(),
            version: Some("1.2.3".into()),
            instances_desired: 2,
            instances_min: 1,
            instances_max: 4,
            cpu: 2.0,
            memory: 4096,
            app_name: "myapp".into(),
            job_group_stack: Some("main".into()),
            job_group_sequence: Some("v003".into()),
            user: Some("team@example.com".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_provenance_labels_overwrite() {
        let mut labels = HashMap::from([(LABEL_SOURCE.to_string(), "manual".to_string())]);
        apply_provenance_labels(&mut labels, "myapp-v001", "titusprod");

        assert_eq!(labels[LABEL_NAME], "myapp-v001");
        assert_eq!(labels[LABEL_SOURCE], SOURCE_SPINNAKER);
        assert_eq!(labels[LABEL_ACCOUNT], "titusprod");
    }

    #[test]
    fn test_service_descriptor() {
        let mut input = description(JobType::Service);
        input.labels.insert("team".into(), "edge".into());
        let descriptor = input.to_descriptor();

        assert_eq!(descriptor.owner.unwrap().team_email, "team@example.com");
        assert_eq!(descriptor.application_name, "myapp");
        assert_eq!(descriptor.capacity_group, "myapp");
        assert_eq!(descriptor.attributes["team"], "edge");

        let group = descriptor.job_group_info.unwrap();
        assert_eq!((group.stack.as_str(), group.sequence.as_str()), ("main", "v003"));

        let Some(JobSpec::Service(service)) = descriptor.job_spec else {
            panic!("expected a service job spec");
        };
        assert!(service.enabled);
        assert_eq!(service.capacity, Some(pb::Capacity { min: 1, max: 4, desired: 2 }));
        assert_eq!(
            service.retry_policy.unwrap().policy,
            Some(retry_policy::Policy::ExponentialBackOff(retry_policy::ExponentialBackOff {
                initial_delay_ms: 5_000,
                max_delay_interval_ms: 300_000,
                retries: 0,
            }))
        );
    }

    #[test]
    fn test_out_of_service_is_kept() {
        let mut input = description(JobType::Service);
        input.in_service = Some(false);
        let Some(JobSpec::Service(service)) = input.to_descriptor().job_spec else {
            panic!("expected a service job spec");
        };
        assert!(!service.enabled);
    }

    #[test]
    fn test_batch_descriptor() {
        let mut input = description(JobType::Batch);
        input.retries = 3;
        input.runtime_limit_secs = 900;
        input.capacity_group = Some("etl-pool".into());
        let descriptor = input.to_descriptor();

        assert_eq!(descriptor.capacity_group, "etl-pool");
        let Some(JobSpec::Batch(batch)) = descriptor.job_spec else {
            panic!("expected a batch job spec");
        };
        assert_eq!(batch.size, 2);
        assert_eq!(batch.runtime_limit_sec, 900);
        assert_eq!(
            batch.retry_policy.unwrap().policy,
            Some(retry_policy::Policy::Immediate(retry_policy::Immediate { retries: 3 }))
        );
    }

    #[test]
    fn test_container_fields() {
        let mut input = description(JobType::Service);
        input.digest = Some("sha256:abc".into());
        input.entry_point = Some("/bin/run".into());
        input.cmd = Some(String::new());
        input.soft_constraints = vec!["UniqueHost".into()];
        input.security_groups = vec!["sg-1".into()];
        input.iam_profile = Some("arn:aws:iam::1:role/myapp".into());
        input.env.insert("STAGE".into(), "prod".into());

        let container = input.to_descriptor().container.unwrap();
        let image = container.image.unwrap();
        assert_eq!(image.digest, "sha256:abc");
        assert!(image.tag.is_empty());
        assert_eq!(container.entry_point, vec!["/bin/run"]);
        assert!(container.command.is_empty());
        assert_eq!(container.env["STAGE"], "prod");
        assert_eq!(container.soft_constraints.unwrap().constraints["UniqueHost"], "true");
        assert!(container.hard_constraints.is_none());

        let resources = container.resources.unwrap();
        assert!(resources.allocate_ip);
        assert_eq!(resources.memory_mb, 4096);
        assert_eq!(resources.gpu, 0);

        let profile = container.security_profile.unwrap();
        assert_eq!(profile.security_groups, vec!["sg-1"]);
        assert_eq!(profile.iam_role, "arn:aws:iam::1:role/myapp");
    }

    #[test]
    fn test_image_tag_without_digest() {
        let image = description(JobType::Batch).to_descriptor().container.unwrap().image.unwrap();
        assert_eq!(image.tag, "1.2.3");
        assert_eq!(image.name, "registry/myapp");
    }
}

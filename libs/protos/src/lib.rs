//! Protobuf messages for the Titus job management API.
//!
//! Messages are hand-maintained prost types; calls are issued by
//! `grpc-client`, which ships the encoded bytes, so no generated service stubs
//! are needed.

pub mod titus;

#[cfg(test)]
mod tests {
    use super::titus::*;
    use prost::Message;

    #[test]
    fn test_query_result_decodes_items_and_pagination() {
        let result = JobQueryResult {
            items: vec![Job {
                id: "job-1".into(),
                ..Default::default()
            }],
            pagination: Some(Pagination {
                total_pages: 3,
                ..Default::default()
            }),
        };

        let decoded = JobQueryResult::decode(result.encode_to_vec().as_slice()).unwrap();
        assert_eq!(decoded.items[0].id, "job-1");
        assert_eq!(decoded.pagination.unwrap().total_pages, 3);
    }

    #[test]
    fn test_job_state_accessor_tolerates_unknown_values() {
        let status = JobStatus {
            state: 42,
            ..Default::default()
        };
        assert_eq!(status.state(), job_status::JobState::Accepted);
        assert_eq!(job_status::JobState::KillInitiated.as_str_name(), "KillInitiated");
        assert_eq!(
            job_status::JobState::from_str_name("Finished"),
            Some(job_status::JobState::Finished)
        );
    }

    #[test]
    fn test_service_spec_oneof() {
        let descriptor = JobDescriptor {
            job_spec: Some(job_descriptor::JobSpec::Service(ServiceJobSpec {
                capacity: Some(Capacity { min: 1, max: 3, desired: 2 }),
                enabled: true,
                retry_policy: None,
            })),
            ..Default::default()
        };

        let decoded = JobDescriptor::decode(descriptor.encode_to_vec().as_slice()).unwrap();
        match decoded.job_spec {
            Some(job_descriptor::JobSpec::Service(spec)) => {
                assert_eq!(spec.capacity.unwrap().desired, 2);
                assert!(spec.enabled);
            }
            other => panic!("expected service spec, got {other:?}"),
        }
    }
}

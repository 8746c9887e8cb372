use async_trait::async_trait;
use grpc_client::{CallOptions, CallOutcome, MethodDescriptor, UnaryCall};
use prost::Message;
use protos::titus::{self as pb, JOB_MANAGEMENT_SERVICE, job_management_service as methods};
use std::convert::Infallible;
use tower::{Service, ServiceExt};

use crate::error::{TitusError, TitusResult};

/// Typed surface of `com.netflix.titus.JobManagementService`
///
/// Every method is one logical call; retries happen below this seam.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobManagementApi: Send + Sync {
    async fn find_job(&self, request: pb::JobId) -> TitusResult<pb::Job>;

    async fn find_jobs(&self, query: pb::JobQuery) -> TitusResult<pb::JobQueryResult>;

    /// Returns the scheduler-assigned job id
    async fn create_job(&self, descriptor: pb::JobDescriptor) -> TitusResult<pb::JobId>;

    async fn update_job_instances(&self, update: pb::JobInstancesUpdate) -> TitusResult<()>;

    async fn update_job_status(&self, update: pb::JobStatusUpdate) -> TitusResult<()>;

    async fn kill_job(&self, request: pb::JobId) -> TitusResult<()>;

    async fn kill_tasks(&self, request: pb::TaskKillRequest) -> TitusResult<()>;

    async fn find_task(&self, request: pb::TaskId) -> TitusResult<pb::Task>;
}

/// `JobManagementApi` over a unary call pipeline
#[derive(Debug, Clone)]
pub struct GrpcJobManagementApi<S> {
    service: S,
    options: CallOptions,
}

impl<S> GrpcJobManagementApi<S>
where
    S: Service<UnaryCall, Response = CallOutcome, Error = Infallible> + Clone + Send + Sync + 'static,
    S::Future: Send,
{
    pub fn new(service: S) -> Self {
        Self {
            service,
            options: CallOptions::default(),
        }
    }

    /// Options applied to every call.
    ///
    /// Each call gets a child of the cancellation token, so cancelling it
    /// aborts all in-flight calls of this client.
    pub fn with_call_options(mut self, options: CallOptions) -> Self {
        self.options = options;
        self
    }

    async fn unary<Req, Resp>(&self, method: &'static str, request: Req) -> TitusResult<Resp>
    where
        Req: Message,
        Resp: Message + Default,
    {
        let mut options = self.options.clone();
        options.cancellation = self.options.cancellation.child_token();

        let call = UnaryCall::new(
            MethodDescriptor::new(JOB_MANAGEMENT_SERVICE, method),
            request.encode_to_vec(),
        )
        .with_options(options);

        let outcome = match self.service.clone().oneshot(call).await {
            Ok(outcome) => outcome,
            Err(never) => match never {},
        };

        let message = outcome.into_result().map_err(|status| {
            tracing::debug!(method, code = ?status.code(), "Titus call failed");
            TitusError::Rpc { method, status }
        })?;

        Resp::decode(message).map_err(|source| TitusError::Decode { method, source })
    }
}

#[async_trait]
impl<S> JobManagementApi for GrpcJobManagementApi<S>
where
    S: Service<UnaryCall, Response = CallOutcome, Error = Infallible> + Clone + Send + Sync + 'static,
    S::Future: Send,
{
    async fn find_job(&self, request: pb::JobId) -> TitusResult<pb::Job> {
        self.unary(methods::FIND_JOB, request).await
    }

    async fn find_jobs(&self, query: pb::JobQuery) -> TitusResult<pb::JobQueryResult> {
        self.unary(methods::FIND_JOBS, query).await
    }

    async fn create_job(&self, descriptor: pb::JobDescriptor) -> TitusResult<pb::JobId> {
        self.unary(methods::CREATE_JOB, descriptor).await
    }

    async fn update_job_instances(&self, update: pb::JobInstancesUpdate) -> TitusResult<()> {
        self.unary::<_, pb::Empty>(methods::UPDATE_JOB_INSTANCES, update)
            .await
            .map(drop)
    }

    async fn update_job_status(&self, update: pb::JobStatusUpdate) -> TitusResult<()> {
        self.unary::<_, pb::Empty>(methods::UPDATE_JOB_STATUS, update)
            .await
            .map(drop)
    }

    async fn kill_job(&self, request: pb::JobId) -> TitusResult<()> {
        self.unary::<_, pb::Empty>(methods::KILL_JOB, request)
            .await
            .map(drop)
    }

    async fn kill_tasks(&self, request: pb::TaskKillRequest) -> TitusResult<()> {
        self.unary::<_, pb::Empty>(methods::KILL_TASKS, request)
            .await
            .map(drop)
    }

    async fn find_task(&self, request: pb::TaskId) -> TitusResult<pb::Task> {
        self.unary(methods::FIND_TASK, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use tonic::Status;
    use tonic::metadata::MetadataMap;

    fn respond(call: &UnaryCall) -> CallOutcome {
        let body = match call.method.method() {
            methods::FIND_JOB => {
                let request = pb::JobId::decode(call.message.clone()).unwrap();
                if request.id == "missing" {
                    return CallOutcome::from_status(Status::not_found("no such job"));
                }
                pb::Job {
                    id: request.id,
                    ..Default::default()
                }
                .encode_to_vec()
            }
            methods::CREATE_JOB => pb::JobId { id: "new-job".into() }.encode_to_vec(),
            methods::KILL_JOB => pb::Empty {}.encode_to_vec(),
            methods::FIND_TASK => b"\xff\xff".to_vec(),
            _ => return CallOutcome::from_status(Status::unimplemented("")),
        };
        CallOutcome::ok(MetadataMap::new(), Bytes::from(body))
    }

    fn api() -> GrpcJobManagementApi<
        impl Service<UnaryCall, Response = CallOutcome, Error = Infallible, Future: Send>
        + Clone
        + Send
        + Sync
        + 'static,
    > {
        GrpcJobManagementApi::new(tower::service_fn(|call: UnaryCall| async move {
            assert_eq!(call.method.service(), JOB_MANAGEMENT_SERVICE);
            Ok::<_, Infallible>(respond(&call))
        }))
    }

    #[tokio::test]
    async fn test_find_job_round_trip() {
        let job = api()
            .find_job(pb::JobId { id: "a1b2".into() })
            .await
            .unwrap();
        assert_eq!(job.id, "a1b2");
    }

    #[tokio::test]
    async fn test_create_job_returns_id() {
        let id = api().create_job(pb::JobDescriptor::default()).await.unwrap();
        assert_eq!(id.id, "new-job");
    }

    #[tokio::test]
    async fn test_empty_response() {
        api().kill_job(pb::JobId { id: "a1b2".into() }).await.unwrap();
    }

    #[tokio::test]
    async fn test_status_becomes_rpc_error() {
        let err = api()
            .find_job(pb::JobId { id: "missing".into() })
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(matches!(err, TitusError::Rpc { method: "FindJob", .. }));
    }

    #[tokio::test]
    async fn test_garbage_response_is_decode_error() {
        let err = api()
            .find_task(pb::TaskId { id: "t-1".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, TitusError::Decode { method: "FindTask", .. }));
    }

    #[tokio::test]
    async fn test_unimplemented_method() {
        let err = api()
            .kill_tasks(pb::TaskKillRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(tonic::Code::Unimplemented));
    }
}

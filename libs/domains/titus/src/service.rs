use grpc_client::interceptors::metrics::MetricsLayer;
use grpc_client::{
    BackoffScheduler, MtlsCredentials, UnaryPipeline, create_channel_lazy_with_config,
    unary_pipeline,
};
use protos::titus as pb;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;

use crate::api::{GrpcJobManagementApi, JobManagementApi};
use crate::config::{DEFAULT_PAGE_SIZE, TitusClientConfig};
use crate::customizer::JobDescriptorCustomizer;
use crate::descriptor::{LABEL_NAME, LABEL_SOURCE, SOURCE_SPINNAKER, apply_provenance_labels};
use crate::error::{TitusError, TitusResult};
use crate::models::{Job, JobDescription, JobType, Task};
use crate::naming::push_sequence;

const DEFAULT_USER: &str = "spinnaker";

/// Client facade for one Titus region/account
#[derive(Clone)]
pub struct TitusClient<A: JobManagementApi> {
    api: Arc<A>,
    page_size: u32,
    customizers: Vec<Arc<dyn JobDescriptorCustomizer>>,
}

impl TitusClient<GrpcJobManagementApi<UnaryPipeline>> {
    /// Build the full call pipeline from `config`.
    ///
    /// The channel connects lazily, so this only fails on bad configuration
    /// or unreadable credentials. Must be called inside a tokio runtime.
    pub fn connect(
        config: &TitusClientConfig,
        scheduler: &BackoffScheduler,
        credentials: Option<MtlsCredentials>,
    ) -> TitusResult<Self> {
        let channel_config = config.channel_config(credentials.as_ref())?;
        let channel = create_channel_lazy_with_config(config.endpoint.clone(), channel_config)?;
        let pipeline = unary_pipeline(
            channel,
            config.caller_id.clone(),
            config.retry_config(),
            MetricsLayer::new(config.destination_tags()),
            scheduler.acquire(),
        )?;

        tracing::info!(
            endpoint = %config.endpoint,
            account = %config.account,
            region = %config.region,
            tls = credentials.is_some(),
            "Titus client ready"
        );

        Ok(Self::new(GrpcJobManagementApi::new(pipeline)).with_page_size(config.page_size))
    }
}

impl<A: JobManagementApi> TitusClient<A> {
    pub fn new(api: A) -> Self {
        Self {
            api: Arc::new(api),
            page_size: DEFAULT_PAGE_SIZE,
            customizers: Vec::new(),
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Register a customizer; they run in registration order
    pub fn with_customizer(mut self, customizer: impl JobDescriptorCustomizer + 'static) -> Self {
        self.customizers.push(Arc::new(customizer));
        self
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Submit a job and return the scheduler-assigned id.
    #[instrument(skip(self, description), fields(job_name = %description.name))]
    pub async fn submit_job(&self, description: JobDescription, account: &str) -> TitusResult<String> {
        let mut description = description;
        if description.name.is_empty() {
            return Err(TitusError::InvalidDescription("name is required".into()));
        }
        if description.application_name.is_empty() {
            return Err(TitusError::InvalidDescription(
                "applicationName (image) is required".into(),
            ));
        }

        let job_type = *description.job_type.get_or_insert(JobType::Service);
        description
            .user
            .get_or_insert_with(|| DEFAULT_USER.to_string());

        // A parsed name suffix wins over any supplied sequence
        if job_type == JobType::Service {
            match push_sequence(&description.name) {
                Some(sequence) => description.job_group_sequence = Some(sequence),
                None => tracing::debug!("No push sequence in job name"),
            }
        }

        let name = description.name.clone();
        apply_provenance_labels(&mut description.labels, &name, account);

        let mut descriptor = description.to_descriptor();
        for customizer in &self.customizers {
            customizer.customize(&mut descriptor);
        }
        apply_provenance_labels(&mut descriptor.attributes, &name, account);

        let job_id = self.api.create_job(descriptor).await?.id;
        tracing::info!(job_id = %job_id, %job_type, "Submitted job");
        Ok(job_id)
    }

    #[instrument(skip(self))]
    pub async fn get_job(&self, job_id: &str) -> TitusResult<Job> {
        let job = self
            .api
            .find_job(pb::JobId {
                id: job_id.to_string(),
            })
            .await?;
        Ok(job.into())
    }

    #[instrument(skip(self))]
    pub async fn get_task(&self, task_id: &str) -> TitusResult<Task> {
        let task = self
            .api
            .find_task(pb::TaskId {
                id: task_id.to_string(),
            })
            .await?;
        Ok(task.into())
    }

    /// First job labelled with `name` by this client, if any.
    ///
    /// Only the first page is consulted.
    #[instrument(skip(self))]
    pub async fn find_job_by_name(&self, name: &str) -> TitusResult<Option<Job>> {
        let criteria = HashMap::from([(
            "labels".to_string(),
            format!("{LABEL_NAME}={name},{LABEL_SOURCE}={SOURCE_SPINNAKER}"),
        )]);
        let result = self.api.find_jobs(self.query(criteria, 0)).await?;
        Ok(result.items.into_iter().next().map(Job::from))
    }

    #[instrument(skip(self))]
    pub async fn find_jobs_by_application(&self, application: &str) -> TitusResult<Vec<Job>> {
        let criteria = HashMap::from([("appName".to_string(), application.to_string())]);
        self.sweep(criteria).await
    }

    /// Every service job submitted through this client
    #[instrument(skip(self))]
    pub async fn get_all_jobs(&self) -> TitusResult<Vec<Job>> {
        let criteria = HashMap::from([
            ("jobType".to_string(), "SERVICE".to_string()),
            ("labels".to_string(), format!("{LABEL_SOURCE}={SOURCE_SPINNAKER}")),
        ]);
        self.sweep(criteria).await
    }

    #[instrument(skip(self))]
    pub async fn resize_job(&self, job_id: &str, desired: u32, min: u32, max: u32) -> TitusResult<()> {
        self.api
            .update_job_instances(pb::JobInstancesUpdate {
                job_id: job_id.to_string(),
                capacity: Some(pb::Capacity { min, max, desired }),
            })
            .await
    }

    #[instrument(skip(self))]
    pub async fn activate_job(&self, job_id: &str, in_service: bool) -> TitusResult<()> {
        self.api
            .update_job_status(pb::JobStatusUpdate {
                id: job_id.to_string(),
                enable_status: in_service,
            })
            .await
    }

    #[instrument(skip(self))]
    pub async fn terminate_job(&self, job_id: &str) -> TitusResult<()> {
        self.api
            .kill_job(pb::JobId {
                id: job_id.to_string(),
            })
            .await
    }

    #[instrument(skip(self), fields(tasks = task_ids.len()))]
    pub async fn terminate_tasks_and_shrink(&self, task_ids: Vec<String>, shrink: bool) -> TitusResult<()> {
        self.api
            .kill_tasks(pb::TaskKillRequest { task_ids, shrink })
            .await
    }

    fn query(&self, criteria: HashMap<String, String>, page_number: i32) -> pb::JobQuery {
        pb::JobQuery {
            page: Some(pb::Page {
                page_number,
                page_size: i32::try_from(self.page_size).unwrap_or(i32::MAX),
                cursor: String::new(),
            }),
            filtering_criteria: criteria,
            fields: Vec::new(),
        }
    }

    /// Walk pages from 0 until the reported total page count is reached
    async fn sweep(&self, criteria: HashMap<String, String>) -> TitusResult<Vec<Job>> {
        let mut jobs = Vec::new();
        let mut page_number = 0;
        loop {
            let result = self
                .api
                .find_jobs(self.query(criteria.clone(), page_number))
                .await?;
            jobs.extend(result.items.into_iter().map(Job::from));

            let total_pages = result.pagination.map(|p| p.total_pages).unwrap_or(0);
            page_number += 1;
            if page_number >= total_pages {
                break;
            }
        }
        tracing::debug!(pages = page_number, jobs = jobs.len(), "Job sweep complete");
        Ok(jobs)
    }
}

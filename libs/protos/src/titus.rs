// Message types for `com.netflix.titus.JobManagementService`.

/// Fully-qualified service name.
pub const JOB_MANAGEMENT_SERVICE: &str = "com.netflix.titus.JobManagementService";

/// Unary method names of [`JOB_MANAGEMENT_SERVICE`].
pub mod job_management_service {
    pub const FIND_JOB: &str = "FindJob";
    pub const FIND_JOBS: &str = "FindJobs";
    pub const CREATE_JOB: &str = "CreateJob";
    pub const UPDATE_JOB_INSTANCES: &str = "UpdateJobInstances";
    pub const UPDATE_JOB_STATUS: &str = "UpdateJobStatus";
    pub const KILL_JOB: &str = "KillJob";
    pub const KILL_TASKS: &str = "KillTasks";
    pub const FIND_TASK: &str = "FindTask";
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Empty {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct JobId {
    #[prost(string, tag = "1")]
    pub id: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TaskId {
    #[prost(string, tag = "1")]
    pub id: ::prost::alloc::string::String,
}

// Pagination

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Page {
    /// Zero-based page number.
    #[prost(int32, tag = "1")]
    pub page_number: i32,
    #[prost(int32, tag = "2")]
    pub page_size: i32,
    #[prost(string, tag = "3")]
    pub cursor: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Pagination {
    #[prost(message, optional, tag = "1")]
    pub current_page: ::core::option::Option<Page>,
    #[prost(bool, tag = "2")]
    pub has_more: bool,
    #[prost(int32, tag = "3")]
    pub total_pages: i32,
    #[prost(int32, tag = "4")]
    pub total_items: i32,
    #[prost(string, tag = "5")]
    pub cursor: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct JobQuery {
    #[prost(message, optional, tag = "1")]
    pub page: ::core::option::Option<Page>,
    /// Scheduler-side filters such as `appName`, `jobType` or `labels`.
    #[prost(map = "string, string", tag = "2")]
    pub filtering_criteria:
        ::std::collections::HashMap<::prost::alloc::string::String, ::prost::alloc::string::String>,
    #[prost(string, repeated, tag = "3")]
    pub fields: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct JobQueryResult {
    #[prost(message, repeated, tag = "1")]
    pub items: ::prost::alloc::vec::Vec<Job>,
    #[prost(message, optional, tag = "2")]
    pub pagination: ::core::option::Option<Pagination>,
}

// Job descriptor

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Owner {
    #[prost(string, tag = "1")]
    pub team_email: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct JobGroupInfo {
    #[prost(string, tag = "1")]
    pub stack: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub detail: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub sequence: ::prost::alloc::string::String,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct Capacity {
    #[prost(uint32, tag = "1")]
    pub min: u32,
    #[prost(uint32, tag = "2")]
    pub max: u32,
    #[prost(uint32, tag = "3")]
    pub desired: u32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct ContainerResources {
    #[prost(double, tag = "1")]
    pub cpu: f64,
    #[prost(uint32, tag = "2")]
    pub gpu: u32,
    #[prost(uint32, tag = "3")]
    pub memory_mb: u32,
    #[prost(uint32, tag = "4")]
    pub disk_mb: u32,
    #[prost(uint32, tag = "5")]
    pub network_mbps: u32,
    #[prost(bool, tag = "6")]
    pub allocate_ip: bool,
    #[prost(uint32, tag = "7")]
    pub shm_size_mb: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SecurityProfile {
    #[prost(string, repeated, tag = "1")]
    pub security_groups: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    #[prost(string, tag = "2")]
    pub iam_role: ::prost::alloc::string::String,
    #[prost(map = "string, string", tag = "3")]
    pub attributes:
        ::std::collections::HashMap<::prost::alloc::string::String, ::prost::alloc::string::String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Image {
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub tag: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub digest: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Constraints {
    #[prost(map = "string, string", tag = "1")]
    pub constraints:
        ::std::collections::HashMap<::prost::alloc::string::String, ::prost::alloc::string::String>,
    #[prost(string, tag = "2")]
    pub expression: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Container {
    #[prost(message, optional, tag = "1")]
    pub resources: ::core::option::Option<ContainerResources>,
    #[prost(message, optional, tag = "2")]
    pub security_profile: ::core::option::Option<SecurityProfile>,
    #[prost(message, optional, tag = "3")]
    pub image: ::core::option::Option<Image>,
    #[prost(map = "string, string", tag = "4")]
    pub attributes:
        ::std::collections::HashMap<::prost::alloc::string::String, ::prost::alloc::string::String>,
    #[prost(string, repeated, tag = "5")]
    pub entry_point: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    #[prost(string, repeated, tag = "6")]
    pub command: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    #[prost(map = "string, string", tag = "7")]
    pub env:
        ::std::collections::HashMap<::prost::alloc::string::String, ::prost::alloc::string::String>,
    #[prost(message, optional, tag = "8")]
    pub soft_constraints: ::core::option::Option<Constraints>,
    #[prost(message, optional, tag = "9")]
    pub hard_constraints: ::core::option::Option<Constraints>,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct RetryPolicy {
    #[prost(oneof = "retry_policy::Policy", tags = "1, 2, 3")]
    pub policy: ::core::option::Option<retry_policy::Policy>,
}

/// Nested message and enum types in `RetryPolicy`.
pub mod retry_policy {
    /// Retry straight away, up to `retries` times.
    #[derive(Clone, Copy, PartialEq, ::prost::Message)]
    pub struct Immediate {
        #[prost(uint32, tag = "1")]
        pub retries: u32,
    }

    #[derive(Clone, Copy, PartialEq, ::prost::Message)]
    pub struct Delayed {
        #[prost(uint64, tag = "1")]
        pub delay_ms: u64,
        #[prost(uint32, tag = "2")]
        pub retries: u32,
    }

    #[derive(Clone, Copy, PartialEq, ::prost::Message)]
    pub struct ExponentialBackOff {
        #[prost(uint32, tag = "1")]
        pub initial_delay_ms: u32,
        #[prost(uint32, tag = "2")]
        pub max_delay_interval_ms: u32,
        #[prost(uint32, tag = "3")]
        pub retries: u32,
    }

    #[derive(Clone, Copy, PartialEq, ::prost::Oneof)]
    pub enum Policy {
        #[prost(message, tag = "1")]
        Immediate(Immediate),
        #[prost(message, tag = "2")]
        Delayed(Delayed),
        #[prost(message, tag = "3")]
        ExponentialBackOff(ExponentialBackOff),
    }
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct ServiceJobSpec {
    #[prost(message, optional, tag = "1")]
    pub capacity: ::core::option::Option<Capacity>,
    #[prost(bool, tag = "2")]
    pub enabled: bool,
    #[prost(message, optional, tag = "3")]
    pub retry_policy: ::core::option::Option<RetryPolicy>,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct BatchJobSpec {
    #[prost(uint32, tag = "1")]
    pub size: u32,
    #[prost(uint64, tag = "2")]
    pub runtime_limit_sec: u64,
    #[prost(message, optional, tag = "3")]
    pub retry_policy: ::core::option::Option<RetryPolicy>,
    #[prost(bool, tag = "4")]
    pub retry_on_runtime_limit: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct JobDescriptor {
    #[prost(message, optional, tag = "1")]
    pub owner: ::core::option::Option<Owner>,
    #[prost(string, tag = "2")]
    pub application_name: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub capacity_group: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "4")]
    pub job_group_info: ::core::option::Option<JobGroupInfo>,
    /// Free-form labels; provenance labels live here.
    #[prost(map = "string, string", tag = "5")]
    pub attributes:
        ::std::collections::HashMap<::prost::alloc::string::String, ::prost::alloc::string::String>,
    #[prost(message, optional, tag = "6")]
    pub container: ::core::option::Option<Container>,
    #[prost(oneof = "job_descriptor::JobSpec", tags = "7, 8")]
    pub job_spec: ::core::option::Option<job_descriptor::JobSpec>,
}

/// Nested message and enum types in `JobDescriptor`.
pub mod job_descriptor {
    #[derive(Clone, Copy, PartialEq, ::prost::Oneof)]
    pub enum JobSpec {
        #[prost(message, tag = "7")]
        Batch(super::BatchJobSpec),
        #[prost(message, tag = "8")]
        Service(super::ServiceJobSpec),
    }
}

// Job and task state

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct JobStatus {
    #[prost(enumeration = "job_status::JobState", tag = "1")]
    pub state: i32,
    #[prost(string, tag = "2")]
    pub reason_code: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub reason_message: ::prost::alloc::string::String,
    #[prost(uint64, tag = "4")]
    pub timestamp: u64,
}

/// Nested message and enum types in `JobStatus`.
pub mod job_status {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum JobState {
        Accepted = 0,
        KillInitiated = 1,
        Finished = 2,
    }

    impl JobState {
        /// Name as it appears in the proto definition.
        pub fn as_str_name(&self) -> &'static str {
            match self {
                Self::Accepted => "Accepted",
                Self::KillInitiated => "KillInitiated",
                Self::Finished => "Finished",
            }
        }

        pub fn from_str_name(value: &str) -> ::core::option::Option<Self> {
            match value {
                "Accepted" => Some(Self::Accepted),
                "KillInitiated" => Some(Self::KillInitiated),
                "Finished" => Some(Self::Finished),
                _ => None,
            }
        }
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Job {
    #[prost(string, tag = "1")]
    pub id: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "2")]
    pub job_descriptor: ::core::option::Option<JobDescriptor>,
    #[prost(message, optional, tag = "3")]
    pub status: ::core::option::Option<JobStatus>,
    #[prost(message, repeated, tag = "4")]
    pub status_history: ::prost::alloc::vec::Vec<JobStatus>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TaskStatus {
    #[prost(enumeration = "task_status::TaskState", tag = "1")]
    pub state: i32,
    #[prost(string, tag = "2")]
    pub reason_code: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub reason_message: ::prost::alloc::string::String,
    #[prost(uint64, tag = "4")]
    pub timestamp: u64,
}

/// Nested message and enum types in `TaskStatus`.
pub mod task_status {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum TaskState {
        Accepted = 0,
        Launched = 1,
        StartInitiated = 2,
        Started = 3,
        KillInitiated = 4,
        Disconnected = 5,
        Finished = 6,
    }

    impl TaskState {
        /// Name as it appears in the proto definition.
        pub fn as_str_name(&self) -> &'static str {
            match self {
                Self::Accepted => "Accepted",
                Self::Launched => "Launched",
                Self::StartInitiated => "StartInitiated",
                Self::Started => "Started",
                Self::KillInitiated => "KillInitiated",
                Self::Disconnected => "Disconnected",
                Self::Finished => "Finished",
            }
        }
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Task {
    #[prost(string, tag = "1")]
    pub id: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub job_id: ::prost::alloc::string::String,
    #[prost(map = "string, string", tag = "3")]
    pub task_context:
        ::std::collections::HashMap<::prost::alloc::string::String, ::prost::alloc::string::String>,
    #[prost(message, optional, tag = "4")]
    pub status: ::core::option::Option<TaskStatus>,
    #[prost(message, repeated, tag = "5")]
    pub status_history: ::prost::alloc::vec::Vec<TaskStatus>,
}

// Mutations

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct JobInstancesUpdate {
    #[prost(string, tag = "1")]
    pub job_id: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "2")]
    pub capacity: ::core::option::Option<Capacity>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct JobStatusUpdate {
    #[prost(string, tag = "1")]
    pub id: ::prost::alloc::string::String,
    #[prost(bool, tag = "2")]
    pub enable_status: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TaskKillRequest {
    #[prost(string, repeated, tag = "1")]
    pub task_ids: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    /// Lower the job's desired size by the number of killed tasks.
    #[prost(bool, tag = "2")]
    pub shrink: bool,
}

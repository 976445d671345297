//! Common value types shared by requests and responses.

use crate::error::JobError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Job status as reported by the service.
///
/// Ordinals: 0 waiting for start, 1 waiting, 2 preparing, 3 executing,
/// 4 result processing, 5 stopped, 6 finished, 7 failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum JobStatus {
    /// 0 - waiting for start.
    WaitingForStart,
    /// 1 - waiting.
    Waiting,
    /// 2 - preparing.
    Preparing,
    /// 3 - executing.
    Executing,
    /// 4 - result processing.
    ResultProcessing,
    /// 5 - stopped.
    Stopped,
    /// 6 - execution finished.
    Finished,
    /// 7 - execution failed.
    Failed,
}

impl JobStatus {
    /// Numeric ordinal used on the wire.
    pub fn ordinal(self) -> u8 {
        self.into()
    }

    /// Stopped, finished and failed are terminal.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Stopped | JobStatus::Finished | JobStatus::Failed
        )
    }
}

impl TryFrom<u8> for JobStatus {
    type Error = JobError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => JobStatus::WaitingForStart,
            1 => JobStatus::Waiting,
            2 => JobStatus::Preparing,
            3 => JobStatus::Executing,
            4 => JobStatus::ResultProcessing,
            5 => JobStatus::Stopped,
            6 => JobStatus::Finished,
            7 => JobStatus::Failed,
            other => return Err(JobError::UnknownStatus(other)),
        })
    }
}

impl From<JobStatus> for u8 {
    fn from(status: JobStatus) -> u8 {
        match status {
            JobStatus::WaitingForStart => 0,
            JobStatus::Waiting => 1,
            JobStatus::Preparing => 2,
            JobStatus::Executing => 3,
            JobStatus::ResultProcessing => 4,
            JobStatus::Stopped => 5,
            JobStatus::Finished => 6,
            JobStatus::Failed => 7,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobStatus::WaitingForStart => "waiting-for-start",
            JobStatus::Waiting => "waiting",
            JobStatus::Preparing => "preparing",
            JobStatus::Executing => "executing",
            JobStatus::ResultProcessing => "result-processing",
            JobStatus::Stopped => "stopped",
            JobStatus::Finished => "finished",
            JobStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Reconstruction job type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum JobType {
    /// 13 - LiDAR reconstruction.
    Lidar,
    /// 14 - 2D reconstruction.
    Map2D,
    /// 15 - 3D reconstruction.
    Model3D,
}

impl TryFrom<u8> for JobType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            13 => Ok(JobType::Lidar),
            14 => Ok(JobType::Map2D),
            15 => Ok(JobType::Model3D),
            other => Err(format!("unknown job type {}", other)),
        }
    }
}

impl From<JobType> for u8 {
    fn from(job_type: JobType) -> u8 {
        match job_type {
            JobType::Lidar => 13,
            JobType::Map2D => 14,
            JobType::Model3D => 15,
        }
    }
}

/// Resource type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    /// Input imagery.
    Map,
    /// Output of a reconstruction job.
    JobOutput,
}

impl ResourceType {
    /// Wire value.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Map => "map",
            ResourceType::JobOutput => "job_output",
        }
    }
}

/// What happens to linked files when a resource is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeleteMode {
    /// 0 - keep all files.
    #[default]
    KeepFiles,
    /// 1 - delete files not linked to another resource.
    DeleteUnlinkedFiles,
}

impl DeleteMode {
    /// Wire value.
    pub fn as_u8(self) -> u8 {
        match self {
            DeleteMode::KeepFiles => 0,
            DeleteMode::DeleteUnlinkedFiles => 1,
        }
    }
}

/// Camera position attached to an image file.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// Attitude.
    #[serde(default)]
    pub attitude: f64,
    /// Latitude.
    #[serde(default)]
    pub latitude: f64,
    /// Longitude.
    #[serde(default)]
    pub longitude: f64,
}

/// Geographic bounding box of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    /// Maximum latitude.
    #[serde(default)]
    pub max_latitude: f64,
    /// Maximum longitude.
    #[serde(default)]
    pub max_longitude: f64,
    /// Minimum latitude.
    #[serde(default)]
    pub min_latitude: f64,
    /// Minimum longitude.
    #[serde(default)]
    pub min_longitude: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_status_terminal() {
        assert!(!JobStatus::Executing.is_terminal());
        assert!(JobStatus::Stopped.is_terminal());
        assert!(JobStatus::Finished.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn test_job_status_from_json() {
        let status: JobStatus = serde_json::from_str("6").unwrap();
        assert_eq!(status, JobStatus::Finished);
        assert_eq!(serde_json::to_string(&JobStatus::Failed).unwrap(), "7");
        assert!(serde_json::from_str::<JobStatus>("9").is_err());
    }

    #[test]
    fn test_job_type_wire_values() {
        assert_eq!(serde_json::to_string(&JobType::Model3D).unwrap(), "15");
        let job_type: JobType = serde_json::from_str("13").unwrap();
        assert_eq!(job_type, JobType::Lidar);
    }

    #[test]
    fn test_resource_type_wire_values() {
        assert_eq!(serde_json::to_string(&ResourceType::Map).unwrap(), "\"map\"");
        let parsed: ResourceType = serde_json::from_str("\"job_output\"").unwrap();
        assert_eq!(parsed, ResourceType::JobOutput);
    }
}

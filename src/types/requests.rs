//! Request types sent to the Terra API.

use super::common::*;
use crate::error::{SigningError, TerraError};
use serde::Serialize;

/// Default page size for list queries.
pub const DEFAULT_ROWS: u32 = 10;

/// Create resource request.
#[derive(Debug, Clone, Serialize)]
pub struct CreateResourceRequest {
    /// Resource name.
    pub name: String,
    /// Resource type.
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    /// User extension information.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<String>,
    /// Uuids of existing files to include.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<String>>,
}

impl CreateResourceRequest {
    /// Create a request for a `map` resource.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resource_type: ResourceType::Map,
            meta: None,
            files: None,
        }
    }

    /// Set user extension information.
    pub fn with_meta(mut self, meta: impl Into<String>) -> Self {
        self.meta = Some(meta.into());
        self
    }

    /// Include existing files.
    pub fn with_files(mut self, files: Vec<String>) -> Self {
        self.files = Some(files);
        self
    }
}

/// Create job request.
#[derive(Debug, Clone, Serialize)]
pub struct CreateJobRequest {
    /// Job name.
    pub name: String,
    /// User extension information.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<String>,
}

impl CreateJobRequest {
    /// Create a new request.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            meta: None,
        }
    }

    /// Set user extension information.
    pub fn with_meta(mut self, meta: impl Into<String>) -> Self {
        self.meta = Some(meta.into());
        self
    }
}

/// Coordinate system type of a geographic description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CoordinateSystemType {
    /// Geographic coordinate system.
    #[serde(rename = "GEO_CS")]
    Geographic,
    /// Local coordinate system.
    #[serde(rename = "LOCAL_CS")]
    Local,
    /// Local east-north-up coordinate system.
    #[serde(rename = "LOCAL_ENU_CS")]
    LocalEnu,
}

/// Reference GPS position for a local ENU system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReferenceGps {
    /// Altitude.
    pub altitude: f64,
    /// Latitude.
    pub latitude: f64,
    /// Longitude.
    pub longitude: f64,
}

/// Coordinate system description for the region of interest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoDescription {
    /// Coordinate system type.
    pub cs_type: CoordinateSystemType,
    /// Well-known text of the coordinate system.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo_cs_wkt: Option<String>,
    /// EPSG-style coordinate system identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo_cs: Option<String>,
    /// Vertical coordinate system override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub override_vertical_cs: Option<String>,
    /// Coordinate offset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<[f64; 3]>,
    /// Reference GPS position.
    #[serde(rename = "ref_GPS", skip_serializing_if = "Option::is_none")]
    pub ref_gps: Option<ReferenceGps>,
}

/// Predefined region of interest.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PredefinedAoi {
    /// Maximum altitude.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_altitude: Option<f64>,
    /// Minimum altitude.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_altitude: Option<f64>,
    /// Polygon vertices.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub polygon_points: Vec<[f64; 3]>,
    /// Coordinate system of the polygon.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo_desc: Option<GeoDescription>,
}

/// Export options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ExportParameter {
    /// Keep the point cloud directory structure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pc_dir_structure: Option<bool>,
    /// Export undistorted images.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub undistort_images: Option<bool>,
    /// Export intermediate result files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_result_files: Option<bool>,
}

/// Parameter block of a start request.
///
/// `P` is the algorithm parameter schema for the job type; it is passed
/// through without interpretation.
#[derive(Debug, Clone, Serialize)]
pub struct JobParameters<P> {
    /// Algorithm parameters.
    pub parameter: P,
    /// Region of interest.
    #[serde(rename = "predefine_AOI", skip_serializing_if = "Option::is_none")]
    pub predefine_aoi: Option<PredefinedAoi>,
    /// Export options.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_parameter: Option<ExportParameter>,
}

impl<P> JobParameters<P> {
    /// Wrap algorithm parameters.
    pub fn new(parameter: P) -> Self {
        Self {
            parameter,
            predefine_aoi: None,
            export_parameter: None,
        }
    }

    /// Set the region of interest.
    pub fn with_aoi(mut self, aoi: PredefinedAoi) -> Self {
        self.predefine_aoi = Some(aoi);
        self
    }

    /// Set export options.
    pub fn with_export(mut self, export: ExportParameter) -> Self {
        self.export_parameter = Some(export);
        self
    }
}

/// Start job request.
#[derive(Debug, Clone)]
pub struct StartJobRequest<P> {
    /// Input resource.
    pub resource_uuid: String,
    /// Job type.
    pub job_type: JobType,
    /// Parameters.
    pub parameters: JobParameters<P>,
    /// Existing resource to receive the output.
    pub output_resource_uuid: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StartJobBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    output_resource_uuid: Option<&'a str>,
    parameters: String,
    resource_uuid: &'a str,
    #[serde(rename = "type")]
    job_type: JobType,
}

impl<P: Serialize> StartJobRequest<P> {
    /// Create a new start request.
    pub fn new(resource_uuid: impl Into<String>, job_type: JobType, parameter: P) -> Self {
        Self {
            resource_uuid: resource_uuid.into(),
            job_type,
            parameters: JobParameters::new(parameter),
            output_resource_uuid: None,
        }
    }

    /// Write output into an existing resource.
    pub fn with_output_resource(mut self, uuid: impl Into<String>) -> Self {
        self.output_resource_uuid = Some(uuid.into());
        self
    }

    /// Wire body; the service expects `parameters` as a JSON string.
    pub fn to_body(&self) -> Result<serde_json::Value, TerraError> {
        let serialization_error = |e: serde_json::Error| SigningError::PayloadSerialization {
            message: e.to_string(),
        };
        let parameters = serde_json::to_string(&self.parameters).map_err(serialization_error)?;
        let body = StartJobBody {
            output_resource_uuid: self.output_resource_uuid.as_deref(),
            parameters,
            resource_uuid: &self.resource_uuid,
            job_type: self.job_type,
        };
        serde_json::to_value(body).map_err(|e| serialization_error(e).into())
    }
}

/// One uploaded object to register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedFile {
    /// Relative file name.
    pub name: String,
    /// Content tag returned by object storage.
    pub etag: String,
    /// Checksum; the content tag is used.
    pub checksum: String,
}

/// Upload callback request.
#[derive(Debug, Clone, Serialize)]
pub struct UploadCallbackRequest {
    /// Value from the storage token.
    #[serde(rename = "callbackParam")]
    pub callback_param: String,
    /// Uploaded files.
    pub files: Vec<UploadedFile>,
    /// Resource receiving the files.
    #[serde(rename = "resourceUUID")]
    pub resource_uuid: String,
}

/// A list query that can be rendered to query pairs and paged.
pub trait ListQuery: Clone + Send + Sync {
    /// Query pairs in a stable order; each key at most once.
    fn query_pairs(&self) -> Vec<(&'static str, String)>;

    /// Current page, 1-based.
    fn current_page(&self) -> Option<u32>;

    /// Page size.
    fn page_size(&self) -> Option<u32>;

    /// Set the page.
    fn set_page(&mut self, page: u32);
}

fn push_opt<T: ToString>(pairs: &mut Vec<(&'static str, String)>, key: &'static str, value: &Option<T>) {
    if let Some(value) = value {
        pairs.push((key, value.to_string()));
    }
}

fn join_uuids(uuids: &[String]) -> Option<String> {
    if uuids.is_empty() {
        None
    } else {
        Some(uuids.join(","))
    }
}

/// Resource list query.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceQuery {
    /// Page size.
    pub rows: Option<u32>,
    /// Page, 1-based.
    pub page: Option<u32>,
    /// Free-text search.
    pub search: Option<String>,
    /// Restrict to these uuids.
    pub uuids: Vec<String>,
    /// Restrict to a resource type.
    pub resource_type: Option<ResourceType>,
}

impl Default for ResourceQuery {
    fn default() -> Self {
        Self {
            rows: Some(DEFAULT_ROWS),
            page: None,
            search: None,
            uuids: Vec::new(),
            resource_type: None,
        }
    }
}

impl ResourceQuery {
    /// Query with the default page size.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the page size.
    pub fn rows(mut self, rows: u32) -> Self {
        self.rows = Some(rows);
        self
    }

    /// Set the page.
    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Set the search text.
    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// Restrict to a resource type.
    pub fn resource_type(mut self, resource_type: ResourceType) -> Self {
        self.resource_type = Some(resource_type);
        self
    }
}

impl ListQuery for ResourceQuery {
    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        push_opt(&mut pairs, "rows", &self.rows);
        push_opt(&mut pairs, "page", &self.page);
        push_opt(&mut pairs, "search", &self.search);
        push_opt(&mut pairs, "uuids", &join_uuids(&self.uuids));
        push_opt(&mut pairs, "type", &self.resource_type.map(|t| t.as_str()));
        pairs
    }

    fn current_page(&self) -> Option<u32> {
        self.page
    }

    fn page_size(&self) -> Option<u32> {
        self.rows
    }

    fn set_page(&mut self, page: u32) {
        self.page = Some(page);
    }
}

/// File list query.
#[derive(Debug, Clone, PartialEq)]
pub struct FileQuery {
    /// Page size.
    pub rows: Option<u32>,
    /// Page, 1-based.
    pub page: Option<u32>,
    /// Free-text search.
    pub search: Option<String>,
    /// Include download URLs.
    pub need_url: Option<bool>,
    /// Exact file name.
    pub name: Option<String>,
    /// Restrict to these uuids.
    pub uuids: Vec<String>,
    /// Restrict to a resource.
    pub resource_uuid: Option<String>,
    /// Sort by creation time ascending instead of descending.
    pub order_asc: Option<bool>,
}

impl Default for FileQuery {
    fn default() -> Self {
        Self {
            rows: Some(DEFAULT_ROWS),
            page: None,
            search: None,
            need_url: None,
            name: None,
            uuids: Vec::new(),
            resource_uuid: None,
            order_asc: None,
        }
    }
}

impl FileQuery {
    /// Query with the default page size.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the page size.
    pub fn rows(mut self, rows: u32) -> Self {
        self.rows = Some(rows);
        self
    }

    /// Set the page.
    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Restrict to a resource.
    pub fn resource(mut self, uuid: impl Into<String>) -> Self {
        self.resource_uuid = Some(uuid.into());
        self
    }

    /// Include download URLs.
    pub fn need_url(mut self, need_url: bool) -> Self {
        self.need_url = Some(need_url);
        self
    }
}

impl ListQuery for FileQuery {
    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        push_opt(&mut pairs, "rows", &self.rows);
        push_opt(&mut pairs, "page", &self.page);
        push_opt(&mut pairs, "search", &self.search);
        push_opt(&mut pairs, "needURL", &self.need_url);
        push_opt(&mut pairs, "name", &self.name);
        push_opt(&mut pairs, "uuids", &join_uuids(&self.uuids));
        push_opt(&mut pairs, "resourceUuid", &self.resource_uuid);
        push_opt(&mut pairs, "orderAsc", &self.order_asc);
        pairs
    }

    fn current_page(&self) -> Option<u32> {
        self.page
    }

    fn page_size(&self) -> Option<u32> {
        self.rows
    }

    fn set_page(&mut self, page: u32) {
        self.page = Some(page);
    }
}

/// Job list query.
#[derive(Debug, Clone, PartialEq)]
pub struct JobQuery {
    /// Page size.
    pub rows: Option<u32>,
    /// Page, 1-based.
    pub page: Option<u32>,
    /// Free-text search.
    pub search: Option<String>,
    /// Restrict to these uuids.
    pub uuids: Vec<String>,
    /// Restrict to a job type.
    pub job_type: Option<JobType>,
    /// Restrict to an input resource.
    pub origin_resource_uuid: Option<String>,
    /// Restrict to an output resource.
    pub output_resource_uuid: Option<String>,
}

impl Default for JobQuery {
    fn default() -> Self {
        Self {
            rows: Some(DEFAULT_ROWS),
            page: None,
            search: None,
            uuids: Vec::new(),
            job_type: None,
            origin_resource_uuid: None,
            output_resource_uuid: None,
        }
    }
}

impl JobQuery {
    /// Query with the default page size.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the page size.
    pub fn rows(mut self, rows: u32) -> Self {
        self.rows = Some(rows);
        self
    }

    /// Set the page.
    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Restrict to a job type.
    pub fn job_type(mut self, job_type: JobType) -> Self {
        self.job_type = Some(job_type);
        self
    }

    /// Restrict to an input resource.
    pub fn origin_resource(mut self, uuid: impl Into<String>) -> Self {
        self.origin_resource_uuid = Some(uuid.into());
        self
    }
}

impl ListQuery for JobQuery {
    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        push_opt(&mut pairs, "rows", &self.rows);
        push_opt(&mut pairs, "page", &self.page);
        push_opt(&mut pairs, "search", &self.search);
        push_opt(&mut pairs, "uuids", &join_uuids(&self.uuids));
        push_opt(&mut pairs, "type", &self.job_type.map(u8::from));
        push_opt(&mut pairs, "originResourceUuid", &self.origin_resource_uuid);
        push_opt(&mut pairs, "outputResourceUuid", &self.output_resource_uuid);
        pairs
    }

    fn current_page(&self) -> Option<u32> {
        self.page
    }

    fn page_size(&self) -> Option<u32> {
        self.rows
    }

    fn set_page(&mut self, page: u32) {
        self.page = Some(page);
    }
}

use axum::{
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    Json,
};
use axum::extract::multipart::Multipart;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fmt::Write as _;
use std::time::Instant;

use crate::batch::{BatchDriver, BatchOutput, BatchParams, FailurePolicy};
use crate::extract::{DateRange, Extractor};
use crate::projection::Crs;
use crate::sampler::{SampleRequest, SpatialSampler};
use crate::tabular::{output_file_name, read_records, read_sample_rows, rows_to_csv_string};
use crate::types::GeoPoint;
use crate::{Error, Result as SamplerResult};
use super::models::*;
use super::AppState;

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(e: Error) -> ApiError {
    let status = if e.is_invalid_input() {
        StatusCode::BAD_REQUEST
    } else if matches!(e, Error::RemoteLookupFailed { .. }) {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };

    (status, Json(ErrorResponse { error: e.to_string() }))
}

fn bad_request(msg: impl Into<String>) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: msg.into() }))
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn get_sample(
    State(state): State<AppState>,
    Query(req): Query<SampleQuery>,
) -> Result<Json<SampleResponse>, ApiError> {
    let start = Instant::now();

    let defaults = &state.config.sampler;
    let radius_ft = req.radius_ft.unwrap_or(defaults.default_radius_ft);
    let samples = req.samples.unwrap_or(defaults.default_sample_count);
    let plot_id = req.plot_id.clone().unwrap_or_else(|| "point".to_string());

    let crs: Crs = req.crs.parse().map_err(error_response)?;
    let request = SampleRequest::new(GeoPoint::with_crs(req.longitude, req.latitude, crs), radius_ft, samples, plot_id)
        .map_err(error_response)?;

    let result = match req.seed {
        Some(seed) => state.sampler.sample(&request, &mut StdRng::seed_from_u64(seed)),
        None => state.sampler.sample(&request, &mut rand::rng()),
    }
    .map_err(error_response)?;

    let execution_time_ms = start.elapsed().as_secs_f64() * 1000.0;

    Ok(Json(SampleResponse {
        plot_id: result.plot_id().to_string(),
        crs: crs.to_string(),
        radius_ft,
        points: result
            .points()
            .iter()
            .map(|p| PointResponse { lon: p.lon, lat: p.lat })
            .collect(),
        execution_time_ms,
    }))
}

pub async fn upload_csv(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let start = Instant::now();

    let mut csv_data: Option<Vec<u8>> = None;
    let mut radius_ft = state.config.sampler.default_radius_ft;
    let mut samples = state.config.sampler.default_sample_count;
    let mut seed: Option<u64> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "csv" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| bad_request(format!("Failed to read CSV upload: {}", e)))?;
                csv_data = Some(bytes.to_vec());
            }
            "radius_ft" => radius_ft = parse_field(&name, field.text().await)?,
            "samples" => samples = parse_field(&name, field.text().await)?,
            "seed" => seed = Some(parse_field(&name, field.text().await)?),
            _ => {}
        }
    }

    let csv_data = csv_data.ok_or_else(|| bad_request("Missing CSV file"))?;

    let params = BatchParams::new(radius_ft, samples).map_err(error_response)?;
    let body = process_upload(&csv_data, state.sampler, &params, seed, start).map_err(error_response)?;

    Ok(csv_attachment(&output_file_name(params.radius_feet()), body))
}

fn csv_attachment(file_name: &str, body: String) -> Response {
    let disposition = format!("attachment; filename=\"{}\"", file_name);
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, mime::TEXT_CSV.as_ref().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response()
}

pub async fn extract_csv(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let extractor = state.extractor.clone().ok_or_else(|| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse { error: "No dataset catalog is configured".to_string() }),
        )
    })?;

    let mut csv_data: Option<Vec<u8>> = None;
    let mut dataset: Option<String> = None;
    let mut start_date: Option<String> = None;
    let mut end_date: Option<String> = None;
    let mut aggregate = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "csv" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| bad_request(format!("Failed to read CSV upload: {}", e)))?;
                csv_data = Some(bytes.to_vec());
            }
            "dataset" => dataset = Some(parse_field(&name, field.text().await)?),
            "start_date" => start_date = Some(parse_field(&name, field.text().await)?),
            "end_date" => end_date = Some(parse_field(&name, field.text().await)?),
            "aggregate" => aggregate = parse_field(&name, field.text().await)?,
            _ => {}
        }
    }

    let csv_data = csv_data.ok_or_else(|| bad_request("Missing CSV file"))?;
    let dataset = dataset.ok_or_else(|| bad_request("Missing dataset"))?;
    let range = match (start_date, end_date) {
        (Some(start), Some(end)) => Some(DateRange::parse(&start, &end).map_err(|e| bad_request(e.to_string()))?),
        (None, None) => None,
        _ => return Err(bad_request("start_date and end_date must be given together")),
    };

    let body = process_extract(&extractor, &csv_data, &dataset, range, aggregate).map_err(error_response)?;
    Ok(csv_attachment(&extract_file_name(&dataset, aggregate), body))
}

/// Download name for an extraction; dataset path separators become underscores
pub fn extract_file_name(dataset: &str, aggregate: bool) -> String {
    let stem: String = dataset
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
        .collect();
    if aggregate {
        format!("{}_aggregated.csv", stem)
    } else {
        format!("{}_points.csv", stem)
    }
}

/// Extracts a dataset at the uploaded sample points and renders the CSV body
pub fn process_extract(
    extractor: &Extractor,
    csv_data: &[u8],
    dataset: &str,
    range: Option<DateRange>,
    aggregate: bool,
) -> SamplerResult<String> {
    let points = read_sample_rows(csv_data)?;
    let table = extractor.extract(dataset, &points, range)?;

    if aggregate {
        table.aggregate_by_plot().to_csv_string()
    } else {
        table.to_csv_string()
    }
}

fn parse_field<T: std::str::FromStr>(
    name: &str,
    text: std::result::Result<String, axum::extract::multipart::MultipartError>,
) -> Result<T, ApiError> {
    let text = text.map_err(|e| bad_request(format!("Failed to read field {}: {}", name, e)))?;
    text.trim()
        .parse()
        .map_err(|_| bad_request(format!("Invalid value for {}: {:?}", name, text)))
}

/// Samples every record of an uploaded CSV and renders the download body
///
/// The body starts with `#` comment lines carrying run statistics and one
/// line per skipped record, followed by the `plot_ID,lon,lat` rows.
pub fn process_upload(
    csv_data: &[u8],
    sampler: SpatialSampler,
    params: &BatchParams,
    seed: Option<u64>,
    start: Instant,
) -> SamplerResult<String> {
    let records = read_records(csv_data)?;
    let driver = BatchDriver::new(sampler, FailurePolicy::SkipAndReport);

    let output = match seed {
        Some(seed) => driver.run_parallel(&records, params, seed)?,
        None => driver.run(&records, params, &mut rand::rng())?,
    };

    let execution_time_ms = start.elapsed().as_secs_f64() * 1000.0;
    let mut body = render_statistics(records.len(), &output, execution_time_ms);
    body.push_str(&rows_to_csv_string(&output.rows)?);
    Ok(body)
}

fn render_statistics(total: usize, output: &BatchOutput, execution_time_ms: f64) -> String {
    let mut out = String::with_capacity(128 + output.failures.len() * 64);

    // writing to a String cannot fail
    let _ = writeln!(out, "# Statistics");
    let _ = writeln!(out, "# Total records: {}", total);
    let _ = writeln!(out, "# Successful: {}", total - output.failures.len());
    let _ = writeln!(out, "# Failed: {}", output.failures.len());
    let _ = writeln!(out, "# Sample points: {}", output.rows.len());
    let _ = writeln!(out, "# Execution time: {:.2} ms", execution_time_ms);

    for failure in &output.failures {
        let _ = writeln!(
            out,
            "# Failed record {} (plot_ID={}): {}",
            failure.index, failure.plot_id, failure.error
        );
    }

    out
}

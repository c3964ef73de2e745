use crate::employee::build_roster;
use crate::errors::AppError;
use crate::footfall::load_footfall;
use crate::models::{
    DebugInfo, EmployeesResponse, SalesQuery, SalesReport, StoresQuery, StoresResponse,
};
use crate::period::parse_range;
use crate::providers::{self, filter_transactions};
use crate::report::{build_report, ReportInput};
use crate::state::AppState;
use crate::stores::{self, DirectorySource};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use tracing::{error, info};

pub async fn health() -> &'static str {
    "ok"
}

pub async fn get_sales(
    State(state): State<AppState>,
    Query(query): Query<SalesQuery>,
) -> Result<(StatusCode, Json<SalesReport>), AppError> {
    let range = parse_range(&query)?;
    let provider = providers::select(range.year, &state);
    info!(
        year = range.year,
        era = %provider.era(),
        from = %range.from,
        to = %range.to,
        "sales report requested"
    );

    let (batch, (directory, store_notes), (footfall, footfall_note)) = tokio::join!(
        provider.fetch(&range),
        provider.store_directory(),
        load_footfall(&state.config.footfall_path, &range),
    );

    let batch = match batch {
        Ok(batch) => batch,
        Err(err) => {
            error!(era = %provider.era(), "sales report failed: {err}");
            let report =
                SalesReport::failed(range.info(), provider.era().to_string(), err.to_string());
            return Ok((StatusCode::INTERNAL_SERVER_ERROR, Json(report)));
        }
    };

    let transactions = filter_transactions(
        batch.transactions,
        query.store_id.as_deref(),
        query.employee_id.as_deref(),
    );

    let mut notes = batch.notes;
    notes.extend(store_notes);
    notes.extend(footfall_note);

    let report = build_report(ReportInput {
        range: &range,
        transactions: &transactions,
        stores: &directory,
        footfall: &footfall,
        store_filter: query.store_id.as_deref(),
        employee_filter: query.employee_id.as_deref(),
        include_employees: provider.has_employees(),
        source: batch.source,
        notes,
    });

    Ok((StatusCode::OK, Json(report)))
}

pub async fn get_stores(
    State(state): State<AppState>,
    Query(query): Query<StoresQuery>,
) -> Result<Json<StoresResponse>, AppError> {
    let source = match query.source.as_deref() {
        None => DirectorySource::Spreadsheet,
        Some(raw) => DirectorySource::parse(raw).ok_or_else(|| {
            AppError::bad_request("source must be 'spreadsheet', 'management' or 'database'")
        })?,
    };

    let (directory, note) = stores::load_or_empty(
        source,
        &state.config.store_spreadsheet_path,
        &state.config.store_management_path,
        state.pool.as_ref(),
    )
    .await;

    Ok(Json(StoresResponse {
        success: true,
        source: source.as_str().to_string(),
        stores: directory.records(),
        notes: note.into_iter().collect(),
    }))
}

pub async fn get_employees(
    State(state): State<AppState>,
    Query(query): Query<SalesQuery>,
) -> Result<(StatusCode, Json<EmployeesResponse>), AppError> {
    let range = parse_range(&query)?;
    let provider = providers::select(range.year, &state);

    if !provider.has_employees() {
        return Ok((
            StatusCode::OK,
            Json(EmployeesResponse {
                success: true,
                employees: Vec::new(),
                debug: DebugInfo {
                    source: provider.era().to_string(),
                    notes: vec![format!("no employee data for {}", range.year)],
                },
            }),
        ));
    }

    let (batch, (directory, store_notes)) =
        tokio::join!(provider.fetch(&range), provider.store_directory());

    match batch {
        Ok(batch) => {
            let transactions =
                filter_transactions(batch.transactions, query.store_id.as_deref(), None);
            let mut notes = batch.notes;
            notes.extend(store_notes);
            Ok((
                StatusCode::OK,
                Json(EmployeesResponse {
                    success: true,
                    employees: build_roster(&transactions, &directory),
                    debug: DebugInfo {
                        source: batch.source,
                        notes,
                    },
                }),
            ))
        }
        Err(err) => {
            error!("employee roster failed: {err}");
            Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(EmployeesResponse {
                    success: false,
                    employees: Vec::new(),
                    debug: DebugInfo {
                        source: provider.era().to_string(),
                        notes: vec![err.to_string()],
                    },
                }),
            ))
        }
    }
}

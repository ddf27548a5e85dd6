use napi::Result as NapiResult;
use napi_derive::napi;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

#[napi]
pub fn pd_route_metrics(input_json: String) -> NapiResult<String> {
    let input: propdev_core::planning::pd_route::PdRouteInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        propdev_core::planning::pd_route::appraise_pd_route(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Valuation
// ---------------------------------------------------------------------------

#[napi]
pub fn gdv_schedule(input_json: String) -> NapiResult<String> {
    let input: propdev_core::valuation::gdv::GdvInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        propdev_core::valuation::gdv::build_gdv_schedule(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Costing
// ---------------------------------------------------------------------------

#[napi]
pub fn build_cost_plan(input_json: String) -> NapiResult<String> {
    let input: propdev_core::costing::build_cost::BuildCostInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        propdev_core::costing::build_cost::build_cost_plan(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Finance
// ---------------------------------------------------------------------------

#[napi]
pub fn finance_structure(input_json: String) -> NapiResult<String> {
    let input: propdev_core::finance::structuring::FinanceStructureInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        propdev_core::finance::structuring::structure_finance(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

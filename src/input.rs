//! Search inputs from the uploaded sheet (CSV export)

use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

use crate::search::SearchInput;
use crate::utils::{HarvestError, HarvestResult};

/// Header names for the account label, by preference
const ACCOUNT_HEADERS: [&str; 2] = ["FB帳號", "訂單編號"];

/// Header names for the payment id, by preference
const TARGET_HEADERS: [&str; 3] = ["付款單號", "訂單號", "訂單編號"];

pub fn load_search_inputs(path: &Path) -> HarvestResult<Vec<SearchInput>> {
    let file = std::fs::File::open(path)
        .map_err(|e| HarvestError::Input(format!("Cannot open {}: {}", path.display(), e)))?;
    let inputs = parse_search_inputs(file)?;
    info!("Loaded {} search inputs from {}", inputs.len(), path.display());
    Ok(inputs)
}

/// Map sheet rows onto search inputs. Rows with neither an account nor a
/// payment id are dropped; a sheet with no usable row is an error.
pub fn parse_search_inputs<R: Read>(reader: R) -> HarvestResult<Vec<SearchInput>> {
    let mut csv = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv.headers()?.clone();
    let position = |candidates: &[&str]| -> Vec<usize> {
        candidates
            .iter()
            .filter_map(|name| {
                headers
                    .iter()
                    .position(|header| header.trim_start_matches('\u{feff}') == *name)
            })
            .collect()
    };
    let account_columns = position(&ACCOUNT_HEADERS);
    let target_columns = position(&TARGET_HEADERS);

    let mut inputs = Vec::new();
    for record in csv.records() {
        let record = record?;
        let first_filled = |columns: &[usize]| -> String {
            columns
                .iter()
                .filter_map(|&index| record.get(index))
                .find(|value| !value.is_empty())
                .unwrap_or_default()
                .to_string()
        };

        let account_label = first_filled(&account_columns);
        let target_id = first_filled(&target_columns);
        if account_label.is_empty() && target_id.is_empty() {
            continue;
        }
        inputs.push(SearchInput {
            account_label,
            target_id,
        });
    }
    debug!("Parsed inputs: {:?}", inputs);

    if inputs.is_empty() {
        return Err(HarvestError::Input(
            "No valid rows found. Check that the sheet has 付款單號 and FB帳號 columns".to_string(),
        ));
    }
    Ok(inputs)
}

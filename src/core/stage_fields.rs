//! 將 `<base>_<stage id>` 形式的重複欄位折疊成 `array_<base>` 陣列欄位。
//!
//! HubSpot 對每個 pipeline stage 都產生一組欄位（例如 `hs_date_entered_235832088`），
//! 偵測與轉換分開：[`detect_stage_field_groups`] 只看欄位名稱，
//! [`normalize_stage_fields`] 再依偵測結果改寫表格。

use crate::domain::model::{StageFieldGroup, StageFieldMember};
use crate::domain::table::{Cell, ColumnSchema, DataType, Field, FinalTable};
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::LazyLock;

pub const STAGE_ID_FIELD: &str = "pipeline_stage_id";
pub const STAGE_VALUE_FIELD: &str = "value";

static STAGE_FIELD_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+)_(\d{2,})$").expect("stage field pattern is valid"));

/// 依 base name 分組，只保留兩個以上成員的組；組與成員皆維持欄位出現順序
pub fn detect_stage_field_groups(structure: &ColumnSchema) -> Vec<StageFieldGroup> {
    let mut groups: Vec<StageFieldGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for field in &structure.fields {
        let Some(caps) = STAGE_FIELD_PATTERN.captures(&field.name) else {
            continue;
        };
        let member = StageFieldMember {
            suffix_id: caps[2].to_string(),
            field_name: field.name.clone(),
        };
        let base_name = &caps[1];
        match index.get(base_name) {
            Some(&i) => groups[i].members.push(member),
            None => {
                index.insert(base_name.to_string(), groups.len());
                groups.push(StageFieldGroup {
                    base_name: base_name.to_string(),
                    members: vec![member],
                });
            }
        }
    }

    groups.retain(|group| group.members.len() > 1);
    groups
}

/// 對 `target` 結構欄位執行偵測與轉換；目標欄位不存在或不是 struct 時原樣回傳
pub fn normalize_stage_fields(mut table: FinalTable, target: &str) -> FinalTable {
    let Some(target_index) = table.schema.position(target) else {
        tracing::debug!("No '{}' column, skipping stage field normalization", target);
        return table;
    };
    let DataType::Struct(structure) = table.schema.fields[target_index].data_type.clone() else {
        tracing::debug!("'{}' is not a struct, skipping stage field normalization", target);
        return table;
    };

    let groups = detect_stage_field_groups(&structure);
    if groups.is_empty() {
        return table;
    }

    let mut removed: Vec<usize> = Vec::new();
    let mut new_columns: Vec<(Field, Vec<Cell>)> = Vec::new();

    for group in &groups {
        let positions: Vec<usize> = group
            .members
            .iter()
            .filter_map(|m| structure.position(&m.field_name))
            .collect();
        let member_types: Vec<&DataType> = positions
            .iter()
            .map(|&p| &structure.fields[p].data_type)
            .collect();
        let value_type = common_type(&member_types);

        let cells = table
            .rows
            .iter()
            .map(|row| {
                let values = match &row[target_index] {
                    Cell::Struct(values) => Some(values),
                    _ => None,
                };
                Cell::Array(
                    group
                        .members
                        .iter()
                        .zip(&positions)
                        .map(|(member, &p)| {
                            let value = values
                                .and_then(|v| v.get(p))
                                .cloned()
                                .unwrap_or(Cell::Null);
                            let value = coerce(value, &structure.fields[p].data_type, &value_type);
                            Cell::Struct(vec![Cell::String(member.suffix_id.clone()), value])
                        })
                        .collect(),
                )
            })
            .collect();

        let element = DataType::Struct(ColumnSchema::new(vec![
            Field::new(STAGE_ID_FIELD, DataType::String),
            Field::new(STAGE_VALUE_FIELD, value_type),
        ]));
        new_columns.push((
            Field::new(group.column_name(), DataType::Array(Box::new(element))),
            cells,
        ));
        removed.extend(positions);

        tracing::debug!(
            "🔀 Folded {} '{}' stage fields into {}",
            group.members.len(),
            group.base_name,
            group.column_name()
        );
    }

    removed.sort_unstable();
    removed.dedup();

    let mut remaining = structure;
    for &p in removed.iter().rev() {
        remaining.fields.remove(p);
    }
    table.schema.fields[target_index].data_type = DataType::Struct(remaining);
    for row in table.rows.iter_mut() {
        if let Cell::Struct(values) = &mut row[target_index] {
            for &p in removed.iter().rev() {
                if p < values.len() {
                    values.remove(p);
                }
            }
        }
    }

    for (field, cells) in new_columns {
        table.put_column(field, cells);
    }

    tracing::info!(
        "🔀 Normalized {} stage field group(s) out of '{}'",
        groups.len(),
        target
    );
    table
}

/// 成員型別一致時沿用，否則統一成字串
fn common_type(types: &[&DataType]) -> DataType {
    match types.split_first() {
        Some((first, rest)) if rest.iter().all(|t| t == first) => (*first).clone(),
        _ => DataType::String,
    }
}

fn coerce(cell: Cell, from: &DataType, to: &DataType) -> Cell {
    if from == to || cell.is_null() {
        return cell;
    }
    match cell.to_json(from) {
        Value::String(s) => Cell::String(s),
        other => Cell::String(other.to_string()),
    }
}

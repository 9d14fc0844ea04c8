use crate::core::stage_fields::normalize_stage_fields;
use crate::domain::model::PROPERTIES_FIELD;
use crate::domain::table::{Cell, DataType, Field, FinalTable};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlattenMode {
    /// properties 維持巢狀
    None,
    /// 只折疊 stage 欄位
    StageFieldsOnly,
    /// 折疊 stage 欄位後，把剩下的屬性全部提升為頂層欄位
    Full,
}

impl FlattenMode {
    /// 兩者同時開啟時以 Full 為準
    pub fn from_flags(flatten_properties: bool, flatten_stage_fields: bool) -> Self {
        if flatten_properties {
            FlattenMode::Full
        } else if flatten_stage_fields {
            FlattenMode::StageFieldsOnly
        } else {
            FlattenMode::None
        }
    }
}

pub fn orchestrate(table: FinalTable, mode: FlattenMode) -> FinalTable {
    match mode {
        FlattenMode::None => {
            tracing::info!("Run with no flattening.");
            table
        }
        FlattenMode::StageFieldsOnly => {
            tracing::info!("Run with flatten_properties_stage_fields.");
            normalize_stage_fields(table, PROPERTIES_FIELD)
        }
        FlattenMode::Full => {
            tracing::info!("Run with flatten_properties.");
            let normalized = normalize_stage_fields(table, PROPERTIES_FIELD);
            promote_struct_fields(normalized, PROPERTIES_FIELD)
        }
    }
}

/// 將 struct 欄位的子欄位提升到頂層並移除該 struct。
/// 名稱與既有欄位衝突時加上 `<struct>_` 前綴，直到不再衝突。
pub fn promote_struct_fields(mut table: FinalTable, target: &str) -> FinalTable {
    let is_struct = matches!(
        table.schema.field(target).map(|f| &f.data_type),
        Some(DataType::Struct(_))
    );
    if !is_struct {
        return table;
    }
    let Some((field, cells)) = table.remove_column(target) else {
        return table;
    };
    let DataType::Struct(nested) = field.data_type else {
        return table;
    };

    let existing: HashSet<String> = table.schema.fields.iter().map(|f| f.name.clone()).collect();
    // 屬性自己的名稱先保留，改名時不能搶走
    let mut taken: HashSet<String> = existing.clone();
    taken.extend(
        nested
            .fields
            .iter()
            .filter(|f| !existing.contains(&f.name))
            .map(|f| f.name.clone()),
    );
    let mut promoted_names = Vec::with_capacity(nested.len());
    for sub_field in &nested.fields {
        if !existing.contains(&sub_field.name) {
            promoted_names.push(sub_field.name.clone());
            continue;
        }
        let mut name = format!("{}_{}", target, sub_field.name);
        while taken.contains(&name) {
            name = format!("{}_{}", target, name);
        }
        tracing::warn!(
            "⚠️ Promoted property '{}' collides with an existing column, renamed to '{}'",
            sub_field.name,
            name
        );
        taken.insert(name.clone());
        promoted_names.push(name);
    }

    let width = nested.len();
    for (row, cell) in table.rows.iter_mut().zip(cells) {
        match cell {
            Cell::Struct(values) => {
                let mut values = values.into_iter();
                row.extend((0..width).map(|_| values.next().unwrap_or(Cell::Null)));
            }
            _ => row.extend(std::iter::repeat(Cell::Null).take(width)),
        }
    }
    for (name, sub_field) in promoted_names.into_iter().zip(nested.fields) {
        table.schema.fields.push(Field::new(name, sub_field.data_type));
    }

    tracing::debug!("Promoted {} properties to top-level columns", width);
    table
}

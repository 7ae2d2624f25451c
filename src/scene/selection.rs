use serde_json::{Map, Value};

use crate::frame::Frame;

/// Selected cell, tracked by identifier across frames.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionState {
    /// Stable identifier of the selected cell.
    pub identifier: Option<u64>,
    /// Instance index in the current frame, re-resolved on every frame.
    pub index: Option<usize>,
    /// Last fetched property table, formatted for display.
    pub details: Vec<(String, String)>,
}

impl SelectionState {
    /// Select `identifier` in `frame` (or clear on `None`).
    pub fn select(&mut self, identifier: Option<u64>, frame: &Frame) {
        self.identifier = identifier;
        self.details.clear();
        self.resolve(frame);
    }

    /// Drop the selection.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Recompute `index` by scanning `frame` for the identifier. The
    /// identifier survives frames where the cell is absent.
    pub fn resolve(&mut self, frame: &Frame) {
        self.index = self.identifier.and_then(|id| frame.index_of(id));
    }

    /// GPU-facing index, -1 when nothing is selected in this frame.
    #[must_use]
    pub fn shader_index(&self) -> i32 {
        self.index.map_or(-1, |i| i as i32)
    }

    /// Store a fetched property table.
    pub fn set_details(&mut self, props: &Map<String, Value>) {
        self.details = props
            .iter()
            .map(|(k, v)| (k.clone(), format_property(v)))
            .collect();
    }
}

/// Render one property value: numbers truncated (floored) to five
/// decimals, arrays as `[ a, b ]`.
#[must_use]
pub fn format_property(value: &Value) -> String {
    match value {
        Value::Number(n) => n.as_f64().map_or_else(
            || n.to_string(),
            |v| {
                let scale = 1e5;
                format!("{}", (v * scale).floor() / scale)
            },
        ),
        Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(format_property).collect();
            format!("[ {} ]", inner.join(", "))
        }
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::frame::CellInstance;

    fn frame(ids: &[u64]) -> Frame {
        Frame {
            cells: vec![CellInstance::default(); ids.len()],
            cell_ids: ids.to_vec(),
            field: None,
        }
    }

    #[test]
    fn selection_follows_identifier_not_index() {
        let mut sel = SelectionState::default();
        sel.select(Some(42), &frame(&[1, 42, 3]));
        assert_eq!(sel.index, Some(1));

        sel.resolve(&frame(&[42, 1]));
        assert_eq!(sel.index, Some(0));

        sel.resolve(&frame(&[7, 8]));
        assert_eq!(sel.index, None);
        assert_eq!(sel.identifier, Some(42));
        assert_eq!(sel.shader_index(), -1);
    }

    #[test]
    fn numbers_are_floored_to_five_decimals() {
        assert_eq!(format_property(&json!(1.234_567_89)), "1.23456");
        assert_eq!(format_property(&json!(3)), "3");
        assert_eq!(format_property(&json!(-0.000_001)), "-0.00001");
    }

    #[test]
    fn arrays_and_strings_render_plainly() {
        assert_eq!(
            format_property(&json!([1.5, [2, 0.333_333_3]])),
            "[ 1.5, [ 2, 0.33333 ] ]"
        );
        assert_eq!(format_property(&json!("rod")), "rod");
        assert_eq!(format_property(&json!(true)), "true");
    }

    #[test]
    fn details_keep_server_keys() {
        let mut sel = SelectionState::default();
        let props = json!({"cellType": 1, "growthRate": 0.123_456_7});
        sel.set_details(props.as_object().unwrap());
        assert!(sel
            .details
            .contains(&("growthRate".to_owned(), "0.12345".to_owned())));
    }
}

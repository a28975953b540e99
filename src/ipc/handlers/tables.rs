use crate::error::KitResult;
use crate::ipc::error::err;
use crate::ipc::handlers::{bool_param, str_param, with_deck};
use crate::ipc::types::{AppState, Request};
use crate::sections::apply_design::DesignTable;
use crate::table::Table;
use serde_json::{json, Value};

/// One table edit, parsed from the method suffix and params.
enum TableOp {
    AddRow,
    RemoveRow { row_id: String },
    SetColumn { row_id: String, value: String },
    SetPk { row_id: String, checked: bool },
    SetFk { row_id: String, checked: bool },
    Rename { name: String },
}

impl TableOp {
    fn parse(op: &str, req: &Request) -> Option<Result<Self, Value>> {
        let row_id = || str_param(req, "rowId").map(str::to_string);
        let parsed = match op {
            "addRow" => Ok(TableOp::AddRow),
            "removeRow" => row_id().map(|row_id| TableOp::RemoveRow { row_id }),
            "setColumn" => row_id().and_then(|row_id| {
                str_param(req, "value").map(|v| TableOp::SetColumn {
                    row_id,
                    value: v.to_string(),
                })
            }),
            "setPk" => row_id().and_then(|row_id| {
                bool_param(req, "checked").map(|checked| TableOp::SetPk { row_id, checked })
            }),
            "setFk" => row_id().and_then(|row_id| {
                bool_param(req, "checked").map(|checked| TableOp::SetFk { row_id, checked })
            }),
            "rename" => str_param(req, "name").map(|n| TableOp::Rename {
                name: n.to_string(),
            }),
            _ => return None,
        };
        Some(parsed)
    }

    fn apply(self, table: &mut Table) -> KitResult<Value> {
        match self {
            TableOp::AddRow => {
                let row_id = table.add_row();
                return Ok(json!({ "rowId": row_id }));
            }
            TableOp::RemoveRow { row_id } => table.remove_row(&row_id)?,
            TableOp::SetColumn { row_id, value } => table.set_column(&row_id, &value)?,
            TableOp::SetPk { row_id, checked } => table.set_primary_key(&row_id, checked)?,
            TableOp::SetFk { row_id, checked } => table.set_foreign_key(&row_id, checked)?,
            TableOp::Rename { name } => table.rename(&name),
        }
        Ok(json!({}))
    }
}

fn m2m_index(req: &Request) -> Result<usize, Value> {
    let parsed = match req.params.get("table") {
        Some(Value::Number(n)) => n.as_u64().map(|n| n as usize),
        Some(Value::String(s)) => s.trim().parse::<usize>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| err(&req.id, "bad_params", "params.table must be a table index", None))
}

fn merge_state(mut out: Value, deck: &mut crate::Homework) -> Value {
    if let Value::Object(map) = &mut out {
        map.insert("section".into(), deck.section_state());
    }
    out
}

fn handle_design(state: &mut AppState, req: &Request, op: TableOp) -> Value {
    let which = match str_param(req, "table") {
        Ok(t) => t.to_string(),
        Err(resp) => return resp,
    };
    with_deck(state, req, |deck| {
        let which = DesignTable::parse(&which)?;
        let out = deck.design_edit(which, |t| op.apply(t))?;
        Ok(merge_state(out, deck))
    })
}

fn handle_m2m(state: &mut AppState, req: &Request, op: TableOp) -> Value {
    let index = match m2m_index(req) {
        Ok(i) => i,
        Err(resp) => return resp,
    };
    with_deck(state, req, |deck| {
        let out = deck.m2m_edit(index, |t| op.apply(t))?;
        Ok(merge_state(out, deck))
    })
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let (group, op) = req.method.split_once('.')?;
    if group != "design" && group != "m2m" {
        return None;
    }
    let op = match TableOp::parse(op, req)? {
        Ok(op) => op,
        Err(resp) => return Some(resp),
    };
    Some(if group == "design" {
        handle_design(state, req, op)
    } else {
        handle_m2m(state, req, op)
    })
}

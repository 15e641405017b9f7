use crate::ast::petri::*;
use serde::Serialize;
//the structured form of a module, serialized as json with the camelCase field names
//downstream tools expect. Arc ids are derived from their endpoints.

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleRecord {
    pub module_name: String,
    pub entry: String,
    pub exit: String,
    pub places: Vec<PlaceRecord>,
    pub transitions: Vec<TransitionRecord>,
    pub arcs: Vec<ArcRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaceRecord {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitionRecord {
    pub id: String,
    pub priority: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArcRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub src: String,
    pub dst: String,
}

pub fn to_record(module: &PetriModule) -> ModuleRecord {
    ModuleRecord {
        module_name: module.name.clone(),
        entry: module.entry.clone(),
        exit: module.exit.clone(),
        places: module
            .places
            .iter()
            .map(|p| PlaceRecord { id: p.id.clone() })
            .collect(),
        transitions: module
            .transitions
            .iter()
            .map(|t| TransitionRecord {
                id: t.id.clone(),
                priority: t.priority,
            })
            .collect(),
        arcs: module
            .arcs
            .iter()
            .map(|a| ArcRecord {
                id: a.derived_id(),
                kind: a.kind.to_string(),
                src: a.src.clone(),
                dst: a.dst.clone(),
            })
            .collect(),
    }
}

//pretty printed with two spaces of indentation
pub fn to_json(module: &PetriModule) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&to_record(module))
}

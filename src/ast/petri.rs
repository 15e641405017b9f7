/*
The output of the compiler : a Petri net fragment.

Places and transitions are only identified by their generated id.
A fragment exposes a single entry place and a single exit place, which is
what lets the code generator plug fragments into each other.
*/

use std::fmt::Display;

use ahash::AHashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Place {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub id: String,
    pub priority: u32, //0 means no priority annotation
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArcKind {
    PlaceToTransition,
    TransitionToPlace,
}

impl Display for ArcKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArcKind::PlaceToTransition => write!(f, "P2T"),
            ArcKind::TransitionToPlace => write!(f, "T2P"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arc {
    pub kind: ArcKind,
    pub src: String,
    pub dst: String,
}

impl Arc {
    //the id used by the structured output
    pub fn derived_id(&self) -> String {
        format!("{}_to_{}", self.src, self.dst)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PetriModule {
    pub name: String,
    pub entry: String,
    pub exit: String,
    pub places: Vec<Place>,
    pub transitions: Vec<Transition>,
    pub arcs: Vec<Arc>,
}

impl PetriModule {
    //a fragment holding only its two interface places
    pub fn new(name: String, entry: String, exit: String) -> Self {
        PetriModule {
            name,
            places: vec![Place { id: entry.clone() }, Place { id: exit.clone() }],
            entry,
            exit,
            transitions: Vec::new(),
            arcs: Vec::new(),
        }
    }

    pub fn add_place(&mut self, id: &str) {
        self.places.push(Place { id: id.to_string() })
    }

    pub fn add_transition(&mut self, id: &str, priority: u32) {
        self.transitions.push(Transition {
            id: id.to_string(),
            priority,
        })
    }

    //place -> transition
    pub fn consume(&mut self, place: &str, transition: &str) {
        self.arcs.push(Arc {
            kind: ArcKind::PlaceToTransition,
            src: place.to_string(),
            dst: transition.to_string(),
        })
    }

    //transition -> place
    pub fn produce(&mut self, transition: &str, place: &str) {
        self.arcs.push(Arc {
            kind: ArcKind::TransitionToPlace,
            src: transition.to_string(),
            dst: place.to_string(),
        })
    }

    //copies every element of another fragment into this one
    pub fn absorb(&mut self, other: &PetriModule) {
        self.places.extend(other.places.iter().cloned());
        self.transitions.extend(other.transitions.iter().cloned());
        self.arcs.extend(other.arcs.iter().cloned());
    }

    //checks the structural invariants of a fragment :
    //unique ids, interface places present, arcs between existing nodes of the right class
    pub fn validate(&self) -> Result<(), InvariantError> {
        let mut places = AHashSet::new();
        for p in &self.places {
            if !places.insert(p.id.as_str()) {
                return Err(InvariantError::DuplicateId(p.id.clone()));
            }
        }
        let mut transitions = AHashSet::new();
        for t in &self.transitions {
            if places.contains(t.id.as_str()) || !transitions.insert(t.id.as_str()) {
                return Err(InvariantError::DuplicateId(t.id.clone()));
            }
        }
        for interface in &[&self.entry, &self.exit] {
            if !places.contains(interface.as_str()) {
                return Err(InvariantError::MissingInterface((*interface).clone()));
            }
        }
        for arc in &self.arcs {
            let (src_ok, dst_ok) = match arc.kind {
                ArcKind::PlaceToTransition => (
                    places.contains(arc.src.as_str()),
                    transitions.contains(arc.dst.as_str()),
                ),
                ArcKind::TransitionToPlace => (
                    transitions.contains(arc.src.as_str()),
                    places.contains(arc.dst.as_str()),
                ),
            };
            if !(src_ok && dst_ok) {
                return Err(InvariantError::DanglingArc(arc.clone()));
            }
        }
        Ok(())
    }
}

//lookups used to inspect compiled fragments
#[cfg(test)]
impl PetriModule {
    pub fn transition(&self, id: &str) -> Option<&Transition> {
        self.transitions.iter().find(|t| t.id == id)
    }

    pub fn arcs_from<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Arc> + 'a {
        self.arcs.iter().filter(move |a| a.src == id)
    }

    pub fn arcs_to<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Arc> + 'a {
        self.arcs.iter().filter(move |a| a.dst == id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantError {
    DuplicateId(String),
    MissingInterface(String),
    DanglingArc(Arc),
}

impl Display for InvariantError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvariantError::DuplicateId(id) => write!(f, "id {} is used twice", id),
            InvariantError::MissingInterface(id) => {
                write!(f, "interface place {} is not in the place set", id)
            }
            InvariantError::DanglingArc(arc) => write!(
                f,
                "{} arc {} -> {} does not connect a {} to a {}",
                arc.kind,
                arc.src,
                arc.dst,
                if arc.kind == ArcKind::PlaceToTransition {
                    "place"
                } else {
                    "transition"
                },
                if arc.kind == ArcKind::PlaceToTransition {
                    "transition"
                } else {
                    "place"
                },
            ),
        }
    }
}

impl std::error::Error for InvariantError {}

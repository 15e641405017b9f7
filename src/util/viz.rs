use std::{collections::HashMap, io::Write};

use crate::ast::petri::PetriModule;

//renders a fragment for graphviz : places are circles, transitions are boxes
type Nd = usize;
type Ed<'a> = &'a (usize, usize);
struct Graph {
    nodes: Vec<(String, bool)>, //label, is a place
    edges: Vec<(usize, usize)>,
}

pub fn render_dot<W: Write>(output: &mut W, module: &PetriModule) -> std::io::Result<()> {
    let mut index = HashMap::new();
    let mut nodes = Vec::new();
    for p in &module.places {
        index.insert(p.id.as_str(), nodes.len());
        nodes.push((p.id.clone(), true));
    }
    for t in &module.transitions {
        index.insert(t.id.as_str(), nodes.len());
        if t.priority > 0 {
            nodes.push((format!("{} ^{}", t.id, t.priority), false));
        } else {
            nodes.push((t.id.clone(), false));
        }
    }
    //arcs always join known nodes in a valid fragment
    let edges = module
        .arcs
        .iter()
        .filter_map(|a| Some((*index.get(a.src.as_str())?, *index.get(a.dst.as_str())?)))
        .collect();
    let graph = Graph { nodes, edges };
    dot::render(&graph, output)
}

impl<'a> dot::Labeller<'a, Nd, Ed<'a>> for Graph {
    fn graph_id(&'a self) -> dot::Id<'a> {
        //constant, always a valid id
        dot::Id::new("petri").unwrap()
    }
    fn node_id(&'a self, n: &Nd) -> dot::Id<'a> {
        dot::Id::new(format!("N{}", n)).unwrap()
    }
    fn node_label<'b>(&'b self, n: &Nd) -> dot::LabelText<'b> {
        dot::LabelText::LabelStr(self.nodes[*n].0.clone().into())
    }
    fn node_shape(&'a self, n: &Nd) -> Option<dot::LabelText<'a>> {
        let shape = if self.nodes[*n].1 { "circle" } else { "box" };
        Some(dot::LabelText::LabelStr(shape.into()))
    }
}

impl<'a> dot::GraphWalk<'a, Nd, Ed<'a>> for Graph {
    fn nodes(&self) -> dot::Nodes<'a, Nd> {
        (0..self.nodes.len()).collect()
    }
    fn edges(&'a self) -> dot::Edges<'a, Ed<'a>> {
        self.edges.iter().collect()
    }
    fn source(&self, e: &Ed) -> Nd {
        e.0
    }
    fn target(&self, e: &Ed) -> Nd {
        e.1
    }
}

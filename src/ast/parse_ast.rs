/*
This is the syntax tree built by the parser and consumed by the code generator.
It is a direct image of the flownet syntax : every operator of the language
has exactly one variant here, and every node owns its children.

There is no concrete syntax for Choice yet, so it can only be built by hand
(see the constructors at the bottom of this file).
*/

use std::{
    hash::Hash,
    ops::{Deref, DerefMut},
};

use serde::{Serialize, Serializer};

//struct for storing the a position
//the tuple is file_id, left index, right index
pub type Pos = (usize, usize, usize);

//A wrapper to include position information in the tree
//It implements deref for easier use, so methods of the "value" field
//can be called directly on the wrapper.
//Two Loc are equal when their values are equal, wherever they come from.
#[derive(Debug, Clone, Eq)]
pub struct Loc<T> {
    pub loc: Pos,
    pub value: T,
}

impl<T> Loc<T> {
    pub fn new(loc: Pos, value: T) -> Self {
        Loc { value, loc }
    }
}

impl<T: PartialEq> PartialEq for Loc<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T: Hash> Hash for Loc<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.value.hash(state)
    }
}

impl<T> Deref for Loc<T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> DerefMut for Loc<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

//positions are for diagnostics only, they are not part of the json dump
impl<T: Serialize> Serialize for Loc<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}

//A process expression
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Expr {
    //an atomic step
    Action { name: String },
    //ordered composition, at least two children
    Sequence { children: Vec<Expr> },
    //both sides run, the continuation waits for both
    Parallel { left: Box<Expr>, right: Box<Expr> },
    //exactly one side runs
    Choice { left: Box<Expr>, right: Box<Expr> },
    //a scheduling priority on the way into the child
    #[serde(rename = "prio")]
    Priority {
        #[serde(rename = "priority")]
        level: u32,
        child: Box<Expr>,
    },
    //a reference to another module, resolved when compiling
    #[serde(rename = "call")]
    Call { module: Loc<String> },
}

impl Expr {
    pub fn action(name: &str) -> Self {
        Expr::Action {
            name: name.to_string(),
        }
    }
    pub fn sequence(first: Expr, second: Expr) -> Self {
        Expr::Sequence {
            children: vec![first, second],
        }
    }
    pub fn parallel(left: Expr, right: Expr) -> Self {
        Expr::Parallel {
            left: Box::new(left),
            right: Box::new(right),
        }
    }
    pub fn choice(left: Expr, right: Expr) -> Self {
        Expr::Choice {
            left: Box::new(left),
            right: Box::new(right),
        }
    }
    pub fn priority(level: u32, child: Expr) -> Self {
        Expr::Priority {
            level,
            child: Box::new(child),
        }
    }
    //a call with no meaningful position, for trees built outside the parser
    #[cfg(test)]
    pub fn call(module: &str) -> Self {
        Expr::Call {
            module: Loc::new((0, 0, 0), module.to_string()),
        }
    }

    //every module name called somewhere in this expression, in source order
    pub fn called_modules(&self) -> Vec<&Loc<String>> {
        let mut calls = Vec::new();
        collect_calls(self, &mut calls);
        calls
    }
}

fn collect_calls<'a>(expr: &'a Expr, calls: &mut Vec<&'a Loc<String>>) {
    match expr {
        Expr::Action { .. } => (),
        Expr::Sequence { children } => {
            for child in children {
                collect_calls(child, calls)
            }
        }
        Expr::Parallel { left, right } | Expr::Choice { left, right } => {
            collect_calls(left, calls);
            collect_calls(right, calls);
        }
        Expr::Priority { child, .. } => collect_calls(child, calls),
        Expr::Call { module } => calls.push(module),
    }
}
